use std::io;
use std::sync::Arc;
use std::time::Duration;

use lingo_reader::{
    api::HttpTextApi,
    cli::Cli,
    config::{get_app_data_prefix, Config},
    logging::{self, LogLevel},
    status::watch_processing,
    ui::reader::Reader,
};

use clap::Parser;
use eyre::{eyre, Result};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = LogLevel::from_verbosity(cli.verbose, cli.debug);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path.clone())?,
        None => Config::new()?,
    };
    if let Some(server) = &cli.server {
        config.settings.server_url = server.clone();
    }
    if cli.token.is_some() {
        config.settings.token = cli.token.clone();
    }

    let Some(text_id) = cli.text_id.or(config.settings.last_text_id) else {
        return Err(eyre!("no text to open; pass a TEXT_ID"));
    };

    let api = HttpTextApi::new(
        &config.settings.server_url,
        config.settings.token.clone(),
        config.settings.request_timeout(),
    )?;

    if cli.status {
        logging::init(level);
        let period = Duration::from_millis(config.settings.poll_interval_ms);
        watch_processing(&api, text_id, period, &mut io::stdout())?;
        return Ok(());
    }

    let log_path = get_app_data_prefix()?.join("lingo.log");
    if let Err(err) = logging::init_file(level, &log_path) {
        eprintln!("Warning: Could not open {}: {}", log_path.display(), err);
        logging::init(level);
    }
    logging::info(format!(
        "opening text {text_id} from {}",
        config.settings.server_url
    ));

    if config.settings.last_text_id != Some(text_id) {
        config.settings.last_text_id = Some(text_id);
        if let Err(err) = config.save() {
            logging::warn(format!("could not remember last text: {err}"));
        }
    }

    let mut reader = Reader::new(config, Arc::new(api), text_id)?;
    reader.run()
}
