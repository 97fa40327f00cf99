use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "lingo",
    version,
    about = "Read texts from a language-learning server in the terminal.",
    long_about = None
)]
pub struct Cli {
    /// Base URL of the server API
    #[clap(short, long, value_name = "URL")]
    pub server: Option<String>,

    /// Bearer token sent with every request
    #[clap(short, long)]
    pub token: Option<String>,

    /// Use a specific configuration file
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Follow the text's processing progress and exit when it is done
    #[clap(long)]
    pub status: bool,

    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug output
    #[clap(long)]
    pub debug: bool,

    /// Text to open; defaults to the last one read
    #[clap(name = "TEXT_ID")]
    pub text_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from(["lingo", "-s", "http://host/api", "-vv", "--status", "42"]);
        assert_eq!(cli.server.as_deref(), Some("http://host/api"));
        assert_eq!(cli.verbose, 2);
        assert!(cli.status);
        assert_eq!(cli.text_id, Some(42));
        assert!(cli.token.is_none());
    }

    #[test]
    fn test_rejects_non_numeric_text_id() {
        assert!(Cli::try_parse_from(["lingo", "novela"]).is_err());
    }
}
