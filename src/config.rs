use crate::logging;
use crate::settings::{CfgDefaultKeymaps, Settings};
use eyre::Result;
use serde::de::DeserializeOwned;
use std::{fs, path::PathBuf};

pub const APP_NAME: &str = "lingo";

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub keymap: CfgDefaultKeymaps,
    filepath: PathBuf,
}

impl Config {
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        Self::load_from(prefix.join("configuration.json"))
    }

    /// Load configuration from a custom path, writing defaults there on first run.
    ///
    /// Sections or fields that fail to parse fall back to their defaults.
    pub fn load_from(filepath: PathBuf) -> Result<Self> {
        if !filepath.exists() {
            let config = Self {
                settings: Settings::default(),
                keymap: CfgDefaultKeymaps::default(),
                filepath,
            };
            config.save()?;
            return Ok(config);
        }

        let config_str = fs::read_to_string(&filepath)?;
        let (settings, keymap) = match serde_json::from_str::<serde_json::Value>(&config_str) {
            Ok(user_config) => (
                section(&user_config, "Setting"),
                section(&user_config, "Keymap"),
            ),
            Err(err) => {
                logging::warn(format!(
                    "ignoring unreadable {}: {err}",
                    filepath.display()
                ));
                (Settings::default(), CfgDefaultKeymaps::default())
            }
        };

        Ok(Self {
            settings,
            keymap,
            filepath,
        })
    }

    /// Get the configuration file path
    pub fn filepath(&self) -> &PathBuf {
        &self.filepath
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<()> {
        let config_json = serde_json::json!({
            "Setting": self.settings,
            "Keymap": self.keymap,
        });
        let config_str = serde_json::to_string_pretty(&config_json)?;

        if let Some(parent) = self.filepath.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.filepath, config_str)?;
        Ok(())
    }
}

fn section<T: DeserializeOwned + Default>(config: &serde_json::Value, name: &str) -> T {
    match config.get(name) {
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            logging::warn(format!("invalid \"{name}\" section, using defaults: {err}"));
            T::default()
        }),
        None => T::default(),
    }
}

pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home).join(APP_NAME));
    } else if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home.clone()).join(".config").join(APP_NAME);
        if path.exists() {
            return Ok(path);
        } else {
            return Ok(PathBuf::from(home).join(format!(".{APP_NAME}")));
        }
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(format!(".{APP_NAME}")));
    }

    Err(eyre::eyre!(
        "Could not determine application data directory"
    ))
}
