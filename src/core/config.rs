use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

/// Tunables read from `config.json` next to the executable. Every key
/// can also be set through an environment variable of the same name;
/// the environment wins over the file, the file over the defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    #[serde(rename = "DEBUG", default)]
    pub debug: bool,
    /// Countdown status line cadence while the alarm is armed.
    #[serde(rename = "LOG_INTERVAL", default = "default_log_interval")]
    pub log_interval_ms: u64,
    /// Pause between reminder firings until the alarm is acknowledged.
    #[serde(rename = "REPEAT_INTERVAL", default = "default_repeat_interval")]
    pub repeat_interval_ms: u64,
    #[serde(rename = "DEFAULT_SOUND", default = "default_sound")]
    pub default_sound: String,
    #[serde(rename = "DEFAULT_ICON", default = "default_icon")]
    pub default_icon: String,
}

fn default_log_interval() -> u64 {
    1_000
}

fn default_repeat_interval() -> u64 {
    60_000
}

fn default_sound() -> String {
    "alarm1.wav".to_string()
}

fn default_icon() -> String {
    "icon.png".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_interval_ms: default_log_interval(),
            repeat_interval_ms: default_repeat_interval(),
            default_sound: default_sound(),
            default_icon: default_icon(),
        }
    }
}

impl Settings {
    /// Clamped to at least 1 ms; interval timers reject a zero period.
    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms.max(1))
    }

    /// Clamped to at least 1 ms; interval timers reject a zero period.
    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms.max(1))
    }

    /// Overlay environment values onto whatever the file provided.
    ///
    /// `lookup` stands in for `std::env::var` so tests can inject an
    /// environment. Empty values count as unset; values that fail to
    /// parse are warned about and ignored, never fatal.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(value) = lookup("DEBUG") {
            self.debug = is_truthy(&value);
        }
        if let Some(value) = lookup("LOG_INTERVAL") {
            match value.parse() {
                Ok(ms) => self.log_interval_ms = ms,
                Err(_) => warn!("Ignoring unparseable LOG_INTERVAL: {value}"),
            }
        }
        if let Some(value) = lookup("REPEAT_INTERVAL") {
            match value.parse() {
                Ok(ms) => self.repeat_interval_ms = ms,
                Err(_) => warn!("Ignoring unparseable REPEAT_INTERVAL: {value}"),
            }
        }
        if let Some(value) = lookup("DEFAULT_SOUND") {
            self.default_sound = value;
        }
        if let Some(value) = lookup("DEFAULT_ICON") {
            self.default_icon = value;
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            config_path: base_dir.join("config.json"),
        }
    }

    /// Load settings from the config file. The file is optional:
    /// failure to read or parse it gets a warning and the defaults
    /// are used, never an error.
    pub fn load(&self) -> Settings {
        match fs::read_to_string(&self.config_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => return settings,
                Err(err) => {
                    warn!("Ignoring malformed {}: {err}", self.config_path.display());
                }
            },
            Err(_) => warn!("Failed to read {}", self.config_path.display()),
        }
        Settings::default()
    }
}
