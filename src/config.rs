//! Runtime settings.
//!
//! Layering, lowest to highest: built-in defaults, `<data_dir>/config.toml`,
//! `TABLERO_*` environment variables, then CLI flags (applied by the binary).

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "TABLERO_";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// IANA zone used to display lead timestamps.
    pub timezone: String,
    pub offline: bool,
    pub log_json: bool,
}

/// Shape of `config.toml`; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    host: Option<String>,
    port: Option<u16>,
    timezone: Option<String>,
    offline: Option<bool>,
    log_json: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("unknown timezone '{0}', use IANA format (e.g. America/Argentina/Buenos_Aires)")]
    UnknownTimezone(String),
}

pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tablero")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            data_dir: default_data_dir(),
            timezone: "America/Argentina/Buenos_Aires".into(),
            offline: false,
            log_json: false,
        }
    }
}

impl Settings {
    /// Load settings from the process environment and the config file.
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with(data_dir, |key| std::env::var(key).ok())
    }

    /// Same as [`Settings::load`] with an injectable environment lookup.
    pub fn load_with(data_dir: Option<PathBuf>, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        if let Some(dir) = data_dir.or_else(|| env(&format!("{ENV_PREFIX}DATA_DIR")).map(PathBuf::from)) {
            settings.data_dir = dir;
        }

        let file = settings.data_dir.join("config.toml");
        if file.exists() {
            settings.apply_file(&file)?;
        }
        settings.apply_env(env)?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileSettings = toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(tz) = file.timezone {
            self.timezone = tz;
        }
        if let Some(offline) = file.offline {
            self.offline = offline;
        }
        if let Some(log_json) = file.log_json {
            self.log_json = log_json;
        }
        Ok(())
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |name: &str| env(&format!("{ENV_PREFIX}{name}"));

        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}PORT"),
                value: port.clone(),
            })?;
        }
        if let Some(tz) = var("TIMEZONE") {
            self.timezone = tz;
        }
        if let Some(v) = var("OFFLINE") {
            self.offline = parse_bool(&format!("{ENV_PREFIX}OFFLINE"), &v)?;
        }
        if let Some(v) = var("LOG_JSON") {
            self.log_json = parse_bool(&format!("{ENV_PREFIX}LOG_JSON"), &v)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.tz().map(|_| ())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
