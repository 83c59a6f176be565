//! Autosave configuration
//!
//! Stored as TOML under an `[autosave]` table:
//! ```toml
//! [autosave]
//! debounce_ms = 300
//! status_ms = 2000
//! discard_stale_completions = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Upper bound for `debounce_ms` (1 minute)
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Upper bound for `status_ms` (10 minutes)
pub const MAX_STATUS_MS: u64 = 600_000;

/// Every key accepted by [`AutoSaveConfig::get`] and [`AutoSaveConfig::set`]
pub const KEYS: &[&str] = &[
    "autosave.debounce_ms",
    "autosave.status_ms",
    "autosave.discard_stale_completions",
];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Timing knobs for one save controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Quiet window before a save fires; 0 saves on every change
    pub debounce_ms: u64,
    /// Delay before a settled status resets to neutral
    pub status_ms: u64,
    /// Ignore settlement of saves that a later change superseded
    pub discard_stale_completions: bool,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            status_ms: 2000,
            discard_stale_completions: false,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    autosave: AutoSaveConfig,
}

impl AutoSaveConfig {
    /// Quiet window, or `None` for immediate mode
    pub fn debounce(&self) -> Option<Duration> {
        match self.debounce_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Delay before the status resets to neutral
    pub fn status_duration(&self) -> Duration {
        Duration::from_millis(self.status_ms)
    }

    /// Default location: `<config dir>/autosave/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("autosave").join("config.toml"))
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        file.autosave.validate()?;
        Ok(file.autosave)
    }

    /// Write to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        let contents = toml::to_string_pretty(&ConfigFile {
            autosave: self.clone(),
        })?;

        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, contents).map_err(write_err)
    }

    /// Check every value is within its valid range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(out_of_range("autosave.debounce_ms", self.debounce_ms, MAX_DEBOUNCE_MS));
        }
        if self.status_ms > MAX_STATUS_MS {
            return Err(out_of_range("autosave.status_ms", self.status_ms, MAX_STATUS_MS));
        }
        Ok(())
    }

    /// Read a single value by dotted key
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "autosave.debounce_ms" => self.debounce_ms.to_string(),
            "autosave.status_ms" => self.status_ms.to_string(),
            "autosave.discard_stale_completions" => self.discard_stale_completions.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a single value by dotted key
    ///
    /// `autosave.debounce_ms` also accepts `none`, meaning immediate mode.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut updated = self.clone();
        match key {
            "autosave.debounce_ms" => {
                updated.debounce_ms = if value.eq_ignore_ascii_case("none") {
                    0
                } else {
                    parse_value(key, value)?
                };
            }
            "autosave.status_ms" => updated.status_ms = parse_value(key, value)?,
            "autosave.discard_stale_completions" => {
                updated.discard_stale_completions = parse_value(key, value)?
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn out_of_range(key: &str, value: u64, max: u64) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: format!("must be between 0 and {}", max),
    }
}
