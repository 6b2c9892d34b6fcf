//! Core configuration.
//!
//! # Responsibility
//! - Describe every tunable of the core in one TOML-loadable structure.
//! - Convert sections into the option types used by services.
//!
//! # Invariants
//! - Every field has a default; an empty file is a valid configuration.
//! - Durations are strictly positive after `validate()`.
//! - The recording interval is a whole number of seconds.

use crate::emergency::EmergencySettings;
use crate::geo::PositionOptions;
use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SECS_PER_HOUR: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// SQLite database file. An in-memory store is used when unset.
    pub db_path: Option<PathBuf>,
    pub location: LocationConfig,
    pub emergency: EmergencyConfig,
    pub reminders: ReminderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub high_accuracy: bool,
    pub fix_timeout_ms: u64,
    pub watch_timeout_ms: u64,
    pub watch_maximum_age_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    pub recording_interval_ms: u64,
    pub map_url_base: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub window_hours: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
            location: LocationConfig::default(),
            emergency: EmergencyConfig::default(),
            reminders: ReminderConfig::default(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            fix_timeout_ms: 10_000,
            watch_timeout_ms: 5_000,
            watch_maximum_age_ms: 10_000,
        }
    }
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        let defaults = EmergencySettings::default();
        Self {
            recording_interval_ms: defaults.recording_interval.as_millis() as u64,
            map_url_base: defaults.map_url_base,
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self { window_hours: 24 }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config syntax: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl CoreConfig {
    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("location.fix_timeout_ms", self.location.fix_timeout_ms),
            ("location.watch_timeout_ms", self.location.watch_timeout_ms),
            (
                "emergency.recording_interval_ms",
                self.emergency.recording_interval_ms,
            ),
            ("reminders.window_hours", self.reminders.window_hours),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("`{name}` must be greater than 0")));
        }
        if self.emergency.recording_interval_ms % 1_000 != 0 {
            return Err(ConfigError::Invalid(format!(
                "`emergency.recording_interval_ms` must be a whole number of seconds, got {}",
                self.emergency.recording_interval_ms
            )));
        }
        if self.reminders.window_hours.checked_mul(SECS_PER_HOUR).is_none() {
            return Err(ConfigError::Invalid(format!(
                "`reminders.window_hours` is too large: {}",
                self.reminders.window_hours
            )));
        }
        if self.emergency.map_url_base.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "`emergency.map_url_base` must not be empty".to_string(),
            ));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "`log_dir` must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// One-shot fix options. Cached fixes are never reused.
    pub fn one_shot_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.location.high_accuracy,
            timeout: Duration::from_millis(self.location.fix_timeout_ms),
            maximum_age: Duration::ZERO,
        }
    }

    pub fn watch_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.location.high_accuracy,
            timeout: Duration::from_millis(self.location.watch_timeout_ms),
            maximum_age: Duration::from_millis(self.location.watch_maximum_age_ms),
        }
    }

    pub fn emergency_settings(&self) -> EmergencySettings {
        EmergencySettings {
            recording_interval: Duration::from_millis(self.emergency.recording_interval_ms),
            map_url_base: self.emergency.map_url_base.clone(),
        }
    }

    pub fn reminder_window(&self) -> Duration {
        Duration::from_secs(self.reminders.window_hours.saturating_mul(SECS_PER_HOUR))
    }
}
