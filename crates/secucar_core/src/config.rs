//! Startup configuration for the persistence core.
//!
//! # Responsibility
//! - Resolve storage location, lock deadline and logging options.
//! - Read values from the process environment (or any lookup in tests).
//!
//! # Invariants
//! - Missing variables fall back to defaults; malformed ones are errors.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "SECUCAR_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "SECUCAR_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "SECUCAR_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SECUCAR_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "secucar.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MEMORY_MARKER: &str = ":memory:";

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    File(PathBuf),
    Memory,
}

/// Resolved configuration for one `Database` instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub storage: StorageLocation,
    /// Longest time a single statement waits for a storage lock.
    pub busy_timeout: Duration,
    pub log_level: &'static str,
    /// Absolute directory for rolling log files; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            storage: StorageLocation::File(PathBuf::from(DEFAULT_DB_FILE_NAME)),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl DatabaseConfig {
    /// In-memory storage with default timeouts; used by tests and probes.
    pub fn in_memory() -> Self {
        Self {
            storage: StorageLocation::Memory,
            ..Self::default()
        }
    }

    /// Reads configuration from `SECUCAR_*` environment variables.
    ///
    /// # Errors
    /// - Returns `ConfigError` when a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, applying defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = non_blank(lookup(ENV_DB_PATH)) {
            config.storage = if raw == MEMORY_MARKER {
                StorageLocation::Memory
            } else {
                StorageLocation::File(PathBuf::from(raw))
            };
        }

        if let Some(raw) = non_blank(lookup(ENV_BUSY_TIMEOUT_MS)) {
            let millis = raw
                .parse::<u64>()
                .map_err(|err| ConfigError::invalid(ENV_BUSY_TIMEOUT_MS, &raw, err.to_string()))?;
            config.busy_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = non_blank(lookup(ENV_LOG_LEVEL)) {
            config.log_level = normalize_level(&raw)
                .map_err(|reason| ConfigError::invalid(ENV_LOG_LEVEL, &raw, reason))?;
        }

        if let Some(raw) = non_blank(lookup(ENV_LOG_DIR)) {
            let path = PathBuf::from(&raw);
            if !path.is_absolute() {
                return Err(ConfigError::invalid(
                    ENV_LOG_DIR,
                    &raw,
                    "must be an absolute path",
                ));
            }
            config.log_dir = Some(path);
        }

        Ok(config)
    }
}

/// Malformed configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, DatabaseConfig, StorageLocation, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH,
        ENV_LOG_DIR, ENV_LOG_LEVEL,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = DatabaseConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DatabaseConfig::default());
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn reads_all_variables() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/var/lib/secucar/db.sqlite3"),
            (ENV_BUSY_TIMEOUT_MS, "250"),
            (ENV_LOG_LEVEL, " WARNING "),
            (ENV_LOG_DIR, "/var/log/secucar"),
        ]))
        .unwrap();

        assert_eq!(
            config.storage,
            StorageLocation::File(PathBuf::from("/var/lib/secucar/db.sqlite3"))
        );
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/secucar")));
    }

    #[test]
    fn memory_marker_selects_in_memory_storage() {
        let config = DatabaseConfig::from_lookup(lookup(&[(ENV_DB_PATH, ":memory:")])).unwrap();
        assert_eq!(config.storage, StorageLocation::Memory);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = DatabaseConfig::from_lookup(lookup(&[(ENV_BUSY_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT_MS,
                ..
            }
        ));

        let err = DatabaseConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "fatal")])).unwrap_err();
        assert!(err.to_string().contains(ENV_LOG_LEVEL));

        let err = DatabaseConfig::from_lookup(lookup(&[(ENV_LOG_DIR, "logs")])).unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }
}
