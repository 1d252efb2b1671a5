//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve store path, log settings and donor file path once at startup.
//!
//! # Invariants
//! - Blank variables count as unset.
//! - A constructed [`RegistryConfig`] always has a canonical log level and
//!   an absolute log directory.

use crate::logging::{default_log_level, parse_level};
use crate::transfer::DEFAULT_DONOR_FILE;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "BLOODBANK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BLOODBANK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BLOODBANK_LOG_DIR";
pub const ENV_DONOR_FILE: &str = "BLOODBANK_DONOR_FILE";

pub const DEFAULT_DB_FILE: &str = "bloodbank.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "logs";

#[derive(Debug)]
pub enum ConfigError {
    /// Relative log directory and no working directory to anchor it.
    WorkingDirectory(std::io::Error),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WorkingDirectory(err) => {
                write!(f, "cannot resolve current working directory: {err}")
            }
            Self::InvalidLogLevel(level) => write!(
                f,
                "{ENV_LOG_LEVEL}=`{level}` is not one of trace|debug|info|warn|error"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WorkingDirectory(err) => Some(err),
            Self::InvalidLogLevel(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub donor_file: PathBuf,
}

impl RegistryConfig {
    /// Reads `BLOODBANK_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, falling back to defaults.
    ///
    /// A relative log directory is anchored at the current working directory.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
        let log_level = match read(ENV_LOG_LEVEL) {
            Some(raw) => parse_level(&raw)
                .map_err(|_| ConfigError::InvalidLogLevel(raw))?
                .to_string(),
            None => default_log_level().to_string(),
        };
        let donor_file = read(ENV_DONOR_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DONOR_FILE));

        let log_dir = match read(ENV_LOG_DIR).map(PathBuf::from) {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => current_dir()?.join(dir),
            None => current_dir()?.join(DEFAULT_LOG_DIR_NAME),
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            donor_file,
        })
    }
}

fn current_dir() -> Result<PathBuf, ConfigError> {
    std::env::current_dir().map_err(ConfigError::WorkingDirectory)
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, RegistryConfig, DEFAULT_DB_FILE, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL,
    };
    use crate::logging::default_log_level;
    use crate::transfer::DEFAULT_DONOR_FILE;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = RegistryConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_FILE));
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.donor_file, PathBuf::from(DEFAULT_DONOR_FILE));
        assert!(config.log_dir.is_absolute());
        assert!(config.log_dir.ends_with("logs"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config =
            RegistryConfig::from_lookup(lookup_from(&[(ENV_DB_PATH, "   "), (ENV_LOG_LEVEL, "")]))
                .unwrap();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_FILE));
        assert_eq!(config.log_level, default_log_level());
    }

    #[test]
    fn explicit_values_are_trimmed_and_used() {
        let config = RegistryConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, " /var/lib/bloodbank/registry.db "),
            (ENV_LOG_LEVEL, "WARNING"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/bloodbank/registry.db"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = RegistryConfig::from_lookup(lookup_from(&[(ENV_LOG_LEVEL, "chatty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(level) if level == "chatty"));
    }

    #[test]
    fn relative_log_dir_is_anchored_at_working_directory() {
        let config = RegistryConfig::from_lookup(lookup_from(&[(ENV_LOG_DIR, "var/log")])).unwrap();
        assert!(config.log_dir.is_absolute());
        assert!(config.log_dir.ends_with("var/log"));
    }
}
