//! Runtime configuration.
//!
//! Loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::pool::DbConfig;

/// Process-level configuration for a Velo POS backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size (default: 5)
    pub db_max_connections: u32,

    /// Allow the timestamp-based invoice number when the counter fails
    pub numbering_fallback: bool,

    /// tracing filter directive (default: "info")
    pub log_filter: String,
}

impl Default for PosConfig {
    fn default() -> Self {
        PosConfig {
            db_path: PathBuf::from("./velo.db"),
            db_max_connections: 5,
            numbering_fallback: true,
            log_filter: "info".to_string(),
        }
    }
}

impl PosConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                  | Default      |
    /// |---------------------------|--------------|
    /// | `VELO_DB_PATH`            | `./velo.db`  |
    /// | `VELO_DB_MAX_CONNECTIONS` | `5`          |
    /// | `VELO_NUMBERING_FALLBACK` | `true`       |
    /// | `VELO_LOG`                | `info`       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`PosConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PosConfig::default();

        let db_max_connections = match lookup("VELO_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue("VELO_DB_MAX_CONNECTIONS".to_string()))?,
            None => defaults.db_max_connections,
        };

        let numbering_fallback = match lookup("VELO_NUMBERING_FALLBACK") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::InvalidValue("VELO_NUMBERING_FALLBACK".to_string()))?,
            None => defaults.numbering_fallback,
        };

        let db_path = match lookup("VELO_DB_PATH") {
            Some(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::InvalidValue("VELO_DB_PATH".to_string()))
            }
            Some(raw) => PathBuf::from(raw),
            None => defaults.db_path,
        };

        Ok(PosConfig {
            db_path,
            db_max_connections,
            numbering_fallback,
            log_filter: lookup("VELO_LOG").unwrap_or(defaults.log_filter),
        })
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.db_path.clone())
            .max_connections(self.db_max_connections)
            .numbering_fallback(self.numbering_fallback)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PosConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PosConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = PosConfig::from_lookup(lookup(&[
            ("VELO_DB_PATH", "/var/lib/velo/shop.db"),
            ("VELO_DB_MAX_CONNECTIONS", "8"),
            ("VELO_NUMBERING_FALLBACK", "off"),
            ("VELO_LOG", "velo_db=debug"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/velo/shop.db"));
        assert_eq!(config.db_max_connections, 8);
        assert!(!config.numbering_fallback);
        assert_eq!(config.log_filter, "velo_db=debug");

        let db = config.db_config();
        assert_eq!(db.max_connections, 8);
        assert!(!db.numbering_fallback);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            PosConfig::from_lookup(lookup(&[("VELO_DB_MAX_CONNECTIONS", "zero")])),
            Err(ConfigError::InvalidValue("VELO_DB_MAX_CONNECTIONS".into()))
        );
        assert_eq!(
            PosConfig::from_lookup(lookup(&[("VELO_DB_MAX_CONNECTIONS", "0")])),
            Err(ConfigError::InvalidValue("VELO_DB_MAX_CONNECTIONS".into()))
        );
        assert_eq!(
            PosConfig::from_lookup(lookup(&[("VELO_NUMBERING_FALLBACK", "maybe")])),
            Err(ConfigError::InvalidValue("VELO_NUMBERING_FALLBACK".into()))
        );
    }
}
