//! Configuration System
//!
//! Hierarchical configuration loading from:
//! - `rbdb.toml` (project configuration, optional)
//! - Environment variables (`RBDB_*` prefix, `__` separating sections)
//!
//! ## Example
//!
//! ```toml
//! # rbdb.toml
//! [database]
//! path = "knowledge.db"
//! busy_timeout_ms = 5000
//! foreign_keys = true
//!
//! [logging]
//! filter = "rbdb=debug"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! RBDB_DATABASE__PATH=/var/lib/rbdb/knowledge.db
//! RBDB_LOGGING__FILTER=debug
//! ```

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the database file
    pub path: PathBuf,

    /// How long the engine waits on a locked database before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Enforce referential integrity on catalog tables
    #[serde(default = "default_true")]
    pub foreign_keys: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Tracing filter directive, e.g. `info` or `rbdb=debug`
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from("rbdb.db"),
            busy_timeout_ms: default_busy_timeout_ms(),
            foreign_keys: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then `rbdb.toml`, then `RBDB_*`
    /// environment variables.
    pub fn load() -> Result<Self> {
        Ok(Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("rbdb.toml"))
            .merge(Env::prefixed("RBDB_").split("__"))
            .extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database.path, PathBuf::from("rbdb.db"));
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert!(config.database.foreign_keys);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("RBDB_DATABASE__PATH", "/tmp/other.db");
            jail.set_env("RBDB_DATABASE__BUSY_TIMEOUT_MS", "250");
            let config = Config::load().expect("config loads");
            assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
            assert_eq!(config.database.busy_timeout_ms, 250);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "rbdb.toml",
                r#"
                [database]
                path = "from-file.db"
                foreign_keys = false
            "#,
            )?;
            let config = Config::load().expect("config loads");
            assert_eq!(config.database.path, PathBuf::from("from-file.db"));
            assert!(!config.database.foreign_keys);
            Ok(())
        });
    }
}
