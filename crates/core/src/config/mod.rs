//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (QUERYCACHE_*)
//! 2. TOML config file (if QUERYCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (QUERYCACHE_*, nested keys split on `__`)
/// 2. TOML config file (if QUERYCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory holding one cache directory per table.
    ///
    /// Set via QUERYCACHE_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Default entry lifetime in minutes; `0` disables persistence.
    ///
    /// Set via QUERYCACHE_TTL_MINUTES environment variable.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,

    /// Reject filter keys whose operator prefix is not recognized.
    ///
    /// Set via QUERYCACHE_STRICT_FILTERS environment variable.
    #[serde(default)]
    pub strict_filters: bool,

    /// Path to the SQLite database used by the bundled executor.
    ///
    /// Set via QUERYCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Columns carrying actor data, injected on writes and hidden on reads.
    #[serde(default)]
    pub actor_columns: ActorColumns,

    /// Assignment applied by `disable` operations.
    #[serde(default)]
    pub soft_delete: SoftDelete,
}

/// Column names used for actor/session data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorColumns {
    /// Set via QUERYCACHE_ACTOR_COLUMNS__IP.
    pub ip: String,
    /// Set via QUERYCACHE_ACTOR_COLUMNS__ACCOUNT_ID.
    pub account_id: String,
    /// Set via QUERYCACHE_ACTOR_COLUMNS__USER_ID.
    pub user_id: String,
}

impl Default for ActorColumns {
    fn default() -> Self {
        Self { ip: "ip".into(), account_id: "account_id".into(), user_id: "user_id".into() }
    }
}

impl ActorColumns {
    /// All actor column names, in injection order.
    pub fn names(&self) -> [&str; 3] {
        [&self.ip, &self.account_id, &self.user_id]
    }
}

/// Soft-delete assignment (`column = value`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDelete {
    pub column: String,
    pub value: String,
}

impl Default for SoftDelete {
    fn default() -> Self {
        Self { column: "active".into(), value: "0".into() }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_ttl_minutes() -> i64 {
    10
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./querycache.sqlite")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            ttl_minutes: default_ttl_minutes(),
            strict_filters: false,
            db_path: default_db_path(),
            actor_columns: ActorColumns::default(),
            soft_delete: SoftDelete::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `QUERYCACHE_`
    /// 2. TOML file from `QUERYCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("QUERYCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("QUERYCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
