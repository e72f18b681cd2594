//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// One year, in minutes.
const MAX_TTL_MINUTES: i64 = 525_600;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `ttl_minutes` is negative or exceeds one year
    /// - any actor or soft-delete column name is empty
    ///
    /// Returns `ConfigError::Missing` if `cache_dir` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_minutes < 0 {
            return Err(ConfigError::Invalid { field: "ttl_minutes".into(), reason: "must not be negative".into() });
        }
        if self.ttl_minutes > MAX_TTL_MINUTES {
            return Err(ConfigError::Invalid {
                field: "ttl_minutes".into(),
                reason: format!("must not exceed one year ({MAX_TTL_MINUTES} minutes)"),
            });
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_dir".into(),
                hint: "Set QUERYCACHE_CACHE_DIR environment variable".into(),
            });
        }

        let columns = [
            ("actor_columns.ip", &self.actor_columns.ip),
            ("actor_columns.account_id", &self.actor_columns.account_id),
            ("actor_columns.user_id", &self.actor_columns.user_id),
            ("soft_delete.column", &self.soft_delete.column),
        ];
        for (field, name) in columns {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
        }

        if !self.strict_filters {
            tracing::warn!("strict_filters is off; unknown filter operators degrade to equality clauses");
        }

        Ok(())
    }
}
