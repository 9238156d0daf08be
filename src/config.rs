//! Runtime configuration, read from the environment (and `.env` if present).

use std::env;
use std::path::PathBuf;

/// Directory holding the file-backed key-value store
pub const DATA_DIR_VAR: &str = "CATEGORY_GUARD_DATA_DIR";
/// User the demo binary acts as
pub const USER_VAR: &str = "CATEGORY_GUARD_USER";
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_USER: &str = "demo-user";
pub const DEFAULT_LOG_FILTER: &str = "category_guard=debug,info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub user_id: String,
    pub log_filter: String,
}

impl Config {
    /// Load `.env`, then read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup(DATA_DIR_VAR).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        if data_dir.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: DATA_DIR_VAR,
                reason: "must not be empty".to_string(),
            });
        }

        let user_id = lookup(USER_VAR).unwrap_or_else(|| DEFAULT_USER.to_string());
        if user_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: USER_VAR,
                reason: "must not be empty".to_string(),
            });
        }

        let log_filter = lookup(LOG_FILTER_VAR)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            user_id,
            log_filter,
        })
    }
}
