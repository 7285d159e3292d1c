//! services/admin/src/config.rs
//!
//! Defines the service configuration and its loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub api_base_url: String,
    pub notify_url: String,
    pub survey_base_link: String,
    pub store_path: PathBuf,
    pub log_level: Level,
    pub request_timeout: Duration,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Backend and Email Endpoints ---
        let api_base_url = var("API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("API_BASE_URL".to_string()))?;

        let notify_url = var("NOTIFY_URL")
            .unwrap_or_else(|| format!("{}/email/send-group", api_base_url));

        let survey_base_link = var("SURVEY_BASE_LINK")
            .ok_or_else(|| ConfigError::MissingVar("SURVEY_BASE_LINK".to_string()))?;

        let timeout_str = var("REQUEST_TIMEOUT_SECS").unwrap_or_else(|| "20".to_string());
        let timeout_secs = timeout_str
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "REQUEST_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", timeout_str),
                )
            })?;

        // --- Local Storage ---
        let store_path = var("STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/store.json"));

        Ok(Self {
            bind_address,
            api_base_url,
            notify_url,
            survey_base_link,
            store_path,
            log_level,
            request_timeout: Duration::from_secs(timeout_secs),
            cors_origin,
        })
    }
}
