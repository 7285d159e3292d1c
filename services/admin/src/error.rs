//! services/admin/src/error.rs
//!
//! Defines the primary error type for the admin service.

use crate::config::ConfigError;

/// The primary error type for the `admin` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying HTTP client library.
    #[error("HTTP Client Error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(var: Option<&str>) -> Result<(), ApiError> {
        crate::config::Config::from_lookup(|_: &str| var.map(str::to_string))?;
        Ok(())
    }

    #[test]
    fn startup_errors_convert_with_question_mark() {
        let err = load(None).unwrap_err();
        assert!(matches!(err, ApiError::Config(ConfigError::MissingVar(_))));

        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken");
        assert!(ApiError::from(io).to_string().starts_with("IO error"));
    }
}
