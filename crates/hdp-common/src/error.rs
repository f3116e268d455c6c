//! Error types for HDP

use thiserror::Error;

/// Result type alias for HDP operations
pub type Result<T> = std::result::Result<T, HdpError>;

/// Main error type for HDP
#[derive(Error, Debug)]
pub enum HdpError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Missing required credentials: {0}")]
    MissingCredentials(String),

    #[error("Data validation failed: {0}")]
    DataValidation(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HdpError {
    /// Whether a retry with backoff can reasonably be expected to succeed.
    ///
    /// Transport failures and server-side/rate-limit status codes are
    /// transient; everything else (decode failures, bad credentials,
    /// validation, database errors) is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            HdpError::Http(e) => {
                if let Some(status) = e.status() {
                    status.is_server_error() || status.as_u16() == 429
                } else {
                    // Connect/timeout/body errors without a status
                    true
                }
            },
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_is_not_retryable() {
        let err = HdpError::Decode("unexpected token".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_credentials_is_not_retryable() {
        let err = HdpError::MissingCredentials("RAPID_API_KEY".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_is_not_retryable() {
        let err = HdpError::DataValidation("missing zpid column".to_string());
        assert!(!err.is_retryable());
    }
}
