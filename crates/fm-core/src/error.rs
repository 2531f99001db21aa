//! Error types for fm-core

use thiserror::Error;

/// Main error type for fm-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Claude API error: {0}")]
    ClaudeApi(String),

    #[error("Completion returned no text")]
    EmptyResponse,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for fm-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::EmptyResponse.to_string(), "Completion returned no text");
        assert_eq!(
            Error::Config("missing api key".to_string()).to_string(),
            "Configuration error: missing api key"
        );
    }
}
