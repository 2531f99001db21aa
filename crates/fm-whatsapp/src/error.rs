//! Error types for fm-whatsapp

use thiserror::Error;

/// fm-whatsapp error type
#[derive(Error, Debug)]
pub enum WhatsAppError {
    #[error("WhatsApp access token or phone number id not set")]
    CredentialsNotSet,

    #[error("Webhook signature verification failed")]
    SignatureVerificationFailed,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("WhatsApp API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] fm_core::Error),
}

impl From<reqwest::Error> for WhatsAppError {
    fn from(err: reqwest::Error) -> Self {
        WhatsAppError::Http(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WhatsAppError>;
