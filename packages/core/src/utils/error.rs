// Типы ошибок уровня приложения

use crate::error::CryptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VeilError {
    #[error("Cryptography error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Two-factor code required")]
    TwoFactorRequired,

    #[error("Invalid two-factor code")]
    InvalidTwoFactorCode,
}

impl From<serde_json::Error> for VeilError {
    fn from(error: serde_json::Error) -> Self {
        VeilError::SerializationError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VeilError>;
