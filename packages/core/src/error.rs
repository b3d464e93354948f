use thiserror::Error;

/// Ошибки криптографического ядра
///
/// `UnwrapError` намеренно не несёт причину: неверный пароль и повреждённый
/// blob должны быть неотличимы для вызывающего.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Failed to generate key pair: {0}")]
    KeyGenerationError(String),
    #[error("Failed to wrap private key: {0}")]
    WrapError(String),
    #[error("Failed to unwrap private key")]
    UnwrapError,
    #[error("Encryption failed: {0}")]
    EncryptError(String),
    #[error("Decryption failed: {0}")]
    DecryptError(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),
    #[error("Invalid input: {0}")]
    InvalidInputError(String),
}

impl CryptoError {
    /// `true` для ошибок, от которых нет fallback-пути
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CryptoError::KeyGenerationError(_) | CryptoError::EncryptError(_)
        )
    }
}

impl From<rand::Error> for CryptoError {
    fn from(err: rand::Error) -> Self {
        CryptoError::KeyGenerationError(err.to_string()) // General RNG error
    }
}

impl From<argon2::Error> for CryptoError {
    fn from(err: argon2::Error) -> Self {
        CryptoError::KeyDerivationError(err.to_string())
    }
}

pub type CryptoResult<T> = std::result::Result<T, CryptoError>;
