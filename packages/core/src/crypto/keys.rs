// Управление ключами
// Генерация и разбор RSA пар ключей для identity

use crate::config::Config;
use crate::error::{CryptoError, CryptoResult};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use zeroize::Zeroizing;

/// Минимальный модуль, который мы согласны генерировать
const MIN_RSA_BITS: usize = 2048;

/// Пара ключей identity в PEM
///
/// Публичный ключ в SPKI (`BEGIN PUBLIC KEY`), приватный в PKCS#8
/// (`BEGIN PRIVATE KEY`). Приватный PEM затирается при drop.
pub struct IdentityKeyPair {
    pub public_key_pem: String,
    pub private_key_pem: Zeroizing<String>,
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public_key_pem", &self.public_key_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Генератор RSA пар ключей
///
/// Каждый вызов [`KeyPairService::generate`] создаёт свежую пару; ничего не
/// кэшируется. При сбое или таймауте возвращается
/// [`CryptoError::KeyGenerationError`], подменных ключей нет.
#[derive(Debug, Clone)]
pub struct KeyPairService {
    key_bits: usize,
    timeout: Duration,
}

impl KeyPairService {
    pub fn new(config: &Config) -> Self {
        Self {
            key_bits: config.rsa_key_bits,
            timeout: Duration::from_millis(config.keygen_timeout_ms),
        }
    }

    /// Сгенерировать новую пару ключей
    ///
    /// Генерация идёт в отдельном потоке; если она не уложилась в
    /// `keygen_timeout_ms`, результат отбрасывается.
    pub fn generate(&self) -> CryptoResult<IdentityKeyPair> {
        use tracing::{debug, error};

        if self.key_bits < MIN_RSA_BITS {
            return Err(CryptoError::KeyGenerationError(format!(
                "RSA modulus of {} bits is below the {} bit minimum",
                self.key_bits, MIN_RSA_BITS
            )));
        }

        debug!(target: "veilchat::keys", bits = self.key_bits, "Generating RSA key pair");

        let (tx, rx) = mpsc::channel();
        let bits = self.key_bits;
        std::thread::Builder::new()
            .name("rsa-keygen".to_string())
            .spawn(move || {
                // Получатель мог уже уйти по таймауту
                let _ = tx.send(generate_blocking(bits));
            })
            .map_err(|e| CryptoError::KeyGenerationError(e.to_string()))?;

        let result = match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CryptoError::KeyGenerationError(format!(
                "key generation timed out after {} ms",
                self.timeout.as_millis()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(CryptoError::KeyGenerationError(
                "key generation worker terminated".to_string(),
            )),
        };

        if let Err(e) = &result {
            error!(target: "veilchat::keys", error = %e, "RSA key generation failed");
        }

        result
    }
}

impl Default for KeyPairService {
    fn default() -> Self {
        Self::new(Config::global())
    }
}

fn generate_blocking(bits: usize) -> CryptoResult<IdentityKeyPair> {
    let private_key = RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)
        .map_err(|e| CryptoError::KeyGenerationError(e.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGenerationError(format!("PKCS#8 encoding failed: {}", e)))?;
    let public_key_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGenerationError(format!("SPKI encoding failed: {}", e)))?;

    Ok(IdentityKeyPair {
        public_key_pem,
        private_key_pem,
    })
}

/// Разобрать публичный ключ (SPKI или PKCS#1 PEM)
pub fn parse_public_key_pem(pem: &str) -> CryptoResult<RsaPublicKey> {
    let pem = pem.trim();
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| CryptoError::InvalidInputError(format!("Invalid RSA public key: {}", e)))
}

/// Разобрать приватный ключ (PKCS#8 или PKCS#1 PEM)
pub fn parse_private_key_pem(pem: &str) -> CryptoResult<RsaPrivateKey> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| CryptoError::InvalidInputError(format!("Invalid RSA private key: {}", e)))
}

/// Получить SPKI PEM публичного ключа из приватного PEM
pub fn public_key_from_private(private_key_pem: &str) -> CryptoResult<String> {
    let private_key = parse_private_key_pem(private_key_pem)?;
    RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::InvalidInputError(format!("SPKI encoding failed: {}", e)))
}
