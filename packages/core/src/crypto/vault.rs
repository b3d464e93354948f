// Шифрование приватных ключей паролем или escrow-секретом
// Argon2id для деривации ключа + AES-256-CBC для шифрования PEM
//
// Формат wrapped blob: `saltHex$ivHex:base64(ciphertext)`.
// Старый формат `ivHex:hex(ciphertext)` (scrypt по фиксированной соли)
// читается, но никогда не пишется.

use crate::config::Config;
use crate::crypto::aes_cbc::{self, IV_LENGTH, KEY_LENGTH};
use crate::crypto::keys::parse_private_key_pem;
use crate::error::{CryptoError, CryptoResult};
use crate::utils::b64;
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

/// Разделитель соли и тела blob
const SALT_SEPARATOR: char = '$';
/// Разделитель IV и шифртекста
const IV_SEPARATOR: char = ':';

/// Параметры scrypt, с которыми писались старые blob
const LEGACY_SCRYPT_LOG_N: u8 = 14;
const LEGACY_SCRYPT_R: u32 = 8;
const LEGACY_SCRYPT_P: u32 = 1;
const LEGACY_SALT: &[u8] = b"salt";

/// Параметры Argon2id для vault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
    pub salt_length: usize,
}

impl From<&Config> for VaultParams {
    fn from(config: &Config) -> Self {
        Self {
            m_cost: config.argon2_m_cost,
            t_cost: config.argon2_t_cost,
            p_cost: config.argon2_p_cost,
            salt_length: config.vault_salt_length,
        }
    }
}

/// Разобранный wrapped blob
enum WrappedBlob {
    Argon2 {
        salt: Vec<u8>,
        iv: [u8; IV_LENGTH],
        ciphertext: Vec<u8>,
    },
    LegacyScrypt {
        iv: [u8; IV_LENGTH],
        ciphertext: Vec<u8>,
    },
}

impl WrappedBlob {
    fn parse(wrapped: &str) -> Result<Self, &'static str> {
        let wrapped = wrapped.trim();

        if let Some((salt_hex, body)) = wrapped.split_once(SALT_SEPARATOR) {
            let salt = hex::decode(salt_hex).map_err(|_| "salt is not hex")?;
            let (iv_hex, ciphertext_b64) =
                body.split_once(IV_SEPARATOR).ok_or("missing IV separator")?;
            let iv = aes_cbc::parse_iv_hex(iv_hex).ok_or("invalid IV")?;
            let ciphertext = b64::decode(ciphertext_b64).map_err(|_| "ciphertext is not base64")?;
            return Ok(WrappedBlob::Argon2 {
                salt,
                iv,
                ciphertext,
            });
        }

        let (iv_hex, ciphertext_hex) = wrapped
            .split_once(IV_SEPARATOR)
            .ok_or("missing IV separator")?;
        let iv = aes_cbc::parse_iv_hex(iv_hex).ok_or("invalid IV")?;
        let ciphertext = hex::decode(ciphertext_hex).map_err(|_| "ciphertext is not hex")?;
        Ok(WrappedBlob::LegacyScrypt { iv, ciphertext })
    }
}

/// Хранилище приватного ключа «в покое»
///
/// Не делает I/O: wrapped blob хранит и отдаёт внешнее хранилище
/// пользователей.
#[derive(Debug, Clone)]
pub struct PrivateKeyVault {
    params: VaultParams,
}

impl PrivateKeyVault {
    pub fn new(params: VaultParams) -> Self {
        Self { params }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(VaultParams::from(config))
    }

    /// Зашифровать приватный PEM под ключом, выведенным из `secret`
    ///
    /// Каждый вызов берёт новую соль и новый IV, так что два вызова с
    /// одинаковыми входами дают разные blob.
    pub fn wrap(&self, private_key_pem: &str, secret: &str) -> CryptoResult<String> {
        use tracing::debug;

        if secret.is_empty() {
            return Err(CryptoError::WrapError("secret cannot be empty".to_string()));
        }
        parse_private_key_pem(private_key_pem)
            .map_err(|_| CryptoError::WrapError("input is not an RSA private key".to_string()))?;

        let mut salt = vec![0u8; self.params.salt_length];
        let mut iv = [0u8; IV_LENGTH];
        rand::rngs::OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| CryptoError::WrapError(e.to_string()))?;
        rand::rngs::OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| CryptoError::WrapError(e.to_string()))?;

        let key = derive_vault_key(secret, &salt, &self.params)?;
        let ciphertext = aes_cbc::encrypt(&key, &iv, private_key_pem.as_bytes());

        debug!(target: "veilchat::vault", salt_len = salt.len(), "Wrapped private key");

        Ok(format!(
            "{}{}{}{}{}",
            hex::encode(&salt),
            SALT_SEPARATOR,
            hex::encode(iv),
            IV_SEPARATOR,
            b64::encode(&ciphertext)
        ))
    }

    /// Расшифровать wrapped blob
    ///
    /// Любой сбой (битый blob, неверный секрет, padding, не-PEM результат)
    /// превращается в один и тот же [`CryptoError::UnwrapError`].
    pub fn unwrap(&self, wrapped: &str, secret: &str) -> CryptoResult<Zeroizing<String>> {
        use tracing::debug;

        match self.try_unwrap(wrapped, secret) {
            Ok(pem) => Ok(pem),
            Err(reason) => {
                debug!(target: "veilchat::vault", reason, "Private key unwrap failed");
                Err(CryptoError::UnwrapError)
            }
        }
    }

    fn try_unwrap(&self, wrapped: &str, secret: &str) -> Result<Zeroizing<String>, &'static str> {
        if secret.is_empty() {
            return Err("empty secret");
        }

        let plaintext = match WrappedBlob::parse(wrapped)? {
            WrappedBlob::Argon2 {
                salt,
                iv,
                ciphertext,
            } => {
                let key = derive_vault_key(secret, &salt, &self.params)
                    .map_err(|_| "key derivation failed")?;
                aes_cbc::decrypt(&key, &iv, &ciphertext).map_err(|_| "decryption failed")?
            }
            WrappedBlob::LegacyScrypt { iv, ciphertext } => {
                let key = derive_legacy_key(secret).map_err(|_| "key derivation failed")?;
                aes_cbc::decrypt(&key, &iv, &ciphertext).map_err(|_| "decryption failed")?
            }
        };

        let pem = Zeroizing::new(String::from_utf8(plaintext).map_err(|_| "not UTF-8")?);

        // Padding совпадает случайно примерно в 1 случае из 256,
        // поэтому результат обязан разбираться как ключ.
        parse_private_key_pem(&pem).map_err(|_| "not a private key")?;

        Ok(pem)
    }

    /// `true`, если blob записан в старом формате и его стоит перешифровать
    pub fn needs_rewrap(wrapped: &str) -> bool {
        matches!(WrappedBlob::parse(wrapped), Ok(WrappedBlob::LegacyScrypt { .. }))
    }
}

impl Default for PrivateKeyVault {
    fn default() -> Self {
        Self::from_config(Config::global())
    }
}

/// Деривировать ключ vault из секрета с использованием Argon2id
fn derive_vault_key(
    secret: &str,
    salt: &[u8],
    params: &VaultParams,
) -> CryptoResult<Zeroizing<[u8; KEY_LENGTH]>> {
    let argon2_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(KEY_LENGTH))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
    argon2.hash_password_into(secret.as_bytes(), salt, &mut *key)?;

    Ok(key)
}

/// Ключ старого формата: scrypt(secret, "salt", N=2^14, r=8, p=1)
fn derive_legacy_key(secret: &str) -> CryptoResult<Zeroizing<[u8; KEY_LENGTH]>> {
    let params = scrypt::Params::new(LEGACY_SCRYPT_LOG_N, LEGACY_SCRYPT_R, LEGACY_SCRYPT_P, KEY_LENGTH)
        .map_err(|e| CryptoError::KeyDerivationError(e.to_string()))?;

    let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
    scrypt::scrypt(secret.as_bytes(), LEGACY_SALT, &params, &mut *key)
        .map_err(|e| CryptoError::KeyDerivationError(e.to_string()))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::fixtures;

    fn vault() -> PrivateKeyVault {
        PrivateKeyVault::from_config(&Config::for_tests())
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let pem = &fixtures::pair(0).private_key_pem;
        let wrapped = vault().wrap(pem, "my_secure_password_123").unwrap();

        let unwrapped = vault().unwrap(&wrapped, "my_secure_password_123").unwrap();
        assert_eq!(*unwrapped, **pem);
    }

    #[test]
    fn test_wrapped_blob_format() {
        let wrapped = vault()
            .wrap(&fixtures::pair(0).private_key_pem, "password123")
            .unwrap();

        let (salt_hex, body) = wrapped.split_once('$').unwrap();
        let (iv_hex, ciphertext_b64) = body.split_once(':').unwrap();
        assert_eq!(salt_hex.len(), 32);
        assert_eq!(iv_hex.len(), 32);
        assert!(b64::decode(ciphertext_b64).is_ok());
        assert!(!wrapped.contains("PRIVATE KEY"));
        assert!(!PrivateKeyVault::needs_rewrap(&wrapped));
    }

    #[test]
    fn test_wrap_is_not_deterministic() {
        let pem = &fixtures::pair(0).private_key_pem;
        let first = vault().wrap(pem, "password123").unwrap();
        let second = vault().wrap(pem, "password123").unwrap();

        assert_ne!(first, second);
        assert_eq!(*vault().unwrap(&first, "password123").unwrap(), **pem);
        assert_eq!(*vault().unwrap(&second, "password123").unwrap(), **pem);
    }

    #[test]
    fn test_unwrap_with_wrong_secret() {
        let wrapped = vault()
            .wrap(&fixtures::pair(0).private_key_pem, "correct_password_123")
            .unwrap();

        let result = vault().unwrap(&wrapped, "wrong_password_456");
        assert_eq!(result.unwrap_err(), CryptoError::UnwrapError);
    }

    #[test]
    fn test_unwrap_malformed_blobs() {
        for blob in ["", "no separators", "zz$00:AAAA", "00$nothex:AAAA", "abcd:1234"] {
            assert_eq!(
                vault().unwrap(blob, "password123").unwrap_err(),
                CryptoError::UnwrapError,
                "blob {:?} should not unwrap",
                blob
            );
        }
    }

    #[test]
    fn test_unwrap_tampered_ciphertext() {
        let wrapped = vault()
            .wrap(&fixtures::pair(0).private_key_pem, "password123")
            .unwrap();
        let (prefix, ciphertext_b64) = wrapped.rsplit_once(':').unwrap();
        let mut ciphertext = b64::decode(ciphertext_b64).unwrap();
        ciphertext.truncate(ciphertext.len() - 16);
        let tampered = format!("{}:{}", prefix, b64::encode(&ciphertext));

        assert!(vault().unwrap(&tampered, "password123").is_err());
    }

    #[test]
    fn test_wrap_rejects_bad_input() {
        assert!(matches!(
            vault().wrap(&fixtures::pair(0).private_key_pem, ""),
            Err(CryptoError::WrapError(_))
        ));
        assert!(matches!(
            vault().wrap("not a key", "password123"),
            Err(CryptoError::WrapError(_))
        ));
    }

    #[test]
    fn test_legacy_blob_unwraps() {
        let pem = &fixtures::pair(1).private_key_pem;
        let iv = [0x42u8; IV_LENGTH];
        let key = derive_legacy_key("legacy_password_1").unwrap();
        let ciphertext = aes_cbc::encrypt(&key, &iv, pem.as_bytes());
        let legacy = format!("{}:{}", hex::encode(iv), hex::encode(ciphertext));

        assert!(PrivateKeyVault::needs_rewrap(&legacy));
        assert_eq!(*vault().unwrap(&legacy, "legacy_password_1").unwrap(), **pem);
        assert!(vault().unwrap(&legacy, "other_password_1").is_err());
    }

    #[test]
    fn test_derive_vault_key_depends_on_salt() {
        let params = VaultParams::from(&Config::for_tests());
        let key1 = derive_vault_key("password123", &[1u8; 16], &params).unwrap();
        let key2 = derive_vault_key("password123", &[1u8; 16], &params).unwrap();
        let key3 = derive_vault_key("password123", &[2u8; 16], &params).unwrap();

        // Одинаковый секрет и соль должны давать одинаковый ключ
        assert_eq!(*key1, *key2);
        assert_ne!(*key1, *key3);
    }
}
