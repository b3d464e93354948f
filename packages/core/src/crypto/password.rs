// Хэширование паролей для хранения и сравнения при логине
//
// Хэш детерминирован при фиксированной соли хоста (`Config::password_salt`).
// Ключ vault выводится отдельно, со своей случайной солью, см. `vault.rs`.

use crate::config::Config;
use crate::error::{CryptoError, CryptoResult};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Префикс PHC строк Argon2
const ARGON2_PHC_PREFIX: &str = "$argon2";
/// Длина hex SHA-256, которым хэшировались старые пароли
const LEGACY_SHA256_HEX_LEN: usize = 64;

/// Захэшировать пароль в PHC строку Argon2id
///
/// Одинаковый пароль при одной и той же соли хоста всегда даёт одинаковую
/// строку.
pub fn hash_password(password: &str, config: &Config) -> CryptoResult<String> {
    if password.is_empty() {
        return Err(CryptoError::InvalidInputError(
            "Password cannot be empty".to_string(),
        ));
    }

    let salt = SaltString::encode_b64(config.password_salt.as_bytes())
        .map_err(|e| CryptoError::KeyDerivationError(format!("Invalid host salt: {}", e)))?;
    let params = Params::new(
        config.argon2_m_cost,
        config.argon2_t_cost,
        config.argon2_p_cost,
        None,
    )?;

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CryptoError::KeyDerivationError(e.to_string()))
}

/// Проверить пароль против сохранённого хэша
///
/// Понимает PHC строки Argon2 с любыми параметрами и солью, а также старые
/// hex SHA-256 хэши. Сравнение всегда constant-time.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    if stored_hash.starts_with(ARGON2_PHC_PREFIX) {
        return match PasswordHash::new(stored_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        };
    }

    if is_legacy_hash(stored_hash) {
        let computed = hex::encode(Sha256::digest(password.as_bytes()));
        return computed
            .as_bytes()
            .ct_eq(stored_hash.to_ascii_lowercase().as_bytes())
            .into();
    }

    false
}

/// `true` для старых hex SHA-256 хэшей, которые стоит перехэшировать
pub fn is_legacy_hash(stored_hash: &str) -> bool {
    stored_hash.len() == LEGACY_SHA256_HEX_LEN && stored_hash.chars().all(|c| c.is_ascii_hexdigit())
}
