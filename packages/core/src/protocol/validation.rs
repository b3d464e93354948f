// Валидация входящих конвертов
//
// Проверяется только форма: расшифровка при этом не выполняется.

use crate::crypto::aes_cbc::parse_iv_hex;
use crate::crypto::hybrid::IV_SEPARATOR;
use crate::protocol::envelope::MessageEnvelope;
use crate::utils::error::{Result, VeilError};
use base64::{engine::general_purpose, Engine as _};

/// Валидация Base64 строки
pub fn validate_base64(encoded: &str) -> Result<()> {
    if general_purpose::STANDARD.decode(encoded).is_err() {
        return Err(VeilError::ValidationError(
            "Invalid Base64 string".to_string(),
        ));
    }
    Ok(())
}

fn validate_non_empty_base64(encoded: &str, field: &str) -> Result<()> {
    if encoded.is_empty() {
        return Err(VeilError::ValidationError(format!("{} is empty", field)));
    }
    validate_base64(encoded)
        .map_err(|_| VeilError::ValidationError(format!("{} is not valid Base64", field)))
}

/// Валидация конверта перед отправкой или после приёма
pub fn validate_envelope(envelope: &MessageEnvelope) -> Result<()> {
    match envelope {
        MessageEnvelope::Hybrid {
            content,
            encrypted_key,
        } => {
            let (iv_hex, ciphertext) = content.split_once(IV_SEPARATOR).ok_or_else(|| {
                VeilError::ValidationError("hybrid content must be ivHex:base64".to_string())
            })?;
            if parse_iv_hex(iv_hex).is_none() {
                return Err(VeilError::ValidationError(
                    "hybrid content has a malformed IV".to_string(),
                ));
            }
            validate_non_empty_base64(ciphertext, "ciphertext")?;
            validate_non_empty_base64(encrypted_key, "encryptedKey")
        }
        MessageEnvelope::HybridGroup {
            content,
            encrypted_keys,
        } => {
            validate_non_empty_base64(content, "ciphertext")?;
            if encrypted_keys.is_empty() {
                return Err(VeilError::ValidationError(
                    "group envelope has no recipients".to_string(),
                ));
            }
            for (recipient_id, encrypted_key) in encrypted_keys {
                if recipient_id.is_empty() {
                    return Err(VeilError::ValidationError(
                        "group envelope has an empty recipient id".to_string(),
                    ));
                }
                validate_non_empty_base64(encrypted_key, "encryptedKeys entry")?;
            }
            Ok(())
        }
        // Пустой текст допустим
        MessageEnvelope::PlainEncoded { content } => validate_base64(content),
    }
}
