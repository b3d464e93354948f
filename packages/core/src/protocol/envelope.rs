// Конверты сообщений
// Форма тела сообщения при передаче и хранении

use crate::crypto::hybrid::HybridCipher;
use crate::error::CryptoResult;
use crate::utils::b64;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Маркер обратимо закодированного (незашифрованного) текста
pub const MARKER_BASE64_TEXT: &str = "base64-text";
/// Маркер прямого гибридного конверта
pub const MARKER_HYBRID: &str = "rsa-aes";
/// Маркер группового гибридного конверта
pub const MARKER_HYBRID_GROUP: &str = "rsa-aes-group";

/// Тело сообщения в одной из трёх форм
///
/// Форма однозначно задаёт путь декодирования; см. [`crate::protocol::codec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum MessageEnvelope {
    /// `content = ivHex:base64(ct)`, `encrypted_key = base64(RSA-OAEP(key ‖ iv))`
    #[serde(rename_all = "camelCase")]
    Hybrid {
        content: String,
        encrypted_key: String,
    },
    /// `content = base64(ct)`, ключ завёрнут отдельно для каждого участника
    #[serde(rename_all = "camelCase")]
    HybridGroup {
        content: String,
        encrypted_keys: BTreeMap<String, String>,
    },
    /// `content = base64(utf8)`; только для совместимости, не шифруется
    #[serde(rename_all = "camelCase")]
    PlainEncoded { content: String },
}

impl MessageEnvelope {
    /// Зашифровать сообщение для одного получателя
    pub fn seal_direct(plaintext: &str, recipient_public_key_pem: &str) -> CryptoResult<Self> {
        let envelope = HybridCipher::encrypt_for_one(plaintext, recipient_public_key_pem)?;
        Ok(MessageEnvelope::Hybrid {
            content: envelope.content,
            encrypted_key: envelope.encrypted_key,
        })
    }

    /// Зашифровать сообщение для группы: `recipient id -> public key PEM`
    pub fn seal_group(
        plaintext: &str,
        recipient_public_keys: &HashMap<String, String>,
    ) -> CryptoResult<Self> {
        let envelope = HybridCipher::encrypt_for_group(plaintext, recipient_public_keys)?;
        Ok(MessageEnvelope::HybridGroup {
            content: envelope.content,
            encrypted_keys: envelope.encrypted_keys,
        })
    }

    /// Старый путь записи без шифрования
    ///
    /// Новые сообщения должны идти через [`MessageEnvelope::seal_direct`] или
    /// [`MessageEnvelope::seal_group`].
    pub fn plain_encoded(plaintext: &str) -> Self {
        MessageEnvelope::PlainEncoded {
            content: b64::encode(plaintext.as_bytes()),
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            MessageEnvelope::Hybrid { .. } => MARKER_HYBRID,
            MessageEnvelope::HybridGroup { .. } => MARKER_HYBRID_GROUP,
            MessageEnvelope::PlainEncoded { .. } => MARKER_BASE64_TEXT,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            MessageEnvelope::Hybrid { content, .. }
            | MessageEnvelope::HybridGroup { content, .. }
            | MessageEnvelope::PlainEncoded { content } => content,
        }
    }

    /// Завёрнутый ключ, адресованный `recipient_id`
    ///
    /// Для прямого конверта ключ один и `recipient_id` не проверяется.
    pub fn encrypted_key_for(&self, recipient_id: &str) -> Option<&str> {
        match self {
            MessageEnvelope::Hybrid { encrypted_key, .. } => Some(encrypted_key),
            MessageEnvelope::HybridGroup { encrypted_keys, .. } => {
                encrypted_keys.get(recipient_id).map(String::as_str)
            }
            MessageEnvelope::PlainEncoded { .. } => None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        !matches!(self, MessageEnvelope::PlainEncoded { .. })
    }
}
