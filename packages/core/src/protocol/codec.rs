//! Декодирование сообщений для отображения
//!
//! Каскад применяется по порядку, первый успешный шаг выигрывает:
//!
//! 1. удалённое сообщение → заглушка из конфигурации
//! 2. маркер `base64-text` → base64 → UTF-8
//! 3. непустой `encrypted_key` и доступный приватный ключ → [`HybridCipher`]
//! 4. base64 → UTF-8 без маркера (старые записи)
//! 5. `content` как есть
//!
//! Функция тотальна: ошибки декодирования не поднимаются наверх, а
//! переводят на следующий шаг с записью в лог.

use crate::config::Config;
use crate::crypto::hybrid::HybridCipher;
use crate::error::CryptoResult;
use crate::protocol::envelope::MARKER_BASE64_TEXT;
use crate::storage::models::StoredMessage;
use crate::utils::b64;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};

/// Шаг каскада, давший итоговый текст
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecodePath {
    Deleted,
    Base64Text,
    Hybrid,
    BareBase64,
    Raw,
}

/// Приватный ключ зрителя в одной из двух форм
#[derive(Clone, Copy)]
pub enum ViewerKey<'a> {
    Pem(&'a str),
    Parsed(&'a RsaPrivateKey),
}

impl ViewerKey<'_> {
    fn decrypt(&self, content: &str, encrypted_key: &str) -> CryptoResult<String> {
        match self {
            ViewerKey::Pem(pem) => HybridCipher::decrypt(content, encrypted_key, pem),
            ViewerKey::Parsed(key) => HybridCipher::decrypt_with_key(content, encrypted_key, key),
        }
    }
}

/// Поля сохранённого сообщения, от которых зависит отображение
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayFields<'a> {
    pub content: &'a str,
    pub marker: &'a str,
    pub encrypted_key: &'a str,
    pub is_deleted: bool,
}

#[derive(Debug, Clone)]
pub struct MessageCodec {
    deleted_placeholder: String,
}

impl MessageCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            deleted_placeholder: config.deleted_placeholder.clone(),
        }
    }

    /// Текст для отображения; см. порядок каскада в документации модуля
    pub fn decode_for_display(
        &self,
        content: &str,
        marker: &str,
        encrypted_key: &str,
        is_deleted: bool,
        private_key_pem: Option<&str>,
    ) -> String {
        let fields = DisplayFields {
            content,
            marker,
            encrypted_key,
            is_deleted,
        };
        self.decode_with_path(fields, private_key_pem.map(ViewerKey::Pem))
            .0
    }

    /// То же, что [`MessageCodec::decode_for_display`], плюс сработавший шаг
    pub fn decode_with_path(
        &self,
        fields: DisplayFields<'_>,
        viewer_key: Option<ViewerKey<'_>>,
    ) -> (String, DecodePath) {
        use tracing::{debug, warn};

        if fields.is_deleted {
            return (self.deleted_placeholder.clone(), DecodePath::Deleted);
        }

        if fields.marker == MARKER_BASE64_TEXT {
            match b64::decode_utf8(fields.content) {
                Ok(text) => return (text, DecodePath::Base64Text),
                Err(reason) => warn!(
                    target: "veilchat::codec",
                    %reason,
                    "base64-text content did not decode, falling back"
                ),
            }
        } else if !fields.encrypted_key.trim().is_empty() {
            match viewer_key {
                Some(key) => match key.decrypt(fields.content, fields.encrypted_key) {
                    Ok(text) => return (text, DecodePath::Hybrid),
                    Err(error) => warn!(
                        target: "veilchat::codec",
                        %error,
                        marker = fields.marker,
                        "hybrid decrypt failed, falling back"
                    ),
                },
                None => debug!(
                    target: "veilchat::codec",
                    marker = fields.marker,
                    "encrypted message without viewer key, falling back"
                ),
            }
        }

        match b64::decode_utf8(fields.content) {
            Ok(text) => (text, DecodePath::BareBase64),
            Err(_) => {
                debug!(
                    target: "veilchat::codec",
                    content_len = fields.content.len(),
                    "content shown as stored"
                );
                (fields.content.to_string(), DecodePath::Raw)
            }
        }
    }

    /// Декодировать сохранённое сообщение глазами `viewer_id`
    ///
    /// Для группового сообщения берётся ключ из `encrypted_keys[viewer_id]`;
    /// если его нет, каскад идёт без гибридного шага.
    pub fn decode_stored(
        &self,
        message: &StoredMessage,
        viewer_id: &str,
        viewer_key: Option<ViewerKey<'_>>,
    ) -> (String, DecodePath) {
        let fields = DisplayFields {
            content: &message.content,
            marker: message.marker.as_deref().unwrap_or_default(),
            encrypted_key: message.encrypted_key_for(viewer_id).unwrap_or_default(),
            is_deleted: message.is_deleted,
        };
        self.decode_with_path(fields, viewer_key)
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(Config::global())
    }
}
