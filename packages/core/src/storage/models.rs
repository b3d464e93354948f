// Модели данных для хранилища

use crate::protocol::envelope::{
    MessageEnvelope, MARKER_BASE64_TEXT, MARKER_HYBRID, MARKER_HYBRID_GROUP,
};
use crate::utils::time::current_timestamp;
use crate::utils::uuid::{generate_chat_link, generate_v4};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity пользователя
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub display_name: String,
    /// SPKI PEM, доступен всем
    pub public_key_pem: String,
    /// `saltHex$ivHex:base64(ct)`; открывается только паролем или escrow-секретом
    pub private_key_wrapped: String,
    pub is_anonymous: bool,
    /// `chat_<uuid>`
    pub chat_link: String,
    pub created_at: i64,
}

impl Identity {
    pub fn new(
        username: String,
        display_name: String,
        public_key_pem: String,
        private_key_wrapped: String,
        is_anonymous: bool,
    ) -> Self {
        Self {
            id: generate_v4(),
            username,
            display_name,
            public_key_pem,
            private_key_wrapped,
            is_anonymous,
            chat_link: generate_chat_link(),
            created_at: current_timestamp(),
        }
    }
}

/// Учётные данные, 1:1 с Identity
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub user_id: String,
    /// PHC строка Argon2id; `None` у анонимных identity
    pub password_hash: Option<String>,
    /// hex TOTP секрет; при наличии логин требует код
    pub two_factor_secret: Option<String>,
}

impl Credential {
    pub fn two_factor_enabled(&self) -> bool {
        self.two_factor_secret.is_some()
    }
}

// Хэш и секрет в логи не попадают
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("has_password", &self.password_hash.is_some())
            .field("two_factor_enabled", &self.two_factor_enabled())
            .finish()
    }
}

/// Сообщение в хранилище
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    /// Форма конверта; пустой маркер бывает только у старых записей
    pub marker: Option<String>,
    pub encrypted_key: Option<String>,
    pub encrypted_keys: Option<BTreeMap<String, String>>,
    pub is_deleted: bool,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl StoredMessage {
    /// Новое сообщение из конверта в момент отправки
    pub fn from_envelope(chat_id: &str, sender_id: &str, envelope: &MessageEnvelope) -> Self {
        let (encrypted_key, encrypted_keys) = match envelope {
            MessageEnvelope::Hybrid { encrypted_key, .. } => (Some(encrypted_key.clone()), None),
            MessageEnvelope::HybridGroup { encrypted_keys, .. } => {
                (None, Some(encrypted_keys.clone()))
            }
            MessageEnvelope::PlainEncoded { .. } => (None, None),
        };

        Self {
            id: generate_v4(),
            chat_id: chat_id.to_string(),
            sender_id: sender_id.to_string(),
            content: envelope.content().to_string(),
            marker: Some(envelope.marker().to_string()),
            encrypted_key,
            encrypted_keys,
            is_deleted: false,
            created_at: current_timestamp(),
            deleted_at: None,
        }
    }

    /// Восстановить конверт по маркеру
    ///
    /// `None` для удалённых сообщений, неизвестных маркеров и записей, у
    /// которых нет полей, требуемых маркером.
    pub fn envelope(&self) -> Option<MessageEnvelope> {
        if self.is_deleted {
            return None;
        }
        let content = self.content.clone();
        match self.marker.as_deref()? {
            MARKER_HYBRID => Some(MessageEnvelope::Hybrid {
                content,
                encrypted_key: self.encrypted_key.clone()?,
            }),
            MARKER_HYBRID_GROUP => Some(MessageEnvelope::HybridGroup {
                content,
                encrypted_keys: self.encrypted_keys.clone()?,
            }),
            MARKER_BASE64_TEXT => Some(MessageEnvelope::PlainEncoded { content }),
            _ => None,
        }
    }

    /// Ключ для `viewer_id`: из карты группы, иначе одиночный
    pub fn encrypted_key_for(&self, viewer_id: &str) -> Option<&str> {
        match &self.encrypted_keys {
            Some(keys) => keys.get(viewer_id).map(String::as_str),
            None => self.encrypted_key.as_deref(),
        }
    }

    /// Пометить удалённым
    ///
    /// Переход необратим: содержимое и ключи стираются, повторный вызов
    /// ничего не меняет (в том числе `deleted_at`).
    pub fn tombstone(&mut self) {
        if self.is_deleted {
            return;
        }
        self.content.clear();
        self.marker = None;
        self.encrypted_key = None;
        self.encrypted_keys = None;
        self.is_deleted = true;
        self.deleted_at = Some(current_timestamp());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hybrid() -> MessageEnvelope {
        MessageEnvelope::Hybrid {
            content: "00112233445566778899aabbccddeeff:AAAA".to_string(),
            encrypted_key: "a2V5".to_string(),
        }
    }

    #[test]
    fn test_from_envelope_direct() {
        let msg = StoredMessage::from_envelope("chat_1", "alice", &hybrid());
        assert_eq!(msg.marker.as_deref(), Some(MARKER_HYBRID));
        assert_eq!(msg.encrypted_key.as_deref(), Some("a2V5"));
        assert!(msg.encrypted_keys.is_none());
        assert!(!msg.is_deleted);
        assert_eq!(msg.envelope(), Some(hybrid()));
    }

    #[test]
    fn test_from_envelope_group() {
        let mut keys = BTreeMap::new();
        keys.insert("bob".to_string(), "Ym9i".to_string());
        let envelope = MessageEnvelope::HybridGroup {
            content: "AAAA".to_string(),
            encrypted_keys: keys,
        };
        let msg = StoredMessage::from_envelope("chat_1", "alice", &envelope);

        assert_eq!(msg.encrypted_key_for("bob"), Some("Ym9i"));
        assert_eq!(msg.encrypted_key_for("carol"), None);
        assert_eq!(msg.envelope(), Some(envelope));
    }

    #[test]
    fn test_tombstone_is_one_way() {
        let mut msg = StoredMessage::from_envelope("chat_1", "alice", &hybrid());
        msg.tombstone();

        assert!(msg.is_deleted);
        assert!(msg.content.is_empty());
        assert!(msg.marker.is_none());
        assert!(msg.encrypted_key.is_none());
        assert!(msg.envelope().is_none());
        let deleted_at = msg.deleted_at;
        assert!(deleted_at.is_some());

        msg.tombstone();
        assert_eq!(msg.deleted_at, deleted_at);
        assert!(msg.is_deleted);
    }

    #[test]
    fn test_unknown_marker_has_no_envelope() {
        let mut msg = StoredMessage::from_envelope("chat_1", "alice", &hybrid());
        msg.marker = Some("something-else".to_string());
        assert!(msg.envelope().is_none());

        msg.marker = Some(MARKER_HYBRID.to_string());
        msg.encrypted_key = None;
        assert!(msg.envelope().is_none());
    }

    #[test]
    fn test_credential_debug_redacts_secrets() {
        let credential = Credential {
            user_id: "u1".to_string(),
            password_hash: Some("$argon2id$secret-hash".to_string()),
            two_factor_secret: Some("deadbeef".to_string()),
        };
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("secret-hash"));
        assert!(!debug.contains("deadbeef"));
        assert!(debug.contains("two_factor_enabled: true"));
    }

    #[test]
    fn test_stored_message_json_is_camel_case() {
        let msg = StoredMessage::from_envelope("chat_1", "alice", &hybrid());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["chatId"], "chat_1");
        assert_eq!(json["isDeleted"], false);
        assert_eq!(json["encryptedKey"], "a2V5");
    }
}
