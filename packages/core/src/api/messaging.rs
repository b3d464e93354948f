// API для отправки и получения сообщений

use crate::config::Config;
use crate::protocol::codec::{DecodePath, MessageCodec};
use crate::protocol::envelope::MessageEnvelope;
use crate::state::UnlockedSession;
use crate::storage::models::StoredMessage;
use crate::storage::PublicKeyDirectory;
use crate::utils::error::{Result, VeilError};
use std::collections::HashMap;

/// Сборка и чтение сообщений чата
#[derive(Debug, Clone)]
pub struct ChatMessaging {
    codec: MessageCodec,
}

impl ChatMessaging {
    pub fn new(config: &Config) -> Self {
        Self {
            codec: MessageCodec::new(config),
        }
    }

    pub fn codec(&self) -> &MessageCodec {
        &self.codec
    }

    /// Сообщение в личный чат, зашифрованное для `recipient_id`
    pub fn compose_direct<D: PublicKeyDirectory>(
        &self,
        directory: &D,
        chat_id: &str,
        sender_id: &str,
        recipient_id: &str,
        plaintext: &str,
    ) -> Result<StoredMessage> {
        let public_key = lookup_public_key(directory, recipient_id)?;
        let envelope = MessageEnvelope::seal_direct(plaintext, &public_key)?;
        Ok(StoredMessage::from_envelope(chat_id, sender_id, &envelope))
    }

    /// Сообщение в групповой чат
    ///
    /// Ключ заворачивается для каждого из `member_ids`; отправитель, который
    /// хочет читать свои сообщения, должен быть в списке.
    pub fn compose_group<D: PublicKeyDirectory>(
        &self,
        directory: &D,
        chat_id: &str,
        sender_id: &str,
        member_ids: &[String],
        plaintext: &str,
    ) -> Result<StoredMessage> {
        use tracing::debug;

        let mut recipients = HashMap::with_capacity(member_ids.len());
        for member_id in member_ids {
            recipients.insert(member_id.clone(), lookup_public_key(directory, member_id)?);
        }

        let envelope = MessageEnvelope::seal_group(plaintext, &recipients)?;
        debug!(target: "veilchat::codec", chat_id, members = recipients.len(), "Composed group message");
        Ok(StoredMessage::from_envelope(chat_id, sender_id, &envelope))
    }

    /// Старый формат без шифрования; только для совместимости
    pub fn compose_plain(&self, chat_id: &str, sender_id: &str, plaintext: &str) -> StoredMessage {
        StoredMessage::from_envelope(chat_id, sender_id, &MessageEnvelope::plain_encoded(plaintext))
    }

    /// Текст для владельца сессии
    pub fn open(&self, session: &UnlockedSession, message: &StoredMessage) -> (String, DecodePath) {
        session.decode_with_path(&self.codec, message)
    }

    /// Текст для зрителя без приватного ключа
    pub fn open_without_key(&self, message: &StoredMessage, viewer_id: &str) -> (String, DecodePath) {
        self.codec.decode_stored(message, viewer_id, None)
    }
}

fn lookup_public_key<D: PublicKeyDirectory>(directory: &D, user_id: &str) -> Result<String> {
    directory
        .public_key(user_id)?
        .ok_or_else(|| VeilError::NotFound(format!("public key for {}", user_id)))
}
