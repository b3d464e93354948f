//! Разблокированная сессия пользователя
//!
//! Живёт ровно один запрос: приватный ключ расшифрован из vault при логине,
//! затирается при drop и никуда не сохраняется.

use crate::crypto::hybrid::HybridCipher;
use crate::crypto::keys::parse_private_key_pem;
use crate::error::CryptoResult;
use crate::protocol::codec::{DecodePath, MessageCodec, ViewerKey};
use crate::storage::models::StoredMessage;
use rsa::RsaPrivateKey;
use std::fmt;
use zeroize::Zeroizing;

/// Пользователь с расшифрованным приватным ключом
///
/// Намеренно не `Clone`.
pub struct UnlockedSession {
    user_id: String,
    private_key_pem: Zeroizing<String>,
    // RsaPrivateKey затирает себя при drop
    private_key: RsaPrivateKey,
}

impl UnlockedSession {
    /// Собрать сессию из уже расшифрованного PEM
    pub fn new(user_id: impl Into<String>, private_key_pem: Zeroizing<String>) -> CryptoResult<Self> {
        let private_key = parse_private_key_pem(&private_key_pem)?;
        Ok(Self {
            user_id: user_id.into(),
            private_key_pem,
            private_key,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    /// Расшифровать гибридный конверт своим ключом
    pub fn decrypt(&self, content: &str, encrypted_key: &str) -> CryptoResult<String> {
        HybridCipher::decrypt_with_key(content, encrypted_key, &self.private_key)
    }

    /// Текст сообщения для отображения этому пользователю
    pub fn decode(&self, codec: &MessageCodec, message: &StoredMessage) -> String {
        self.decode_with_path(codec, message).0
    }

    pub fn decode_with_path(
        &self,
        codec: &MessageCodec,
        message: &StoredMessage,
    ) -> (String, DecodePath) {
        codec.decode_stored(message, &self.user_id, Some(ViewerKey::Parsed(&self.private_key)))
    }
}

impl fmt::Debug for UnlockedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedSession")
            .field("user_id", &self.user_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crypto::keys::fixtures;
    use crate::protocol::envelope::MessageEnvelope;

    fn session(index: usize, user_id: &str) -> UnlockedSession {
        UnlockedSession::new(user_id, fixtures::pair(index).private_key_pem.clone()).unwrap()
    }

    #[test]
    fn test_decode_own_direct_message() {
        let bob = session(1, "bob");
        let envelope =
            MessageEnvelope::seal_direct("hi bob", &fixtures::pair(1).public_key_pem).unwrap();
        let message = StoredMessage::from_envelope("chat_1", "alice", &envelope);

        let codec = MessageCodec::new(&Config::default());
        assert_eq!(bob.decode(&codec, &message), "hi bob");
        assert_eq!(
            bob.decrypt(envelope.content(), envelope.encrypted_key_for("bob").unwrap())
                .unwrap(),
            "hi bob"
        );
    }

    #[test]
    fn test_other_users_message_stays_hidden() {
        let carol = session(2, "carol");
        let envelope =
            MessageEnvelope::seal_direct("not for carol", &fixtures::pair(1).public_key_pem)
                .unwrap();
        let message = StoredMessage::from_envelope("chat_1", "alice", &envelope);

        let codec = MessageCodec::new(&Config::default());
        let (text, path) = carol.decode_with_path(&codec, &message);
        assert_eq!(path, DecodePath::Raw);
        assert!(!text.contains("carol"));
    }

    #[test]
    fn test_rejects_non_key_pem() {
        assert!(UnlockedSession::new("x", Zeroizing::new("garbage".to_string())).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", session(0, "alice"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("PRIVATE KEY"));
    }
}
