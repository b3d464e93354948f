// In-memory storage для тестов и встраивания

use crate::storage::models::*;
use crate::storage::{CredentialStore, PublicKeyDirectory, UserDirectory};
use crate::utils::error::{Result, VeilError};
use std::collections::HashMap;

/// In-memory хранилище
#[derive(Debug, Default)]
pub struct MemoryStorage {
    identities: HashMap<String, Identity>,
    credentials: HashMap<String, Credential>,
    messages: Vec<StoredMessage>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // === Сообщения ===

    pub fn save_message(&mut self, msg: StoredMessage) -> Result<()> {
        self.messages.push(msg);
        Ok(())
    }

    pub fn load_message(&self, message_id: &str) -> Result<Option<StoredMessage>> {
        Ok(self.messages.iter().find(|m| m.id == message_id).cloned())
    }

    pub fn load_messages_for_chat(
        &self,
        chat_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>> {
        let mut messages: Vec<StoredMessage> = self
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();

        // Сортировка по времени создания
        messages.sort_by_key(|m| m.created_at);

        Ok(messages.into_iter().skip(offset).take(limit).collect())
    }

    /// Удалить сообщение для всех (tombstone, запись остаётся)
    pub fn tombstone_message(&mut self, message_id: &str) -> Result<()> {
        let msg = self
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| VeilError::NotFound(format!("message {}", message_id)))?;
        msg.tombstone();
        Ok(())
    }

    // === Утилиты ===

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    pub fn clear_all(&mut self) -> Result<()> {
        self.identities.clear();
        self.credentials.clear();
        self.messages.clear();
        Ok(())
    }
}

// === Identity ===

impl UserDirectory for MemoryStorage {
    fn save_identity(&mut self, identity: Identity, credential: Credential) -> Result<()> {
        if credential.user_id != identity.id {
            return Err(VeilError::StorageError(
                "credential does not belong to identity".to_string(),
            ));
        }
        if self.identities.contains_key(&identity.id) {
            return Err(VeilError::AlreadyExists(format!("identity {}", identity.id)));
        }
        if self
            .identities
            .values()
            .any(|existing| existing.username == identity.username)
        {
            return Err(VeilError::AlreadyExists(format!(
                "username {}",
                identity.username
            )));
        }

        self.credentials.insert(identity.id.clone(), credential);
        self.identities.insert(identity.id.clone(), identity);
        Ok(())
    }

    fn load_identity(&self, user_id: &str) -> Result<Option<Identity>> {
        Ok(self.identities.get(user_id).cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
        Ok(self
            .identities
            .values()
            .find(|identity| identity.username == username)
            .cloned())
    }

    fn update_wrapped_key(&mut self, user_id: &str, private_key_wrapped: String) -> Result<()> {
        let identity = self
            .identities
            .get_mut(user_id)
            .ok_or_else(|| VeilError::NotFound(format!("identity {}", user_id)))?;
        identity.private_key_wrapped = private_key_wrapped;
        Ok(())
    }

    fn delete_identity(&mut self, user_id: &str) -> Result<()> {
        if self.identities.remove(user_id).is_none() {
            return Err(VeilError::NotFound(format!("identity {}", user_id)));
        }
        self.credentials.remove(user_id);
        Ok(())
    }
}

// === Учётные данные ===

impl CredentialStore for MemoryStorage {
    fn load_credential(&self, user_id: &str) -> Result<Option<Credential>> {
        Ok(self.credentials.get(user_id).cloned())
    }

    fn update_credential(&mut self, credential: Credential) -> Result<()> {
        if !self.identities.contains_key(&credential.user_id) {
            return Err(VeilError::NotFound(format!(
                "identity {}",
                credential.user_id
            )));
        }
        self.credentials.insert(credential.user_id.clone(), credential);
        Ok(())
    }
}

// === Публичные ключи ===

impl PublicKeyDirectory for MemoryStorage {
    fn public_key(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self
            .identities
            .get(user_id)
            .map(|identity| identity.public_key_pem.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::envelope::MessageEnvelope;

    fn identity(username: &str) -> (Identity, Credential) {
        let identity = Identity::new(
            username.to_string(),
            username.to_string(),
            "-----BEGIN PUBLIC KEY-----".to_string(),
            "wrapped".to_string(),
            false,
        );
        let credential = Credential {
            user_id: identity.id.clone(),
            password_hash: Some("hash".to_string()),
            two_factor_secret: None,
        };
        (identity, credential)
    }

    #[test]
    fn test_identity_and_credential_live_together() {
        let mut storage = MemoryStorage::new();
        let (alice, credential) = identity("alice");
        let id = alice.id.clone();

        storage.save_identity(alice, credential).unwrap();
        assert!(storage.load_identity(&id).unwrap().is_some());
        assert!(storage.load_credential(&id).unwrap().is_some());
        assert_eq!(storage.find_by_username("alice").unwrap().unwrap().id, id);
        assert!(storage.public_key(&id).unwrap().is_some());

        storage.delete_identity(&id).unwrap();
        assert!(storage.load_identity(&id).unwrap().is_none());
        assert!(storage.load_credential(&id).unwrap().is_none());
        assert!(matches!(
            storage.delete_identity(&id),
            Err(VeilError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut storage = MemoryStorage::new();
        let (first, first_credential) = identity("alice");
        let (second, second_credential) = identity("alice");

        storage.save_identity(first, first_credential).unwrap();
        assert!(matches!(
            storage.save_identity(second, second_credential),
            Err(VeilError::AlreadyExists(_))
        ));
        assert_eq!(storage.identity_count(), 1);
    }

    #[test]
    fn test_mismatched_credential_rejected() {
        let mut storage = MemoryStorage::new();
        let (alice, mut credential) = identity("alice");
        credential.user_id = "someone-else".to_string();

        assert!(matches!(
            storage.save_identity(alice, credential),
            Err(VeilError::StorageError(_))
        ));
    }

    #[test]
    fn test_messages_by_chat_and_tombstone() {
        let mut storage = MemoryStorage::new();

        let mut first = StoredMessage::from_envelope("chat_1", "alice", &MessageEnvelope::plain_encoded("a"));
        first.created_at = 100;
        let mut second = StoredMessage::from_envelope("chat_1", "bob", &MessageEnvelope::plain_encoded("b"));
        second.created_at = 200;
        let other = StoredMessage::from_envelope("chat_2", "bob", &MessageEnvelope::plain_encoded("c"));
        let first_id = first.id.clone();

        storage.save_message(second).unwrap();
        storage.save_message(first).unwrap();
        storage.save_message(other).unwrap();

        let messages = storage.load_messages_for_chat("chat_1", 10, 0).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, first_id); // Сортировка по created_at

        storage.tombstone_message(&first_id).unwrap();
        let deleted = storage.load_message(&first_id).unwrap().unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.content.is_empty());

        assert!(matches!(
            storage.tombstone_message("missing"),
            Err(VeilError::NotFound(_))
        ));
    }
}
