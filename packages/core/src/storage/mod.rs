// Модуль хранилища
//
// Ядро не ходит в базу само: хост передаёт реализации трейтов ниже.

pub mod memory;
pub mod models;

use crate::storage::models::{Credential, Identity};
use crate::utils::error::Result;

pub use memory::MemoryStorage;

/// Публичные ключи по id пользователя (нужны отправителю)
pub trait PublicKeyDirectory {
    fn public_key(&self, user_id: &str) -> Result<Option<String>>;
}

/// Хранение identity
pub trait UserDirectory {
    /// Identity и Credential создаются вместе
    fn save_identity(&mut self, identity: Identity, credential: Credential) -> Result<()>;

    fn load_identity(&self, user_id: &str) -> Result<Option<Identity>>;

    fn find_by_username(&self, username: &str) -> Result<Option<Identity>>;

    /// Обновить wrapped blob (миграция со старого формата)
    fn update_wrapped_key(&mut self, user_id: &str, private_key_wrapped: String) -> Result<()>;

    /// Identity и Credential удаляются вместе
    fn delete_identity(&mut self, user_id: &str) -> Result<()>;
}

/// Учётные данные
pub trait CredentialStore {
    fn load_credential(&self, user_id: &str) -> Result<Option<Credential>>;

    fn update_credential(&mut self, credential: Credential) -> Result<()>;
}
