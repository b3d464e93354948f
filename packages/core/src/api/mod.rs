// Публичный API ядра
// Высокоуровневые сервисы поверх crypto / protocol / storage

pub mod auth;
pub mod crypto;
pub mod identity;
pub mod messaging;

use crate::config::Config;

pub use auth::CredentialAuth;
pub use identity::{AnonymousIdentity, IdentityService};
pub use messaging::ChatMessaging;

/// Все сервисы ядра с общей конфигурацией
#[derive(Debug, Clone)]
pub struct VeilChatCore {
    pub identity: IdentityService,
    pub auth: CredentialAuth,
    pub messaging: ChatMessaging,
}

impl VeilChatCore {
    pub fn new(config: Config) -> Self {
        Self {
            identity: IdentityService::new(config.clone()),
            auth: CredentialAuth::new(config.clone()),
            messaging: ChatMessaging::new(&config),
        }
    }
}

impl Default for VeilChatCore {
    fn default() -> Self {
        Self::new(Config::global().clone())
    }
}
