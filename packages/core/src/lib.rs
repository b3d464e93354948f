// VeilChat Core
// RSA identities, key vault and hybrid message envelopes for VeilChat

#![warn(clippy::all)]

// Модули
pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod utils;

// Re-exports для удобства
pub use api::{ChatMessaging, CredentialAuth, IdentityService, VeilChatCore};
pub use config::Config;
pub use error::{CryptoError, CryptoResult};
pub use protocol::{DecodePath, MessageCodec, MessageEnvelope};
pub use state::UnlockedSession;
pub use storage::models::{Credential, Identity, StoredMessage};
pub use storage::{CredentialStore, MemoryStorage, PublicKeyDirectory, UserDirectory};
pub use utils::error::{Result, VeilError};
pub use utils::logging::init_logging;
