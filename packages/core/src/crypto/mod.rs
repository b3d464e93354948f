//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Host application (chat service, UI)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │            MessageCodec (protocol::codec)                   │
//! │  - Каскад декодирования для отображения                     │
//! │  - base64-text / hybrid / legacy                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   HybridCipher            │  │  PrivateKeyVault         │
//! │  - RSA-OAEP wrap          │  │  - Argon2id KDF          │
//! │  - AES-256-CBC payload    │  │  - AES-256-CBC at rest   │
//! │  - group re-wrap          │  │  - legacy scrypt read    │
//! └───────────────────────────┘  └──────────────────────────┘
//!                │                           │
//!                └─────────────┬─────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              KeyPairService / CredentialAuth                │
//! │  - RSA-2048 (SPKI / PKCS#8 PEM)                             │
//! │  - Argon2id password hash, TOTP                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Модули
//!
//! - [`keys`]: генерация и разбор RSA ключей
//! - [`vault`]: wrap/unwrap приватного ключа
//! - [`hybrid`]: гибридный конверт RSA + AES
//! - [`aes_cbc`]: симметричный слой и `ContentKey`
//! - [`password`]: хэш пароля для логина
//! - [`totp`]: одноразовые коды

pub mod aes_cbc;

pub mod hybrid;

pub mod keys;

pub mod password;

pub mod totp;

pub mod vault;

// ============================================================================
// Re-exports для удобства
// ============================================================================

pub use hybrid::{GroupEnvelope, HybridCipher, HybridEnvelope};
pub use keys::{IdentityKeyPair, KeyPairService};
pub use vault::{PrivateKeyVault, VaultParams};
