// Boundary-функции криптоядра
//
// Тонкие обёртки над сервисами с параметрами из `Config::global()`.
// Хосту, которому нужна своя конфигурация, удобнее брать сервисы напрямую.

use crate::config::Config;
use crate::crypto::hybrid::HybridCipher;
use crate::crypto::keys::KeyPairService;
use crate::crypto::password;
use crate::crypto::totp::{self, TotpParams};
use crate::crypto::vault::PrivateKeyVault;
use crate::error::CryptoResult;
use crate::protocol::codec::MessageCodec;
use std::collections::{BTreeMap, HashMap};
use zeroize::Zeroizing;

/// Новая пара RSA-2048: `(SPKI PEM, PKCS#8 PEM)`
pub fn generate_key_pair() -> CryptoResult<(String, Zeroizing<String>)> {
    let pair = KeyPairService::new(Config::global()).generate()?;
    Ok((pair.public_key_pem, pair.private_key_pem))
}

pub fn wrap_private_key(private_key_pem: &str, secret: &str) -> CryptoResult<String> {
    PrivateKeyVault::from_config(Config::global()).wrap(private_key_pem, secret)
}

pub fn unwrap_private_key(wrapped: &str, secret: &str) -> CryptoResult<Zeroizing<String>> {
    PrivateKeyVault::from_config(Config::global()).unwrap(wrapped, secret)
}

/// `(content, encrypted_key)` для одного получателя
pub fn encrypt_for_recipient(
    plaintext: &str,
    recipient_public_key_pem: &str,
) -> CryptoResult<(String, String)> {
    let envelope = HybridCipher::encrypt_for_one(plaintext, recipient_public_key_pem)?;
    Ok((envelope.content, envelope.encrypted_key))
}

/// `(content, recipient id -> encrypted_key)` для группы
pub fn encrypt_for_group(
    plaintext: &str,
    recipient_public_keys: &HashMap<String, String>,
) -> CryptoResult<(String, BTreeMap<String, String>)> {
    let envelope = HybridCipher::encrypt_for_group(plaintext, recipient_public_keys)?;
    Ok((envelope.content, envelope.encrypted_keys))
}

pub fn decrypt(content: &str, encrypted_key: &str, private_key_pem: &str) -> CryptoResult<String> {
    HybridCipher::decrypt(content, encrypted_key, private_key_pem)
}

/// Никогда не падает; см. [`MessageCodec`]
pub fn decode_for_display(
    content: &str,
    marker: &str,
    encrypted_key: &str,
    is_deleted: bool,
    private_key_pem: Option<&str>,
) -> String {
    MessageCodec::new(Config::global()).decode_for_display(
        content,
        marker,
        encrypted_key,
        is_deleted,
        private_key_pem,
    )
}

pub fn hash_password(password: &str) -> CryptoResult<String> {
    password::hash_password(password, Config::global())
}

pub fn verify_totp(code: &str, secret_hex: &str) -> bool {
    totp::verify_totp(code, secret_hex, &TotpParams::from(Config::global()))
}
