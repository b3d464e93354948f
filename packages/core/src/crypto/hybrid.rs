//! Hybrid encryption using RSA-OAEP + AES-256-CBC
//!
//! Implements the message envelope scheme:
//! - Sender generates a random AES-256 key and 128-bit IV per message
//! - Encrypts the plaintext once with AES-256-CBC
//! - Wraps `aes_key ‖ iv` (48 bytes) with RSA-OAEP under each recipient key
//!
//! Direct format: `content = ivHex ":" base64(ct)`, `encrypted_key = base64(rsa_ct)`.
//! Group format: `content = base64(ct)`, one `encrypted_key` per recipient id.

use crate::crypto::aes_cbc::{self, ContentKey, KEY_LENGTH};
use crate::crypto::keys::{parse_private_key_pem, parse_public_key_pem};
use crate::error::{CryptoError, CryptoResult};
use crate::utils::b64;
use rayon::prelude::*;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::collections::{BTreeMap, HashMap};
use zeroize::Zeroizing;

/// Separator between the hex IV and the base64 ciphertext in direct content
pub const IV_SEPARATOR: char = ':';

/// Envelope for a direct chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridEnvelope {
    pub content: String,
    pub encrypted_key: String,
}

/// Envelope for a group chat: one wrapped content key per recipient id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEnvelope {
    pub content: String,
    pub encrypted_keys: BTreeMap<String, String>,
}

impl GroupEnvelope {
    /// Wrapped content key addressed to `recipient_id`
    pub fn key_for(&self, recipient_id: &str) -> Option<&str> {
        self.encrypted_keys.get(recipient_id).map(String::as_str)
    }
}

/// OAEP with SHA-1 digest and MGF1-SHA-1 (OpenSSL's default OAEP parameters)
fn oaep() -> Oaep {
    Oaep::new::<Sha1>()
}

/// Stateless hybrid cipher
pub struct HybridCipher;

impl HybridCipher {
    /// Encrypt `plaintext` for a single recipient.
    ///
    /// Fails with [`CryptoError::EncryptError`] if the public key is malformed.
    pub fn encrypt_for_one(
        plaintext: &str,
        recipient_public_key_pem: &str,
    ) -> CryptoResult<HybridEnvelope> {
        use tracing::debug;

        let public_key = parse_public_key_pem(recipient_public_key_pem)
            .map_err(|e| CryptoError::EncryptError(e.to_string()))?;
        let content_key = fresh_content_key()?;

        let ciphertext = content_key.encrypt(plaintext.as_bytes());
        let encrypted_key = wrap_content_key(&public_key, &content_key.to_wrapped_bytes())?;

        debug!(
            target: "veilchat::hybrid",
            plaintext_len = plaintext.len(),
            "Encrypted direct envelope"
        );

        Ok(HybridEnvelope {
            content: format!(
                "{}{}{}",
                hex::encode(content_key.iv()),
                IV_SEPARATOR,
                b64::encode(&ciphertext)
            ),
            encrypted_key,
        })
    }

    /// Encrypt `plaintext` once and wrap the content key for every recipient.
    ///
    /// Recipient wraps run in parallel; any malformed key fails the whole
    /// call with [`CryptoError::EncryptError`] naming the recipient.
    pub fn encrypt_for_group(
        plaintext: &str,
        recipient_public_keys: &HashMap<String, String>,
    ) -> CryptoResult<GroupEnvelope> {
        use tracing::debug;

        if recipient_public_keys.is_empty() {
            return Err(CryptoError::EncryptError(
                "group envelope needs at least one recipient".to_string(),
            ));
        }

        let content_key = fresh_content_key()?;
        let ciphertext = content_key.encrypt(plaintext.as_bytes());
        let wrapped = content_key.to_wrapped_bytes();

        let encrypted_keys = recipient_public_keys
            .par_iter()
            .map(|(recipient_id, public_key_pem)| {
                let public_key = parse_public_key_pem(public_key_pem).map_err(|e| {
                    CryptoError::EncryptError(format!("recipient {}: {}", recipient_id, e))
                })?;
                let encrypted_key = wrap_content_key(&public_key, &wrapped)?;
                Ok((recipient_id.clone(), encrypted_key))
            })
            .collect::<CryptoResult<BTreeMap<String, String>>>()?;

        debug!(
            target: "veilchat::hybrid",
            recipients = encrypted_keys.len(),
            plaintext_len = plaintext.len(),
            "Encrypted group envelope"
        );

        Ok(GroupEnvelope {
            content: b64::encode(&ciphertext),
            encrypted_keys,
        })
    }

    /// Decrypt an envelope with a PEM private key.
    ///
    /// `content` may be in direct (`ivHex:b64`) or group (`b64`) form.
    pub fn decrypt(
        content: &str,
        encrypted_key: &str,
        private_key_pem: &str,
    ) -> CryptoResult<String> {
        let private_key = parse_private_key_pem(private_key_pem)
            .map_err(|e| CryptoError::DecryptError(e.to_string()))?;
        Self::decrypt_with_key(content, encrypted_key, &private_key)
    }

    /// Same as [`HybridCipher::decrypt`] for an already parsed key.
    pub fn decrypt_with_key(
        content: &str,
        encrypted_key: &str,
        private_key: &RsaPrivateKey,
    ) -> CryptoResult<String> {
        let wrapped = b64::decode(encrypted_key.trim()).map_err(CryptoError::DecryptError)?;
        let key_material = Zeroizing::new(
            private_key
                .decrypt_blinded(&mut rand::rngs::OsRng, oaep(), &wrapped)
                .map_err(|e| CryptoError::DecryptError(format!("RSA-OAEP: {}", e)))?,
        );

        let (content_iv, ciphertext_b64) = split_content(content)?;

        let content_key = match ContentKey::from_wrapped_bytes(&key_material) {
            Some(content_key) => content_key,
            // Old envelopes wrapped only the AES key; the IV lives in the content prefix
            None if key_material.len() == KEY_LENGTH => {
                let iv = content_iv.ok_or_else(|| {
                    CryptoError::DecryptError("32-byte key payload without IV prefix".to_string())
                })?;
                let mut key = [0u8; KEY_LENGTH];
                key.copy_from_slice(&key_material);
                let content_key = ContentKey::from_parts(key, iv);
                zeroize::Zeroize::zeroize(&mut key);
                content_key
            }
            None => {
                return Err(CryptoError::DecryptError(format!(
                    "unexpected key payload length {}",
                    key_material.len()
                )))
            }
        };

        let ciphertext = b64::decode(ciphertext_b64).map_err(CryptoError::DecryptError)?;
        let plaintext = content_key
            .decrypt(&ciphertext)
            .map_err(CryptoError::DecryptError)?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::DecryptError("plaintext is not UTF-8".to_string()))
    }
}

fn fresh_content_key() -> CryptoResult<ContentKey> {
    ContentKey::generate().map_err(|e| CryptoError::EncryptError(format!("RNG failure: {}", e)))
}

fn wrap_content_key(public_key: &RsaPublicKey, wrapped: &[u8]) -> CryptoResult<String> {
    let encrypted = public_key
        .encrypt(&mut rand::rngs::OsRng, oaep(), wrapped)
        .map_err(|e| CryptoError::EncryptError(format!("RSA-OAEP: {}", e)))?;
    Ok(b64::encode(&encrypted))
}

/// Split `ivHex:b64` into its parts; plain `b64` has no IV prefix.
fn split_content(content: &str) -> CryptoResult<(Option<[u8; aes_cbc::IV_LENGTH]>, &str)> {
    let content = content.trim();
    match content.split_once(IV_SEPARATOR) {
        Some((iv_hex, ciphertext_b64)) => {
            let iv = aes_cbc::parse_iv_hex(iv_hex)
                .ok_or_else(|| CryptoError::DecryptError("invalid IV prefix".to_string()))?;
            Ok((Some(iv), ciphertext_b64))
        }
        None => Ok((None, content)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::fixtures;

    #[test]
    fn test_direct_roundtrip() {
        let pair = fixtures::pair(0);
        let envelope = HybridCipher::encrypt_for_one("Hello, VeilChat!", &pair.public_key_pem).unwrap();

        let (iv_hex, _) = envelope.content.split_once(':').unwrap();
        assert_eq!(iv_hex.len(), 32);

        let plaintext =
            HybridCipher::decrypt(&envelope.content, &envelope.encrypted_key, &pair.private_key_pem)
                .unwrap();
        assert_eq!(plaintext, "Hello, VeilChat!");
    }

    #[test]
    fn test_wrapped_key_carries_key_and_iv() {
        let pair = fixtures::pair(0);
        let envelope = HybridCipher::encrypt_for_one("payload", &pair.public_key_pem).unwrap();

        let private_key = parse_private_key_pem(&pair.private_key_pem).unwrap();
        let wrapped = b64::decode(&envelope.encrypted_key).unwrap();
        let key_material = private_key.decrypt(oaep(), &wrapped).unwrap();
        assert_eq!(key_material.len(), 48);

        // IV in the content prefix equals bytes 32..48 of the wrapped payload
        let (iv_hex, _) = envelope.content.split_once(':').unwrap();
        assert_eq!(hex::decode(iv_hex).unwrap(), key_material[32..]);
    }

    #[test]
    fn test_encryption_is_not_deterministic() {
        let pair = fixtures::pair(0);
        let first = HybridCipher::encrypt_for_one("same text", &pair.public_key_pem).unwrap();
        let second = HybridCipher::encrypt_for_one("same text", &pair.public_key_pem).unwrap();

        assert_ne!(first.content, second.content);
        assert_ne!(first.encrypted_key, second.encrypted_key);
    }

    #[test]
    fn test_wrong_key_fails() {
        let envelope =
            HybridCipher::encrypt_for_one("secret", &fixtures::pair(0).public_key_pem).unwrap();

        let result = HybridCipher::decrypt(
            &envelope.content,
            &envelope.encrypted_key,
            &fixtures::pair(1).private_key_pem,
        );
        assert!(matches!(result, Err(CryptoError::DecryptError(_))));
    }

    #[test]
    fn test_malformed_public_key_is_encrypt_error() {
        let result = HybridCipher::encrypt_for_one("hi", "-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----");
        assert!(matches!(result, Err(CryptoError::EncryptError(_))));
    }

    #[test]
    fn test_group_roundtrip_for_every_member() {
        let mut recipients = HashMap::new();
        for (i, id) in ["alice", "bob", "carol"].iter().enumerate() {
            recipients.insert(id.to_string(), fixtures::pair(i).public_key_pem.clone());
        }

        let envelope = HybridCipher::encrypt_for_group("group hello", &recipients).unwrap();
        assert_eq!(envelope.encrypted_keys.len(), 3);
        assert!(!envelope.content.contains(':'));

        for (i, id) in ["alice", "bob", "carol"].iter().enumerate() {
            let plaintext = HybridCipher::decrypt(
                &envelope.content,
                envelope.key_for(id).unwrap(),
                &fixtures::pair(i).private_key_pem,
            )
            .unwrap();
            assert_eq!(plaintext, "group hello");
        }
    }

    #[test]
    fn test_group_rejects_empty_and_malformed() {
        assert!(matches!(
            HybridCipher::encrypt_for_group("x", &HashMap::new()),
            Err(CryptoError::EncryptError(_))
        ));

        let mut recipients = HashMap::new();
        recipients.insert("alice".to_string(), fixtures::pair(0).public_key_pem.clone());
        recipients.insert("mallory".to_string(), "garbage".to_string());
        let err = HybridCipher::encrypt_for_group("x", &recipients).unwrap_err();
        assert!(err.to_string().contains("mallory"));
    }

    #[test]
    fn test_legacy_32_byte_key_payload() {
        let pair = fixtures::pair(0);
        let public_key = parse_public_key_pem(&pair.public_key_pem).unwrap();

        let key = [5u8; 32];
        let iv = [6u8; 16];
        let ciphertext = aes_cbc::encrypt(&key, &iv, "старое сообщение".as_bytes());
        let content = format!("{}:{}", hex::encode(iv), b64::encode(&ciphertext));
        let encrypted_key = wrap_content_key(&public_key, &key).unwrap();

        let plaintext = HybridCipher::decrypt(&content, &encrypted_key, &pair.private_key_pem).unwrap();
        assert_eq!(plaintext, "старое сообщение");
    }

    #[test]
    fn test_corrupted_envelope_fails() {
        let pair = fixtures::pair(0);
        let envelope = HybridCipher::encrypt_for_one("text", &pair.public_key_pem).unwrap();

        assert!(HybridCipher::decrypt("zz:AAAA", &envelope.encrypted_key, &pair.private_key_pem).is_err());
        assert!(HybridCipher::decrypt(&envelope.content, "not base64!", &pair.private_key_pem).is_err());
        assert!(HybridCipher::decrypt(&envelope.content, &envelope.encrypted_key, "nope").is_err());
    }
}
