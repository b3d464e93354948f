// AES-256-CBC с PKCS#7 padding
// Общий симметричный слой для vault и hybrid envelope

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const KEY_LENGTH: usize = 32;
pub const IV_LENGTH: usize = 16;

/// Симметричный ключ + IV для одного вызова шифрования
///
/// Никогда не сохраняется и не кэшируется; затирается при drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ContentKey {
    key: [u8; KEY_LENGTH],
    iv: [u8; IV_LENGTH],
}

impl ContentKey {
    /// Сгенерировать свежие ключ и IV из OsRng
    pub fn generate() -> Result<Self, rand::Error> {
        let mut content_key = Self {
            key: [0u8; KEY_LENGTH],
            iv: [0u8; IV_LENGTH],
        };
        rand::rngs::OsRng.try_fill_bytes(&mut content_key.key)?;
        rand::rngs::OsRng.try_fill_bytes(&mut content_key.iv)?;
        Ok(content_key)
    }

    pub fn from_parts(key: [u8; KEY_LENGTH], iv: [u8; IV_LENGTH]) -> Self {
        Self { key, iv }
    }

    /// Разобрать `key ‖ iv` (ровно 48 байт, разрез на байте 32)
    pub fn from_wrapped_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_LENGTH + IV_LENGTH {
            return None;
        }
        let (key_bytes, iv_bytes) = bytes.split_at(KEY_LENGTH);
        let mut key = [0u8; KEY_LENGTH];
        let mut iv = [0u8; IV_LENGTH];
        key.copy_from_slice(key_bytes);
        iv.copy_from_slice(iv_bytes);
        Some(Self { key, iv })
    }

    /// `key ‖ iv`, которые заворачиваются RSA-OAEP
    pub fn to_wrapped_bytes(&self) -> zeroize::Zeroizing<Vec<u8>> {
        let mut out = zeroize::Zeroizing::new(Vec::with_capacity(KEY_LENGTH + IV_LENGTH));
        out.extend_from_slice(&self.key);
        out.extend_from_slice(&self.iv);
        out
    }

    pub fn iv(&self) -> &[u8; IV_LENGTH] {
        &self.iv
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        encrypt(&self.key, &self.iv, plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, String> {
        decrypt(&self.key, &self.iv, ciphertext)
    }
}

/// Зашифровать данные AES-256-CBC
pub fn encrypt(key: &[u8; KEY_LENGTH], iv: &[u8; IV_LENGTH], plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Расшифровать данные AES-256-CBC
pub fn decrypt(
    key: &[u8; KEY_LENGTH],
    iv: &[u8; IV_LENGTH],
    ciphertext: &[u8],
) -> Result<Vec<u8>, String> {
    if ciphertext.is_empty() || ciphertext.len() % IV_LENGTH != 0 {
        return Err(format!(
            "Invalid ciphertext length: {} is not a positive multiple of the block size",
            ciphertext.len()
        ));
    }

    Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| "Invalid padding".to_string())
}

/// Разобрать IV из hex (ровно 16 байт)
pub fn parse_iv_hex(iv_hex: &str) -> Option<[u8; IV_LENGTH]> {
    let bytes = hex::decode(iv_hex).ok()?;
    bytes.try_into().ok()
}
