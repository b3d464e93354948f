//! Time-based one-time passwords (RFC 6238, HMAC-SHA1)
//!
//! Secrets are hex-encoded byte strings. A code is accepted if it matches the
//! current 30-second window or one window on either side.

use crate::config::Config;
use crate::error::{CryptoError, CryptoResult};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// RFC 4226 allows 6 to 8 digits
const MIN_DIGITS: u32 = 6;
const MAX_DIGITS: u32 = 8;

/// TOTP parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotpParams {
    pub step_secs: u64,
    pub digits: u32,
    pub skew_windows: u64,
}

impl From<&Config> for TotpParams {
    fn from(config: &Config) -> Self {
        Self {
            step_secs: config.totp_step_secs,
            digits: config.totp_digits.clamp(MIN_DIGITS, MAX_DIGITS),
            skew_windows: config.totp_skew_windows,
        }
    }
}

impl Default for TotpParams {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// HOTP value for a counter (RFC 4226 dynamic truncation)
fn hotp(secret: &[u8], counter: u64, digits: u32) -> u32 {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha1::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return u32::MAX,
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    binary % 10u32.pow(digits.clamp(MIN_DIGITS, MAX_DIGITS))
}

fn format_code(value: u32, digits: u32) -> String {
    format!("{:0width$}", value, width = digits as usize)
}

fn decode_secret(secret_hex: &str) -> Option<Vec<u8>> {
    let secret = hex::decode(secret_hex.trim()).ok()?;
    if secret.is_empty() {
        return None;
    }
    Some(secret)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Code for the window containing `unix_time`
pub fn totp_code_at(secret_hex: &str, unix_time: u64, params: &TotpParams) -> CryptoResult<String> {
    let secret = decode_secret(secret_hex)
        .ok_or_else(|| CryptoError::InvalidInputError("TOTP secret must be non-empty hex".to_string()))?;
    if params.step_secs == 0 {
        return Err(CryptoError::InvalidInputError("TOTP step must be positive".to_string()));
    }
    let counter = unix_time / params.step_secs;
    Ok(format_code(hotp(&secret, counter, params.digits), params.digits))
}

/// Verify `code` against the current time
pub fn verify_totp(code: &str, secret_hex: &str, params: &TotpParams) -> bool {
    verify_totp_at(code, secret_hex, unix_now(), params)
}

/// Verify `code` against windows T-skew..=T+skew around `unix_time`
pub fn verify_totp_at(code: &str, secret_hex: &str, unix_time: u64, params: &TotpParams) -> bool {
    if code.len() != params.digits as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if params.step_secs == 0 {
        return false;
    }
    let secret = match decode_secret(secret_hex) {
        Some(secret) => secret,
        None => return false,
    };

    let current = unix_time / params.step_secs;
    let first = current.saturating_sub(params.skew_windows);
    let last = current.saturating_add(params.skew_windows);

    // Every candidate is checked so timing does not depend on which window matched
    let mut matched = subtle::Choice::from(0u8);
    for counter in first..=last {
        let candidate = format_code(hotp(&secret, counter, params.digits), params.digits);
        matched |= candidate.as_bytes().ct_eq(code.as_bytes());
    }
    matched.into()
}

/// Fresh random secret, hex-encoded
pub fn generate_totp_secret(length: usize) -> CryptoResult<String> {
    let mut secret = vec![0u8; length];
    rand::rngs::OsRng
        .try_fill_bytes(&mut secret)
        .map_err(|e| CryptoError::KeyGenerationError(e.to_string()))?;
    Ok(hex::encode(secret))
}

/// `otpauth://` provisioning URI for authenticator apps (secret in base32)
pub fn totp_uri(
    secret_hex: &str,
    username: &str,
    issuer: &str,
    params: &TotpParams,
) -> CryptoResult<String> {
    let secret = decode_secret(secret_hex)
        .ok_or_else(|| CryptoError::InvalidInputError("TOTP secret must be non-empty hex".to_string()))?;
    Ok(format!(
        "otpauth://totp/{issuer}:{username}?secret={}&issuer={issuer}&algorithm=SHA1&digits={}&period={}",
        base32_encode(&secret),
        params.digits,
        params.step_secs
    ))
}

/// RFC 4648 base32 without padding
fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8 + 4) / 5);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}
