//! Cryptographic primitives
//!
//! - bcrypt password hashing (cost 12)
//! - CSPRNG tokens, UUIDs and bounded integers
//! - SHA-256 fingerprints and HMAC-SHA256 signatures
//! - AES-256-GCM with a 16 byte IV, framed as `hex(iv):hex(ciphertext):hex(tag)`

use aes_gcm::{
    AesGcm, Nonce,
    aead::{Aead, KeyInit, OsRng, consts::U16},
    aes::Aes256,
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// AES-256-GCM keyed with a 16 byte nonce instead of the usual 12.
type Aes256Gcm16 = AesGcm<Aes256, U16>;
type HmacSha256 = Hmac<Sha256>;

pub const BCRYPT_COST: u32 = 12;
pub const DEFAULT_TOKEN_BYTES: usize = 32;
pub const KEY_SIZE: usize = 32;
pub const IV_SIZE: usize = 16;
pub const TAG_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key must be {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("malformed encrypted payload: {0}")]
    MalformedPayload(String),
    #[error("authentication tag did not verify")]
    IntegrityFailure,
    #[error("encryption failed")]
    Encryption,
    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

/// 256-bit key for [`encrypt`] and [`decrypt`], usually parsed from a 64 char hex string.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(key))
    }

    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for EncryptionKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidKeyLength(s.len() / 2))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Salted bcrypt hash. Two calls with the same input produce different strings.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

/// Returns `false` for a mismatch and for a hash that cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// `length` random bytes, hex encoded.
pub fn generate_token(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// SHA-256 content fingerprint. Not suitable for secrets.
pub fn hash_data(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

pub fn create_hmac(data: &str, secret: &str) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature produced by [`create_hmac`].
pub fn verify_hmac(data: &str, secret: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Uniform integer in `[min, max)` for any `max > min`, full `i64` range
/// included. A range with `max <= min` yields `min`.
pub fn generate_random_number(min: i64, max: i64) -> i64 {
    let mut bytes = [0u8; 4];
    OsRng.fill_bytes(&mut bytes);
    let unit = f64::from(u32::from_be_bytes(bytes)) / (f64::from(u32::MAX) + 1.0);
    let span = (i128::from(max) - i128::from(min)) as f64;
    let offset = (unit * span).floor() as i128;
    let value = (i128::from(min) + offset).min(i128::from(max) - 1).max(i128::from(min));
    i64::try_from(value).unwrap_or(min)
}

/// Encrypts with a fresh random IV and returns `iv:ciphertext:tag` in hex.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<String, CryptoError> {
    let cipher =
        Aes256Gcm16::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;

    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| CryptoError::Encryption)?;

    // aes-gcm appends the tag to the ciphertext
    let tag = sealed.split_off(sealed.len() - TAG_SIZE);

    Ok(format!(
        "{}:{}:{}",
        hex::encode(iv),
        hex::encode(sealed),
        hex::encode(tag)
    ))
}

/// Reverses [`encrypt`]. Nothing is returned unless the tag authenticates.
pub fn decrypt(payload: &str, key: &[u8]) -> Result<String, CryptoError> {
    let cipher =
        Aes256Gcm16::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;

    let parts: Vec<&str> = payload.split(':').collect();
    let [iv_hex, ciphertext_hex, tag_hex] = parts.as_slice() else {
        return Err(CryptoError::MalformedPayload(format!(
            "expected 3 parts, got {}",
            parts.len()
        )));
    };

    let iv = decode_part(iv_hex, "iv")?;
    let mut sealed = decode_part(ciphertext_hex, "ciphertext")?;
    let tag = decode_part(tag_hex, "tag")?;

    if iv.len() != IV_SIZE {
        return Err(CryptoError::MalformedPayload(format!(
            "iv must be {IV_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    if tag.len() != TAG_SIZE {
        return Err(CryptoError::MalformedPayload(format!(
            "tag must be {TAG_SIZE} bytes, got {}",
            tag.len()
        )));
    }

    sealed.extend_from_slice(&tag);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
        .map_err(|_| CryptoError::IntegrityFailure)?;

    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::MalformedPayload("plaintext is not valid UTF-8".to_string()))
}

fn decode_part(part: &str, name: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(part).map_err(|e| CryptoError::MalformedPayload(format!("{name}: {e}")))
}
