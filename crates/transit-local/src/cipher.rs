//! AES-256-GCM-SIV encryption of individual attribute values.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant.
//! Each call still generates a fresh random nonce; misuse resistance means a
//! repeated nonce degrades gracefully instead of catastrophically.
//!
//! Data keys are derived per `(key_path, key_name)` with HMAC-SHA256 over the
//! master key, so the key namespace behaves like independent backend mounts.

use aes_gcm_siv::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Prefix carried by every ciphertext this backend produces.
pub const CIPHERTEXT_PREFIX: &str = "vault:v1:";

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// AES-GCM-SIV decryption failed authentication — wrong key or tampered
    /// data.
    #[error("aead operation failed")]
    AeadFailure,

    /// The ciphertext string does not match the `vault:v1:` format.
    #[error("ciphertext does not match the vault:v1 format")]
    InvalidFormat,
}

/// Derive the data key for `key_name` under `key_path`.
pub fn derive_key(master: &[u8; KEY_LEN], key_path: &str, key_name: &str) -> [u8; KEY_LEN] {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(master)
        .expect("HMAC accepts keys of any length");
    // Length-prefix the path so the (path, name) framing is unambiguous.
    mac.update(&(key_path.len() as u64).to_be_bytes());
    mac.update(key_path.as_bytes());
    mac.update(key_name.as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&digest);
    key
}

/// Encrypt a plaintext value under `key`, producing a `vault:v1:` blob.
///
/// A fresh 96-bit nonce from the OS CSPRNG is prepended to the ciphertext
/// inside the base64 payload.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (should be
/// unreachable with a valid key and nonce).
pub fn encrypt_value(plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<String, CipherError> {
    let cipher = build_cipher(key)?;
    let nonce = Aes256GcmSiv::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CipherError::AeadFailure)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(format!("{CIPHERTEXT_PREFIX}{}", STANDARD.encode(blob)))
}

/// Decrypt a `vault:v1:` blob back to plaintext bytes.
///
/// # Errors
///
/// Returns [`CipherError::InvalidFormat`] if the string does not parse as a
/// `vault:v1:` blob, or [`CipherError::AeadFailure`] if authentication fails
/// (wrong key or tampered data).
pub fn decrypt_value(wire: &str, key: &[u8; KEY_LEN]) -> Result<Vec<u8>, CipherError> {
    let encoded = wire
        .strip_prefix(CIPHERTEXT_PREFIX)
        .ok_or(CipherError::InvalidFormat)?;
    let blob = STANDARD
        .decode(encoded)
        .map_err(|_| CipherError::InvalidFormat)?;
    if blob.len() < NONCE_LEN {
        return Err(CipherError::InvalidFormat);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

    let cipher = build_cipher(key)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CipherError::AeadFailure)
}

fn build_cipher(key: &[u8; KEY_LEN]) -> Result<Aes256GcmSiv, CipherError> {
    Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}
