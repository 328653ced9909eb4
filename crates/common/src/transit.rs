//! The batched encrypt/decrypt contract against the transit-encryption service.
//!
//! Everything the attribute layer knows about the encryption backend lives in
//! this module: a [`TransitClient`] accepts an ordered sequence of items under
//! one key path and returns one outcome per item, in the same order. The
//! backend may be a remote key-management service or an in-process cipher;
//! callers cannot tell the difference.

use serde::{Deserialize, Serialize};

use crate::error::{TransitError, TransitItemError};

/// One item of a batched encrypt or decrypt request.
///
/// A batch is scoped to a single key path (mount); items within it may target
/// different key names under that path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitItem {
    /// Name of the encryption key within the batch's key path.
    pub key_name: String,
    /// Plaintext (for encrypt) or ciphertext (for decrypt).
    pub payload: String,
}

impl TransitItem {
    /// Construct an item from a key name and payload.
    pub fn new(key_name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            payload: payload.into(),
        }
    }
}

/// Per-item outcomes of a batch call, in request order.
pub type BatchOutcome = Vec<Result<String, TransitItemError>>;

/// Client for a transit-encryption backend.
///
/// # Contract
///
/// - The returned [`BatchOutcome`] has exactly one entry per request item,
///   and entry `i` corresponds to request item `i`. Callers rely on this to
///   re-attach results to the right attribute slots; implementations that
///   cannot guarantee it must fail the batch instead.
/// - A [`TransitError`] means the whole batch failed and nothing was
///   processed. A [`TransitItemError`] inside the outcome affects only that
///   item.
/// - Implementations never log or retain plaintext payloads.
pub trait TransitClient: Send + Sync {
    /// Encrypt every item under `key_path`, one ciphertext per plaintext.
    fn encrypt_batch(
        &self,
        key_path: &str,
        items: &[TransitItem],
    ) -> Result<BatchOutcome, TransitError>;

    /// Decrypt every item under `key_path`, one plaintext per ciphertext.
    fn decrypt_batch(
        &self,
        key_path: &str,
        items: &[TransitItem],
    ) -> Result<BatchOutcome, TransitError>;
}
