//! Error types for the transit-encryption boundary.

use thiserror::Error;

/// Transport-level failure of a batched transit call.
///
/// Any of these aborts the whole in-flight batch: no item in the request was
/// processed, and callers may retry the entire batch later. Retry and timeout
/// policy belongs to the [`TransitClient`](crate::TransitClient)
/// implementation, never to its callers.
#[derive(Debug, Clone, Error)]
pub enum TransitError {
    /// The transit backend could not be reached.
    #[error("transit backend unreachable: {0}")]
    Unreachable(String),

    /// The backend rejected the caller's credentials.
    #[error("transit backend rejected credentials: {0}")]
    Unauthorized(String),

    /// The backend has no key mount at the requested path.
    #[error("unknown key path: {0}")]
    UnknownKeyPath(String),

    /// The backend returned a response it should not have — wrong item count
    /// or an unparseable body.
    #[error("malformed transit response: {0}")]
    MalformedResponse(String),
}

/// Per-item failure inside an otherwise-successful batch response.
///
/// Item `i` of the response corresponds to item `i` of the request; a failed
/// item does not affect its siblings.
#[derive(Debug, Clone, Error)]
pub enum TransitItemError {
    /// The ciphertext does not match the backend's wire format.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    /// Authentication of the ciphertext failed — wrong key or tampered data.
    #[error("ciphertext failed authentication under key {key_name}")]
    AuthenticationFailed {
        /// Name of the key the item was submitted under.
        key_name: String,
    },

    /// The backend has no key with the requested name under this path.
    #[error("unknown key: {0}")]
    UnknownKey(String),
}
