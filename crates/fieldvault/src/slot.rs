//! Runtime state of one vault attribute on one record instance.

use serde_json::Value;

/// The four-state slot machine behind every declared attribute.
///
/// ```text
///           load (lazy)                first read, batched decrypt
/// Empty ──────────────▶ CiphertextOnly ───────────────────────────▶ Clean
///   ▲                        │  ▲                                    │
///   │ reload/discard         │  │ per-item decrypt failure           │
///   │                        ▼  │ (slot unchanged, retryable)        │
///   └──────────── set(value) ───┴──────▶ Dirty ◀─────── set(value) ──┘
///                                          │
///                                          │ flush, batched encrypt
///                                          ▼
///                                        Clean
/// ```
///
/// A slot never holds stale ciphertext next to a different plaintext:
/// ciphertext is cached only in `CiphertextOnly`, before first decode, and
/// every write discards it.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrState {
    /// No value loaded; reads return the declared default (or null).
    Empty,
    /// Ciphertext loaded from storage, not yet decrypted.
    CiphertextOnly(String),
    /// Plaintext matching what storage holds (or will hold at next persist).
    Clean(Value),
    /// Plaintext set by the application, not yet encrypted.
    Dirty(Value),
}

impl AttrState {
    /// Returns `true` if the slot awaits decryption.
    pub fn is_pending(&self) -> bool {
        matches!(self, AttrState::CiphertextOnly(_))
    }

    /// Returns `true` if the slot holds plaintext pending encryption.
    pub fn is_dirty(&self) -> bool {
        matches!(self, AttrState::Dirty(_))
    }

    /// The cached ciphertext, if the slot is pending.
    pub fn ciphertext(&self) -> Option<&str> {
        match self {
            AttrState::CiphertextOnly(ct) => Some(ct),
            _ => None,
        }
    }

    /// The in-memory plaintext, if decrypted or written.
    pub fn plaintext(&self) -> Option<&Value> {
        match self {
            AttrState::Clean(v) | AttrState::Dirty(v) => Some(v),
            _ => None,
        }
    }
}
