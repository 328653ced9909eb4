//! Deterministic, in-process transit-encryption backend.
//!
//! Implements [`common::TransitClient`] without any network: every
//! `(key_path, key_name)` pair maps to an AES-256 data key derived from a
//! single master key via HMAC-SHA256, so ciphertext produced under one key
//! never decrypts under another. Used for development and tests; a remote
//! key-management client slots in behind the same trait.
//!
//! # Ciphertext format
//!
//! ```text
//! vault:v1:<base64(nonce || ciphertext+tag)>
//! ```
//!
//! The `vault:v1:` prefix enables future algorithm or key-version migration
//! without breaking existing ciphertext.

pub mod cipher;
pub mod client;
pub mod config;

pub use client::LocalTransit;
pub use config::LocalTransitConfig;
