//! Transparent field-level encryption for persisted records.
//!
//! Application code reads and writes plain attribute values; the underlying
//! storage only ever holds ciphertext. Encryption and decryption are delegated
//! to a transit-encryption backend behind the [`common::TransitClient`] trait.
//!
//! # Components
//!
//! - [`codec`] — serializer + transform pipeline between typed values and the
//!   wire string handed to the backend.
//! - [`descriptor`] / [`registry`] — per-record-type declaration of vault
//!   attributes: storage column, key path, key name, codec, laziness.
//! - [`slot`] / [`proxy`] — the per-record-instance state machine that caches
//!   decrypted plaintext, defers decryption until first read, and batches
//!   transit calls per key path.
//! - [`bridge`] — the boundary the persistence framework adapts to.
//!
//! # Lifecycle
//!
//! ```text
//! load:  storage columns ──▶ CiphertextOnly ──(first read, batched)──▶ Clean
//! write: set(name, value) ──▶ Dirty ──(flush, batched)──▶ Clean + ciphertext map
//! ```
//!
//! Decrypted values never outlive the owning record instance; there is no
//! process-wide plaintext cache.

pub mod bridge;
pub mod codec;
pub mod descriptor;
pub mod proxy;
pub mod registry;
pub mod slot;

pub use bridge::{AttributeAccess, VaultRecord};
pub use codec::{CodecError, CodecPipeline, Serializer, Transform, ValueSerializer};
pub use descriptor::{
    AttributeDescriptor, AttributeOptions, ConfigError, RecordDefaults, RecordSchema,
};
pub use proxy::{AttributeProxy, ProxyError, ResolveOutcome};
pub use registry::{DescriptorRegistry, LookupError};
pub use slot::AttrState;
