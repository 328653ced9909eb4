//! The attribute proxy: per-record-instance state machine mediating every
//! read and write of declared vault attributes.
//!
//! One proxy backs all attributes of one record instance. It caches decrypted
//! plaintext for the instance's lifetime, defers decryption until first read
//! for lazy attributes, and batches transit calls so a record with N pending
//! attributes issues one decrypt round-trip per distinct key path rather
//! than N.
//!
//! The proxy is scoped to a single owner; it is not meant for unsynchronized
//! concurrent mutation, matching ordinary ORM object semantics. All transit
//! calls block the caller — there is no background decryption.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use common::{TransitClient, TransitError, TransitItem, TransitItemError};

use crate::codec::CodecError;
use crate::descriptor::{AttributeDescriptor, RecordSchema};
use crate::registry::LookupError;
use crate::slot::AttrState;

/// Runtime errors raised by attribute access, resolution, and persistence.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No schema is registered under this record type.
    #[error("record type {0} is not registered")]
    UnknownRecordType(String),

    /// The attribute was never declared on this record type.
    #[error("attribute {attribute} is not declared on {record_type}")]
    UnknownAttribute {
        /// The record type that was consulted.
        record_type: String,
        /// The undeclared attribute name.
        attribute: String,
    },

    /// Encoding or decoding through the attribute's codec pipeline failed.
    #[error("codec failure on attribute {attribute}")]
    Codec {
        /// The attribute whose codec failed.
        attribute: String,
        /// The underlying codec error.
        #[source]
        source: CodecError,
    },

    /// The backend reported a per-item failure decrypting this attribute.
    #[error("decryption failed for attribute {attribute}")]
    Decryption {
        /// The attribute whose ciphertext failed to decrypt.
        attribute: String,
        /// The backend's per-item error.
        #[source]
        source: TransitItemError,
    },

    /// The backend reported a per-item failure encrypting this attribute.
    #[error("encryption failed for attribute {attribute}")]
    Encryption {
        /// The attribute whose plaintext failed to encrypt.
        attribute: String,
        /// The backend's per-item error.
        #[source]
        source: TransitItemError,
    },

    /// A transport-level failure aborted the whole in-flight batch.
    #[error("transit backend unavailable")]
    BackendUnavailable(#[from] TransitError),
}

impl From<LookupError> for ProxyError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::UnknownRecordType(t) => ProxyError::UnknownRecordType(t),
            LookupError::UnknownAttribute {
                record_type,
                attribute,
            } => ProxyError::UnknownAttribute {
                record_type,
                attribute,
            },
        }
    }
}

/// Outcome of one resolution pass over pending slots.
#[derive(Debug, Default)]
pub struct ResolveOutcome {
    /// Attributes that transitioned to `Clean`.
    pub resolved: Vec<String>,
    /// Attributes whose item failed. Their slots stay `CiphertextOnly`; the
    /// recorded error is raised again at the point of access.
    pub failed: BTreeMap<String, ProxyError>,
}

/// Per-record-instance proxy over all declared vault attributes.
pub struct AttributeProxy {
    schema: Arc<RecordSchema>,
    transit: Arc<dyn TransitClient>,
    slots: BTreeMap<String, AttrState>,
}

impl AttributeProxy {
    /// Proxy for a fresh record: every slot starts `Empty`.
    pub fn new(schema: Arc<RecordSchema>, transit: Arc<dyn TransitClient>) -> Self {
        let slots = schema
            .attributes()
            .map(|d| (d.logical_name.clone(), AttrState::Empty))
            .collect();
        Self {
            schema,
            transit,
            slots,
        }
    }

    /// The schema this proxy resolves against.
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Current slot state of one attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::UnknownAttribute`] for undeclared names.
    pub fn state(&self, name: &str) -> Result<&AttrState, ProxyError> {
        self.slots.get(name).ok_or_else(|| self.unknown(name))
    }

    /// Returns `true` if any slot holds plaintext pending encryption.
    pub fn has_pending_changes(&self) -> bool {
        self.slots.values().any(AttrState::is_dirty)
    }

    /// Read the plaintext value of `name`.
    ///
    /// `Clean` and `Dirty` slots return the cached plaintext with no transit
    /// call. `Empty` returns the declared default (or null). A pending slot
    /// triggers resolution of *every* pending slot on this record in the same
    /// batched pass; if this attribute's item failed, the failure is raised
    /// here, at the point of access.
    pub fn get(&mut self, name: &str) -> Result<Value, ProxyError> {
        let descriptor = self.descriptor(name)?;
        match self.slots.get(name) {
            Some(AttrState::Clean(v)) | Some(AttrState::Dirty(v)) => return Ok(v.clone()),
            Some(AttrState::Empty) => {
                return Ok(descriptor.default_value.clone().unwrap_or(Value::Null))
            }
            Some(AttrState::CiphertextOnly(_)) => {}
            None => return Err(self.unknown(name)),
        }

        let pending = self.pending_names();
        let mut outcome = self.resolve_names(&pending)?;
        if let Some(err) = outcome.failed.remove(name) {
            return Err(err);
        }
        match self.slots.get(name) {
            Some(AttrState::Clean(v)) => Ok(v.clone()),
            // The backend returned success for this item but the slot did not
            // land in `Clean` — a violated response contract.
            _ => Err(ProxyError::BackendUnavailable(
                TransitError::MalformedResponse(format!(
                    "attribute {name} missing from decrypt response"
                )),
            )),
        }
    }

    /// Write a plaintext value, marking the slot `Dirty`.
    ///
    /// Overwrites any prior state, including cached ciphertext. No storage or
    /// transit interaction happens until [`flush`](Self::flush).
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), ProxyError> {
        self.descriptor(name)?;
        self.slots.insert(name.to_owned(), AttrState::Dirty(value));
        Ok(())
    }

    /// Decrypt the named attributes that are currently pending.
    ///
    /// Pending slots are grouped by key path — one decrypt call per distinct
    /// path, each item carrying its own key name. Per-item failures are
    /// isolated: the failed slot stays pending and is reported in the
    /// outcome while its siblings resolve.
    ///
    /// # Errors
    ///
    /// [`ProxyError::UnknownAttribute`] for undeclared names;
    /// [`ProxyError::BackendUnavailable`] if a batch call fails outright, in
    /// which case that batch's slots are left unchanged and retryable.
    pub fn resolve(&mut self, names: &[&str]) -> Result<ResolveOutcome, ProxyError> {
        let mut pending = Vec::new();
        for name in names {
            self.descriptor(name)?;
            if matches!(self.slots.get(*name), Some(AttrState::CiphertextOnly(_))) {
                pending.push((*name).to_owned());
            }
        }
        self.resolve_names(&pending)
    }

    /// Encrypt every dirty slot and return the `storage column → ciphertext`
    /// map the persistence layer must write.
    ///
    /// All-or-nothing: slots are only transitioned to `Clean` after every
    /// encode and encrypt call has succeeded. Any failure returns an error
    /// with no partial map and no state change, so a physical write can never
    /// happen with a half-encrypted record. Dirty nulls map to `None` without
    /// a transit call. With no dirty slots this returns an empty map and
    /// performs no transit call.
    pub fn flush(&mut self) -> Result<BTreeMap<String, Option<String>>, ProxyError> {
        let mut columns: BTreeMap<String, Option<String>> = BTreeMap::new();
        let mut nulls: Vec<String> = Vec::new();
        let mut groups: BTreeMap<String, Vec<FlushEntry>> = BTreeMap::new();

        for descriptor in self.schema.attributes() {
            let name = descriptor.logical_name.as_str();
            let Some(AttrState::Dirty(value)) = self.slots.get(name) else {
                continue;
            };
            let wire = descriptor
                .codec
                .encode(value)
                .map_err(|source| ProxyError::Codec {
                    attribute: name.to_owned(),
                    source,
                })?;
            match wire {
                None => {
                    columns.insert(descriptor.storage_column.clone(), None);
                    nulls.push(name.to_owned());
                }
                Some(plaintext) => {
                    groups
                        .entry(descriptor.key_path.clone())
                        .or_default()
                        .push(FlushEntry {
                            name: name.to_owned(),
                            descriptor: Arc::clone(descriptor),
                            item: TransitItem::new(descriptor.key_name.clone(), plaintext),
                        });
                }
            }
        }

        let mut encrypted: Vec<(String, String, String)> = Vec::new();
        for (key_path, entries) in &groups {
            let items: Vec<TransitItem> = entries.iter().map(|e| e.item.clone()).collect();
            debug!(
                record_type = self.schema.record_type(),
                key_path, count = items.len(), "encrypting attribute batch"
            );
            let results = self.transit.encrypt_batch(key_path, &items)?;
            if results.len() != items.len() {
                return Err(length_mismatch(items.len(), results.len()).into());
            }
            for (entry, result) in entries.iter().zip(results) {
                match result {
                    Ok(ciphertext) => encrypted.push((
                        entry.name.clone(),
                        entry.descriptor.storage_column.clone(),
                        ciphertext,
                    )),
                    Err(source) => {
                        warn!(attribute = entry.name, "encrypt failed; aborting flush");
                        return Err(ProxyError::Encryption {
                            attribute: entry.name.clone(),
                            source,
                        });
                    }
                }
            }
        }

        // Commit point: every encrypt call succeeded.
        for name in nulls {
            self.slots.insert(name, AttrState::Clean(Value::Null));
        }
        for (name, column, ciphertext) in encrypted {
            columns.insert(column, Some(ciphertext));
            if let Some(AttrState::Dirty(value)) = self.slots.remove(&name) {
                self.slots.insert(name, AttrState::Clean(value));
            }
        }
        Ok(columns)
    }

    /// Reset every slot from raw storage columns.
    ///
    /// Present ciphertext becomes `CiphertextOnly`; absent or null columns
    /// become `Empty`. Attributes declared non-lazy are then resolved in one
    /// combined pass (still one decrypt call per key path). Per-item eager
    /// failures leave the slot pending and raise at the point of access;
    /// batch-level failures propagate from here.
    pub fn load_from_storage(
        &mut self,
        columns: &BTreeMap<String, Option<String>>,
    ) -> Result<(), ProxyError> {
        let mut eager: Vec<String> = Vec::new();
        for descriptor in self.schema.attributes() {
            let name = descriptor.logical_name.clone();
            let state = match columns.get(&descriptor.storage_column) {
                Some(Some(ciphertext)) => {
                    if !descriptor.lazy {
                        eager.push(name.clone());
                    }
                    AttrState::CiphertextOnly(ciphertext.clone())
                }
                _ => AttrState::Empty,
            };
            self.slots.insert(name, state);
        }

        if eager.is_empty() {
            return Ok(());
        }
        let outcome = self.resolve_names(&eager)?;
        if !outcome.failed.is_empty() {
            warn!(
                record_type = self.schema.record_type(),
                count = outcome.failed.len(),
                "eager load left attributes pending after per-item failures"
            );
        }
        Ok(())
    }

    /// Names of all slots currently awaiting decryption.
    fn pending_names(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|(_, state)| state.is_pending())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Decrypt the given pending slots, grouped by key path.
    ///
    /// `names` must be declared; non-pending names are skipped.
    fn resolve_names(&mut self, names: &[String]) -> Result<ResolveOutcome, ProxyError> {
        let mut outcome = ResolveOutcome::default();
        let mut groups: BTreeMap<String, Vec<ResolveEntry>> = BTreeMap::new();
        for name in names {
            let Some(descriptor) = self.schema.attribute(name) else {
                continue;
            };
            if let Some(AttrState::CiphertextOnly(ciphertext)) = self.slots.get(name.as_str()) {
                groups
                    .entry(descriptor.key_path.clone())
                    .or_default()
                    .push(ResolveEntry {
                        name: name.clone(),
                        descriptor: Arc::clone(descriptor),
                        item: TransitItem::new(descriptor.key_name.clone(), ciphertext.clone()),
                    });
            }
        }

        for (key_path, entries) in groups {
            let items: Vec<TransitItem> = entries.iter().map(|e| e.item.clone()).collect();
            debug!(
                record_type = self.schema.record_type(),
                key_path, count = items.len(), "decrypting attribute batch"
            );
            let results = self.transit.decrypt_batch(&key_path, &items)?;
            if results.len() != items.len() {
                return Err(length_mismatch(items.len(), results.len()).into());
            }
            for (entry, result) in entries.into_iter().zip(results) {
                match result {
                    Ok(wire) => match entry.descriptor.codec.decode(Some(&wire)) {
                        Ok(value) => {
                            self.slots.insert(entry.name.clone(), AttrState::Clean(value));
                            outcome.resolved.push(entry.name);
                        }
                        Err(source) => {
                            warn!(attribute = entry.name, "codec decode failed; slot stays pending");
                            outcome.failed.insert(
                                entry.name.clone(),
                                ProxyError::Codec {
                                    attribute: entry.name,
                                    source,
                                },
                            );
                        }
                    },
                    Err(source) => {
                        warn!(attribute = entry.name, error = %source, "decrypt failed; slot stays pending");
                        outcome.failed.insert(
                            entry.name.clone(),
                            ProxyError::Decryption {
                                attribute: entry.name,
                                source,
                            },
                        );
                    }
                }
            }
        }
        Ok(outcome)
    }

    fn descriptor(&self, name: &str) -> Result<Arc<AttributeDescriptor>, ProxyError> {
        self.schema
            .attribute(name)
            .cloned()
            .ok_or_else(|| self.unknown(name))
    }

    fn unknown(&self, name: &str) -> ProxyError {
        ProxyError::UnknownAttribute {
            record_type: self.schema.record_type().to_owned(),
            attribute: name.to_owned(),
        }
    }
}

impl std::fmt::Debug for AttributeProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Slot states may hold plaintext; show only the shape.
        f.debug_struct("AttributeProxy")
            .field("record_type", &self.schema.record_type())
            .field("attributes", &self.slots.len())
            .finish()
    }
}

struct ResolveEntry {
    name: String,
    descriptor: Arc<AttributeDescriptor>,
    item: TransitItem,
}

struct FlushEntry {
    name: String,
    descriptor: Arc<AttributeDescriptor>,
    item: TransitItem,
}

fn length_mismatch(expected: usize, got: usize) -> TransitError {
    TransitError::MalformedResponse(format!("expected {expected} batch results, got {got}"))
}
