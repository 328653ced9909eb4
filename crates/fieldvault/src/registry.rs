//! Process-wide registry of record schemas, keyed by record type.
//!
//! Registration happens once, at record-type definition time. After that the
//! registry is read-only: lookups go through `arc-swap` and never block, so
//! the hot attribute-access path can resolve descriptors from any thread.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::descriptor::{AttributeDescriptor, ConfigError, RecordSchema};

/// Lookup failures — programmer errors, raised immediately to the caller.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// No schema was registered under this record type.
    #[error("record type {0} is not registered")]
    UnknownRecordType(String),

    /// The record type exists but never declared this attribute.
    #[error("attribute {attribute} is not declared on {record_type}")]
    UnknownAttribute {
        /// The record type that was consulted.
        record_type: String,
        /// The undeclared attribute name.
        attribute: String,
    },
}

/// Registry mapping record type names to their frozen [`RecordSchema`].
#[derive(Debug)]
pub struct DescriptorRegistry {
    inner: ArcSwap<HashMap<String, Arc<RecordSchema>>>,
}

impl DescriptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(HashMap::new())),
        }
    }

    /// Register a schema. One-time per record type; expected to run during
    /// startup, before concurrent lookups begin.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateRecordType`] if the record type is
    /// already registered.
    pub fn register(&self, schema: RecordSchema) -> Result<Arc<RecordSchema>, ConfigError> {
        let current = self.inner.load_full();
        if current.contains_key(schema.record_type()) {
            return Err(ConfigError::DuplicateRecordType(
                schema.record_type().to_owned(),
            ));
        }
        let schema = Arc::new(schema);
        let mut next = HashMap::clone(&current);
        next.insert(schema.record_type().to_owned(), Arc::clone(&schema));
        self.inner.store(Arc::new(next));
        Ok(schema)
    }

    /// Look up the schema for `record_type`. Lock-free.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownRecordType`] if unregistered.
    pub fn schema(&self, record_type: &str) -> Result<Arc<RecordSchema>, LookupError> {
        self.inner
            .load()
            .get(record_type)
            .cloned()
            .ok_or_else(|| LookupError::UnknownRecordType(record_type.to_owned()))
    }

    /// Resolve one attribute descriptor. Lock-free.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownRecordType`] or
    /// [`LookupError::UnknownAttribute`] for undeclared names.
    pub fn resolve(
        &self,
        record_type: &str,
        logical_name: &str,
    ) -> Result<Arc<AttributeDescriptor>, LookupError> {
        let schema = self.schema(record_type)?;
        schema
            .attribute(logical_name)
            .cloned()
            .ok_or_else(|| LookupError::UnknownAttribute {
                record_type: record_type.to_owned(),
                attribute: logical_name.to_owned(),
            })
    }

    /// Number of registered record types.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Returns `true` if no record types are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}

impl Default for DescriptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
