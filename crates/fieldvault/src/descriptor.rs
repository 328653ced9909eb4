//! Attribute declaration: per-record-type defaults, per-attribute options,
//! and the immutable descriptors the proxy resolves against.
//!
//! Declaration happens once, at record-type definition time, through
//! [`RecordSchema::builder`]. Every default is resolved into the descriptor
//! at build time — there is no hidden shared default consulted later.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::codec::{CodecPipeline, Serializer, Transform};

/// Declaration-time errors. Fatal when the record type is defined, never at
/// runtime.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The same logical attribute name was declared twice on one record type.
    #[error("attribute {0} is declared twice")]
    DuplicateAttribute(String),

    /// Two attributes resolved to the same physical storage column.
    #[error("storage column {column} is claimed by both {first} and {second}")]
    DuplicateColumn {
        /// The colliding column name.
        column: String,
        /// Attribute that claimed the column first.
        first: String,
        /// Attribute whose declaration collided.
        second: String,
    },

    /// The record type was registered twice.
    #[error("record type {0} is already registered")]
    DuplicateRecordType(String),
}

/// Record-type-level declaration defaults, copied into each descriptor at
/// build time.
#[derive(Debug, Clone)]
pub struct RecordDefaults {
    /// Key path (backend mount) used when an attribute does not override it.
    pub key_path: String,
    /// Whether decryption is deferred until first read.
    pub lazy: bool,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            key_path: "transit".into(),
            lazy: false,
        }
    }
}

/// Per-attribute declaration options. Unset fields fall back to the
/// record-type defaults or to the derived values documented on each method.
#[derive(Debug, Default)]
pub struct AttributeOptions {
    storage_column: Option<String>,
    key_path: Option<String>,
    key_name: Option<String>,
    serializer: Option<Serializer>,
    transform: Option<Transform>,
    lazy: Option<bool>,
    default_value: Option<Value>,
}

impl AttributeOptions {
    /// Options with every field left at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the physical column holding the ciphertext
    /// (default: `<logical_name>_encrypted`).
    pub fn storage_column(mut self, column: impl Into<String>) -> Self {
        self.storage_column = Some(column.into());
        self
    }

    /// Override the key path (default: the record-type default).
    pub fn key_path(mut self, path: impl Into<String>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    /// Override the key name (default: `<record_type_lowercase>_<logical_name>`).
    pub fn key_name(mut self, name: impl Into<String>) -> Self {
        self.key_name = Some(name.into());
        self
    }

    /// Select a serializer (default: [`Serializer::Identity`]).
    pub fn serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Attach an encode/decode transform pair.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Override the record-type lazy default for this attribute.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    /// Declared default returned when the attribute has no stored value.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Immutable descriptor of one declared vault attribute.
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    /// Identifier exposed to application code.
    pub logical_name: String,
    /// Physical column holding the ciphertext.
    pub storage_column: String,
    /// Backend mount the encryption key lives under.
    pub key_path: String,
    /// Name of the encryption key within that path.
    pub key_name: String,
    /// Composed serializer + transform pipeline.
    pub codec: CodecPipeline,
    /// Whether decryption is deferred until first read.
    pub lazy: bool,
    /// Value returned for an `Empty` slot; `None` means null.
    pub default_value: Option<Value>,
}

/// The full set of vault attributes declared on one record type.
///
/// Immutable after [`SchemaBuilder::build`]; safe for unsynchronized
/// concurrent reads from many record instances.
#[derive(Debug)]
pub struct RecordSchema {
    record_type: String,
    attributes: BTreeMap<String, Arc<AttributeDescriptor>>,
}

impl RecordSchema {
    /// Start declaring attributes for `record_type` with the given defaults.
    pub fn builder(record_type: impl Into<String>, defaults: RecordDefaults) -> SchemaBuilder {
        SchemaBuilder {
            record_type: record_type.into(),
            defaults,
            attributes: BTreeMap::new(),
        }
    }

    /// Name of the record type this schema describes.
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Look up a descriptor by logical attribute name.
    pub fn attribute(&self, logical_name: &str) -> Option<&Arc<AttributeDescriptor>> {
        self.attributes.get(logical_name)
    }

    /// Iterate over every declared descriptor, in logical-name order.
    pub fn attributes(&self) -> impl Iterator<Item = &Arc<AttributeDescriptor>> {
        self.attributes.values()
    }

    /// Number of declared attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if no attributes are declared.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Builder collecting attribute declarations for one record type.
#[derive(Debug)]
pub struct SchemaBuilder {
    record_type: String,
    defaults: RecordDefaults,
    attributes: BTreeMap<String, Arc<AttributeDescriptor>>,
}

impl SchemaBuilder {
    /// Declare one attribute, resolving `options` against the record-type
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateAttribute`] if `logical_name` was
    /// already declared, or [`ConfigError::DuplicateColumn`] if the resolved
    /// storage column collides with a previous declaration.
    pub fn attribute(
        mut self,
        logical_name: impl Into<String>,
        options: AttributeOptions,
    ) -> Result<Self, ConfigError> {
        let logical_name = logical_name.into();
        if self.attributes.contains_key(&logical_name) {
            return Err(ConfigError::DuplicateAttribute(logical_name));
        }

        let storage_column = options
            .storage_column
            .unwrap_or_else(|| format!("{logical_name}_encrypted"));
        if let Some(existing) = self
            .attributes
            .values()
            .find(|d| d.storage_column == storage_column)
        {
            return Err(ConfigError::DuplicateColumn {
                column: storage_column,
                first: existing.logical_name.clone(),
                second: logical_name,
            });
        }

        let descriptor = AttributeDescriptor {
            storage_column,
            key_path: options
                .key_path
                .unwrap_or_else(|| self.defaults.key_path.clone()),
            key_name: options.key_name.unwrap_or_else(|| {
                format!("{}_{logical_name}", self.record_type.to_lowercase())
            }),
            codec: CodecPipeline::new(
                options.serializer.unwrap_or(Serializer::Identity),
                options.transform,
            ),
            lazy: options.lazy.unwrap_or(self.defaults.lazy),
            default_value: options.default_value,
            logical_name: logical_name.clone(),
        };

        self.attributes.insert(logical_name, Arc::new(descriptor));
        Ok(self)
    }

    /// Finish the declaration and freeze the schema.
    pub fn build(self) -> RecordSchema {
        RecordSchema {
            record_type: self.record_type,
            attributes: self.attributes,
        }
    }
}
