//! Boundary with the persistence framework.
//!
//! The ORM adapter interacts with this crate through two pieces:
//!
//! - [`AttributeAccess`] — the capability interface attribute reads and
//!   writes are forwarded through, so declared vault attributes behave like
//!   ordinary typed fields without the proxy knowing anything about the
//!   persistence framework.
//! - [`VaultRecord`] — a thin adapter owning the proxy for one record
//!   instance and exposing the load/save lifecycle hooks: feed it the raw
//!   encrypted columns on load, and persist exactly the column map
//!   [`VaultRecord::save`] returns.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use common::TransitClient;

use crate::descriptor::RecordSchema;
use crate::proxy::{AttributeProxy, ProxyError};

/// Capability interface for transparent attribute access.
pub trait AttributeAccess {
    /// Read the plaintext value of a declared attribute.
    fn get(&mut self, name: &str) -> Result<Value, ProxyError>;

    /// Write the plaintext value of a declared attribute.
    fn set(&mut self, name: &str, value: Value) -> Result<(), ProxyError>;
}

impl AttributeAccess for AttributeProxy {
    fn get(&mut self, name: &str) -> Result<Value, ProxyError> {
        AttributeProxy::get(self, name)
    }

    fn set(&mut self, name: &str, value: Value) -> Result<(), ProxyError> {
        AttributeProxy::set(self, name, value)
    }
}

/// One record instance's vault attributes, as seen by the persistence layer.
#[derive(Debug)]
pub struct VaultRecord {
    proxy: AttributeProxy,
}

impl VaultRecord {
    /// A fresh, unpersisted record: every attribute starts unset.
    pub fn new(schema: Arc<RecordSchema>, transit: Arc<dyn TransitClient>) -> Self {
        Self {
            proxy: AttributeProxy::new(schema, transit),
        }
    }

    /// Materialize a record from the raw encrypted columns read by the ORM.
    ///
    /// Non-lazy attributes are decrypted immediately, in one batched pass.
    ///
    /// # Errors
    ///
    /// Propagates batch-level transit failures from eager resolution.
    pub fn from_storage(
        schema: Arc<RecordSchema>,
        transit: Arc<dyn TransitClient>,
        columns: &BTreeMap<String, Option<String>>,
    ) -> Result<Self, ProxyError> {
        let mut proxy = AttributeProxy::new(schema, transit);
        proxy.load_from_storage(columns)?;
        Ok(Self { proxy })
    }

    /// Encrypt pending writes and return the columns to persist.
    ///
    /// The ORM must call this immediately before the physical write and
    /// persist the returned map verbatim — those columns are the only place
    /// the new ciphertext exists.
    pub fn save(&mut self) -> Result<BTreeMap<String, Option<String>>, ProxyError> {
        self.proxy.flush()
    }

    /// Discard in-memory state and re-load from storage columns.
    pub fn reload(
        &mut self,
        columns: &BTreeMap<String, Option<String>>,
    ) -> Result<(), ProxyError> {
        self.proxy.load_from_storage(columns)
    }

    /// Returns `true` if any attribute has an unpersisted write.
    pub fn changed(&self) -> bool {
        self.proxy.has_pending_changes()
    }

    /// The underlying proxy, for slot-state introspection.
    pub fn proxy(&self) -> &AttributeProxy {
        &self.proxy
    }

    /// Mutable access to the underlying proxy.
    pub fn proxy_mut(&mut self) -> &mut AttributeProxy {
        &mut self.proxy
    }
}

impl AttributeAccess for VaultRecord {
    fn get(&mut self, name: &str) -> Result<Value, ProxyError> {
        self.proxy.get(name)
    }

    fn set(&mut self, name: &str, value: Value) -> Result<(), ProxyError> {
        self.proxy.set(name, value)
    }
}
