//! Process-wide session table.
//!
//! [`NativeSessionStore`] is the default backend a container uses when it is
//! given only a namespace. Every store handle in the process shares one table
//! of root namespaces, each mapping type keys to serialized models, so state
//! committed by one container is visible to the next container opened under
//! the same namespace for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use satchel_types::TypeKey;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::namespace::validate_namespace;
use crate::payload::StoredModel;
use crate::traits::ModelStore;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "SessionContainer";

type Namespaces = HashMap<String, HashMap<TypeKey, StoredModel>>;

fn table() -> &'static RwLock<Namespaces> {
    static TABLE: OnceLock<RwLock<Namespaces>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}

/// Handle onto one namespace of the process-wide session table.
#[derive(Clone, Debug)]
pub struct NativeSessionStore {
    namespace: String,
}

impl NativeSessionStore {
    /// Open a handle scoped to `namespace`.
    pub fn new(namespace: impl Into<String>) -> StoreResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self { namespace })
    }

    /// The root namespace this handle reads and writes.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Sorted keys persisted under this namespace.
    pub fn keys(&self) -> StoreResult<Vec<TypeKey>> {
        let table = table().read().map_err(poisoned)?;
        let mut keys: Vec<TypeKey> = table
            .get(&self.namespace)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    /// Sorted list of namespaces that currently hold state.
    pub fn namespaces() -> StoreResult<Vec<String>> {
        let table = table().read().map_err(poisoned)?;
        let mut names: Vec<String> = table.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl Default for NativeSessionStore {
    /// A handle onto [`DEFAULT_NAMESPACE`].
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl ModelStore for NativeSessionStore {
    fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredModel>> {
        let table = table().read().map_err(poisoned)?;
        Ok(table
            .get(&self.namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn set(&self, key: &TypeKey, value: Option<StoredModel>) -> StoreResult<()> {
        let mut table = table().write().map_err(poisoned)?;
        match value {
            Some(model) => {
                table
                    .entry(self.namespace.clone())
                    .or_default()
                    .insert(key.clone(), model);
            }
            None => {
                if let Some(entries) = table.get_mut(&self.namespace) {
                    entries.remove(key);
                    if entries.is_empty() {
                        table.remove(&self.namespace);
                    }
                }
            }
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut table = table().write().map_err(poisoned)?;
        let removed = table.remove(&self.namespace).map(|e| e.len()).unwrap_or(0);
        debug!(namespace = %self.namespace, removed, "native session namespace cleared");
        Ok(())
    }
}
