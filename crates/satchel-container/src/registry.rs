//! Explicit registry of model types known to a container.
//!
//! Every model type a container touches is registered under its
//! [`TypeKey`]. The registry is what turns a key back into a type: it
//! rejects two Rust types claiming the same key, and it can construct a
//! default instance for a key without the caller naming the type.

use std::any::{type_name, TypeId};
use std::collections::BTreeMap;

use satchel_types::{SessionModel, TypeKey};

use crate::entry::ErasedModel;
use crate::error::{ContainerError, ContainerResult};

fn construct<M: SessionModel>() -> Box<dyn ErasedModel> {
    Box::new(M::default())
}

/// What the registry knows about one model type.
#[derive(Clone)]
pub struct ModelDescriptor {
    key: TypeKey,
    type_id: TypeId,
    type_name: &'static str,
    construct: fn() -> Box<dyn ErasedModel>,
}

impl ModelDescriptor {
    fn of<M: SessionModel>(key: TypeKey) -> Self {
        Self {
            key,
            type_id: TypeId::of::<M>(),
            type_name: type_name::<M>(),
            construct: construct::<M>,
        }
    }

    /// The key the model is cached and stored under.
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// Rust type name of the model, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if this descriptor was registered for `M`.
    pub fn is<M: SessionModel>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    pub(crate) fn construct(&self) -> Box<dyn ErasedModel> {
        (self.construct)()
    }
}

impl std::fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Key-to-type registry.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<TypeKey, ModelDescriptor>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `M` and return its key.
    ///
    /// Registering the same type again is a no-op. Fails if the model's name
    /// is not a valid key or is already taken by a different type.
    pub fn register<M: SessionModel>(&mut self) -> ContainerResult<TypeKey> {
        let key = M::key()?;
        match self.models.get(&key) {
            Some(existing) if existing.is::<M>() => Ok(key),
            Some(existing) => Err(ContainerError::TypeResolution {
                key: key.to_string(),
                reason: format!(
                    "key is already registered by {}, cannot register {}",
                    existing.type_name,
                    type_name::<M>()
                ),
            }),
            None => {
                self.models
                    .insert(key.clone(), ModelDescriptor::of::<M>(key.clone()));
                Ok(key)
            }
        }
    }

    /// Look up the descriptor registered under `key`.
    pub fn get(&self, key: &TypeKey) -> Option<&ModelDescriptor> {
        self.models.get(key)
    }

    /// Returns `true` if a type is registered under `key`.
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.models.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<TypeKey> {
        self.models.keys().cloned().collect()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub(crate) fn forget(&mut self, key: &TypeKey) {
        self.models.remove(key);
    }
}
