//! The session container: a typed, lazily-populated cache in front of a
//! [`ModelStore`].
//!
//! Each model type is in one of three states (see [`EntryState`]). The
//! first access to a type reads it from the store; every later access is
//! served from the cache, including accesses after the type was removed.
//! Nothing reaches the store until [`SessionContainer::commit`].

use std::collections::BTreeMap;

use satchel_store::{Codec, ModelStore, NativeSessionStore};
use satchel_types::{SessionModel, TypeKey};
use tracing::{debug, info};

use crate::config::ContainerConfig;
use crate::defaults::Defaults;
use crate::entry::{EntryState, ErasedModel, Slot};
use crate::error::{ContainerError, ContainerResult};
use crate::handler::Handler;
use crate::registry::ModelRegistry;

/// Per-session cache of model instances with flush-on-commit persistence.
///
/// The container holds at most one instance per model type. It is meant to
/// be owned by a single request for its whole lifetime and provides no
/// internal synchronization.
pub struct SessionContainer {
    store: Box<dyn ModelStore>,
    config: ContainerConfig,
    cache: BTreeMap<TypeKey, Slot>,
    registry: ModelRegistry,
}

impl SessionContainer {
    /// Create a container over an injected store, with default settings.
    pub fn new(store: impl ModelStore + 'static) -> Self {
        Self::with_store(store, ContainerConfig::default())
    }

    /// Create a container over an injected store.
    ///
    /// The configured backend is ignored and the store is used as given: the
    /// configured namespace is only reported by [`namespace`](Self::namespace)
    /// and in log fields, it does not scope the store. The codec applies.
    pub fn with_store(store: impl ModelStore + 'static, config: ContainerConfig) -> Self {
        Self {
            store: Box::new(store),
            config,
            cache: BTreeMap::new(),
            registry: ModelRegistry::new(),
        }
    }

    /// Create a container over the process-wide session table, scoped to
    /// `namespace`.
    pub fn with_namespace(namespace: impl Into<String>) -> ContainerResult<Self> {
        Self::from_config(ContainerConfig::with_namespace(namespace))
    }

    /// Create a container whose store is built from `config`.
    pub fn from_config(config: ContainerConfig) -> ContainerResult<Self> {
        let store = config.build_store()?;
        Ok(Self {
            store,
            config,
            cache: BTreeMap::new(),
            registry: ModelRegistry::new(),
        })
    }

    /// The namespace this container was configured with.
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// The codec used on commit.
    pub fn codec(&self) -> Codec {
        self.config.codec
    }

    /// The underlying store.
    pub fn store(&self) -> &dyn ModelStore {
        self.store.as_ref()
    }

    // ---------------------------------------------------------------
    // Registry
    // ---------------------------------------------------------------

    /// Register a model type without touching the cache.
    ///
    /// `update`, `get` and `remove` register their types implicitly; explicit
    /// registration is needed only for [`create_by_key`](Self::create_by_key).
    pub fn register<M: SessionModel>(&mut self) -> ContainerResult<TypeKey> {
        self.registry.register::<M>()
    }

    /// The model registry.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Registered keys in sorted order.
    pub fn registered_keys(&self) -> Vec<TypeKey> {
        self.registry.keys()
    }

    // ---------------------------------------------------------------
    // Access
    // ---------------------------------------------------------------

    /// Run `handler` with one live instance of each model type it declares.
    ///
    /// Each parameter is resolved in declaration order: the cached or stored
    /// instance if there is one, otherwise a newly created default instance
    /// that joins the cache. Returns whatever the handler returns.
    ///
    /// ```
    /// use satchel_container::SessionContainer;
    /// use satchel_store::InMemoryModelStore;
    /// use satchel_types::SessionModel;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Default, Serialize, Deserialize)]
    /// struct Visits {
    ///     count: u32,
    /// }
    ///
    /// impl SessionModel for Visits {
    ///     const NAME: &'static str = "visits";
    /// }
    ///
    /// let mut session = SessionContainer::new(InMemoryModelStore::new());
    /// session.update(|v: &mut Visits| v.count += 1).unwrap();
    /// let count = session.update(|v: &mut Visits| v.count).unwrap();
    /// assert_eq!(count, 1);
    /// ```
    pub fn update<Args, R, H>(&mut self, handler: H) -> ContainerResult<R>
    where
        H: Handler<Args, R>,
    {
        handler.call(self, &Defaults::new())
    }

    /// Like [`update`](Self::update), but a parameter whose type is neither
    /// cached nor stored receives its declared default from `defaults`
    /// instead of a created instance. The default never enters the cache.
    pub fn update_with<Args, R, H>(&mut self, defaults: &Defaults, handler: H) -> ContainerResult<R>
    where
        H: Handler<Args, R>,
    {
        handler.call(self, defaults)
    }

    /// The live instance of `M`, reading the store on first access.
    ///
    /// Returns `None` when the type is tombstoned or the store has nothing
    /// for it. Either way the type is cached afterwards and the store is not
    /// consulted for it again.
    pub fn fetch<M: SessionModel>(&mut self) -> ContainerResult<Option<&mut M>> {
        let key = self.registry.register::<M>()?;
        self.load::<M>(&key)?;
        match self.cache.get_mut(&key) {
            Some(Slot::Present(model)) => downcast_mut::<M>(model.as_mut(), &key).map(Some),
            _ => Ok(None),
        }
    }

    /// Read access to the live instance of `M`, if there is one.
    ///
    /// Loads from the store on first access, like `update`, but never
    /// creates an instance.
    pub fn get<M: SessionModel>(&mut self) -> ContainerResult<Option<&M>> {
        Ok(self.fetch::<M>()?.map(|model| &*model))
    }

    /// Observable state of the entry for `key`.
    pub fn state(&self, key: &TypeKey) -> EntryState {
        self.cache
            .get(key)
            .map(Slot::state)
            .unwrap_or(EntryState::Unloaded)
    }

    /// Keys touched so far, in sorted order.
    pub fn touched_keys(&self) -> Vec<TypeKey> {
        self.cache.keys().cloned().collect()
    }

    /// Number of touched types, present or tombstoned.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if no type has been touched.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    // ---------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------

    /// Cache a new default instance of `M` and return it.
    ///
    /// Replaces whatever the cache held for `M`, including a tombstone. The
    /// store is not read.
    pub fn create<M: SessionModel>(&mut self) -> ContainerResult<&mut M> {
        let key = self.registry.register::<M>()?;
        debug!(key = %key, "model created");
        self.cache
            .insert(key.clone(), Slot::Present(Box::new(M::default())));
        match self.cache.get_mut(&key) {
            Some(Slot::Present(model)) => downcast_mut::<M>(model.as_mut(), &key),
            _ => Err(ContainerError::Construction {
                key: key.to_string(),
                reason: "created model is missing from the cache".into(),
            }),
        }
    }

    /// Construct and cache a default instance of the type registered under
    /// `key`, replacing whatever the cache held for it.
    ///
    /// Fails with [`ContainerError::Construction`] if no type is registered
    /// under `key`.
    pub fn create_by_key(&mut self, key: &TypeKey) -> ContainerResult<()> {
        let descriptor = self
            .registry
            .get(key)
            .ok_or_else(|| ContainerError::Construction {
                key: key.to_string(),
                reason: "no model type is registered under this key".into(),
            })?;
        let model = descriptor.construct();
        debug!(key = %key, "model created by key");
        self.cache.insert(key.clone(), Slot::Present(model));
        Ok(())
    }

    // ---------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------

    /// Tombstone the entry for `M`.
    pub fn remove<M: SessionModel>(&mut self) -> ContainerResult<()> {
        let key = self.registry.register::<M>()?;
        self.tombstone(key);
        Ok(())
    }

    /// Tombstone the entry for the type of `model`.
    pub fn remove_model<M: SessionModel>(&mut self, _model: &M) -> ContainerResult<()> {
        self.remove::<M>()
    }

    /// Tombstone the entry for `key`, registered or not.
    pub fn remove_key(&mut self, key: &TypeKey) {
        self.tombstone(key.clone());
    }

    /// Tombstone every touched entry. Untouched types are unaffected.
    pub fn clear(&mut self) {
        for slot in self.cache.values_mut() {
            *slot = Slot::Tombstoned;
        }
        debug!(namespace = %self.config.namespace, entries = self.cache.len(), "cache cleared");
    }

    fn tombstone(&mut self, key: TypeKey) {
        debug!(key = %key, "model removed");
        self.cache.insert(key, Slot::Tombstoned);
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    /// Flush every touched entry to the store.
    ///
    /// If no entry is present, including when nothing was touched at all, the
    /// store's namespace is wiped with a single `clear`. Otherwise each
    /// present entry is written and each tombstoned entry is deleted. The cache is left as it is, so a failed
    /// commit can be retried and later commits flush again.
    pub fn commit(&mut self) -> ContainerResult<()> {
        let present = self
            .cache
            .values()
            .filter(|slot| matches!(slot, Slot::Present(_)))
            .count();
        if present == 0 {
            self.store.clear()?;
            info!(namespace = %self.config.namespace, "all models removed, session wiped");
            return Ok(());
        }

        let mut entries = Vec::with_capacity(self.cache.len());
        for (key, slot) in &self.cache {
            let value = match slot {
                Slot::Present(model) => Some(model.encode(self.config.codec)?),
                Slot::Tombstoned => None,
            };
            debug!(key = %key, present = value.is_some(), "flushing entry");
            entries.push((key.clone(), value));
        }
        self.store.set_many(entries)?;

        info!(
            namespace = %self.config.namespace,
            present,
            tombstoned = self.cache.len() - present,
            "session committed"
        );
        Ok(())
    }

    // ---------------------------------------------------------------
    // Internals shared with handler resolution
    // ---------------------------------------------------------------

    /// Make sure `key` has a cache entry, reading the store on first touch.
    pub(crate) fn load<M: SessionModel>(&mut self, key: &TypeKey) -> ContainerResult<()> {
        if self.cache.contains_key(key) {
            return Ok(());
        }
        let slot = match self.store.get(key)? {
            Some(stored) => Slot::Present(Box::new(stored.decode::<M>()?)),
            None => Slot::Tombstoned,
        };
        debug!(key = %key, hit = matches!(slot, Slot::Present(_)), "model loaded from store");
        self.cache.insert(key.clone(), slot);
        Ok(())
    }

    /// Move a present model out of the cache, leaving the key unloaded.
    pub(crate) fn take_present(&mut self, key: &TypeKey) -> Option<Box<dyn ErasedModel>> {
        match self.cache.remove(key) {
            Some(Slot::Present(model)) => Some(model),
            Some(slot) => {
                self.cache.insert(key.clone(), slot);
                None
            }
            None => None,
        }
    }

    /// Put a model into the cache as present.
    pub(crate) fn put_present(&mut self, key: TypeKey, model: Box<dyn ErasedModel>) {
        self.cache.insert(key, Slot::Present(model));
    }

    /// Drop a registration made by a handler call that never ran.
    pub(crate) fn unregister(&mut self, key: &TypeKey) {
        self.registry.forget(key);
    }

    /// Put a tombstone into the cache without logging a removal.
    pub(crate) fn put_tombstone(&mut self, key: TypeKey) {
        self.cache.insert(key, Slot::Tombstoned);
    }
}

pub(crate) fn downcast_mut<'a, M: SessionModel>(
    model: &'a mut (dyn ErasedModel + 'static),
    key: &TypeKey,
) -> ContainerResult<&'a mut M> {
    model
        .as_any_mut()
        .downcast_mut::<M>()
        .ok_or_else(|| ContainerError::TypeResolution {
            key: key.to_string(),
            reason: format!("cached model is not a {}", std::any::type_name::<M>()),
        })
}

impl Default for SessionContainer {
    /// A container over the process-wide session table under the default
    /// namespace.
    fn default() -> Self {
        Self::new(NativeSessionStore::default())
    }
}

impl std::fmt::Debug for SessionContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContainer")
            .field("namespace", &self.config.namespace)
            .field("codec", &self.config.codec)
            .field("touched", &self.cache.len())
            .field("registered", &self.registry.len())
            .finish()
    }
}
