use std::sync::Arc;

use satchel_types::TypeKey;

use crate::error::StoreResult;
use crate::payload::StoredModel;

/// Persistence backend for session models.
///
/// All implementations must satisfy these invariants:
/// - `get` returns the value most recently passed to `set` for that key, or
///   `None` if the key was never set, was set to `None`, or was cleared.
/// - `set(key, None)` removes the entry.
/// - `clear` removes every entry in this store's namespace.
/// - The store never interprets payload bytes.
/// - All I/O errors are propagated, never silently ignored.
pub trait ModelStore: Send + Sync {
    /// Read the persisted model for `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored under the key.
    fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredModel>>;

    /// Persist a model under `key`, or delete the entry when `value` is `None`.
    fn set(&self, key: &TypeKey, value: Option<StoredModel>) -> StoreResult<()>;

    /// Wipe all persisted state for this store.
    fn clear(&self) -> StoreResult<()>;

    /// Persist several entries.
    ///
    /// Default implementation calls `set()` for each entry in order.
    /// Backends may override to write once (e.g., a single file rewrite).
    fn set_many(&self, entries: Vec<(TypeKey, Option<StoredModel>)>) -> StoreResult<()> {
        for (key, value) in entries {
            self.set(&key, value)?;
        }
        Ok(())
    }
}

impl<S: ModelStore + ?Sized> ModelStore for Arc<S> {
    fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredModel>> {
        (**self).get(key)
    }

    fn set(&self, key: &TypeKey, value: Option<StoredModel>) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn clear(&self) -> StoreResult<()> {
        (**self).clear()
    }

    fn set_many(&self, entries: Vec<(TypeKey, Option<StoredModel>)>) -> StoreResult<()> {
        (**self).set_many(entries)
    }
}

impl<S: ModelStore + ?Sized> ModelStore for Box<S> {
    fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredModel>> {
        (**self).get(key)
    }

    fn set(&self, key: &TypeKey, value: Option<StoredModel>) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn clear(&self) -> StoreResult<()> {
        (**self).clear()
    }

    fn set_many(&self, entries: Vec<(TypeKey, Option<StoredModel>)>) -> StoreResult<()> {
        (**self).set_many(entries)
    }
}
