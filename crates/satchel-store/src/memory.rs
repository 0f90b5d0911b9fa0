use std::collections::HashMap;
use std::sync::RwLock;

use satchel_types::TypeKey;

use crate::error::{StoreError, StoreResult};
use crate::payload::StoredModel;
use crate::traits::ModelStore;

/// In-memory, HashMap-based model store.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock` and
/// cloned on read/write. Data is lost when the store is dropped.
pub struct InMemoryModelStore {
    entries: RwLock<HashMap<TypeKey, StoredModel>>,
}

impl InMemoryModelStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_lock()?.len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_lock()?.is_empty())
    }

    /// Sorted list of stored keys.
    pub fn keys(&self) -> StoreResult<Vec<TypeKey>> {
        let map = self.read_lock()?;
        let mut keys: Vec<TypeKey> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn read_lock(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<TypeKey, StoredModel>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_lock(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<TypeKey, StoredModel>>> {
        self.entries
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryModelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelStore for InMemoryModelStore {
    fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredModel>> {
        Ok(self.read_lock()?.get(key).cloned())
    }

    fn set(&self, key: &TypeKey, value: Option<StoredModel>) -> StoreResult<()> {
        let mut map = self.write_lock()?;
        match value {
            Some(model) => {
                map.insert(key.clone(), model);
            }
            None => {
                map.remove(key);
            }
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.write_lock()?.clear();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("InMemoryModelStore")
            .field("entry_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Codec;
    use std::sync::Arc;

    fn key(name: &str) -> TypeKey {
        TypeKey::new(name).unwrap()
    }

    fn payload(text: &str) -> StoredModel {
        StoredModel::encode(Codec::Json, &text).unwrap()
    }

    #[test]
    fn get_missing_is_none() {
        let store = InMemoryModelStore::new();
        assert!(store.get(&key("cart")).unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn set_then_get() {
        let store = InMemoryModelStore::new();
        store.set(&key("cart"), Some(payload("a"))).unwrap();
        assert_eq!(store.get(&key("cart")).unwrap(), Some(payload("a")));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn set_overwrites() {
        let store = InMemoryModelStore::new();
        store.set(&key("cart"), Some(payload("a"))).unwrap();
        store.set(&key("cart"), Some(payload("b"))).unwrap();
        assert_eq!(store.get(&key("cart")).unwrap(), Some(payload("b")));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn set_none_removes() {
        let store = InMemoryModelStore::new();
        store.set(&key("cart"), Some(payload("a"))).unwrap();
        store.set(&key("cart"), None).unwrap();
        assert!(store.get(&key("cart")).unwrap().is_none());
        // Removing an absent key is fine.
        store.set(&key("user"), None).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn clear_wipes_everything() {
        let store = InMemoryModelStore::new();
        store.set(&key("cart"), Some(payload("a"))).unwrap();
        store.set(&key("user"), Some(payload("b"))).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn set_many_applies_in_order() {
        let store = InMemoryModelStore::new();
        store.set(&key("user"), Some(payload("old"))).unwrap();
        store
            .set_many(vec![
                (key("cart"), Some(payload("a"))),
                (key("user"), None),
            ])
            .unwrap();
        assert_eq!(store.keys().unwrap(), vec![key("cart")]);
    }

    #[test]
    fn arc_handle_shares_state() {
        let store = Arc::new(InMemoryModelStore::new());
        let handle: Box<dyn ModelStore> = Box::new(Arc::clone(&store));
        handle.set(&key("cart"), Some(payload("a"))).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn debug_shows_count() {
        let store = InMemoryModelStore::new();
        store.set(&key("cart"), Some(payload("a"))).unwrap();
        assert!(format!("{store:?}").contains("entry_count: 1"));
    }
}
