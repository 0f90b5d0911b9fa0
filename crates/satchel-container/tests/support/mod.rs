//! Shared fixtures for the container integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use satchel_container::SessionModel;
use satchel_store::{Codec, InMemoryModelStore, ModelStore, StoreResult, StoredModel};
use satchel_types::TypeKey;
use serde::{Deserialize, Serialize};

/// In-memory store that records every call made to it.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryModelStore,
    gets: Mutex<Vec<TypeKey>>,
    sets: Mutex<Vec<(TypeKey, bool)>>,
    clears: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a model directly, bypassing the recorded counters.
    pub fn seed<M: SessionModel>(&self, model: &M) {
        let stored = StoredModel::encode(Codec::Json, model).unwrap();
        self.inner.set(&M::key().unwrap(), Some(stored)).unwrap();
    }

    /// Read a model directly, bypassing the recorded counters.
    pub fn peek<M: SessionModel>(&self) -> Option<M> {
        self.inner
            .get(&M::key().unwrap())
            .unwrap()
            .map(|stored| stored.decode().unwrap())
    }

    pub fn gets_for(&self, key: &str) -> usize {
        self.gets
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.as_str() == key)
            .count()
    }

    pub fn get_count(&self) -> usize {
        self.gets.lock().unwrap().len()
    }

    /// Every `set` call as `(key, wrote_a_value)`.
    pub fn sets(&self) -> Vec<(TypeKey, bool)> {
        self.sets.lock().unwrap().clone()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Number of calls that could have changed persisted state.
    pub fn write_count(&self) -> usize {
        self.sets.lock().unwrap().len() + self.clear_count()
    }
}

impl ModelStore for RecordingStore {
    fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredModel>> {
        self.gets.lock().unwrap().push(key.clone());
        self.inner.get(key)
    }

    fn set(&self, key: &TypeKey, value: Option<StoredModel>) -> StoreResult<()> {
        self.sets.lock().unwrap().push((key.clone(), value.is_some()));
        self.inner.set(key, value)
    }

    fn clear(&self) -> StoreResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Alpha {
    pub x: i64,
}

impl SessionModel for Alpha {
    const NAME: &'static str = "alpha";
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Beta {
    pub label: String,
}

impl SessionModel for Beta {
    const NAME: &'static str = "beta";
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Gamma {
    pub flags: Vec<bool>,
}

impl SessionModel for Gamma {
    const NAME: &'static str = "gamma";
}

pub fn key(name: &str) -> TypeKey {
    TypeKey::new(name).unwrap()
}
