//! Durable, file-backed model store.
//!
//! Each namespace is a single JSON document at `<dir>/<namespace>.json`:
//!
//! ```text
//! {
//!   "version": 1,
//!   "entries": {
//!     "cart": {
//!       "codec": "json",
//!       "payload": "<hex of payload bytes>",
//!       "digest": "<blake3 hex of payload bytes>",
//!       "written_at": "2026-10-16T09:30:00Z"
//!     }
//!   }
//! }
//! ```
//!
//! Writes replace the whole document atomically: the new document goes to a
//! uniquely named temp file in the same directory, which is then renamed
//! over the old one. Readers never see a partial document. Read-modify-write
//! cycles are serialized per document across every handle in the process.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use chrono::{DateTime, Utc};
use satchel_types::TypeKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::namespace::validate_namespace;
use crate::payload::{Codec, StoredModel};
use crate::traits::ModelStore;

const DOCUMENT_VERSION: u32 = 1;

/// One persisted model as it appears in the namespace document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Codec the payload was written with.
    pub codec: Codec,
    /// Hex-encoded payload bytes.
    pub payload: String,
    /// BLAKE3 digest of the raw payload bytes, hex-encoded.
    pub digest: String,
    /// When this entry was last written.
    pub written_at: DateTime<Utc>,
}

impl FileEntry {
    fn from_stored(model: &StoredModel) -> Self {
        Self {
            codec: model.codec,
            payload: hex::encode(&model.data),
            digest: blake3::hash(&model.data).to_hex().to_string(),
            written_at: Utc::now(),
        }
    }

    /// Size of the decoded payload in bytes.
    pub fn size(&self) -> usize {
        self.payload.len() / 2
    }

    /// Decode the payload and verify it against the recorded digest.
    pub fn to_stored(&self, namespace: &str, key: &TypeKey) -> StoreResult<StoredModel> {
        let corrupt = |reason: String| StoreError::Corrupt {
            namespace: namespace.to_string(),
            key: key.clone(),
            reason,
        };
        let data = hex::decode(&self.payload).map_err(|e| corrupt(e.to_string()))?;
        let computed = blake3::hash(&data).to_hex().to_string();
        if computed != self.digest {
            return Err(corrupt(format!(
                "digest mismatch: expected {}, computed {computed}",
                self.digest
            )));
        }
        Ok(StoredModel::new(self.codec, data))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    version: u32,
    entries: BTreeMap<TypeKey, FileEntry>,
}

/// Model store persisting one namespace to one JSON file.
///
/// Read-modify-write cycles are serialized by a mutex shared by all handles
/// on the same document in this process. Locking between processes is not
/// provided.
pub struct FileModelStore {
    dir: PathBuf,
    path: PathBuf,
    namespace: String,
    write_lock: Arc<Mutex<()>>,
}

impl FileModelStore {
    /// Open (or prepare) the store for `namespace` under `dir`.
    ///
    /// Creates `dir` if needed. Handles opened on the same document share
    /// one write lock.
    pub fn open(dir: impl AsRef<Path>, namespace: impl Into<String>) -> StoreResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;

        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{namespace}.json"));
        let write_lock = document_lock(
            &fs::canonicalize(dir)?.join(format!("{namespace}.json")),
        )?;

        Ok(Self {
            dir: dir.to_path_buf(),
            path,
            namespace,
            write_lock,
        })
    }

    /// The namespace this store persists.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Path of the namespace document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All persisted entries, sorted by key.
    pub fn entries(&self) -> StoreResult<Vec<(TypeKey, FileEntry)>> {
        Ok(self.load()?.entries.into_iter().collect())
    }

    fn load(&self) -> StoreResult<Document> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Document {
                    version: DOCUMENT_VERSION,
                    entries: BTreeMap::new(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let doc: Document =
            serde_json::from_str(&text).map_err(|e| StoreError::Serialization(e.to_string()))?;
        if doc.version != DOCUMENT_VERSION {
            return Err(StoreError::Serialization(format!(
                "unsupported document version {} in {}",
                doc.version,
                self.path.display()
            )));
        }
        Ok(doc)
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        if doc.entries.is_empty() {
            return self.remove_file();
        }
        let json =
            serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", self.namespace))
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        if let Err(e) = tmp.persist(&self.path) {
            warn!(path = %self.path.display(), error = %e.error, "failed to replace namespace document");
            return Err(e.error.into());
        }
        debug!(path = %self.path.display(), entries = doc.entries.len(), "namespace document written");
        Ok(())
    }

    fn remove_file(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn apply(doc: &mut Document, key: TypeKey, value: Option<StoredModel>) {
        match value {
            Some(model) => {
                doc.entries.insert(key, FileEntry::from_stored(&model));
            }
            None => {
                doc.entries.remove(&key);
            }
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

/// The write lock shared by every handle on the document at `path`.
fn document_lock(path: &Path) -> StoreResult<Arc<Mutex<()>>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let mut locks = LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
    Ok(Arc::clone(locks.entry(path.to_path_buf()).or_default()))
}

impl ModelStore for FileModelStore {
    fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredModel>> {
        let doc = self.load()?;
        doc.entries
            .get(key)
            .map(|entry| entry.to_stored(&self.namespace, key))
            .transpose()
    }

    fn set(&self, key: &TypeKey, value: Option<StoredModel>) -> StoreResult<()> {
        let _guard = self.lock()?;
        let mut doc = self.load()?;
        Self::apply(&mut doc, key.clone(), value);
        self.save(&doc)
    }

    fn clear(&self) -> StoreResult<()> {
        let _guard = self.lock()?;
        self.remove_file()
    }

    fn set_many(&self, entries: Vec<(TypeKey, Option<StoredModel>)>) -> StoreResult<()> {
        let _guard = self.lock()?;
        let mut doc = self.load()?;
        for (key, value) in entries {
            Self::apply(&mut doc, key, value);
        }
        self.save(&doc)
    }
}

impl std::fmt::Debug for FileModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileModelStore")
            .field("path", &self.path)
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(name: &str) -> TypeKey {
        TypeKey::new(name).unwrap()
    }

    fn payload(text: &str) -> StoredModel {
        StoredModel::encode(Codec::Json, &text).unwrap()
    }

    fn test_store() -> (FileModelStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = FileModelStore::open(tmp.path(), "session").unwrap();
        (store, tmp)
    }

    // -----------------------------------------------------------------------
    // Basic persistence
    // -----------------------------------------------------------------------

    #[test]
    fn missing_file_reads_as_empty() {
        let (store, _tmp) = test_store();
        assert!(store.get(&key("cart")).unwrap().is_none());
        assert!(store.entries().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn set_and_get_roundtrip() {
        let (store, _tmp) = test_store();
        store.set(&key("cart"), Some(payload("apples"))).unwrap();
        assert_eq!(store.get(&key("cart")).unwrap(), Some(payload("apples")));
        assert!(store.path().exists());
    }

    #[test]
    fn data_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = FileModelStore::open(tmp.path(), "session").unwrap();
            store.set(&key("cart"), Some(payload("kept"))).unwrap();
        }
        let reopened = FileModelStore::open(tmp.path(), "session").unwrap();
        assert_eq!(reopened.get(&key("cart")).unwrap(), Some(payload("kept")));
    }

    #[test]
    fn set_none_deletes_entry() {
        let (store, _tmp) = test_store();
        store.set(&key("cart"), Some(payload("a"))).unwrap();
        store.set(&key("user"), Some(payload("b"))).unwrap();
        store.set(&key("cart"), None).unwrap();

        let keys: Vec<TypeKey> = store.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![key("user")]);
    }

    #[test]
    fn last_delete_removes_file() {
        let (store, _tmp) = test_store();
        store.set(&key("cart"), Some(payload("a"))).unwrap();
        store.set(&key("cart"), None).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn clear_removes_document() {
        let (store, _tmp) = test_store();
        store.set(&key("cart"), Some(payload("a"))).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.get(&key("cart")).unwrap().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn set_many_writes_once() {
        let (store, _tmp) = test_store();
        store
            .set_many(vec![
                (key("cart"), Some(payload("a"))),
                (key("user"), Some(payload("b"))),
                (key("prefs"), None),
            ])
            .unwrap();
        assert_eq!(store.entries().unwrap().len(), 2);
        // Only the document remains; the temp file was renamed over it.
        let files: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("session.json")]);
    }

    // -----------------------------------------------------------------------
    // Namespaces and integrity
    // -----------------------------------------------------------------------

    #[test]
    fn namespaces_use_separate_files() {
        let tmp = TempDir::new().unwrap();
        let a = FileModelStore::open(tmp.path(), "alpha").unwrap();
        let b = FileModelStore::open(tmp.path(), "beta").unwrap();
        a.set(&key("cart"), Some(payload("a"))).unwrap();
        b.clear().unwrap();
        assert!(a.get(&key("cart")).unwrap().is_some());
        assert_eq!(a.path(), tmp.path().join("alpha.json"));
    }

    #[test]
    fn invalid_namespace_is_rejected() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            FileModelStore::open(tmp.path(), "../escape"),
            Err(StoreError::InvalidNamespace { .. })
        ));
    }

    #[test]
    fn tampered_payload_is_corrupt() {
        let (store, _tmp) = test_store();
        store.set(&key("cart"), Some(payload("honest"))).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        let mut doc: Document = serde_json::from_str(&text).unwrap();
        let entry = doc.entries.get_mut("cart").unwrap();
        entry.payload = hex::encode(b"\"forged\"");
        fs::write(store.path(), serde_json::to_vec(&doc).unwrap()).unwrap();

        let err = store.get(&key("cart")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn garbage_document_is_serialization_error() {
        let (store, _tmp) = test_store();
        fs::write(store.path(), b"not json").unwrap();
        assert!(matches!(
            store.get(&key("cart")),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn leftover_temp_file_does_not_disturb_open_or_writes() {
        let tmp = TempDir::new().unwrap();
        let leftover = tmp.path().join(".session.interrupted.tmp");
        fs::write(&leftover, b"partial").unwrap();

        let store = FileModelStore::open(tmp.path(), "session").unwrap();
        store.set(&key("cart"), Some(payload("a"))).unwrap();
        assert!(leftover.exists());
        assert_eq!(store.get(&key("cart")).unwrap(), Some(payload("a")));
    }

    // -----------------------------------------------------------------------
    // Concurrent handles
    // -----------------------------------------------------------------------

    #[test]
    fn handles_on_one_namespace_share_a_lock() {
        let tmp = TempDir::new().unwrap();
        let a = FileModelStore::open(tmp.path(), "shared").unwrap();
        let b = FileModelStore::open(tmp.path(), "shared").unwrap();
        let c = FileModelStore::open(tmp.path(), "other").unwrap();
        assert!(Arc::ptr_eq(&a.write_lock, &b.write_lock));
        assert!(!Arc::ptr_eq(&a.write_lock, &c.write_lock));
    }

    #[test]
    fn concurrent_handles_lose_no_writes() {
        const THREADS: usize = 4;
        const ROUNDS: u32 = 150;

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let workers: Vec<_> = (0..THREADS)
            .map(|t| {
                let dir = dir.clone();
                std::thread::spawn(move || {
                    let mut errors = Vec::new();
                    for i in 0..ROUNDS {
                        let result = FileModelStore::open(&dir, "shared").and_then(|store| {
                            let model = StoredModel::encode(Codec::Json, &i)?;
                            store.set(&key(&format!("k{t}")), Some(model))
                        });
                        if let Err(e) = result {
                            errors.push(e.to_string());
                        }
                    }
                    errors
                })
            })
            .collect();

        let errors: Vec<String> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        assert!(errors.is_empty(), "errors: {errors:?}");

        let store = FileModelStore::open(&dir, "shared").unwrap();
        for t in 0..THREADS {
            let stored = store.get(&key(&format!("k{t}"))).unwrap().unwrap();
            assert_eq!(stored.decode::<u32>().unwrap(), ROUNDS - 1);
        }
    }

    #[test]
    fn entry_reports_payload_size() {
        let (store, _tmp) = test_store();
        let model = StoredModel::new(Codec::Bincode, vec![1, 2, 3, 4]);
        store.set(&key("blob"), Some(model)).unwrap();
        let (_, entry) = store.entries().unwrap().remove(0);
        assert_eq!(entry.size(), 4);
        assert_eq!(entry.codec, Codec::Bincode);
    }
}
