//! Storage backends for satchel session models.
//!
//! A store persists serialized models keyed by [`TypeKey`]. It knows nothing
//! about caching or model types: the container above it decides when to read
//! and when to flush.
//!
//! # Storage Backends
//!
//! All backends implement the [`ModelStore`] trait:
//!
//! - [`InMemoryModelStore`] -- `HashMap`-based store for tests and embedding
//! - [`NativeSessionStore`] -- process-wide session table scoped by namespace
//! - [`FileModelStore`] -- one JSON document per namespace on disk
//!
//! # Design Rules
//!
//! 1. `set(key, None)` persists "removed": the entry is deleted.
//! 2. `clear()` wipes the store's own namespace and nothing else.
//! 3. Payloads are opaque bytes tagged with the [`Codec`] that produced them.
//! 4. All I/O errors are propagated, never silently ignored.
//!
//! [`TypeKey`]: satchel_types::TypeKey

pub mod error;
pub mod file;
pub mod memory;
pub mod namespace;
pub mod native;
pub mod payload;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{FileEntry, FileModelStore};
pub use memory::InMemoryModelStore;
pub use namespace::validate_namespace;
pub use native::{NativeSessionStore, DEFAULT_NAMESPACE};
pub use payload::{Codec, StoredModel};
pub use traits::ModelStore;
