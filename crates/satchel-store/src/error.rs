use satchel_types::TypeKey;

/// Errors from model store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Encoding or decoding a model payload failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted entry failed its integrity check.
    #[error("corrupt entry {key} in namespace {namespace}: {reason}")]
    Corrupt {
        namespace: String,
        key: TypeKey,
        reason: String,
    },

    /// The namespace cannot be used by this backend.
    #[error("invalid namespace {namespace:?}: {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
