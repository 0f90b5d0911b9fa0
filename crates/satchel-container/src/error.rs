use satchel_store::StoreError;
use satchel_types::TypeError;
use thiserror::Error;

/// Errors surfaced by container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A requested model type cannot be resolved to a usable cache entry.
    #[error("cannot resolve model type {key}: {reason}")]
    TypeResolution { key: String, reason: String },

    /// A model instance could not be constructed.
    #[error("cannot construct model {key}: {reason}")]
    Construction { key: String, reason: String },

    /// The storage backend failed; propagated unmodified.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The container configuration is invalid or unreadable.
    #[error("config error: {0}")]
    Config(String),
}

impl From<TypeError> for ContainerError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidKey { key, reason } => Self::TypeResolution { key, reason },
        }
    }
}

/// Convenience alias for container results.
pub type ContainerResult<T> = Result<T, ContainerError>;
