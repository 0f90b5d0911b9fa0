use std::path::{Path, PathBuf};

use satchel_store::{
    Codec, FileModelStore, InMemoryModelStore, ModelStore, NativeSessionStore, DEFAULT_NAMESPACE,
};
use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, ContainerResult};

/// Which storage backend a container builds for itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backend {
    /// The process-wide session table.
    #[default]
    Native,
    /// A private in-memory store, discarded with the container.
    Memory,
    /// One JSON document per namespace under `dir`.
    File { dir: PathBuf },
}

/// Configuration for a [`SessionContainer`](crate::SessionContainer).
///
/// Missing fields take their defaults when parsed:
///
/// ```toml
/// namespace = "shop"
/// codec = "bincode"
///
/// [backend]
/// kind = "file"
/// dir = "/var/lib/shop/sessions"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Root namespace the models are stored under.
    pub namespace: String,
    /// Codec used to serialize models on commit.
    pub codec: Codec,
    /// Backend built by [`ContainerConfig::build_store`].
    pub backend: Backend,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            codec: Codec::Json,
            backend: Backend::Native,
        }
    }
}

impl ContainerConfig {
    /// Default configuration under a different namespace.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Replace the codec.
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Replace the backend.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> ContainerResult<Self> {
        toml::from_str(text).map_err(|e| ContainerError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContainerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Instantiate the configured backend for the configured namespace.
    pub fn build_store(&self) -> ContainerResult<Box<dyn ModelStore>> {
        let store: Box<dyn ModelStore> = match &self.backend {
            Backend::Native => Box::new(NativeSessionStore::new(self.namespace.clone())?),
            Backend::Memory => {
                satchel_store::validate_namespace(&self.namespace)?;
                Box::new(InMemoryModelStore::new())
            }
            Backend::File { dir } => Box::new(FileModelStore::open(dir, self.namespace.clone())?),
        };
        Ok(store)
    }
}
