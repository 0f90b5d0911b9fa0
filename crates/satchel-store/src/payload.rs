use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Wire format used to serialize a model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// `serde_json`; human-readable, tolerant of added fields.
    #[default]
    Json,
    /// `bincode`; compact, requires the exact same model layout to decode.
    Bincode,
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Bincode => write!(f, "bincode"),
        }
    }
}

/// A serialized model: codec tag plus payload bytes.
///
/// `StoredModel` is the unit of storage. Stores never interpret `data`;
/// only the container decodes it back into a model type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredModel {
    /// The codec that produced `data`.
    pub codec: Codec,
    /// The serialized bytes of the model.
    pub data: Vec<u8>,
}

impl StoredModel {
    /// Wrap already-serialized bytes.
    pub fn new(codec: Codec, data: Vec<u8>) -> Self {
        Self { codec, data }
    }

    /// Serialize a value with the given codec.
    pub fn encode<T: Serialize + ?Sized>(codec: Codec, value: &T) -> StoreResult<Self> {
        let data = match codec {
            Codec::Json => {
                serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?
            }
            Codec::Bincode => {
                bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?
            }
        };
        Ok(Self { codec, data })
    }

    /// Deserialize the payload with the codec it was written with.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        match self.codec {
            Codec::Json => serde_json::from_slice(&self.data)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            Codec::Bincode => bincode::deserialize(&self.data)
                .map_err(|e| StoreError::Serialization(e.to_string())),
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
