//! Cache entries and the type-erased model they hold.

use std::any::Any;

use satchel_store::{Codec, StoreResult, StoredModel};
use satchel_types::SessionModel;

/// Object-safe view of a [`SessionModel`].
pub(crate) trait ErasedModel: Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn encode(&self, codec: Codec) -> StoreResult<StoredModel>;
}

impl<M: SessionModel> ErasedModel for M {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn encode(&self, codec: Codec) -> StoreResult<StoredModel> {
        StoredModel::encode(codec, self)
    }
}

/// A touched cache entry. Untouched types have no entry at all.
pub(crate) enum Slot {
    Present(Box<dyn ErasedModel>),
    Tombstoned,
}

impl Slot {
    pub(crate) fn state(&self) -> EntryState {
        match self {
            Self::Present(_) => EntryState::Present,
            Self::Tombstoned => EntryState::Tombstoned,
        }
    }
}

/// Observable state of one model type in a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Never read from storage nor created in this container.
    Unloaded,
    /// Holds a live model.
    Present,
    /// Removed, cleared, or absent from storage. Never re-fetched before the
    /// container is discarded.
    Tombstoned,
}

impl EntryState {
    /// Returns `true` for [`EntryState::Present`].
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Present => write!(f, "present"),
            Self::Tombstoned => write!(f, "tombstoned"),
        }
    }
}
