//! Declared default values for handler parameters.

use std::any::TypeId;
use std::collections::HashMap;

use satchel_types::SessionModel;

use crate::entry::ErasedModel;

type Factory = Box<dyn Fn() -> Box<dyn ErasedModel>>;

/// Per-type default values for [`SessionContainer::update_with`].
///
/// When a handler asks for a model that is neither cached nor stored, a
/// declared default is handed to the handler instead of a newly created
/// model. The default is a fresh value on every call and never enters the
/// cache, so mutations made to it by the handler are discarded.
///
/// [`SessionContainer::update_with`]: crate::SessionContainer::update_with
#[derive(Default)]
pub struct Defaults {
    factories: HashMap<TypeId, Factory>,
}

impl Defaults {
    /// No declared defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `value` as the default for its model type.
    pub fn with<M: SessionModel + Clone>(mut self, value: M) -> Self {
        self.factories
            .insert(TypeId::of::<M>(), Box::new(move || -> Box<dyn ErasedModel> {
                Box::new(value.clone())
            }));
        self
    }

    /// Declare a function producing the default for `M`.
    pub fn with_factory<M, F>(mut self, factory: F) -> Self
    where
        M: SessionModel,
        F: Fn() -> M + 'static,
    {
        self.factories
            .insert(TypeId::of::<M>(), Box::new(move || -> Box<dyn ErasedModel> {
                Box::new(factory())
            }));
        self
    }

    /// Returns `true` if a default is declared for `M`.
    pub fn contains<M: SessionModel>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<M>())
    }

    /// Number of declared defaults.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub(crate) fn produce<M: SessionModel>(&self) -> Option<Box<dyn ErasedModel>> {
        self.factories.get(&TypeId::of::<M>()).map(|factory| factory())
    }
}

impl std::fmt::Debug for Defaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Defaults")
            .field("declared", &self.factories.len())
            .finish()
    }
}
