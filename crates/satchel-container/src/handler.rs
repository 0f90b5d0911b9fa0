//! Typed parameter injection for [`SessionContainer::update`].
//!
//! A handler is any closure or function whose parameters are all `&mut M`
//! for distinct model types `M`. The parameter types select the models; no
//! runtime reflection is involved.
//!
//! While the handler runs, each requested model is checked out of the cache
//! so the handler can hold disjoint mutable borrows. The checkout guard
//! returns the models to the cache when it is dropped, including when the
//! handler panics. If resolution fails before the handler runs, types first
//! registered by that call are unregistered again.

use satchel_types::{SessionModel, TypeKey};

use crate::container::{downcast_mut, SessionContainer};
use crate::defaults::Defaults;
use crate::entry::ErasedModel;
use crate::error::{ContainerError, ContainerResult};

/// A callable that can be run by [`SessionContainer::update`].
///
/// Implemented for every `FnOnce(&mut A, &mut B, ...) -> R` of up to eight
/// model parameters.
pub trait Handler<Args, R> {
    /// Resolve the parameters against `container` and invoke the handler.
    fn call(self, container: &mut SessionContainer, defaults: &Defaults) -> ContainerResult<R>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    /// Taken from the cache.
    Cached,
    /// Created for this call.
    Created,
    /// A declared default; never cached.
    Default,
}

struct Lease {
    key: TypeKey,
    model: Box<dyn ErasedModel>,
    origin: Origin,
}

/// Models checked out of a container for one handler invocation.
struct Checkout<'c> {
    container: &'c mut SessionContainer,
    leases: Vec<Lease>,
    /// Types first registered by this checkout.
    registered: Vec<TypeKey>,
    invoked: bool,
}

impl<'c> Checkout<'c> {
    fn new(container: &'c mut SessionContainer) -> Self {
        Self {
            container,
            leases: Vec::new(),
            registered: Vec::new(),
            invoked: false,
        }
    }

    /// Resolve the next parameter: fetched, else declared default, else
    /// created.
    fn lease<M: SessionModel>(&mut self, defaults: &Defaults) -> ContainerResult<()> {
        let known = self.container.registry().contains(&M::key()?);
        let key = self.container.register::<M>()?;
        if !known {
            self.registered.push(key.clone());
        }
        if self.leases.iter().any(|lease| lease.key == key) {
            return Err(ContainerError::TypeResolution {
                key: key.to_string(),
                reason: "requested more than once by the same handler".into(),
            });
        }

        let present = self.container.fetch::<M>()?.is_some();
        let (model, origin) = if present {
            (self.take(&key)?, Origin::Cached)
        } else if let Some(model) = defaults.produce::<M>() {
            (model, Origin::Default)
        } else {
            self.container.create::<M>()?;
            (self.take(&key)?, Origin::Created)
        };

        self.leases.push(Lease { key, model, origin });
        Ok(())
    }

    fn take(&mut self, key: &TypeKey) -> ContainerResult<Box<dyn ErasedModel>> {
        self.container
            .take_present(key)
            .ok_or_else(|| ContainerError::TypeResolution {
                key: key.to_string(),
                reason: "model disappeared from the cache during resolution".into(),
            })
    }

    /// Split into the leased models and the invocation flag.
    fn parts(&mut self) -> (std::slice::IterMut<'_, Lease>, &mut bool) {
        (self.leases.iter_mut(), &mut self.invoked)
    }
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        for lease in self.leases.drain(..) {
            match lease.origin {
                Origin::Cached => self.container.put_present(lease.key, lease.model),
                Origin::Created if self.invoked => {
                    self.container.put_present(lease.key, lease.model)
                }
                // Resolution failed before the handler ran; undo the creation.
                Origin::Created => self.container.put_tombstone(lease.key),
                Origin::Default => {}
            }
        }
        if !self.invoked {
            for key in self.registered.drain(..) {
                self.container.unregister(&key);
            }
        }
    }
}

/// Bind the next leased model to a parameter of type `M`.
fn bind<'a, M: SessionModel>(lease: Option<&'a mut Lease>) -> ContainerResult<&'a mut M> {
    let lease = lease.ok_or_else(|| ContainerError::TypeResolution {
        key: M::NAME.to_string(),
        reason: "no model was resolved for this parameter".into(),
    })?;
    downcast_mut::<M>(lease.model.as_mut(), &lease.key)
}

impl<F, R> Handler<(), R> for F
where
    F: FnOnce() -> R,
{
    fn call(self, _container: &mut SessionContainer, _defaults: &Defaults) -> ContainerResult<R> {
        Ok(self())
    }
}

macro_rules! impl_handler {
    ($($ty:ident),+) => {
        #[allow(non_snake_case)]
        impl<F, R, $($ty,)+> Handler<($($ty,)+), R> for F
        where
            F: FnOnce($(&mut $ty),+) -> R,
            $($ty: SessionModel,)+
        {
            fn call(
                self,
                container: &mut SessionContainer,
                defaults: &Defaults,
            ) -> ContainerResult<R> {
                let mut checkout = Checkout::new(container);
                $(checkout.lease::<$ty>(defaults)?;)+

                let (mut leases, invoked) = checkout.parts();
                $(let $ty = bind::<$ty>(leases.next())?;)+
                *invoked = true;
                Ok(self($($ty),+))
            }
        }
    };
}

impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
