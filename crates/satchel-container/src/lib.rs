//! Typed, lazily-populated container for per-session models.
//!
//! A [`SessionContainer`] keeps exactly one live instance per model type for
//! the duration of one request. Models are read from a [`ModelStore`] the
//! first time they are needed, created on demand when the store has none,
//! and written back only when [`SessionContainer::commit`] is called.
//!
//! ```
//! use satchel_container::SessionContainer;
//! use satchel_store::InMemoryModelStore;
//! use satchel_types::SessionModel;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Cart {
//!     items: Vec<String>,
//! }
//!
//! impl SessionModel for Cart {
//!     const NAME: &'static str = "cart";
//! }
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct User {
//!     name: Option<String>,
//! }
//!
//! impl SessionModel for User {
//!     const NAME: &'static str = "user";
//! }
//!
//! let mut session = SessionContainer::new(InMemoryModelStore::new());
//! session
//!     .update(|cart: &mut Cart, user: &mut User| {
//!         user.name = Some("ada".into());
//!         cart.items.push("tea".into());
//!     })
//!     .unwrap();
//! session.commit().unwrap();
//! ```
//!
//! # Key Types
//!
//! - [`SessionContainer`] -- the cache and its operations
//! - [`Handler`] -- closures and functions taking `&mut` models
//! - [`Defaults`] -- declared default values for handler parameters
//! - [`EntryState`] -- unloaded / present / tombstoned
//! - [`ContainerConfig`] -- namespace, codec and backend selection
//!
//! [`ModelStore`]: satchel_store::ModelStore

pub mod config;
pub mod container;
pub mod defaults;
pub mod entry;
pub mod error;
pub mod handler;
pub mod registry;

pub use config::{Backend, ContainerConfig};
pub use container::SessionContainer;
pub use defaults::Defaults;
pub use entry::EntryState;
pub use error::{ContainerError, ContainerResult};
pub use handler::Handler;
pub use registry::{ModelDescriptor, ModelRegistry};

pub use satchel_store::{Codec, DEFAULT_NAMESPACE};
pub use satchel_types::{SessionModel, TypeKey};
