//! Foundation types for satchel.
//!
//! Every other satchel crate depends on `satchel-types`. It defines how a
//! session model names itself and what a model type must be able to do.
//!
//! # Key Types
//!
//! - [`TypeKey`] -- Stable, validated name identifying one model type
//! - [`SessionModel`] -- Trait implemented by every per-session state type
//! - [`TypeError`] -- Validation failures for keys

pub mod error;
pub mod key;
pub mod model;

pub use error::TypeError;
pub use key::TypeKey;
pub use model::SessionModel;
