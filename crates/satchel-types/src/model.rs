use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::TypeError;
use crate::key::TypeKey;

/// A value type holding one slice of per-session state.
///
/// A container keeps at most one live instance of each model type. Models
/// are default-constructible so a container can synthesize one on demand,
/// and serde-serializable so a store can persist them.
///
/// `NAME` is the stable identifier the model is cached and stored under.
/// It must be a valid [`TypeKey`] and must not be shared with any other
/// model type used against the same container.
///
/// ```
/// use satchel_types::SessionModel;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Cart {
///     items: Vec<String>,
/// }
///
/// impl SessionModel for Cart {
///     const NAME: &'static str = "cart";
/// }
///
/// assert_eq!(Cart::key().unwrap().as_str(), "cart");
/// ```
pub trait SessionModel: Default + Serialize + DeserializeOwned + Send + 'static {
    /// Stable name of this model type.
    const NAME: &'static str;

    /// The validated key for this model type.
    fn key() -> Result<TypeKey, TypeError> {
        TypeKey::new(Self::NAME)
    }
}
