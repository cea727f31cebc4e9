//! Dispatch through the active codec for nested values.
//!
//! Use on a field whose type may have an adapter:
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Envelope<T> {
//!     #[serde(with = "webjson::codec::adapted")]
//!     #[serde(bound(serialize = "T: Serialize + 'static"))]
//!     #[serde(bound(deserialize = "T: serde::de::DeserializeOwned + 'static"))]
//!     payload: T,
//! }
//! ```
//!
//! serde offers no hook on derived impls, so a field whose type has an
//! adapter is only routed through it when it opts in like this. Containers
//! of such types use [`option`] and [`seq`].
//!
//! Outside an encode/decode call (no active codec) these behave exactly
//! like the field type's own serde impls.

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::scope;
use crate::errors::{Result, WebJsonError};

pub fn serialize<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: Serialize + 'static,
    S: Serializer,
{
    match scope::current() {
        Some(codec) if codec.has_encoder::<T>() => codec
            .to_value(value)
            .map_err(S::Error::custom)?
            .serialize(serializer),
        _ => value.serialize(serializer),
    }
}

pub fn deserialize<'de, T, D>(deserializer: D) -> std::result::Result<T, D::Error>
where
    T: DeserializeOwned + 'static,
    D: Deserializer<'de>,
{
    match scope::current() {
        Some(codec) if codec.has_decoder::<T>() => {
            let value = Value::deserialize(deserializer)?;
            codec.from_value(value).map_err(D::Error::custom)
        }
        _ => T::deserialize(deserializer),
    }
}

/// Decode a JSON tree through the active codec, or plain serde without one.
pub fn from_value<T: DeserializeOwned + 'static>(value: Value) -> Result<T> {
    match scope::current() {
        Some(codec) => codec.from_value(value),
        None => serde_json::from_value(value).map_err(|e| {
            WebJsonError::decode_with(
                format!("failed to decode {}", std::any::type_name::<T>()),
                e,
            )
        }),
    }
}

/// Borrowed value that serializes through the active codec.
pub(crate) struct Adapted<'a, T>(pub &'a T);

impl<T: Serialize + 'static> Serialize for Adapted<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize(self.0, serializer)
    }
}

/// `#[serde(with = "webjson::codec::adapted::option")]` for `Option<T>`.
pub mod option {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    use super::Adapted;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize + 'static,
        S: Serializer,
    {
        match value {
            Some(inner) => serializer.serialize_some(&Adapted(inner)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned + 'static,
        D: Deserializer<'de>,
    {
        Option::<Value>::deserialize(deserializer)?
            .map(super::from_value::<T>)
            .transpose()
            .map_err(D::Error::custom)
    }
}

/// `#[serde(with = "webjson::codec::adapted::seq")]` for `Vec<T>`.
pub mod seq {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    use super::Adapted;

    pub fn serialize<T, S>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize + 'static,
        S: Serializer,
    {
        serializer.collect_seq(values.iter().map(Adapted))
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        T: DeserializeOwned + 'static,
        D: Deserializer<'de>,
    {
        Vec::<Value>::deserialize(deserializer)?
            .into_iter()
            .map(super::from_value::<T>)
            .collect::<crate::Result<Vec<T>>>()
            .map_err(D::Error::custom)
    }
}
