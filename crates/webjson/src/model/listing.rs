use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::{Error as _, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::codec::adapted::{self, Adapted};
use crate::codec::current;

/// An ordered collection envelope, `{"items": [...]}` on the wire.
///
/// `items` may be absent, which is distinct from an empty listing for both
/// equality and display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<T> {
    items: Option<Vec<T>>,
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items: Some(items) }
    }

    pub fn items(&self) -> Option<&[T]> {
        self.items.as_deref()
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<T>> {
        self.items.as_mut()
    }

    pub fn set_items(&mut self, items: Option<Vec<T>>) {
        self.items = items;
    }

    pub fn into_items(self) -> Option<Vec<T>> {
        self.items
    }

    /// Number of items; zero when absent.
    pub fn len(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self { items: None }
    }
}

impl<T> From<Vec<T>> for Listing<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for Listing<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: fmt::Display> fmt::Display for Listing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listing: [items:\n\t")?;
        match &self.items {
            None => write!(f, "null")?,
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "\n\t")?;
                    }
                    write!(f, "{item}")?;
                }
            }
        }
        write!(f, "\n]")
    }
}

impl<T: Serialize + 'static> Serialize for Listing<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(codec) = current() {
            let encoded = codec
                .encode_listing(self.items())
                .map_err(S::Error::custom)?;
            if let Some(value) = encoded {
                return value.serialize(serializer);
            }
        }

        let items: Option<Vec<Adapted<'_, T>>> = self
            .items
            .as_ref()
            .map(|items| items.iter().map(Adapted).collect());
        let mut state = serializer.serialize_struct("Listing", 1)?;
        state.serialize_field("items", &items)?;
        state.end()
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    items: Option<Vec<Value>>,
}

impl<'de, T: DeserializeOwned + 'static> Deserialize<'de> for Listing<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = Envelope::deserialize(deserializer)?;
        let items = envelope
            .items
            .map(|values| {
                values
                    .into_iter()
                    .map(adapted::from_value::<T>)
                    .collect::<crate::Result<Vec<T>>>()
            })
            .transpose()
            .map_err(D::Error::custom)?;
        Ok(Self { items })
    }
}
