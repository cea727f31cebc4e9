//! Adapter-aware JSON codec over `serde_json`.
//!
//! A [`CodecBuilder`] collects per-type encoders/decoders contributed by
//! adapters; [`Codec`] applies them. Types without an adapter go through
//! their own serde impls, with the codec installed as the thread's active
//! codec so nested dispatch points ([`adapted`], `Listing`) can still reach
//! adapters for inner types.

pub mod adapted;
mod scope;

use std::any::{type_name, Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{Result, WebJsonError};

pub(crate) use scope::current;

type ErasedEncoder = Arc<dyn Fn(&dyn Any, &Codec) -> Result<Value> + Send + Sync>;
type ErasedDecoder = Arc<dyn Fn(Value, &Codec) -> Result<Box<dyn Any>> + Send + Sync>;
type ListingEncoder = Arc<dyn Fn(Option<Vec<Value>>, &Codec) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
struct Slot<F> {
    type_name: &'static str,
    handler: F,
}

/// Collects encoders/decoders for one codec.
///
/// The first registration for a type wins, per direction. Later
/// registrations for the same slot are ignored; [`CodecBuilder::shadowed`]
/// counts them.
#[derive(Default)]
pub struct CodecBuilder {
    encoders: HashMap<TypeId, Slot<ErasedEncoder>>,
    decoders: HashMap<TypeId, Slot<ErasedDecoder>>,
    listing_encoder: Option<ListingEncoder>,
    shadowed: usize,
}

impl CodecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the encoder for `T` unless one is already registered.
    pub fn register_encoder<T, F>(&mut self, encoder: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&T, &Codec) -> Result<Value> + Send + Sync + 'static,
    {
        let erased: ErasedEncoder = Arc::new(move |value: &dyn Any, codec: &Codec| {
            let value = value.downcast_ref::<T>().ok_or_else(|| {
                WebJsonError::Config(format!(
                    "encoder for {} received a value of another type",
                    type_name::<T>()
                ))
            })?;
            encoder(value, codec)
        });

        match self.encoders.entry(TypeId::of::<T>()) {
            Entry::Vacant(slot) => {
                slot.insert(Slot {
                    type_name: type_name::<T>(),
                    handler: erased,
                });
            }
            Entry::Occupied(_) => {
                self.shadowed += 1;
                tracing::debug!(ty = type_name::<T>(), "encoder already registered, ignoring");
            }
        }
        self
    }

    /// Registers the decoder for `T` unless one is already registered.
    pub fn register_decoder<T, F>(&mut self, decoder: F) -> &mut Self
    where
        T: 'static,
        F: Fn(Value, &Codec) -> Result<T> + Send + Sync + 'static,
    {
        let erased: ErasedDecoder = Arc::new(move |value: Value, codec: &Codec| {
            decoder(value, codec).map(|decoded| Box::new(decoded) as Box<dyn Any>)
        });

        match self.decoders.entry(TypeId::of::<T>()) {
            Entry::Vacant(slot) => {
                slot.insert(Slot {
                    type_name: type_name::<T>(),
                    handler: erased,
                });
            }
            Entry::Occupied(_) => {
                self.shadowed += 1;
                tracing::debug!(ty = type_name::<T>(), "decoder already registered, ignoring");
            }
        }
        self
    }

    /// Registers the encoder shared by every `Listing<T>`, whatever `T` is.
    ///
    /// It receives the items already encoded by the codec, or `None` when
    /// the listing has no items. An exact encoder for a particular
    /// `Listing<T>` still takes priority over this one.
    pub fn register_listing_encoder<F>(&mut self, encoder: F) -> &mut Self
    where
        F: Fn(Option<Vec<Value>>, &Codec) -> Result<Value> + Send + Sync + 'static,
    {
        if self.listing_encoder.is_some() {
            self.shadowed += 1;
            tracing::debug!("listing encoder already registered, ignoring");
        } else {
            self.listing_encoder = Some(Arc::new(encoder));
        }
        self
    }

    /// Number of registrations ignored because their slot was taken.
    pub fn shadowed(&self) -> usize {
        self.shadowed
    }

    pub fn build(self) -> Codec {
        Codec {
            inner: Arc::new(CodecInner {
                encoders: self.encoders,
                decoders: self.decoders,
                listing_encoder: self.listing_encoder,
            }),
        }
    }
}

struct CodecInner {
    encoders: HashMap<TypeId, Slot<ErasedEncoder>>,
    decoders: HashMap<TypeId, Slot<ErasedDecoder>>,
    listing_encoder: Option<ListingEncoder>,
}

/// An immutable encoder/decoder bound to a set of adapters.
///
/// Cloning is cheap and clones share the same adapters.
#[derive(Clone)]
pub struct Codec {
    inner: Arc<CodecInner>,
}

impl Codec {
    /// A codec with no adapters at all: plain serde behaviour.
    pub fn plain() -> Self {
        CodecBuilder::new().build()
    }

    /// Returns true if an encoder is registered for exactly `T`.
    pub fn has_encoder<T: 'static>(&self) -> bool {
        self.inner.encoders.contains_key(&TypeId::of::<T>())
    }

    /// Returns true if a decoder is registered for exactly `T`.
    pub fn has_decoder<T: 'static>(&self) -> bool {
        self.inner.decoders.contains_key(&TypeId::of::<T>())
    }

    /// Encode a value to compact JSON text.
    pub fn encode<T: Serialize + 'static>(&self, value: &T) -> Result<String> {
        if let Some(slot) = self.inner.encoders.get(&TypeId::of::<T>()) {
            let encoded = (slot.handler)(value as &dyn Any, self)?;
            return serde_json::to_string(&encoded).map_err(encode_error::<T>);
        }
        let _scope = scope::enter(self);
        serde_json::to_string(value).map_err(encode_error::<T>)
    }

    /// Encode a value to pretty-printed JSON text.
    pub fn encode_pretty<T: Serialize + 'static>(&self, value: &T) -> Result<String> {
        let encoded = self.to_value(value)?;
        serde_json::to_string_pretty(&encoded).map_err(encode_error::<T>)
    }

    /// Encode a value to a JSON tree. This is what adapters call for the
    /// values they nest, so adapters for inner types apply.
    pub fn to_value<T: Serialize + 'static>(&self, value: &T) -> Result<Value> {
        if let Some(slot) = self.inner.encoders.get(&TypeId::of::<T>()) {
            return (slot.handler)(value as &dyn Any, self);
        }
        let _scope = scope::enter(self);
        serde_json::to_value(value).map_err(encode_error::<T>)
    }

    /// Decode JSON text. Text that is empty or only JSON whitespace decodes
    /// to `None`, as does a top-level `null`.
    pub fn decode<T: DeserializeOwned + 'static>(&self, json: &str) -> Result<Option<T>> {
        if is_blank(json) {
            return Ok(None);
        }

        if self.has_decoder::<T>() {
            let value: Value = serde_json::from_str(json).map_err(decode_error::<T>)?;
            if value.is_null() {
                return Ok(None);
            }
            return self.from_value(value).map(Some);
        }

        let _scope = scope::enter(self);
        serde_json::from_str::<Option<T>>(json).map_err(decode_error::<T>)
    }

    /// Decode a JSON tree. This is what adapters call for the values they
    /// nest, so adapters for inner types apply.
    pub fn from_value<T: DeserializeOwned + 'static>(&self, value: Value) -> Result<T> {
        if let Some(slot) = self.inner.decoders.get(&TypeId::of::<T>()) {
            let decoded = (slot.handler)(value, self)?;
            return decoded.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
                WebJsonError::Config(format!(
                    "decoder registered for {} produced a value of another type",
                    slot.type_name
                ))
            });
        }
        let _scope = scope::enter(self);
        serde_json::from_value(value).map_err(decode_error::<T>)
    }

    /// Encode listing items through the listing-family encoder, if any.
    pub(crate) fn encode_listing<T: Serialize + 'static>(
        &self,
        items: Option<&[T]>,
    ) -> Result<Option<Value>> {
        let Some(encoder) = &self.inner.listing_encoder else {
            return Ok(None);
        };
        let values = items
            .map(|items| {
                items
                    .iter()
                    .map(|item| self.to_value(item))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;
        encoder(values, self).map(Some)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::plain()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encoders: Vec<_> = self.inner.encoders.values().map(|s| s.type_name).collect();
        let mut decoders: Vec<_> = self.inner.decoders.values().map(|s| s.type_name).collect();
        encoders.sort_unstable();
        decoders.sort_unstable();
        f.debug_struct("Codec")
            .field("encoders", &encoders)
            .field("decoders", &decoders)
            .field("listing_encoder", &self.inner.listing_encoder.is_some())
            .finish()
    }
}

/// True when `json` holds nothing but JSON whitespace.
pub(crate) fn is_blank(json: &str) -> bool {
    json.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r'))
        .is_empty()
}

fn encode_error<T>(err: serde_json::Error) -> WebJsonError {
    WebJsonError::encode_with(format!("failed to encode {}", type_name::<T>()), err)
}

fn decode_error<T>(err: serde_json::Error) -> WebJsonError {
    WebJsonError::decode_with(format!("failed to decode {}", type_name::<T>()), err)
}
