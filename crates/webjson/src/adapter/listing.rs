use serde_json::{Map, Value};

use super::SerializationAdapter;
use crate::codec::{Codec, CodecBuilder};
use crate::errors::Result;

/// Built-in adapters, applied after every other source.
///
/// Registration is first-wins, so anything registered earlier for the same
/// type overrides these.
pub const DEFAULT_ADAPTERS: &[&dyn SerializationAdapter] = &[&ListingAdapter];

/// Encodes every `Listing<T>` as `{"items": [...]}`.
///
/// Items arrive already encoded by the active codec, so adapters for the
/// item type apply. Decoding is handled by the listing model itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListingAdapter;

impl ListingAdapter {
    fn encode(items: Option<Vec<Value>>, _codec: &Codec) -> Result<Value> {
        let mut result = Map::new();
        result.insert("items".into(), items.map_or(Value::Null, Value::Array));
        Ok(Value::Object(result))
    }
}

impl SerializationAdapter for ListingAdapter {
    fn register(&self, builder: &mut CodecBuilder) {
        builder.register_listing_encoder(Self::encode);
    }

    fn name(&self) -> &str {
        "ListingAdapter"
    }
}
