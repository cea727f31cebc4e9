// webjson: adapter-aware JSON (de)serialization on top of serde_json

pub mod adapter;
pub mod body;
pub mod charset;
pub mod codec;
pub mod config;
pub mod declare;
pub mod errors;
pub mod logger;
pub mod model;
pub mod serializer;

pub use adapter::{AdapterSet, AdapterSource, ListingAdapter, SerializationAdapter};
pub use codec::{Codec, CodecBuilder};
pub use config::SerializerConfig;
pub use declare::{DeclarationTable, Declarer, DeclaresAdapters};
pub use errors::{Result, WebJsonError};
pub use model::{Listing, MappingArray};
pub use serializer::{JsonSerializer, JsonSerializerBuilder, PostProcessor};
