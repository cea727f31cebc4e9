//! The adapter registry: builds a codec per call and runs it.
//!
//! Codecs are assembled from four adapter origins, in precedence order:
//! adapters declared on the target type's field graph, adapters from the
//! configured [`AdapterSource`]s, the serializer's own base set, and
//! [`DEFAULT_ADAPTERS`]. The first registration for a slot wins, so the
//! assembly order is the precedence order.

use std::any::{type_name, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::adapter::{AdapterSet, AdapterSource, SerializationAdapter, DEFAULT_ADAPTERS};
use crate::charset::Charset;
use crate::codec::{is_blank, Codec, CodecBuilder};
use crate::config::SerializerConfig;
use crate::declare::{DeclarationTable, DeclaresAdapters};
use crate::errors::{Result, WebJsonError};
use crate::model::Listing;

const READ_INPUT_FAILED: &str = "Cannot read input.";
const READ_STREAM_FAILED: &str = "Cannot read stream.";

/// Application-specific work run on each decoded listing item.
pub trait PostProcessor<T> {
    fn process(&self, item: &mut T);
}

impl<T, F> PostProcessor<T> for F
where
    F: Fn(&mut T),
{
    fn process(&self, item: &mut T) {
        self(item)
    }
}

/// Thread-safe JSON serializer with pluggable adapters.
///
/// Every call builds a fresh [`Codec`], so adapters added with
/// [`JsonSerializer::register_adapters`] apply to all later calls.
pub struct JsonSerializer {
    base: RwLock<AdapterSet>,
    sources: Vec<Arc<dyn AdapterSource>>,
    declarations: Arc<DeclarationTable>,
    config: SerializerConfig,
}

impl JsonSerializer {
    /// A serializer with only the default adapters.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// A serializer whose base set starts with `adapters`.
    pub fn with_adapters<I>(adapters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn SerializationAdapter>>,
    {
        Self::builder().adapters(adapters).build()
    }

    pub fn builder() -> JsonSerializerBuilder {
        JsonSerializerBuilder::default()
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    pub fn declarations(&self) -> &DeclarationTable {
        &self.declarations
    }

    /// Snapshot of the base adapter set.
    pub fn base_adapters(&self) -> AdapterSet {
        self.base
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adds adapters to the base set. Instances already present are kept
    /// once. Returns how many were new.
    pub fn register_adapters<I>(&self, adapters: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn SerializationAdapter>>,
    {
        let mut base = self.base.write().unwrap_or_else(PoisonError::into_inner);
        let mut added = 0;
        for adapter in adapters {
            if base.insert(adapter) {
                added += 1;
            }
        }
        added
    }

    /// Builds a codec for one call.
    ///
    /// With a target type, adapters declared on that type's field graph
    /// are included. Without one, only source, base and default adapters
    /// apply.
    pub fn build_codec(&self, target: Option<TypeId>) -> Result<Codec> {
        let mut builder = CodecBuilder::new();

        if let Some(ty) = target {
            self.declarations
                .register_declared(ty, &mut builder, &mut HashSet::new())?;
        }

        let mut external = AdapterSet::new();
        for source in &self.sources {
            external.extend(source.adapters());
        }
        external.extend(self.base_adapters().iter().cloned());

        for adapter in external.iter() {
            tracing::debug!(adapter = adapter.name(), "[REGISTER] JSON adapter");
            adapter.register(&mut builder);
        }
        for adapter in DEFAULT_ADAPTERS {
            adapter.register(&mut builder);
        }

        if builder.shadowed() > 0 {
            tracing::debug!(
                shadowed = builder.shadowed(),
                "lower-precedence JSON adapter registrations ignored"
            );
        }
        Ok(builder.build())
    }

    /// Encode `value`, pretty-printed when the config asks for it.
    pub fn encode<T: Serialize + 'static>(&self, value: &T) -> Result<String> {
        let codec = self.build_codec(Some(TypeId::of::<T>()))?;
        if self.config.pretty {
            codec.encode_pretty(value)
        } else {
            codec.encode(value)
        }
    }

    /// Decode JSON text. Empty text yields `None`.
    pub fn decode<T: DeserializeOwned + 'static>(&self, json: &str) -> Result<Option<T>> {
        if is_blank(json) {
            return Ok(None);
        }
        let codec = self.build_codec(Some(TypeId::of::<T>()))?;
        self.log_payload(json);
        codec
            .decode(json)
            .map_err(|e| read_failure::<T>(e.into_decode(READ_INPUT_FAILED)))
    }

    /// Read a stream to its end and decode it. `encoding` names the
    /// charset of the bytes; the configured default applies without one.
    pub fn decode_from_reader<T, R>(&self, reader: R, encoding: Option<&str>) -> Result<Option<T>>
    where
        T: DeserializeOwned + 'static,
        R: Read,
    {
        let json = self.read_text::<T, R>(reader, encoding)?;
        self.decode(&json)
    }

    pub async fn decode_from_async_reader<T, R>(
        &self,
        reader: R,
        encoding: Option<&str>,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned + 'static,
        R: AsyncRead + Unpin,
    {
        let json = self.read_text_async::<T, R>(reader, encoding).await?;
        self.decode(&json)
    }

    /// Decode a `{"items": [...]}` listing.
    ///
    /// Declared adapters are not consulted. Items come back in reverse
    /// wire order unless `reverseListings` is off, and then each item is
    /// handed to every post-processor in turn. Returns `None` when the
    /// listing or its items are absent.
    pub fn decode_listing<T>(
        &self,
        json: &str,
        post_processors: &[&dyn PostProcessor<T>],
    ) -> Result<Option<Listing<T>>>
    where
        T: DeserializeOwned + 'static,
    {
        if is_blank(json) {
            return Ok(None);
        }
        let codec = self.build_codec(None)?;
        self.log_payload(json);

        let listing: Option<Listing<T>> = codec
            .decode(json)
            .map_err(|e| read_failure::<Listing<T>>(e.into_decode(READ_INPUT_FAILED)))?;
        let Some(mut items) = listing.and_then(Listing::into_items) else {
            return Ok(None);
        };

        if self.config.reverse_listings {
            items.reverse();
        }
        for item in &mut items {
            for processor in post_processors {
                processor.process(item);
            }
        }
        Ok(Some(Listing::new(items)))
    }

    pub fn decode_listing_from_reader<T, R>(
        &self,
        reader: R,
        encoding: Option<&str>,
        post_processors: &[&dyn PostProcessor<T>],
    ) -> Result<Option<Listing<T>>>
    where
        T: DeserializeOwned + 'static,
        R: Read,
    {
        let json = self.read_text::<Listing<T>, R>(reader, encoding)?;
        self.decode_listing(&json, post_processors)
    }

    pub async fn decode_listing_from_async_reader<T, R>(
        &self,
        reader: R,
        encoding: Option<&str>,
        post_processors: &[&dyn PostProcessor<T>],
    ) -> Result<Option<Listing<T>>>
    where
        T: DeserializeOwned + 'static,
        R: AsyncRead + Unpin,
    {
        let json = self.read_text_async::<Listing<T>, R>(reader, encoding).await?;
        self.decode_listing(&json, post_processors)
    }

    /// Decode raw bytes meant for a `T` with the named charset, or the
    /// configured default.
    pub(crate) fn decode_bytes<T: 'static>(
        &self,
        bytes: &[u8],
        encoding: Option<&str>,
    ) -> Result<String> {
        let name = encoding.unwrap_or(&self.config.default_encoding);
        Charset::for_name(name)
            .and_then(|charset| charset.decode(bytes))
            .map_err(read_failure::<T>)
    }

    fn read_text<T: 'static, R: Read>(
        &self,
        mut reader: R,
        encoding: Option<&str>,
    ) -> Result<String> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| read_failure::<T>(WebJsonError::decode_with(READ_STREAM_FAILED, e)))?;
        self.decode_bytes::<T>(&bytes, encoding)
    }

    async fn read_text_async<T: 'static, R>(
        &self,
        mut reader: R,
        encoding: Option<&str>,
    ) -> Result<String>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| read_failure::<T>(WebJsonError::decode_with(READ_STREAM_FAILED, e)))?;
        self.decode_bytes::<T>(&bytes, encoding)
    }

    fn log_payload(&self, json: &str) {
        if self.config.log_payloads {
            tracing::debug!(payload = json, "Decoding JSON");
        }
    }
}

fn read_failure<T>(err: WebJsonError) -> WebJsonError {
    tracing::error!(ty = type_name::<T>(), error = %err, "JSON decode failed");
    err
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSerializer")
            .field("base", &self.base_adapters())
            .field("sources", &self.sources.len())
            .field("declarations", &self.declarations)
            .field("config", &self.config)
            .finish()
    }
}

/// Composes a [`JsonSerializer`].
#[derive(Default)]
pub struct JsonSerializerBuilder {
    base: AdapterSet,
    sources: Vec<Arc<dyn AdapterSource>>,
    declarations: DeclarationTable,
    config: SerializerConfig,
}

impl JsonSerializerBuilder {
    /// Adds one adapter to the base set.
    pub fn adapter(mut self, adapter: Arc<dyn SerializationAdapter>) -> Self {
        self.base.insert(adapter);
        self
    }

    pub fn adapters<I>(mut self, adapters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn SerializationAdapter>>,
    {
        self.base.extend(adapters);
        self
    }

    /// Adds a source enumerated on every codec build.
    pub fn adapter_source<S: AdapterSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Registers `T`'s adapter declarations.
    pub fn declare<T: DeclaresAdapters>(mut self) -> Self {
        self.declarations.register::<T>();
        self
    }

    /// Replaces the declaration table built so far.
    pub fn declarations(mut self, table: DeclarationTable) -> Self {
        self.declarations = table;
        self
    }

    pub fn config(mut self, config: SerializerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> JsonSerializer {
        JsonSerializer {
            base: RwLock::new(self.base),
            sources: self.sources,
            declarations: Arc::new(self.declarations),
            config: self.config,
        }
    }
}
