//! Pluggable per-type serialization customizations.
//!
//! An adapter contributes encoders/decoders to a [`CodecBuilder`] each time
//! a codec is built. Adapters come from three places: the serializer's own
//! base set, [`AdapterSource`]s supplied by the application at composition
//! time, and declarations discovered by walking a type's field graph (see
//! [`crate::declare`]).

mod listing;

use std::fmt;
use std::sync::Arc;

use crate::codec::CodecBuilder;

pub use listing::{ListingAdapter, DEFAULT_ADAPTERS};

/// A customization of how one or more types are encoded/decoded.
pub trait SerializationAdapter: Send + Sync {
    /// Contribute encoders/decoders to the codec being built.
    fn register(&self, builder: &mut CodecBuilder);

    /// Human-readable name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Ordered set of adapter instances, keyed by instance identity.
///
/// Inserting an instance that is already present is a no-op, so adapters
/// registered twice are applied once.
#[derive(Clone, Default)]
pub struct AdapterSet {
    adapters: Vec<Arc<dyn SerializationAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an adapter. Returns false if this exact instance was already present.
    pub fn insert(&mut self, adapter: Arc<dyn SerializationAdapter>) -> bool {
        if self.contains(&adapter) {
            return false;
        }
        self.adapters.push(adapter);
        true
    }

    /// Returns true if this exact instance is in the set.
    pub fn contains(&self, adapter: &Arc<dyn SerializationAdapter>) -> bool {
        let needle = identity(adapter);
        self.adapters.iter().any(|a| identity(a) == needle)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Iterates adapters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SerializationAdapter>> {
        self.adapters.iter()
    }
}

impl Extend<Arc<dyn SerializationAdapter>> for AdapterSet {
    fn extend<I: IntoIterator<Item = Arc<dyn SerializationAdapter>>>(&mut self, iter: I) {
        for adapter in iter {
            self.insert(adapter);
        }
    }
}

impl FromIterator<Arc<dyn SerializationAdapter>> for AdapterSet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn SerializationAdapter>>>(iter: I) -> Self {
        let mut set = AdapterSet::new();
        set.extend(iter);
        set
    }
}

impl fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.adapters.iter().map(|a| a.name()))
            .finish()
    }
}

// Thin data pointer; vtable pointers are not a stable identity.
fn identity(adapter: &Arc<dyn SerializationAdapter>) -> *const () {
    Arc::as_ptr(adapter) as *const ()
}

/// Externally supplied adapters, enumerated on every codec build.
///
/// This is the composition-time replacement for container-injected
/// adapters: application wiring hands the serializer one or more sources
/// and they are asked for their adapters whenever a codec is assembled.
pub trait AdapterSource: Send + Sync {
    fn adapters(&self) -> Vec<Arc<dyn SerializationAdapter>>;
}

impl AdapterSource for AdapterSet {
    fn adapters(&self) -> Vec<Arc<dyn SerializationAdapter>> {
        self.adapters.clone()
    }
}

impl<F> AdapterSource for F
where
    F: Fn() -> Vec<Arc<dyn SerializationAdapter>> + Send + Sync,
{
    fn adapters(&self) -> Vec<Arc<dyn SerializationAdapter>> {
        self()
    }
}
