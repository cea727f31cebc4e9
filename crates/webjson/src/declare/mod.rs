//! Type-level adapter declarations and their discovery.
//!
//! A type declares the adapters that shape its JSON, and the types of its
//! fields, by implementing [`DeclaresAdapters`]. Declarations are collected
//! into a [`DeclarationTable`] once at startup. When a codec is built for a
//! target type, the table is walked depth first from that type through its
//! declared field types, instantiating every declared adapter it meets.

use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::adapter::SerializationAdapter;
use crate::codec::CodecBuilder;
use crate::errors::{Result, WebJsonError};

/// Constructs one declared adapter. Failure is a configuration error.
pub type AdapterFactory = fn() -> anyhow::Result<Arc<dyn SerializationAdapter>>;

/// Implemented by types that carry adapter declarations.
///
/// Declaring a field makes its adapters part of every codec built for the
/// outer type. serde's derived impls still have to hand the field to the
/// codec: annotate it with `#[serde(with = "webjson::codec::adapted")]`
/// (or `adapted::option` / `adapted::seq` for `Option<F>` / `Vec<F>`),
/// otherwise the field's own serde impl runs.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use webjson::{CodecBuilder, Declarer, DeclaresAdapters, SerializationAdapter};
///
/// #[derive(Default)]
/// struct MoneyAdapter;
///
/// impl SerializationAdapter for MoneyAdapter {
///     fn register(&self, _builder: &mut CodecBuilder) {}
/// }
///
/// #[derive(Serialize, Deserialize)]
/// struct Money(u64);
///
/// #[derive(Serialize, Deserialize)]
/// struct Invoice {
///     #[serde(with = "webjson::codec::adapted")]
///     total: Money,
/// }
///
/// impl DeclaresAdapters for Money {
///     fn declare(decl: &mut Declarer<'_>) {
///         decl.adapter::<MoneyAdapter>();
///     }
/// }
///
/// impl DeclaresAdapters for Invoice {
///     fn declare(decl: &mut Declarer<'_>) {
///         decl.field::<Money>();
///     }
/// }
/// ```
pub trait DeclaresAdapters: 'static {
    fn declare(decl: &mut Declarer<'_>);
}

#[derive(Clone)]
struct AdapterDeclaration {
    name: &'static str,
    factory: AdapterFactory,
}

#[derive(Clone)]
struct TypeDeclaration {
    type_name: &'static str,
    adapters: Vec<AdapterDeclaration>,
    fields: Vec<TypeId>,
}

impl TypeDeclaration {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            adapters: Vec::new(),
            fields: Vec::new(),
        }
    }
}

/// Records one type's declaration. Handed to [`DeclaresAdapters::declare`].
pub struct Declarer<'t> {
    table: &'t mut DeclarationTable,
    entry: TypeDeclaration,
}

impl Declarer<'_> {
    /// Declares an adapter built with its `Default` impl.
    pub fn adapter<A>(&mut self) -> &mut Self
    where
        A: SerializationAdapter + Default + 'static,
    {
        self.adapter_with(type_name::<A>(), || {
            Ok(Arc::new(A::default()) as Arc<dyn SerializationAdapter>)
        })
    }

    /// Declares an adapter built by a fallible factory.
    pub fn adapter_with(&mut self, name: &'static str, factory: AdapterFactory) -> &mut Self {
        self.entry.adapters.push(AdapterDeclaration { name, factory });
        self
    }

    /// Declares a field of type `F`, registering `F`'s own declaration too.
    ///
    /// The field must be serialized through [`crate::codec::adapted`] for
    /// `F`'s adapters to reach it.
    pub fn field<F: DeclaresAdapters>(&mut self) -> &mut Self {
        self.table.register::<F>();
        self.field_type::<F>()
    }

    /// Declares a field of type `F` without registering it. `F` is followed
    /// during discovery only if it is declared in the table by other means.
    pub fn field_type<F: 'static>(&mut self) -> &mut Self {
        let id = TypeId::of::<F>();
        if !self.entry.fields.contains(&id) {
            self.entry.fields.push(id);
        }
        self
    }
}

/// Maps types to their declared adapters and field types.
#[derive(Clone, Default)]
pub struct DeclarationTable {
    types: HashMap<TypeId, TypeDeclaration>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`'s declaration, and those of the field types it names.
    pub fn register<T: DeclaresAdapters>(&mut self) -> &mut Self {
        self.declare::<T>(T::declare)
    }

    /// Registers a declaration for `T` written out by hand. A type that is
    /// already present is left unchanged.
    pub fn declare<T: 'static>(&mut self, declare: impl FnOnce(&mut Declarer<'_>)) -> &mut Self {
        let id = TypeId::of::<T>();
        if self.types.contains_key(&id) {
            return self;
        }
        // Placeholder first, so a field cycle leading back here stops.
        self.types.insert(id, TypeDeclaration::new(type_name::<T>()));

        let mut declarer = Declarer {
            table: self,
            entry: TypeDeclaration::new(type_name::<T>()),
        };
        declare(&mut declarer);
        let entry = declarer.entry;
        self.types.insert(id, entry);
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Walks from `ty` through declared field types, registering every
    /// declared adapter into `builder`.
    ///
    /// Each type is visited at most once per walk; `seen` holds the visited
    /// set. Undeclared types are skipped without recursing. A factory
    /// failure aborts the walk with a configuration error.
    pub fn register_declared(
        &self,
        ty: TypeId,
        builder: &mut CodecBuilder,
        seen: &mut HashSet<TypeId>,
    ) -> Result<()> {
        if !seen.insert(ty) {
            return Ok(());
        }
        let Some(decl) = self.types.get(&ty) else {
            return Ok(());
        };

        for adapter in &decl.adapters {
            tracing::debug!(
                adapter = adapter.name,
                ty = decl.type_name,
                "[REGISTER] JSON adapter from declaration"
            );
            let instance = (adapter.factory)().map_err(|e| {
                WebJsonError::Config(format!(
                    "Cannot instantiate adapter declared on {}: {} ({e:#})",
                    decl.type_name, adapter.name
                ))
            })?;
            instance.register(builder);
        }

        for field in &decl.fields {
            self.register_declared(*field, builder, seen)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DeclarationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.values().map(|d| d.type_name).collect();
        names.sort_unstable();
        f.debug_struct("DeclarationTable").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codec;
    use serde::Serialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Each adapter tags the encoded value with its own name, so a test can
    // tell which registration won.
    macro_rules! tagging_adapter {
        ($adapter:ident, $target:ty, $tag:literal, $counter:ident) => {
            static $counter: AtomicUsize = AtomicUsize::new(0);

            #[derive(Default)]
            struct $adapter;

            impl SerializationAdapter for $adapter {
                fn register(&self, builder: &mut CodecBuilder) {
                    $counter.fetch_add(1, Ordering::SeqCst);
                    builder.register_encoder(|_: &$target, _: &Codec| Ok(json!($tag)));
                }
            }
        };
    }

    #[derive(Serialize)]
    struct Leaf;
    #[derive(Serialize)]
    struct Branch;
    #[derive(Serialize)]
    struct Root;
    #[derive(Serialize)]
    struct Undeclared;

    tagging_adapter!(LeafAdapter, Leaf, "leaf", LEAF_REGISTRATIONS);
    tagging_adapter!(RootAdapter, Root, "root", ROOT_REGISTRATIONS);

    impl DeclaresAdapters for Leaf {
        fn declare(decl: &mut Declarer<'_>) {
            decl.adapter::<LeafAdapter>();
        }
    }

    // Branch has no adapters of its own but still leads to Leaf.
    impl DeclaresAdapters for Branch {
        fn declare(decl: &mut Declarer<'_>) {
            decl.field::<Leaf>().field_type::<Undeclared>();
        }
    }

    impl DeclaresAdapters for Root {
        fn declare(decl: &mut Declarer<'_>) {
            decl.adapter::<RootAdapter>().field::<Branch>();
        }
    }

    fn walk<T: 'static>(table: &DeclarationTable) -> Result<Codec> {
        let mut builder = CodecBuilder::new();
        table.register_declared(TypeId::of::<T>(), &mut builder, &mut HashSet::new())?;
        Ok(builder.build())
    }

    #[test]
    fn test_register_follows_fields() {
        let mut table = DeclarationTable::new();
        table.register::<Root>();
        assert!(table.contains::<Root>());
        assert!(table.contains::<Branch>());
        assert!(table.contains::<Leaf>());
        assert!(!table.contains::<Undeclared>());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_walk_is_transitive_through_unannotated_types() {
        let mut table = DeclarationTable::new();
        table.register::<Root>();

        let codec = walk::<Root>(&table).unwrap();
        assert!(codec.has_encoder::<Root>());
        assert!(codec.has_encoder::<Leaf>());
        assert_eq!(codec.encode(&Leaf).unwrap(), r#""leaf""#);
    }

    #[test]
    fn test_walk_from_undeclared_type_registers_nothing() {
        let mut table = DeclarationTable::new();
        table.register::<Root>();

        let codec = walk::<Undeclared>(&table).unwrap();
        assert!(!codec.has_encoder::<Root>());
        assert!(!codec.has_encoder::<Leaf>());
    }

    #[test]
    fn test_walk_starts_at_target_not_root() {
        let mut table = DeclarationTable::new();
        table.register::<Root>();

        let codec = walk::<Branch>(&table).unwrap();
        assert!(codec.has_encoder::<Leaf>());
        assert!(!codec.has_encoder::<Root>());
    }

    #[test]
    fn test_each_type_visited_once() {
        let mut table = DeclarationTable::new();
        // Root reaches Leaf through Branch and again directly.
        table.declare::<Root>(|d| {
            d.adapter::<RootAdapter>().field::<Branch>().field::<Leaf>();
        });

        let before = LEAF_REGISTRATIONS.load(Ordering::SeqCst);
        let mut builder = CodecBuilder::new();
        table
            .register_declared(TypeId::of::<Root>(), &mut builder, &mut HashSet::new())
            .unwrap();
        assert_eq!(builder.shadowed(), 0);
        assert!(LEAF_REGISTRATIONS.load(Ordering::SeqCst) > before);
        assert!(ROOT_REGISTRATIONS.load(Ordering::SeqCst) > 0);
    }

    struct CycleA;
    struct CycleB;

    tagging_adapter!(CycleAAdapter, CycleA, "a", CYCLE_A_REGISTRATIONS);
    tagging_adapter!(CycleBAdapter, CycleB, "b", CYCLE_B_REGISTRATIONS);

    impl DeclaresAdapters for CycleA {
        fn declare(decl: &mut Declarer<'_>) {
            decl.adapter::<CycleAAdapter>().field::<CycleB>();
        }
    }

    impl DeclaresAdapters for CycleB {
        fn declare(decl: &mut Declarer<'_>) {
            decl.adapter::<CycleBAdapter>().field::<CycleA>();
        }
    }

    #[test]
    fn test_cyclic_graph_terminates_without_duplicates() {
        let mut table = DeclarationTable::new();
        table.register::<CycleA>();
        assert_eq!(table.len(), 2);

        let mut builder = CodecBuilder::new();
        table
            .register_declared(TypeId::of::<CycleA>(), &mut builder, &mut HashSet::new())
            .unwrap();

        assert_eq!(CYCLE_A_REGISTRATIONS.load(Ordering::SeqCst), 1);
        assert_eq!(CYCLE_B_REGISTRATIONS.load(Ordering::SeqCst), 1);
        assert_eq!(builder.shadowed(), 0);
    }

    #[test]
    fn test_failing_factory_is_config_error() {
        let mut table = DeclarationTable::new();
        table.declare::<Root>(|d| {
            d.adapter::<RootAdapter>()
                .adapter_with("BrokenAdapter", || anyhow::bail!("no credentials"));
        });

        let err = walk::<Root>(&table).unwrap_err();
        assert!(err.is_config());
        let msg = err.to_string();
        assert!(msg.contains("BrokenAdapter"));
        assert!(msg.contains("no credentials"));
    }

    #[test]
    fn test_redeclaring_keeps_first_declaration() {
        let mut table = DeclarationTable::new();
        table.declare::<Leaf>(|_| {});
        table.register::<Leaf>();

        let codec = walk::<Leaf>(&table).unwrap();
        assert!(!codec.has_encoder::<Leaf>());
    }
}
