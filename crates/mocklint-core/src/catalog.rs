//! Well-known Moq and BCL symbols, resolved once per compilation.
//!
//! [`SymbolCatalog::resolve`] only looks up ``Moq.Mock`1``. If that type is
//! missing the library is not referenced and every rule stays silent. All
//! other entries resolve lazily on first query: each method family and each
//! well-known type sits in its own [`OnceLock`], so concurrent first queries
//! resolve it once and later reads take no lock.
//!
//! Every predicate compares [`DeclarationKey`]s, so `Setup<int>` and
//! `Setup<string>` (or `Setup` on `Mock<IFoo>` and on `Mock<IBar>`) are the
//! same logical method.
//!
//! [`CatalogCache`] owns the catalogs of live compilations, keyed by
//! [`CompilationId`], until the caller discards them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use tracing::debug;

use crate::model::{Compilation, CompilationId, DeclarationKey, SymbolId};

// ============================================================================
// Well-known names
// ============================================================================

pub const MOCK_OF_T: &str = "Moq.Mock`1";
pub const MOCK: &str = "Moq.Mock";
pub const MOCK_BEHAVIOR: &str = "Moq.MockBehavior";
pub const IT: &str = "Moq.It";
pub const IS_ANY_TYPE: &str = "Moq.It+IsAnyType";
pub const TIMES: &str = "Moq.Times";

const ICALLBACK: &str = "Moq.Language.ICallback";
const ICALLBACK_OF: &str = "Moq.Language.ICallback`2";
const IRETURNS: &str = "Moq.Language.IReturns`2";
const ISEQUENTIAL_RESULT: &str = "Moq.Language.ISetupSequentialResult`1";
const ITHROWS: &str = "Moq.Language.IThrows";
const IVERIFIES: &str = "Moq.Language.IVerifies";
const IRAISE: &str = "Moq.Language.IRaise`1";
const ICALL_BASE: &str = "Moq.Language.ICallBase";
const RETURNS_EXTENSIONS: &str = "Moq.ReturnsExtensions";
const SEQUENCE_EXTENSIONS: &str = "Moq.SequenceExtensions";

/// Method families the rules ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodFamily {
    /// `Setup`, `SetupGet`, `SetupSet`, `SetupSequence`
    Setup,
    /// Instance `Verify`, `VerifyGet`, `VerifySet`
    Verify,
    /// Instance `VerifyAll`
    VerifyAll,
    /// Static `Mock.Verify(params Mock[])`
    StaticVerify,
    /// Static `Mock.VerifyAll(params Mock[])`
    StaticVerifyAll,
    Callback,
    Returns,
    ReturnsAsync,
    /// `Throws` and `ThrowsAsync`
    Throws,
    CallBase,
    Verifiable,
    /// `Mock<T>.Raise(...)`
    Raise,
    /// Fluent `Setup(...).Raises(...)`
    Raises,
    As,
    ItIsAny,
    ItIs,
    /// Any method of `Moq.It`
    ItMatcher,
}

impl MethodFamily {
    const ALL: [MethodFamily; 17] = [
        MethodFamily::Setup,
        MethodFamily::Verify,
        MethodFamily::VerifyAll,
        MethodFamily::StaticVerify,
        MethodFamily::StaticVerifyAll,
        MethodFamily::Callback,
        MethodFamily::Returns,
        MethodFamily::ReturnsAsync,
        MethodFamily::Throws,
        MethodFamily::CallBase,
        MethodFamily::Verifiable,
        MethodFamily::Raise,
        MethodFamily::Raises,
        MethodFamily::As,
        MethodFamily::ItIsAny,
        MethodFamily::ItIs,
        MethodFamily::ItMatcher,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Containing types, method names (empty = any) and required staticness.
    fn definition(self) -> (&'static [&'static str], &'static [&'static str], Staticness) {
        use Staticness::*;
        match self {
            MethodFamily::Setup => (
                &[MOCK_OF_T],
                &["Setup", "SetupGet", "SetupSet", "SetupSequence"],
                Instance,
            ),
            MethodFamily::Verify => (
                &[MOCK_OF_T, MOCK],
                &["Verify", "VerifyGet", "VerifySet"],
                Instance,
            ),
            MethodFamily::VerifyAll => (&[MOCK_OF_T, MOCK], &["VerifyAll"], Instance),
            MethodFamily::StaticVerify => (&[MOCK], &["Verify"], Static),
            MethodFamily::StaticVerifyAll => (&[MOCK], &["VerifyAll"], Static),
            MethodFamily::Callback => (&[ICALLBACK, ICALLBACK_OF], &["Callback"], Either),
            MethodFamily::Returns => (&[IRETURNS, ISEQUENTIAL_RESULT], &["Returns"], Either),
            MethodFamily::ReturnsAsync => (
                &[RETURNS_EXTENSIONS, SEQUENCE_EXTENSIONS],
                &["ReturnsAsync"],
                Either,
            ),
            MethodFamily::Throws => (
                &[ITHROWS, ISEQUENTIAL_RESULT, RETURNS_EXTENSIONS, SEQUENCE_EXTENSIONS],
                &["Throws", "ThrowsAsync"],
                Either,
            ),
            MethodFamily::CallBase => (&[ICALL_BASE, ISEQUENTIAL_RESULT], &["CallBase"], Either),
            MethodFamily::Verifiable => (&[IVERIFIES], &["Verifiable"], Either),
            MethodFamily::Raise => (&[MOCK_OF_T], &["Raise", "RaiseAsync"], Instance),
            MethodFamily::Raises => (&[IRAISE], &["Raises"], Either),
            MethodFamily::As => (&[MOCK_OF_T, MOCK], &["As"], Instance),
            MethodFamily::ItIsAny => (&[IT], &["IsAny"], Static),
            MethodFamily::ItIs => (&[IT], &["Is"], Static),
            MethodFamily::ItMatcher => (&[IT], &[], Static),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Staticness {
    Static,
    Instance,
    Either,
}

/// Well-known types the rules ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownType {
    Mock,
    MockBehavior,
    IsAnyType,
    Times,
    Object,
    Void,
    Nullable,
    EventHandler,
    EventHandlerOfT,
}

impl WellKnownType {
    const ALL: [WellKnownType; 9] = [
        WellKnownType::Mock,
        WellKnownType::MockBehavior,
        WellKnownType::IsAnyType,
        WellKnownType::Times,
        WellKnownType::Object,
        WellKnownType::Void,
        WellKnownType::Nullable,
        WellKnownType::EventHandler,
        WellKnownType::EventHandlerOfT,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn qualified_name(self) -> &'static str {
        match self {
            WellKnownType::Mock => MOCK,
            WellKnownType::MockBehavior => MOCK_BEHAVIOR,
            WellKnownType::IsAnyType => IS_ANY_TYPE,
            WellKnownType::Times => TIMES,
            WellKnownType::Object => "System.Object",
            WellKnownType::Void => "System.Void",
            WellKnownType::Nullable => "System.Nullable`1",
            WellKnownType::EventHandler => "System.EventHandler",
            WellKnownType::EventHandlerOfT => "System.EventHandler`1",
        }
    }
}

// ============================================================================
// SymbolCatalog
// ============================================================================

/// Per-compilation resolution of the mocking library's symbols.
#[derive(Debug)]
pub struct SymbolCatalog {
    compilation: Arc<Compilation>,
    mock_of_t: DeclarationKey,
    families: [OnceLock<HashSet<DeclarationKey>>; MethodFamily::ALL.len()],
    types: [OnceLock<Option<DeclarationKey>>; WellKnownType::ALL.len()],
    strict_field: OnceLock<Option<DeclarationKey>>,
}

impl SymbolCatalog {
    /// `None` when ``Moq.Mock`1`` is not part of the compilation.
    pub fn resolve(compilation: Arc<Compilation>) -> Option<SymbolCatalog> {
        let mock = compilation.type_by_name(MOCK_OF_T)?;
        let mock_of_t = compilation.declaration_key(mock);
        Some(SymbolCatalog {
            compilation,
            mock_of_t,
            families: std::array::from_fn(|_| OnceLock::new()),
            types: std::array::from_fn(|_| OnceLock::new()),
            strict_field: OnceLock::new(),
        })
    }

    pub fn compilation(&self) -> &Compilation {
        &self.compilation
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    fn family(&self, family: MethodFamily) -> &HashSet<DeclarationKey> {
        self.families[family.index()].get_or_init(|| self.resolve_family(family))
    }

    fn resolve_family(&self, family: MethodFamily) -> HashSet<DeclarationKey> {
        let (containers, names, staticness) = family.definition();
        let comp = &*self.compilation;
        let mut keys = HashSet::new();
        for container in containers {
            let Some(ty) = comp.type_by_name(container) else {
                continue;
            };
            let Some(detail) = comp.type_detail(ty) else {
                continue;
            };
            for member in &detail.members {
                let Some(symbol) = comp.symbol(*member) else {
                    continue;
                };
                if symbol.as_method().is_none() {
                    continue;
                }
                if !names.is_empty() && !names.contains(&symbol.name.as_str()) {
                    continue;
                }
                let matches_static = match staticness {
                    Staticness::Static => symbol.modifiers.is_static,
                    Staticness::Instance => !symbol.modifiers.is_static,
                    Staticness::Either => true,
                };
                if matches_static {
                    keys.insert(comp.declaration_key(*member));
                }
            }
        }
        debug!(?family, count = keys.len(), "resolved method family");
        keys
    }

    fn well_known(&self, ty: WellKnownType) -> Option<DeclarationKey> {
        *self.types[ty.index()].get_or_init(|| {
            self.compilation
                .type_by_name(ty.qualified_name())
                .map(|id| self.compilation.declaration_key(id))
        })
    }

    /// The symbol of a well-known type, if the compilation has it.
    pub fn well_known_type(&self, ty: WellKnownType) -> Option<SymbolId> {
        self.well_known(ty).map(|key| key.definition())
    }

    fn in_family(&self, symbol: SymbolId, family: MethodFamily) -> bool {
        self.family(family)
            .contains(&self.compilation.declaration_key(symbol))
    }

    fn is_type(&self, symbol: SymbolId, ty: WellKnownType) -> bool {
        self.well_known(ty)
            .is_some_and(|key| key == self.compilation.declaration_key(symbol))
    }

    // ------------------------------------------------------------------------
    // Method predicates
    // ------------------------------------------------------------------------

    pub fn is_setup_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::Setup)
    }

    pub fn is_verify_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::Verify)
    }

    pub fn is_verify_all_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::VerifyAll)
    }

    /// Static `Mock.Verify` or `Mock.VerifyAll`.
    pub fn is_static_verify_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::StaticVerify)
            || self.in_family(symbol, MethodFamily::StaticVerifyAll)
    }

    pub fn is_static_verify_all_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::StaticVerifyAll)
    }

    pub fn is_callback_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::Callback)
    }

    pub fn is_returns_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::Returns)
    }

    pub fn is_returns_async_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::ReturnsAsync)
    }

    pub fn is_throws_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::Throws)
    }

    pub fn is_call_base_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::CallBase)
    }

    pub fn is_verifiable_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::Verifiable)
    }

    pub fn is_raise_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::Raise)
    }

    pub fn is_raises_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::Raises)
    }

    pub fn is_as_method(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::As)
    }

    pub fn is_it_is_any(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::ItIsAny)
    }

    pub fn is_it_is(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::ItIs)
    }

    /// Any `Moq.It` matcher, `IsAny` and `Is` included.
    pub fn is_it_matcher(&self, symbol: SymbolId) -> bool {
        self.in_family(symbol, MethodFamily::ItMatcher)
    }

    /// Returns, ReturnsAsync, Throws/ThrowsAsync or CallBase.
    pub fn is_terminating_method(&self, symbol: SymbolId) -> bool {
        self.is_returns_method(symbol)
            || self.is_returns_async_method(symbol)
            || self.is_throws_method(symbol)
            || self.is_call_base_method(symbol)
    }

    // ------------------------------------------------------------------------
    // Type predicates
    // ------------------------------------------------------------------------

    /// ``Mock<T>``, constructed or not.
    pub fn is_mock_type(&self, symbol: SymbolId) -> bool {
        self.compilation.declaration_key(symbol) == self.mock_of_t
    }

    pub fn is_mock_behavior_type(&self, symbol: SymbolId) -> bool {
        self.is_type(symbol, WellKnownType::MockBehavior)
    }

    pub fn is_mock_behavior_strict_field(&self, symbol: SymbolId) -> bool {
        let strict = self.strict_field.get_or_init(|| {
            let behavior = self.well_known_type(WellKnownType::MockBehavior)?;
            let detail = self.compilation.type_detail(behavior)?;
            detail
                .members
                .iter()
                .copied()
                .find(|m| {
                    self.compilation
                        .symbol(*m)
                        .is_some_and(|s| s.name == "Strict")
                })
                .map(|m| self.compilation.declaration_key(m))
        });
        strict.is_some_and(|key| key == self.compilation.declaration_key(symbol))
    }

    pub fn is_any_type_placeholder(&self, symbol: SymbolId) -> bool {
        self.is_type(symbol, WellKnownType::IsAnyType)
    }

    pub fn is_times_type(&self, symbol: SymbolId) -> bool {
        self.is_type(symbol, WellKnownType::Times)
    }

    pub fn is_object_type(&self, symbol: SymbolId) -> bool {
        self.is_type(symbol, WellKnownType::Object)
    }

    pub fn is_void_type(&self, symbol: SymbolId) -> bool {
        self.is_type(symbol, WellKnownType::Void)
    }

    /// `EventHandler` or `EventHandler<T>`.
    pub fn is_event_handler_type(&self, symbol: SymbolId) -> bool {
        self.is_type(symbol, WellKnownType::EventHandler)
            || self.is_type(symbol, WellKnownType::EventHandlerOfT)
    }

    pub fn is_nullable_type(&self, symbol: SymbolId) -> bool {
        self.is_type(symbol, WellKnownType::Nullable)
    }

    /// Declared by the mocking library.
    pub fn is_library_symbol(&self, symbol: SymbolId) -> bool {
        let definition = self.compilation.original_definition(symbol);
        self.compilation
            .symbol(definition)
            .is_some_and(|s| s.qualified_name.starts_with("Moq."))
    }
}

// ============================================================================
// CatalogCache
// ============================================================================

/// Catalogs of live compilations, keyed by compilation id.
///
/// A `None` entry records that the library is absent so the lookup is not
/// repeated. An entry only answers for the compilation it was resolved from;
/// a different compilation reusing the id replaces it.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: Mutex<HashMap<CompilationId, CacheEntry>>,
}

#[derive(Debug)]
struct CacheEntry {
    /// A weak handle keeps the allocation, so its address is not reused.
    compilation: Weak<Compilation>,
    catalog: Option<Arc<SymbolCatalog>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog for `compilation`, resolving it on first request.
    pub fn get_or_resolve(&self, compilation: &Arc<Compilation>) -> Option<Arc<SymbolCatalog>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get(&compilation.id) {
            if Weak::ptr_eq(&entry.compilation, &Arc::downgrade(compilation)) {
                return entry.catalog.clone();
            }
            debug!(compilation = %compilation.id, "compilation id reused, resolving again");
        }
        let catalog = SymbolCatalog::resolve(Arc::clone(compilation)).map(Arc::new);
        if catalog.is_none() {
            debug!(compilation = %compilation.id, "mocking library not referenced");
        }
        entries.insert(
            compilation.id,
            CacheEntry {
                compilation: Arc::downgrade(compilation),
                catalog: catalog.clone(),
            },
        );
        catalog
    }

    /// End a compilation's catalog lifecycle. Returns whether it was cached.
    pub fn discard(&self, id: CompilationId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::MoqFixture;
    use crate::model::CompilationBuilder;

    fn catalog(fixture: MoqFixture) -> SymbolCatalog {
        SymbolCatalog::resolve(Arc::new(fixture.finish())).expect("fixture references Moq")
    }

    mod resolution {
        use super::*;

        #[test]
        fn missing_mock_type_is_not_available() {
            let comp = CompilationBuilder::new(CompilationId(3)).finish();
            assert!(SymbolCatalog::resolve(Arc::new(comp)).is_none());
        }

        #[test]
        fn setup_on_different_instantiations_is_the_same_method() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let bar = fx.interface("IBar");
            let setup_foo = fx.mock_method(foo, "Setup");
            let setup_bar = fx.mock_method(bar, "Setup");
            let verify_foo = fx.mock_method(foo, "Verify");
            let cat = catalog(fx);

            assert_ne!(setup_foo, setup_bar);
            assert!(cat.is_setup_method(setup_foo));
            assert!(cat.is_setup_method(setup_bar));
            assert!(!cat.is_setup_method(verify_foo));
            assert!(cat.is_verify_method(verify_foo));
        }

        #[test]
        fn static_and_instance_verify_all_are_distinct() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let instance = fx.mock_method(foo, "VerifyAll");
            let stat = fx.static_mock_method("VerifyAll");
            let cat = catalog(fx);

            assert!(cat.is_verify_all_method(instance));
            assert!(!cat.is_static_verify_method(instance));
            assert!(cat.is_static_verify_method(stat));
            assert!(cat.is_static_verify_all_method(stat));
            assert!(!cat.is_verify_all_method(stat));
        }

        #[test]
        fn strict_field_and_placeholder_types() {
            let fx = MoqFixture::new();
            let strict = fx.behavior_field("Strict");
            let loose = fx.behavior_field("Loose");
            let any_type = fx.any_type();
            let object = fx.object();
            let cat = catalog(fx);

            assert!(cat.is_mock_behavior_strict_field(strict));
            assert!(!cat.is_mock_behavior_strict_field(loose));
            assert!(cat.is_any_type_placeholder(any_type));
            assert!(cat.is_object_type(object));
            assert!(!cat.is_object_type(any_type));
        }

        #[test]
        fn library_symbols_are_recognized_by_namespace() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let run = fx.method(foo, "Run", &[], None);
            let setup = fx.mock_method(foo, "Setup");
            let cat = catalog(fx);

            assert!(cat.is_library_symbol(setup));
            assert!(!cat.is_library_symbol(run));
        }
    }

    mod cache {
        use super::*;

        #[test]
        fn cache_resolves_once_and_discards() {
            let comp = Arc::new(MoqFixture::new().finish());
            let cache = CatalogCache::new();
            let first = cache.get_or_resolve(&comp).unwrap();
            let second = cache.get_or_resolve(&comp).unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(cache.len(), 1);
            assert!(cache.discard(comp.id));
            assert!(!cache.discard(comp.id));
            assert!(cache.is_empty());
        }

        #[test]
        fn reused_id_resolves_the_new_compilation() {
            let first = Arc::new(MoqFixture::new().finish());
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let setup = fx.mock_method(foo, "Setup");
            let second = Arc::new(fx.finish());
            assert_eq!(first.id, second.id);

            let cache = CatalogCache::new();
            let stale = cache.get_or_resolve(&first).unwrap();
            let fresh = cache.get_or_resolve(&second).unwrap();
            assert!(!Arc::ptr_eq(&stale, &fresh));
            assert!(Arc::ptr_eq(&fresh.compilation, &second));
            assert!(fresh.is_setup_method(setup));
            assert_eq!(cache.len(), 1);
        }

        #[test]
        fn reused_id_replaces_an_absent_library_entry() {
            let bare = Arc::new(CompilationBuilder::new(CompilationId(1)).finish());
            let with_moq = Arc::new(MoqFixture::new().finish());
            assert_eq!(bare.id, with_moq.id);

            let cache = CatalogCache::new();
            assert!(cache.get_or_resolve(&bare).is_none());
            assert!(cache.get_or_resolve(&with_moq).is_some());
        }

        #[test]
        fn absent_library_is_cached_as_none() {
            let comp = Arc::new(CompilationBuilder::new(CompilationId(9)).finish());
            let cache = CatalogCache::new();
            assert!(cache.get_or_resolve(&comp).is_none());
            assert_eq!(cache.len(), 1);
        }

        #[test]
        fn concurrent_first_queries_agree() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let setup = fx.mock_method(foo, "Setup");
            let cat = Arc::new(catalog(fx));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cat = Arc::clone(&cat);
                    std::thread::spawn(move || cat.is_setup_method(setup))
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap());
            }
        }
    }
}
