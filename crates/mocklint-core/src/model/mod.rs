//! Host model: the syntax and symbol graph a host adapter hands to the analyzer.
//!
//! A host (an IDE plugin, a compiler driver, a test) lowers its own syntax tree
//! and semantic model into a [`Compilation`]:
//! - [`Node`]: typed syntax nodes with parent links, spans and bindings
//! - [`Symbol`]: declarations (types, methods, properties, events, ...)
//! - [`SourceFile`]: file paths, root nodes and optional source text
//!
//! Ids are dense indices into the compilation's arenas, so `NodeId(7)` is the
//! eighth node. [`Compilation::validate`] rejects documents that break this.
//!
//! # Declaration identity
//!
//! Generic instantiations are separate symbols whose `original_definition`
//! points to the unbound declaration. [`DeclarationKey`] collapses them, so
//! `Mock<IFoo>.Setup` and `Mock<IBar>.Setup` compare equal.

pub mod builder;
pub mod compilation;
pub mod symbols;
pub mod syntax;

use serde::{Deserialize, Serialize};

pub use builder::CompilationBuilder;
pub use compilation::{Compilation, SourceFile};
pub use symbols::{
    Accessibility, EventDetail, FieldDetail, LocalDetail, MethodDetail, MethodKind, Modifiers,
    ParameterDetail, PropertyDetail, Symbol, SymbolDetail, SymbolKind, TypeDetail, TypeKind,
};
pub use syntax::{
    Ancestors, AssignmentOperator, Descendants, LiteralKind, Node, NodeKind,
};

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a source file within a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new file ID.
    pub fn new(id: u32) -> Self {
        FileId(id)
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file_{}", self.0)
    }
}

/// Unique identifier for a syntax node within a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new node ID.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Unique identifier for a symbol within a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Create a new symbol ID.
    pub fn new(id: u32) -> Self {
        SymbolId(id)
    }

    /// Arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sym_{}", self.0)
    }
}

/// Identity of a compilation, used to key per-compilation caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct CompilationId(pub u64);

impl CompilationId {
    /// Create a new compilation ID.
    pub fn new(id: u64) -> Self {
        CompilationId(id)
    }
}

impl std::fmt::Display for CompilationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "comp_{}", self.0)
    }
}

// ============================================================================
// Declaration Identity
// ============================================================================

/// Value identity of a declaration, stable across generic instantiation.
///
/// Equal to the symbol's original definition. Obtain one through
/// [`Compilation::declaration_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct DeclarationKey(SymbolId);

impl DeclarationKey {
    pub(crate) fn from_definition(definition: SymbolId) -> Self {
        DeclarationKey(definition)
    }

    /// The unbound definition this key stands for.
    pub fn definition(&self) -> SymbolId {
        self.0
    }
}

impl std::fmt::Display for DeclarationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "decl_{}", (self.0).0)
    }
}
