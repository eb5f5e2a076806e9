//! Symbol table entries.
//!
//! Types are referenced by [`SymbolId`]. A constructed generic type such as
//! `Mock<IFoo>` is its own symbol with `type_arguments = [IFoo]` and an
//! `original_definition` pointing at `Mock<T>`.

use serde::{Deserialize, Serialize};

use super::SymbolId;

// ============================================================================
// Enums
// ============================================================================

/// Coarse symbol category, derived from [`SymbolDetail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Type,
    Method,
    Property,
    Event,
    Field,
    Parameter,
    Local,
}

/// Kind of a type symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    Delegate,
    TypeParameter,
    /// The host could not resolve the type.
    Error,
}

/// Kind of a method symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    #[default]
    Ordinary,
    Constructor,
    /// Synthesized method of a lambda expression.
    Lambda,
    /// The `Invoke` method of a delegate type.
    DelegateInvoke,
}

/// Declared accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    #[default]
    Public,
    Internal,
    Protected,
    ProtectedInternal,
    PrivateProtected,
    Private,
}

impl Accessibility {
    /// Whether a generated subclass in another assembly can call it.
    ///
    /// Mock proxies derive from the mocked type, so protected members count.
    pub fn is_reachable_from_subclass(&self) -> bool {
        !matches!(self, Accessibility::Private | Accessibility::PrivateProtected)
    }
}

/// Declaration modifiers relevant to overriding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_abstract: bool,
    pub is_override: bool,
    pub is_sealed: bool,
}

impl Modifiers {
    /// Virtual, abstract or override, and not sealed.
    pub fn is_overridable(&self) -> bool {
        !self.is_static
            && !self.is_sealed
            && (self.is_virtual || self.is_abstract || self.is_override)
    }
}

// ============================================================================
// Details
// ============================================================================

/// Type-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDetail {
    pub type_kind: TypeKind,
    #[serde(default)]
    pub base_type: Option<SymbolId>,
    #[serde(default)]
    pub interfaces: Vec<SymbolId>,
    #[serde(default)]
    pub type_arguments: Vec<SymbolId>,
    /// Members in declaration order, constructors included.
    #[serde(default)]
    pub members: Vec<SymbolId>,
    /// `Invoke` method, for delegate types.
    #[serde(default)]
    pub delegate_invoke: Option<SymbolId>,
    /// `where T : class`, for type parameters.
    #[serde(default)]
    pub has_reference_constraint: bool,
}

impl TypeDetail {
    pub fn new(type_kind: TypeKind) -> Self {
        TypeDetail {
            type_kind,
            base_type: None,
            interfaces: Vec::new(),
            type_arguments: Vec::new(),
            members: Vec::new(),
            delegate_invoke: None,
            has_reference_constraint: false,
        }
    }

    /// Whether `null` converts to this type (nullable value types aside).
    pub fn is_reference_type(&self) -> bool {
        match self.type_kind {
            TypeKind::Class | TypeKind::Interface | TypeKind::Delegate => true,
            TypeKind::TypeParameter => self.has_reference_constraint,
            TypeKind::Struct | TypeKind::Enum | TypeKind::Error => false,
        }
    }
}

/// Method-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDetail {
    #[serde(default)]
    pub method_kind: MethodKind,
    /// Parameter symbols in order.
    #[serde(default)]
    pub parameters: Vec<SymbolId>,
    /// `None` when the host could not infer it.
    #[serde(default)]
    pub return_type: Option<SymbolId>,
    #[serde(default)]
    pub type_arguments: Vec<SymbolId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDetail {
    #[serde(rename = "type")]
    pub type_: SymbolId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetail {
    pub delegate_type: SymbolId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDetail {
    #[serde(rename = "type")]
    pub type_: SymbolId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDetail {
    #[serde(default, rename = "type")]
    pub type_: Option<SymbolId>,
    pub ordinal: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDetail {
    #[serde(default, rename = "type")]
    pub type_: Option<SymbolId>,
}

/// Kind-specific symbol data, tagged by `kind` in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolDetail {
    Type(TypeDetail),
    Method(MethodDetail),
    Property(PropertyDetail),
    Event(EventDetail),
    Field(FieldDetail),
    Parameter(ParameterDetail),
    Local(LocalDetail),
}

// ============================================================================
// Symbol
// ============================================================================

/// A declaration in the host's symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    /// Simple name without generic arity (`Mock`, `Setup`).
    pub name: String,
    /// Metadata-style name (``Moq.Mock`1``, ``Moq.Mock`1.Setup``).
    pub qualified_name: String,
    #[serde(default)]
    pub container: Option<SymbolId>,
    /// Unbound definition, for generic instantiations.
    #[serde(default)]
    pub original_definition: Option<SymbolId>,
    #[serde(default)]
    pub accessibility: Accessibility,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(flatten)]
    pub detail: SymbolDetail,
}

impl Symbol {
    pub fn new(
        id: SymbolId,
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        detail: SymbolDetail,
    ) -> Self {
        Symbol {
            id,
            name: name.into(),
            qualified_name: qualified_name.into(),
            container: None,
            original_definition: None,
            accessibility: Accessibility::default(),
            modifiers: Modifiers::default(),
            detail,
        }
    }

    pub fn kind(&self) -> SymbolKind {
        match self.detail {
            SymbolDetail::Type(_) => SymbolKind::Type,
            SymbolDetail::Method(_) => SymbolKind::Method,
            SymbolDetail::Property(_) => SymbolKind::Property,
            SymbolDetail::Event(_) => SymbolKind::Event,
            SymbolDetail::Field(_) => SymbolKind::Field,
            SymbolDetail::Parameter(_) => SymbolKind::Parameter,
            SymbolDetail::Local(_) => SymbolKind::Local,
        }
    }

    pub fn as_type(&self) -> Option<&TypeDetail> {
        match &self.detail {
            SymbolDetail::Type(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodDetail> {
        match &self.detail {
            SymbolDetail::Method(detail) => Some(detail),
            _ => None,
        }
    }

    /// Type of a property, field, parameter or local. `None` for other kinds
    /// and for values the host could not type.
    pub fn value_type(&self) -> Option<SymbolId> {
        match &self.detail {
            SymbolDetail::Property(p) => Some(p.type_),
            SymbolDetail::Field(f) => Some(f.type_),
            SymbolDetail::Parameter(p) => p.type_,
            SymbolDetail::Local(l) => l.type_,
            SymbolDetail::Type(_) | SymbolDetail::Method(_) | SymbolDetail::Event(_) => None,
        }
    }

    /// Whether the symbol names a storage location a mock can live in.
    pub fn is_variable(&self) -> bool {
        matches!(
            self.kind(),
            SymbolKind::Local | SymbolKind::Parameter | SymbolKind::Field | SymbolKind::Property
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
