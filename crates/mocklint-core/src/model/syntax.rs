//! Syntax nodes and tree walks.
//!
//! [`NodeKind`] is a closed sum type: every consumer matches it exhaustively
//! instead of probing node types at runtime. Child links live in the kind,
//! parent links on the [`Node`].
//!
//! Two walks are provided:
//! - [`Ancestors`]: from a node upward, optionally stopping at a scope root.
//!   The iterator is `Clone`, so a walk can be restarted from any point.
//! - [`Descendants`]: pre-order from a root, optionally refusing to enter
//!   nested method declarations and local functions.
//!
//! Both stop yielding as soon as the [`CancellationToken`] is set.

use serde::{Deserialize, Serialize};

use super::compilation::Compilation;
use super::{FileId, NodeId, SymbolId};
use crate::cancel::{CancelCheck, CancellationToken};
use crate::types::Span;

// ============================================================================
// Node Kinds
// ============================================================================

/// Kind of literal expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
    /// `null`
    Null,
    /// `default` or `default(T)`
    Default,
    Boolean,
    Number,
    String,
    Char,
}

/// Operator of an assignment expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOperator {
    /// `=`
    #[default]
    Assign,
    /// `+=` (event subscription when the target is an event)
    AddAssign,
    /// `-=`
    SubtractAssign,
}

/// Syntax node kind with its child links.
///
/// Serialized internally tagged: `{"kind": "invocation", "expression": 4, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    CompilationUnit {
        #[serde(default)]
        members: Vec<NodeId>,
    },
    TypeDeclaration {
        name: String,
        #[serde(default)]
        members: Vec<NodeId>,
    },
    MethodDeclaration {
        name: String,
        #[serde(default)]
        parameters: Vec<NodeId>,
        #[serde(default)]
        body: Option<NodeId>,
    },
    LocalFunction {
        name: String,
        #[serde(default)]
        parameters: Vec<NodeId>,
        #[serde(default)]
        body: Option<NodeId>,
    },
    Block {
        #[serde(default)]
        statements: Vec<NodeId>,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    /// `var name = initializer;` The node's symbol is the declared local.
    LocalDeclaration {
        name: String,
        #[serde(default)]
        initializer: Option<NodeId>,
    },
    Return {
        #[serde(default)]
        expression: Option<NodeId>,
    },
    /// A call. The node's symbol is the invoked method.
    Invocation {
        expression: NodeId,
        #[serde(default)]
        arguments: Vec<NodeId>,
    },
    /// A call argument, optionally named (`name: expr`).
    Argument {
        #[serde(default)]
        name: Option<String>,
        expression: NodeId,
    },
    /// `expression.name`. The node's symbol is the accessed member.
    MemberAccess {
        expression: NodeId,
        name: String,
    },
    /// A simple name. The node's symbol is whatever the name binds to.
    Identifier {
        name: String,
    },
    /// `new T(arguments)`. The node's symbol is the constructor, its type is `T`.
    ObjectCreation {
        #[serde(default)]
        arguments: Vec<NodeId>,
    },
    /// The node's symbol is the lambda's synthesized method.
    Lambda {
        #[serde(default)]
        parameters: Vec<NodeId>,
        body: NodeId,
    },
    /// A parameter declaration. The node's symbol is the parameter.
    Parameter {
        name: String,
    },
    Literal {
        literal: LiteralKind,
    },
    Assignment {
        target: NodeId,
        #[serde(default)]
        operator: AssignmentOperator,
        value: NodeId,
    },
    Parenthesized {
        expression: NodeId,
    },
    /// Anything the analyzer has no use for. Children are still walked.
    Other {
        #[serde(default)]
        children: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Child node ids in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::CompilationUnit { members } | NodeKind::TypeDeclaration { members, .. } => {
                members.clone()
            }
            NodeKind::MethodDeclaration {
                parameters, body, ..
            }
            | NodeKind::LocalFunction {
                parameters, body, ..
            } => parameters.iter().copied().chain(*body).collect(),
            NodeKind::Block { statements } => statements.clone(),
            NodeKind::ExpressionStatement { expression }
            | NodeKind::Argument { expression, .. }
            | NodeKind::MemberAccess { expression, .. }
            | NodeKind::Parenthesized { expression } => vec![*expression],
            NodeKind::LocalDeclaration { initializer, .. } => initializer.iter().copied().collect(),
            NodeKind::Return { expression } => expression.iter().copied().collect(),
            NodeKind::Invocation {
                expression,
                arguments,
            } => std::iter::once(*expression)
                .chain(arguments.iter().copied())
                .collect(),
            NodeKind::ObjectCreation { arguments } => arguments.clone(),
            NodeKind::Lambda { parameters, body } => {
                parameters.iter().copied().chain(Some(*body)).collect()
            }
            NodeKind::Assignment { target, value, .. } => vec![*target, *value],
            NodeKind::Other { children } => children.clone(),
            NodeKind::Identifier { .. } | NodeKind::Parameter { .. } | NodeKind::Literal { .. } => {
                Vec::new()
            }
        }
    }

    /// Method declaration, local function or lambda.
    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            NodeKind::MethodDeclaration { .. }
                | NodeKind::LocalFunction { .. }
                | NodeKind::Lambda { .. }
        )
    }

    /// Method declaration or local function. Lambdas are excluded.
    pub fn is_function_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::MethodDeclaration { .. } | NodeKind::LocalFunction { .. }
        )
    }

    /// Invocation or object creation.
    pub fn is_call_site(&self) -> bool {
        matches!(
            self,
            NodeKind::Invocation { .. } | NodeKind::ObjectCreation { .. }
        )
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::CompilationUnit { .. } => "compilation_unit",
            NodeKind::TypeDeclaration { .. } => "type_declaration",
            NodeKind::MethodDeclaration { .. } => "method_declaration",
            NodeKind::LocalFunction { .. } => "local_function",
            NodeKind::Block { .. } => "block",
            NodeKind::ExpressionStatement { .. } => "expression_statement",
            NodeKind::LocalDeclaration { .. } => "local_declaration",
            NodeKind::Return { .. } => "return",
            NodeKind::Invocation { .. } => "invocation",
            NodeKind::Argument { .. } => "argument",
            NodeKind::MemberAccess { .. } => "member_access",
            NodeKind::Identifier { .. } => "identifier",
            NodeKind::ObjectCreation { .. } => "object_creation",
            NodeKind::Lambda { .. } => "lambda",
            NodeKind::Parameter { .. } => "parameter",
            NodeKind::Literal { .. } => "literal",
            NodeKind::Assignment { .. } => "assignment",
            NodeKind::Parenthesized { .. } => "parenthesized",
            NodeKind::Other { .. } => "other",
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// A syntax node with its semantic bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub file: FileId,
    #[serde(default)]
    pub parent: Option<NodeId>,
    pub span: Span,
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Declaration the host bound this node to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolId>,
    /// Static type of the expression.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<SymbolId>,
}

// ============================================================================
// Walks
// ============================================================================

/// Lazy walk from a node's parent up to the root, or to a scope root.
///
/// The scope root, when given, is the last node yielded.
#[derive(Clone)]
pub struct Ancestors<'a> {
    compilation: &'a Compilation,
    next: Option<NodeId>,
    scope: Option<NodeId>,
    /// Steps left; a tree never has more ancestors than nodes.
    budget: usize,
    cancel: &'a CancellationToken,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(
        compilation: &'a Compilation,
        node: NodeId,
        scope: Option<NodeId>,
        cancel: &'a CancellationToken,
    ) -> Self {
        let next = compilation.node(node).and_then(|n| n.parent);
        Ancestors {
            compilation,
            next,
            scope,
            budget: compilation.nodes.len(),
            cancel,
        }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        self.cancel.check()?;
        self.budget = self.budget.checked_sub(1)?;
        let id = self.next.take()?;
        let node = self.compilation.node(id)?;
        if self.scope != Some(id) {
            self.next = node.parent;
        }
        Some(node)
    }
}

/// Pre-order walk of a subtree, root included.
pub struct Descendants<'a> {
    compilation: &'a Compilation,
    root: NodeId,
    stack: Vec<NodeId>,
    enter_functions: bool,
    budget: usize,
    cancel: &'a CancellationToken,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(
        compilation: &'a Compilation,
        root: NodeId,
        cancel: &'a CancellationToken,
    ) -> Self {
        Descendants {
            compilation,
            root,
            stack: vec![root],
            enter_functions: true,
            budget: compilation.nodes.len(),
            cancel,
        }
    }

    /// Yield nested method declarations and local functions but not their
    /// contents. Lambdas are still entered.
    pub fn skip_nested_functions(mut self) -> Self {
        self.enter_functions = false;
        self
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        self.cancel.check()?;
        self.budget = self.budget.checked_sub(1)?;
        let id = self.stack.pop()?;
        let node = self.compilation.node(id)?;
        let descend =
            id == self.root || self.enter_functions || !node.kind.is_function_declaration();
        if descend {
            self.stack.extend(node.kind.children().into_iter().rev());
        }
        Some(node)
    }
}

// ============================================================================
// Tests
// ============================================================================
