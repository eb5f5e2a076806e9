//! Shared, read-only view handed to every rule for one call site.

use crate::cancel::CancellationToken;
use crate::catalog::SymbolCatalog;
use crate::model::{Compilation, Node, NodeId, NodeKind, Symbol, SymbolId};
use crate::types::Location;

/// Compilation, catalog and cancellation flag for one analysis pass.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub compilation: &'a Compilation,
    pub catalog: &'a SymbolCatalog,
    pub cancel: &'a CancellationToken,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(catalog: &'a SymbolCatalog, cancel: &'a CancellationToken) -> Self {
        AnalysisContext {
            compilation: catalog.compilation(),
            catalog,
            cancel,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&'a Node> {
        self.compilation.node(id)
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&'a Symbol> {
        self.compilation.symbol(id)
    }

    /// Node after skipping parentheses and argument wrappers.
    pub fn expression(&self, id: NodeId) -> Option<&'a Node> {
        self.node(self.compilation.unwrap_expression(id))
    }

    /// Callee symbol and argument list of an invocation.
    pub fn invocation(&self, call: NodeId) -> Option<(SymbolId, &'a [NodeId])> {
        let node = self.node(call)?;
        match &node.kind {
            NodeKind::Invocation { arguments, .. } => Some((node.symbol?, arguments.as_slice())),
            _ => None,
        }
    }

    /// Receiver of a member-access invocation (`recv.M(...)`), parentheses
    /// skipped. `None` for simple-name calls.
    pub fn receiver(&self, call: NodeId) -> Option<NodeId> {
        let NodeKind::Invocation { expression, .. } = &self.node(call)?.kind else {
            return None;
        };
        match &self.expression(*expression)?.kind {
            NodeKind::MemberAccess { expression, .. } => {
                Some(self.compilation.unwrap_expression(*expression))
            }
            _ => None,
        }
    }

    /// Name of the method an invocation is bound to.
    pub fn method_name(&self, call: NodeId) -> Option<&'a str> {
        let (method, _) = self.invocation(call)?;
        Some(self.symbol(method)?.name.as_str())
    }

    /// Variable a mock expression refers to: a local, parameter, field or
    /// property reached by name or by `this.x`.
    pub fn variable_binding(&self, expr: NodeId) -> Option<SymbolId> {
        let node = self.expression(expr)?;
        match &node.kind {
            NodeKind::Identifier { .. } | NodeKind::MemberAccess { .. } => {
                let symbol = self.symbol(node.symbol?)?;
                symbol.is_variable().then_some(symbol.id)
            }
            _ => None,
        }
    }

    pub fn location(&self, id: NodeId) -> Option<Location> {
        self.compilation.location(id)
    }

    pub fn display_type(&self, id: SymbolId) -> String {
        self.compilation.display_type(id)
    }

    /// `Type.Member` for a member symbol, the bare name otherwise.
    pub fn display_member(&self, id: SymbolId) -> String {
        let Some(symbol) = self.symbol(id) else {
            return id.to_string();
        };
        match symbol.container {
            Some(container) if self.symbol(container).is_some_and(|c| c.as_type().is_some()) => {
                format!("{}.{}", self.display_type(container), symbol.name)
            }
            _ => symbol.name.clone(),
        }
    }
}
