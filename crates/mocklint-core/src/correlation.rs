//! Companion-call search within the enclosing function body.
//!
//! A scope is the nearest method declaration, local function or lambda that
//! contains the original call. Searches walk the scope in pre-order, enter
//! nested lambdas, and stop at nested local functions and methods. A
//! companion only counts when it starts after the original call ends.

use crate::cancel::CancelCheck;
use crate::chain::{extract_lambda_chain, ChainInvocation};
use crate::context::AnalysisContext;
use crate::model::{AssignmentOperator, Node, NodeId, NodeKind, SymbolId};
use crate::types::Span;

/// Nearest function-like node containing `node`.
pub fn enclosing_body(ctx: &AnalysisContext<'_>, node: NodeId) -> Option<NodeId> {
    ctx.compilation
        .ancestors(node, None, ctx.cancel)
        .find(|n| n.kind.is_function_like())
        .map(|n| n.id)
}

/// Nodes of `scope` that start after `after` ends.
fn later_nodes<'a>(
    ctx: &AnalysisContext<'a>,
    scope: NodeId,
    after: Span,
) -> impl Iterator<Item = &'a Node> + 'a {
    ctx.compilation
        .descendants(scope, ctx.cancel)
        .skip_nested_functions()
        .filter(move |n| n.span.is_after(&after))
}

/// Whether any argument of `call` refers to `mock`.
fn references_mock(ctx: &AnalysisContext<'_>, arguments: &[NodeId], mock: SymbolId) -> bool {
    arguments
        .iter()
        .any(|arg| ctx.variable_binding(*arg) == Some(mock))
}

/// `mock.VerifyAll()` or `Mock.VerifyAll(.., mock, ..)` later in `scope`.
///
/// `None` when cancelled.
pub fn has_verify_all(
    ctx: &AnalysisContext<'_>,
    scope: NodeId,
    mock: SymbolId,
    after: Span,
) -> Option<bool> {
    let catalog = ctx.catalog;
    for node in later_nodes(ctx, scope, after) {
        let Some((method, arguments)) = ctx.invocation(node.id) else {
            continue;
        };
        if catalog.is_static_verify_all_method(method) {
            if references_mock(ctx, arguments, mock) {
                return Some(true);
            }
        } else if catalog.is_verify_all_method(method)
            && ctx
                .receiver(node.id)
                .and_then(|r| ctx.variable_binding(r))
                == Some(mock)
        {
            return Some(true);
        }
    }
    ctx.cancel.check().map(|_| false)
}

/// A later verification on `mock` that covers `chain`.
///
/// Matches `VerifyAll()`, a `Verify()` without arguments, a `Verify(expr)`
/// whose chain equals `chain`, and static `Mock.Verify`/`Mock.VerifyAll`
/// calls that list `mock`. With `chain == None` only the unconditional
/// forms match. `None` when cancelled.
pub fn has_matching_verify(
    ctx: &AnalysisContext<'_>,
    scope: NodeId,
    mock: SymbolId,
    chain: Option<&ChainInvocation>,
    after: Span,
) -> Option<bool> {
    let catalog = ctx.catalog;
    for node in later_nodes(ctx, scope, after) {
        let Some((method, arguments)) = ctx.invocation(node.id) else {
            continue;
        };
        if catalog.is_static_verify_method(method) {
            if references_mock(ctx, arguments, mock) {
                return Some(true);
            }
            continue;
        }
        let on_mock = ctx
            .receiver(node.id)
            .and_then(|r| ctx.variable_binding(r))
            == Some(mock);
        if !on_mock {
            continue;
        }
        if catalog.is_verify_all_method(method) {
            return Some(true);
        }
        if catalog.is_verify_method(method) {
            let Some(first) = arguments.first() else {
                return Some(true);
            };
            let other = extract_lambda_chain(ctx, node.id, *first);
            if let (Some(chain), Some(other)) = (chain, other) {
                if *chain == other {
                    return Some(true);
                }
            }
        }
    }
    ctx.cancel.check().map(|_| false)
}

/// Where `mock` is initialised with `new Mock<T>(...)` inside `scope`.
///
/// Returns the creation expression.
pub fn find_mock_creation(
    ctx: &AnalysisContext<'_>,
    mock: SymbolId,
    scope: NodeId,
) -> Option<NodeId> {
    let is_mock_creation = |expr: NodeId| -> Option<NodeId> {
        let node = ctx.expression(expr)?;
        match node.kind {
            NodeKind::ObjectCreation { .. } if ctx.catalog.is_mock_type(node.type_?) => {
                Some(node.id)
            }
            _ => None,
        }
    };
    ctx.compilation
        .descendants(scope, ctx.cancel)
        .skip_nested_functions()
        .find_map(|node| match &node.kind {
            NodeKind::LocalDeclaration {
                initializer: Some(init),
                ..
            } if node.symbol == Some(mock) => is_mock_creation(*init),
            NodeKind::Assignment {
                target,
                operator: AssignmentOperator::Assign,
                value,
            } if ctx.variable_binding(*target) == Some(mock) => is_mock_creation(*value),
            _ => None,
        })
}
