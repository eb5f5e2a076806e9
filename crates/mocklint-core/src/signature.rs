//! Delegate signature compatibility.
//!
//! `Callback`, `Returns` and `ReturnsAsync` take a delegate that Moq invokes
//! with the mocked call's arguments. The delegate is written either as a
//! lambda or as a method group; both are reduced to a [`DelegateSignature`]
//! and compared against the [`ChainInvocation`] target.

use crate::cancel::CancelCheck;
use crate::catalog::WellKnownType;
use crate::chain::{ChainInvocation, ChainTarget};
use crate::context::AnalysisContext;
use crate::model::{MethodKind, NodeId, NodeKind, SymbolId};

// ============================================================================
// Delegate signatures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateParameter {
    /// Parameter node for lambdas, the method group expression otherwise.
    pub node: NodeId,
    pub name: String,
    pub type_: Option<SymbolId>,
}

/// Parameters and return type of a lambda or method group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateSignature {
    pub node: NodeId,
    pub parameters: Vec<DelegateParameter>,
    pub return_type: Option<SymbolId>,
}

impl DelegateSignature {
    pub fn is_lambda(&self, ctx: &AnalysisContext<'_>) -> bool {
        ctx.node(self.node)
            .is_some_and(|n| matches!(n.kind, NodeKind::Lambda { .. }))
    }
}

/// Signature of the delegate written at `expr`.
///
/// `None` for anything other than a lambda or a method group, e.g. a plain
/// value passed to `Returns`.
pub fn delegate_signature(ctx: &AnalysisContext<'_>, expr: NodeId) -> Option<DelegateSignature> {
    let node = ctx.expression(expr)?;
    match &node.kind {
        NodeKind::Lambda { parameters, .. } => {
            let method = ctx.symbol(node.symbol?)?.as_method()?;
            let mut params = Vec::with_capacity(parameters.len());
            for parameter in parameters {
                let parameter_node = ctx.node(*parameter)?;
                let NodeKind::Parameter { name } = &parameter_node.kind else {
                    return None;
                };
                let type_ = parameter_node.type_.or_else(|| {
                    parameter_node
                        .symbol
                        .and_then(|s| ctx.symbol(s))
                        .and_then(|s| s.value_type())
                });
                params.push(DelegateParameter {
                    node: *parameter,
                    name: name.clone(),
                    type_,
                });
            }
            Some(DelegateSignature {
                node: node.id,
                parameters: params,
                return_type: method.return_type,
            })
        }
        NodeKind::Identifier { .. } | NodeKind::MemberAccess { .. } => {
            let method = ctx.symbol(node.symbol?)?.as_method()?;
            if matches!(method.method_kind, MethodKind::Constructor) {
                return None;
            }
            let parameters = method
                .parameters
                .iter()
                .map(|p| {
                    let symbol = ctx.symbol(*p)?;
                    Some(DelegateParameter {
                        node: node.id,
                        name: symbol.name.clone(),
                        type_: symbol.value_type(),
                    })
                })
                .collect::<Option<Vec<_>>>()?;
            Some(DelegateSignature {
                node: node.id,
                parameters,
                return_type: method.return_type,
            })
        }
        _ => None,
    }
}

// ============================================================================
// Checks
// ============================================================================

/// Why a delegate does not fit the mocked member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMismatch {
    /// A property receives no arguments, but the delegate declares some.
    PropertyWithParameters { property: SymbolId, count: usize },
    ArityMismatch { expected: usize, actual: usize },
    ParameterType {
        index: usize,
        node: NodeId,
        expected: SymbolId,
        actual: SymbolId,
    },
    ReturnType { expected: SymbolId, actual: SymbolId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Compatible,
    Mismatch(SignatureMismatch),
}

/// Compare the delegate's parameters with the mocked member's.
///
/// A delegate without parameters fits any member. An `It.IsAny<It.IsAnyType>()`
/// argument, or a formal parameter of type `It.IsAnyType`, requires the
/// delegate parameter to be `object`.
pub fn check_parameters(
    ctx: &AnalysisContext<'_>,
    chain: &ChainInvocation,
    delegate: &DelegateSignature,
) -> Option<Verdict> {
    if delegate.parameters.is_empty() {
        return Some(Verdict::Compatible);
    }
    let method = match chain.target {
        ChainTarget::Property(property) => {
            return Some(Verdict::Mismatch(SignatureMismatch::PropertyWithParameters {
                property,
                count: delegate.parameters.len(),
            }));
        }
        ChainTarget::Method(method) => ctx.symbol(method)?.as_method()?,
    };

    if method.parameters.len() != delegate.parameters.len() {
        return Some(Verdict::Mismatch(SignatureMismatch::ArityMismatch {
            expected: method.parameters.len(),
            actual: delegate.parameters.len(),
        }));
    }

    for (index, (formal, actual)) in method.parameters.iter().zip(&delegate.parameters).enumerate() {
        ctx.cancel.check()?;
        let formal_type = ctx.symbol(*formal)?.value_type()?;
        let matcher_type = chain
            .arguments
            .iter()
            .find(|a| a.parameter == Some(*formal))
            .and_then(|a| a.kind.matcher_type());
        let relaxed = ctx.catalog.is_any_type_placeholder(formal_type)
            || matcher_type.is_some_and(|t| ctx.catalog.is_any_type_placeholder(t));
        let expected = if relaxed {
            ctx.catalog.well_known_type(WellKnownType::Object)?
        } else {
            formal_type
        };
        let actual_type = actual.type_?;
        if !ctx.compilation.same_type(expected, actual_type) {
            return Some(Verdict::Mismatch(SignatureMismatch::ParameterType {
                index,
                node: actual.node,
                expected,
                actual: actual_type,
            }));
        }
    }
    Some(Verdict::Compatible)
}

/// Compare the delegate's return type with the member's value type.
///
/// Skipped for `ReturnsAsync`, whose delegate result is wrapped in a task.
pub fn check_return(
    ctx: &AnalysisContext<'_>,
    chain: &ChainInvocation,
    delegate: &DelegateSignature,
    is_async: bool,
) -> Option<Verdict> {
    if is_async {
        return Some(Verdict::Compatible);
    }
    let expected = match chain.target {
        ChainTarget::Method(method) => ctx.symbol(method)?.as_method()?.return_type?,
        ChainTarget::Property(property) => ctx.symbol(property)?.value_type()?,
    };
    let actual = delegate.return_type?;
    if ctx.compilation.same_type(expected, actual) {
        Some(Verdict::Compatible)
    } else {
        Some(Verdict::Mismatch(SignatureMismatch::ReturnType { expected, actual }))
    }
}
