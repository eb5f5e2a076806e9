//! Rule drivers.
//!
//! Each [`Rule`] looks at one call site, asks the chain extractor, matcher
//! and correlation modules for facts, and pushes zero or more diagnostics.
//! Rules hold no state; every `None` along the way means "not applicable"
//! and ends the check silently.
//!
//! | Module | Rules |
//! |---|---|
//! | [`behavior`] | ML1000, ML1001 |
//! | [`constructor`] | ML1002, ML1003, ML1015, ML1016 |
//! | [`setup`] | ML1004, ML1005, ML1017 |
//! | [`callback`] | ML1006, ML1007, ML1014 |
//! | [`verification`] | ML1008, ML1009, ML1010, ML1011 |
//! | [`raise`] | ML1012, ML1013 |

pub mod behavior;
pub mod callback;
pub mod constructor;
pub mod raise;
pub mod setup;
pub mod verification;

use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, RuleCode};
use crate::model::{NodeId, NodeKind, SymbolId};

/// A stateless check run against every library call site.
pub trait Rule: Send + Sync {
    /// Codes this rule can report.
    fn codes(&self) -> &'static [RuleCode];

    /// Inspect `site` (an invocation or object creation) and report.
    fn check(&self, ctx: &AnalysisContext<'_>, site: NodeId, out: &mut Vec<Diagnostic>);
}

/// Every rule, in rule-id order.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(behavior::BehaviorRule),
        Box::new(constructor::ConstructorRule),
        Box::new(setup::SetupRule),
        Box::new(callback::CallbackRule),
        Box::new(verification::VerificationRule),
        Box::new(raise::RaiseRule),
    ]
}

// ============================================================================
// Helpers shared by rules
// ============================================================================

/// Push a diagnostic located at `node`. Nodes without a location are skipped.
pub(crate) fn report(
    ctx: &AnalysisContext<'_>,
    out: &mut Vec<Diagnostic>,
    code: RuleCode,
    node: NodeId,
    args: Vec<String>,
) -> Option<()> {
    let location = ctx.location(node)?;
    out.push(Diagnostic::new(code, location, args));
    Some(())
}

/// `T` of a `Mock<T>` type.
pub(crate) fn mocked_type(ctx: &AnalysisContext<'_>, mock_type: SymbolId) -> Option<SymbolId> {
    if !ctx.catalog.is_mock_type(mock_type) {
        return None;
    }
    ctx.compilation.type_arguments(mock_type).first().copied()
}

/// Argument list and mocked type of a `new Mock<T>(...)` expression.
pub(crate) fn mock_creation<'a>(
    ctx: &AnalysisContext<'a>,
    site: NodeId,
) -> Option<(&'a [NodeId], SymbolId)> {
    let node = ctx.node(site)?;
    let NodeKind::ObjectCreation { arguments } = &node.kind else {
        return None;
    };
    let mocked = mocked_type(ctx, node.type_?)?;
    Some((arguments.as_slice(), mocked))
}

/// The mock variable a fluent call chain starts from.
pub(crate) fn mock_variable(ctx: &AnalysisContext<'_>, call: NodeId) -> Option<SymbolId> {
    let root = crate::chain::fluent_root(ctx, call)?;
    ctx.variable_binding(root)
}
