//! Event raising rules for `mock.Raise(..)` and `.Raises(..)`.
//!
//! - ML1012: the raised arguments do not fit the event delegate
//! - ML1013: the lambda does not subscribe to an event

use super::{report, Rule};
use crate::chain::{extract_raise, RaiseMethodCall, RaiseTarget};
use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, RuleCode};
use crate::matcher::{argument_facts, is_compatible, SuppliedKind};
use crate::model::{NodeId, NodeKind};

pub struct RaiseRule;

impl Rule for RaiseRule {
    fn codes(&self) -> &'static [RuleCode] {
        &[RuleCode::RaiseSignatureMismatch, RuleCode::RaiseNonEvent]
    }

    fn check(&self, ctx: &AnalysisContext<'_>, site: NodeId, out: &mut Vec<Diagnostic>) {
        let Some((method, _)) = ctx.invocation(site) else {
            return;
        };
        let catalog = ctx.catalog;
        let is_raises = catalog.is_raises_method(method);
        if !is_raises && !catalog.is_raise_method(method) {
            return;
        }
        match extract_raise(ctx, site) {
            Some(RaiseTarget::NotAnEvent { node, symbol }) => {
                report(
                    ctx,
                    out,
                    RuleCode::RaiseNonEvent,
                    node,
                    vec![ctx.display_member(symbol)],
                );
            }
            Some(RaiseTarget::Event(raise)) => {
                check_arguments(ctx, &raise, is_raises, out).unwrap_or(());
            }
            None => {}
        }
    }
}

fn check_arguments(
    ctx: &AnalysisContext<'_>,
    raise: &RaiseMethodCall,
    is_raises: bool,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    // `Raises(m => m.Ev += null, (int x) => new Args(x))` computes the
    // arguments from the call's own.
    if is_raises && raise.arguments.iter().any(|arg| is_lambda(ctx, *arg)) {
        return None;
    }
    let event = ctx.display_member(raise.event);

    if raise.arguments.len() != raise.parameters.len() {
        let detail = format!(
            "expected {} argument(s) but {} were supplied",
            raise.parameters.len(),
            raise.arguments.len()
        );
        let mut diagnostic = Diagnostic::new(
            RuleCode::RaiseSignatureMismatch,
            ctx.location(raise.call)?,
            vec![event, detail],
        );
        if let Some(location) = ctx.location(raise.event_node) {
            diagnostic = diagnostic.with_additional_location(location);
        }
        out.push(diagnostic);
        return Some(());
    }

    let facts = argument_facts(ctx, &raise.arguments)?;
    for (index, (fact, parameter)) in facts.iter().zip(&raise.parameters).enumerate() {
        if is_compatible(ctx, fact, *parameter)? {
            continue;
        }
        let supplied = match fact.kind {
            SuppliedKind::Null => "null".to_string(),
            SuppliedKind::Default => "default".to_string(),
            SuppliedKind::Typed(ty) => format!("'{}'", ctx.display_type(ty)),
        };
        let detail = format!(
            "argument {} is {} but '{}' is expected",
            index + 1,
            supplied,
            ctx.display_type(*parameter)
        );
        report(
            ctx,
            out,
            RuleCode::RaiseSignatureMismatch,
            fact.node,
            vec![event.clone(), detail],
        );
    }
    Some(())
}

fn is_lambda(ctx: &AnalysisContext<'_>, argument: NodeId) -> bool {
    ctx.expression(argument)
        .is_some_and(|n| matches!(n.kind, NodeKind::Lambda { .. }))
}
