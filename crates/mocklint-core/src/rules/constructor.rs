//! Rules on `new Mock<T>(args)`.
//!
//! - ML1002: for a class, the arguments match no accessible constructor
//! - ML1003: for an interface, every non-behavior argument is an error
//! - ML1015: the class is sealed
//! - ML1016: the arguments only match a constructor the proxy cannot call

use super::{mock_creation, report, Rule};
use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, RuleCode};
use crate::matcher::{
    argument_facts, match_members, strip_behavior_argument, ArgumentFact, SuppliedKind,
};
use crate::model::{MethodKind, NodeId, SymbolId, TypeKind};

pub struct ConstructorRule;

impl Rule for ConstructorRule {
    fn codes(&self) -> &'static [RuleCode] {
        &[
            RuleCode::ConstructorArgumentsMismatch,
            RuleCode::InterfaceConstructorArguments,
            RuleCode::SealedTypeMock,
            RuleCode::InaccessibleConstructor,
        ]
    }

    fn check(&self, ctx: &AnalysisContext<'_>, site: NodeId, out: &mut Vec<Diagnostic>) {
        check_creation(ctx, site, out).unwrap_or(());
    }
}

fn check_creation(ctx: &AnalysisContext<'_>, site: NodeId, out: &mut Vec<Diagnostic>) -> Option<()> {
    let (arguments, mocked) = mock_creation(ctx, site)?;
    let detail = ctx.compilation.type_detail(mocked)?;
    match detail.type_kind {
        TypeKind::Interface => {
            let facts = argument_facts(ctx, arguments)?;
            let (rest, _) = strip_behavior_argument(ctx, &facts);
            let name = ctx.display_type(mocked);
            for fact in rest {
                report(
                    ctx,
                    out,
                    RuleCode::InterfaceConstructorArguments,
                    fact.node,
                    vec![name.clone()],
                );
            }
            Some(())
        }
        TypeKind::Class => {
            if ctx.symbol(mocked)?.modifiers.is_sealed {
                return report(
                    ctx,
                    out,
                    RuleCode::SealedTypeMock,
                    site,
                    vec![ctx.display_type(mocked)],
                );
            }
            let facts = argument_facts(ctx, arguments)?;
            let (rest, _) = strip_behavior_argument(ctx, &facts);
            check_class_constructors(ctx, site, mocked, rest, out)
        }
        TypeKind::Struct
        | TypeKind::Enum
        | TypeKind::Delegate
        | TypeKind::TypeParameter
        | TypeKind::Error => None,
    }
}

fn constructors(ctx: &AnalysisContext<'_>, class: SymbolId) -> Vec<SymbolId> {
    let definition = ctx.compilation.original_definition(class);
    let Some(detail) = ctx.compilation.type_detail(definition) else {
        return Vec::new();
    };
    detail
        .members
        .iter()
        .copied()
        .filter(|m| {
            ctx.symbol(*m)
                .and_then(|s| s.as_method())
                .is_some_and(|method| method.method_kind == MethodKind::Constructor)
        })
        .collect()
}

fn check_class_constructors(
    ctx: &AnalysisContext<'_>,
    site: NodeId,
    class: SymbolId,
    supplied: &[ArgumentFact],
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    let all = constructors(ctx, class);
    let args = || vec![describe_arguments(ctx, supplied), ctx.display_type(class)];

    // Without declared constructors the class has an implicit public one.
    if all.is_empty() {
        if supplied.is_empty() {
            return None;
        }
        return report(ctx, out, RuleCode::ConstructorArgumentsMismatch, site, args());
    }

    let accessible: Vec<SymbolId> = all
        .iter()
        .copied()
        .filter(|c| {
            ctx.symbol(*c)
                .is_some_and(|s| s.accessibility.is_reachable_from_subclass())
        })
        .collect();
    if match_members(ctx, &accessible, supplied)?.matched {
        return None;
    }

    let any = match_members(ctx, &all, supplied)?;
    let code = match any.candidate {
        Some(candidate)
            if any.matched
                && !ctx
                    .symbol(candidate)?
                    .accessibility
                    .is_reachable_from_subclass() =>
        {
            RuleCode::InaccessibleConstructor
        }
        _ => RuleCode::ConstructorArgumentsMismatch,
    };
    report(ctx, out, code, site, args())
}

/// `int, null, string` rendering of the supplied arguments.
fn describe_arguments(ctx: &AnalysisContext<'_>, supplied: &[ArgumentFact]) -> String {
    supplied
        .iter()
        .map(|fact| match fact.kind {
            SuppliedKind::Null => "null".to_string(),
            SuppliedKind::Default => "default".to_string(),
            SuppliedKind::Typed(ty) => ctx.display_type(ty),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
