//! Rules on what a setup or verification targets.
//!
//! - ML1004: the configured member cannot be intercepted
//! - ML1005: an `It.IsAny<T>()` / `It.Is<T>()` type argument differs from
//!   the parameter it is matched against
//! - ML1017: `mock.As<T>()` with a non-interface `T`

use super::{report, Rule};
use crate::cancel::CancelCheck;
use crate::chain::{extract_lambda_chain, extract_setup_chain, ChainInvocation};
use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, RuleCode};
use crate::model::{NodeId, SymbolId, TypeKind};

pub struct SetupRule;

impl Rule for SetupRule {
    fn codes(&self) -> &'static [RuleCode] {
        &[
            RuleCode::NonOverridableSetup,
            RuleCode::MatcherTypeMismatch,
            RuleCode::AsRequiresInterface,
        ]
    }

    fn check(&self, ctx: &AnalysisContext<'_>, site: NodeId, out: &mut Vec<Diagnostic>) {
        let Some((method, arguments)) = ctx.invocation(site) else {
            return;
        };
        let catalog = ctx.catalog;
        if catalog.is_setup_method(method) {
            if let Some(chain) = extract_setup_chain(ctx, site) {
                check_overridable(ctx, &chain, out).unwrap_or(());
                check_matcher_types(ctx, &chain, out).unwrap_or(());
            }
        } else if catalog.is_verify_method(method) {
            let chain = arguments
                .first()
                .and_then(|first| extract_lambda_chain(ctx, site, *first));
            if let Some(chain) = chain {
                check_matcher_types(ctx, &chain, out).unwrap_or(());
            }
        } else if catalog.is_as_method(method) {
            check_as_interface(ctx, site, method, out).unwrap_or(());
        }
    }
}

fn check_overridable(
    ctx: &AnalysisContext<'_>,
    chain: &ChainInvocation,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    let member = chain.target_member()?;
    let symbol = ctx.symbol(member.symbol)?;
    let container = ctx.symbol(symbol.container?)?;
    if container.as_type()?.type_kind == TypeKind::Interface {
        return None;
    }
    if symbol.modifiers.is_overridable() {
        return None;
    }
    report(
        ctx,
        out,
        RuleCode::NonOverridableSetup,
        member.node,
        vec![ctx.display_member(member.symbol)],
    )
}

fn check_matcher_types(
    ctx: &AnalysisContext<'_>,
    chain: &ChainInvocation,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    for argument in &chain.arguments {
        ctx.cancel.check()?;
        let Some(matcher) = argument.kind.matcher_type() else {
            continue;
        };
        let Some(parameter) = argument.parameter.and_then(|p| ctx.symbol(p)) else {
            continue;
        };
        let Some(formal) = parameter.value_type() else {
            continue;
        };
        if matcher_fits(ctx, matcher, formal) {
            continue;
        }
        report(
            ctx,
            out,
            RuleCode::MatcherTypeMismatch,
            argument.node,
            vec![
                ctx.display_type(matcher),
                parameter.name.clone(),
                ctx.display_type(formal),
            ],
        );
    }
    Some(())
}

/// Whether a matcher of type `matcher` may stand for a `formal` parameter.
///
/// Moq matches the matcher's type argument exactly, so a derived or
/// interface-implementing type does not fit.
fn matcher_fits(ctx: &AnalysisContext<'_>, matcher: SymbolId, formal: SymbolId) -> bool {
    let catalog = ctx.catalog;
    if catalog.is_any_type_placeholder(matcher) || catalog.is_any_type_placeholder(formal) {
        return true;
    }
    let is_type_parameter = |ty: SymbolId| {
        ctx.compilation
            .type_detail(ty)
            .is_some_and(|d| d.type_kind == TypeKind::TypeParameter)
    };
    if is_type_parameter(formal) {
        return true;
    }
    // `It.IsAny<int>()` for an `int?` parameter converts implicitly.
    if catalog.is_nullable_type(formal) {
        if let Some(inner) = ctx.compilation.type_arguments(formal).first() {
            if ctx.compilation.same_type(*inner, matcher) {
                return true;
            }
        }
    }
    ctx.compilation.same_type(matcher, formal)
}

fn check_as_interface(
    ctx: &AnalysisContext<'_>,
    site: NodeId,
    method: SymbolId,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    let target = *ctx.symbol(method)?.as_method()?.type_arguments.first()?;
    match ctx.compilation.type_detail(target)?.type_kind {
        TypeKind::Interface | TypeKind::TypeParameter | TypeKind::Error => None,
        TypeKind::Class | TypeKind::Struct | TypeKind::Enum | TypeKind::Delegate => report(
            ctx,
            out,
            RuleCode::AsRequiresInterface,
            site,
            vec![ctx.display_type(target)],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::catalog::SymbolCatalog;
    use crate::fixture::MoqFixture;
    use std::sync::Arc;

    fn run(fx: MoqFixture) -> Vec<Diagnostic> {
        let catalog = SymbolCatalog::resolve(Arc::new(fx.finish())).unwrap();
        let cancel = CancellationToken::new();
        let ctx = AnalysisContext::new(&catalog, &cancel);
        let mut out = Vec::new();
        for site in ctx.compilation.call_sites() {
            SetupRule.check(&ctx, site, &mut out);
        }
        out
    }

    fn codes(diags: &[Diagnostic]) -> Vec<RuleCode> {
        diags.iter().map(|d| d.rule).collect()
    }

    mod overridable {
        use super::*;

        fn setup_on_class(virtual_method: bool) -> Vec<Diagnostic> {
            let mut fx = MoqFixture::new();
            let service = fx.class("Service");
            let int = fx.int();
            let method = if virtual_method {
                fx.virtual_method(service, "Load", &[], Some(int))
            } else {
                fx.method(service, "Load", &[], Some(int))
            };
            let mock = fx.mock_local("mock", service);
            let setup = fx.setup(mock, |fx, m| fx.call(m, method, &[]));
            fx.statement(setup);
            run(fx)
        }

        #[test]
        fn non_virtual_class_member_is_reported() {
            let diags = setup_on_class(false);
            assert_eq!(codes(&diags), vec![RuleCode::NonOverridableSetup]);
            assert_eq!(diags[0].args, vec!["Service.Load".to_string()]);
        }

        #[test]
        fn virtual_member_is_allowed() {
            assert!(setup_on_class(true).is_empty());
        }

        #[test]
        fn sealed_override_is_reported() {
            let mut fx = MoqFixture::new();
            let service = fx.class("Service");
            let int = fx.int();
            let method = fx.virtual_method(service, "Load", &[], Some(int));
            let symbol = fx.symbol_mut(method).unwrap();
            symbol.modifiers.is_override = true;
            symbol.modifiers.is_sealed = true;
            let mock = fx.mock_local("mock", service);
            let setup = fx.setup(mock, |fx, m| fx.call(m, method, &[]));
            fx.statement(setup);
            assert_eq!(codes(&run(fx)), vec![RuleCode::NonOverridableSetup]);
        }

        #[test]
        fn interface_members_are_allowed() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let int = fx.int();
            let prop = fx.property(foo, "Count", int);
            let mock = fx.mock_local("mock", foo);
            let setup = fx.setup(mock, |fx, m| fx.member(m, prop));
            fx.statement(setup);
            assert!(run(fx).is_empty());
        }
    }

    mod matcher_types {
        use super::*;

        fn matcher_against(
            formal: impl FnOnce(&mut MoqFixture) -> SymbolId,
            matcher: impl FnOnce(&mut MoqFixture) -> SymbolId,
            verify: bool,
        ) -> Vec<Diagnostic> {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let formal = formal(&mut fx);
            let matcher = matcher(&mut fx);
            let run_method = fx.method(foo, "Run", &[("value", formal)], None);
            let mock = fx.mock_local("mock", foo);
            let body = |fx: &mut MoqFixture, m: NodeId| {
                let any = fx.it_is_any(matcher);
                fx.call(m, run_method, &[any])
            };
            let call = if verify {
                let times = fx.times_once();
                fx.verify(mock, body, Some(times))
            } else {
                fx.setup(mock, body)
            };
            fx.statement(call);
            run(fx)
        }

        #[test]
        fn same_type_is_quiet() {
            assert!(matcher_against(|fx| fx.int(), |fx| fx.int(), false).is_empty());
        }

        #[test]
        fn different_type_warns_with_parameter_name() {
            let diags = matcher_against(|fx| fx.int(), |fx| fx.long(), false);
            assert_eq!(codes(&diags), vec![RuleCode::MatcherTypeMismatch]);
            assert_eq!(
                diags[0].args,
                vec!["Int64".to_string(), "value".to_string(), "Int32".to_string()]
            );
        }

        #[test]
        fn verify_chains_are_checked_too() {
            let diags = matcher_against(|fx| fx.int(), |fx| fx.string(), true);
            assert_eq!(codes(&diags), vec![RuleCode::MatcherTypeMismatch]);
        }

        #[test]
        fn derived_matcher_type_is_reported() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let animal = fx.class("Animal");
            let dog = fx.derived_class("Dog", animal);
            let feed = fx.method(foo, "Feed", &[("animal", animal)], None);
            let mock = fx.mock_local("mock", foo);
            let setup = fx.setup(mock, |fx, m| {
                let any = fx.it_is_any(dog);
                fx.call(m, feed, &[any])
            });
            fx.statement(setup);
            let diags = run(fx);
            assert_eq!(codes(&diags), vec![RuleCode::MatcherTypeMismatch]);
            assert_eq!(
                diags[0].args,
                vec!["Dog".to_string(), "animal".to_string(), "Animal".to_string()]
            );
        }

        #[test]
        fn value_matcher_for_object_parameter_is_reported() {
            let diags = matcher_against(|fx| fx.object(), |fx| fx.int(), false);
            assert_eq!(codes(&diags), vec![RuleCode::MatcherTypeMismatch]);
            assert_eq!(diags[0].args[2], "Object");
        }

        #[test]
        fn any_type_and_nullable_are_exempt() {
            assert!(matcher_against(|fx| fx.int(), |fx| fx.any_type(), false).is_empty());
            assert!(matcher_against(
                |fx| {
                    let int = fx.int();
                    fx.nullable_of(int)
                },
                |fx| fx.int(),
                false
            )
            .is_empty());
        }
    }

    mod as_interface {
        use super::*;

        #[test]
        fn class_type_argument_is_reported() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let bar = fx.interface("IBar");
            let service = fx.class("Service");
            let mock = fx.mock_local("mock", foo);
            let ok = fx.as_(mock, bar);
            fx.statement(ok);
            let bad = fx.as_(mock, service);
            fx.statement(bad);
            let diags = run(fx);
            assert_eq!(codes(&diags), vec![RuleCode::AsRequiresInterface]);
            assert_eq!(diags[0].args, vec!["Service".to_string()]);
        }
    }
}
