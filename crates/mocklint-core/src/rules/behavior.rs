//! Mock behavior rules.
//!
//! - ML1000: `new Mock<T>(...)` without `MockBehavior.Strict`
//! - ML1001: a setup on a strict mock that returns a value but never says
//!   what to return

use super::{mock_creation, mock_variable, report, Rule};
use crate::cancel::CancelCheck;
use crate::chain::{extract_setup_chain, following_call, ChainTarget};
use crate::context::AnalysisContext;
use crate::correlation::{enclosing_body, find_mock_creation};
use crate::diagnostics::{Diagnostic, RuleCode};
use crate::model::{NodeId, NodeKind};

pub struct BehaviorRule;

impl Rule for BehaviorRule {
    fn codes(&self) -> &'static [RuleCode] {
        &[
            RuleCode::StrictBehavior,
            RuleCode::StrictSetupUnterminated,
        ]
    }

    fn check(&self, ctx: &AnalysisContext<'_>, site: NodeId, out: &mut Vec<Diagnostic>) {
        check_strict_behavior(ctx, site, out).unwrap_or(());
        check_unterminated_setup(ctx, site, out).unwrap_or(());
    }
}

/// First argument of a creation typed `MockBehavior`.
fn behavior_argument(ctx: &AnalysisContext<'_>, arguments: &[NodeId]) -> Option<NodeId> {
    arguments.iter().copied().find(|arg| {
        ctx.expression(*arg)
            .and_then(|n| n.type_)
            .is_some_and(|ty| ctx.catalog.is_mock_behavior_type(ty))
    })
}

/// Whether a mock creation is strict.
///
/// No behavior argument means the default (loose) behavior. A behavior
/// passed through a variable cannot be judged and yields `None`.
pub(crate) fn is_strict(ctx: &AnalysisContext<'_>, arguments: &[NodeId]) -> Option<bool> {
    let Some(argument) = behavior_argument(ctx, arguments) else {
        return Some(false);
    };
    let field = ctx.symbol(ctx.expression(argument)?.symbol?)?;
    if !matches!(field.kind(), crate::model::SymbolKind::Field) {
        return None;
    }
    Some(ctx.catalog.is_mock_behavior_strict_field(field.id))
}

fn check_strict_behavior(
    ctx: &AnalysisContext<'_>,
    site: NodeId,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    let (arguments, mocked) = mock_creation(ctx, site)?;
    if is_strict(ctx, arguments)? {
        return None;
    }
    let at = behavior_argument(ctx, arguments).unwrap_or(site);
    report(ctx, out, RuleCode::StrictBehavior, at, vec![ctx.display_type(mocked)])
}

fn check_unterminated_setup(
    ctx: &AnalysisContext<'_>,
    site: NodeId,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    let (method, _) = ctx.invocation(site)?;
    if !ctx.catalog.is_setup_method(method) || ctx.symbol(method)?.name != "Setup" {
        return None;
    }
    let chain = extract_setup_chain(ctx, site)?;
    let returns_value = match chain.target {
        ChainTarget::Method(target) => {
            let return_type = ctx.symbol(target)?.as_method()?.return_type?;
            !ctx.catalog.is_void_type(return_type)
        }
        ChainTarget::Property(_) => true,
    };
    if !returns_value {
        return None;
    }

    let mock = mock_variable(ctx, site)?;
    let scope = enclosing_body(ctx, site)?;
    let creation = find_mock_creation(ctx, mock, scope)?;
    let NodeKind::ObjectCreation { arguments } = &ctx.node(creation)?.kind else {
        return None;
    };
    if !is_strict(ctx, arguments)? {
        return None;
    }
    if following_call(ctx, site, |s| ctx.catalog.is_terminating_method(s)).is_some() {
        return None;
    }
    ctx.cancel.check()?;
    report(
        ctx,
        out,
        RuleCode::StrictSetupUnterminated,
        site,
        vec![ctx.display_member(chain.target.symbol())],
    )
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
            BehaviorRule.check(&ctx, site, &mut out);
        }
        out
    }

    fn codes(diags: &[Diagnostic]) -> Vec<RuleCode> {
        diags.iter().map(|d| d.rule).collect()
    }

    mod strict_behavior {
        use super::*;

        #[test]
        fn missing_behavior_warns() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            fx.mock_local("mock", foo);
            let diags = run(fx);
            assert_eq!(codes(&diags), vec![RuleCode::StrictBehavior]);
            assert_eq!(diags[0].args, vec!["IFoo".to_string()]);
        }

        #[test]
        fn strict_behavior_is_quiet() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            fx.strict_mock_local("mock", foo);
            assert!(run(fx).is_empty());
        }

        #[test]
        fn loose_behavior_warns_at_the_argument() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let loose = fx.behavior("Loose");
            let creation = fx.new_mock(foo, &[loose]);
            fx.declare("mock", creation);

            let catalog = SymbolCatalog::resolve(Arc::new(fx.finish())).unwrap();
            let cancel = CancellationToken::new();
            let ctx = AnalysisContext::new(&catalog, &cancel);
            let mut out = Vec::new();
            BehaviorRule.check(&ctx, creation, &mut out);

            assert_eq!(codes(&out), vec![RuleCode::StrictBehavior]);
            let argument = ctx.node(loose).unwrap().parent.unwrap();
            assert_eq!(out[0].location, ctx.location(argument).unwrap());
        }

        #[test]
        fn behavior_from_a_variable_is_not_judged() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let strict = fx.behavior("Strict");
            let behavior = fx.declare("behavior", strict);
            let reference = fx.ident(behavior);
            let creation = fx.new_mock(foo, &[reference]);
            fx.declare("mock", creation);
            assert!(run(fx).is_empty());
        }
    }

    mod unterminated_setup {
        use super::*;

        fn strict_setup(terminate: bool, strict: bool) -> Vec<Diagnostic> {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let int = fx.int();
            let run_method = fx.method(foo, "Run", &[], Some(int));
            let mock = if strict {
                fx.strict_mock_local("mock", foo)
            } else {
                fx.mock_local("mock", foo)
            };
            let setup = fx.setup(mock, |fx, m| fx.call(m, run_method, &[]));
            let statement = if terminate {
                fx.returns_value(setup, int)
            } else {
                setup
            };
            fx.statement(statement);
            run(fx)
                .into_iter()
                .filter(|d| d.rule == RuleCode::StrictSetupUnterminated)
                .collect()
        }

        #[test]
        fn strict_setup_without_returns_is_an_error() {
            let diags = strict_setup(false, true);
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].args, vec!["IFoo.Run".to_string()]);
        }

        #[test]
        fn returns_terminates_the_setup() {
            assert!(strict_setup(true, true).is_empty());
        }

        #[test]
        fn loose_mocks_are_not_checked() {
            assert!(strict_setup(false, false).is_empty());
        }

        #[test]
        fn void_methods_need_no_result() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let run_method = fx.method(foo, "Run", &[], None);
            let mock = fx.strict_mock_local("mock", foo);
            let setup = fx.setup(mock, |fx, m| fx.call(m, run_method, &[]));
            fx.statement(setup);
            assert!(run(fx).is_empty());
        }

        #[test]
        fn throws_after_callback_terminates() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let int = fx.int();
            let prop = fx.property(foo, "Count", int);
            let mock = fx.strict_mock_local("mock", foo);
            let setup = fx.setup(mock, |fx, m| fx.member(m, prop));
            let callback = fx.callback(setup, &[]);
            let throws = fx.throws(callback);
            fx.statement(throws);
            assert!(run(fx).is_empty());
        }
    }
}
