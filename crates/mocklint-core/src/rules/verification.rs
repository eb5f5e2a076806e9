//! Verification rules.
//!
//! - ML1008: a `Verifiable()` setup that nothing later verifies
//! - ML1009: a local mock that is never checked with `VerifyAll`
//! - ML1010: `Verify(expr)` without a `Times` argument
//! - ML1011: static `Mock.Verify()` / `Mock.VerifyAll()` without mocks

use super::{mock_variable, report, Rule};
use crate::chain::{extract_lambda_chain, extract_setup_chain, preceding_call};
use crate::context::AnalysisContext;
use crate::correlation::{enclosing_body, has_matching_verify, has_verify_all};
use crate::diagnostics::{Diagnostic, RuleCode};
use crate::model::{NodeId, NodeKind, SymbolId};
use crate::signature::delegate_signature;

pub struct VerificationRule;

impl Rule for VerificationRule {
    fn codes(&self) -> &'static [RuleCode] {
        &[
            RuleCode::MissingVerification,
            RuleCode::MissingVerifyAll,
            RuleCode::VerifyWithoutTimes,
            RuleCode::StaticVerifyWithoutMocks,
        ]
    }

    fn check(&self, ctx: &AnalysisContext<'_>, site: NodeId, out: &mut Vec<Diagnostic>) {
        let catalog = ctx.catalog;
        match ctx.invocation(site) {
            Some((method, arguments)) => {
                if catalog.is_verifiable_method(method) {
                    check_missing_verification(ctx, site, out).unwrap_or(());
                } else if catalog.is_verify_method(method) {
                    check_times(ctx, site, arguments, out).unwrap_or(());
                } else if catalog.is_static_verify_method(method) && arguments.is_empty() {
                    let name = ctx.method_name(site).unwrap_or("Verify").to_string();
                    report(ctx, out, RuleCode::StaticVerifyWithoutMocks, site, vec![name]);
                }
            }
            None => check_missing_verify_all(ctx, site, out).unwrap_or(()),
        }
    }
}

fn check_missing_verification(
    ctx: &AnalysisContext<'_>,
    site: NodeId,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    let setup = preceding_call(ctx, site, |s| ctx.catalog.is_setup_method(s))?;
    let chain = extract_setup_chain(ctx, setup)?;
    let mock = mock_variable(ctx, site)?;
    let scope = enclosing_body(ctx, site)?;
    let after = ctx.node(site)?.span;
    if has_matching_verify(ctx, scope, mock, Some(&chain), after)? {
        return None;
    }
    report(
        ctx,
        out,
        RuleCode::MissingVerification,
        site,
        vec![chain.display()],
    )
}

/// Only mocks held in locals are checked; fields and parameters may be
/// verified elsewhere.
fn check_missing_verify_all(
    ctx: &AnalysisContext<'_>,
    site: NodeId,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    let creation = ctx.node(site)?;
    if !matches!(creation.kind, NodeKind::ObjectCreation { .. })
        || !ctx.catalog.is_mock_type(creation.type_?)
    {
        return None;
    }
    let declaration = ctx.node(creation.parent?)?;
    let NodeKind::LocalDeclaration { name, .. } = &declaration.kind else {
        return None;
    };
    let mock = declaration.symbol?;
    let scope = enclosing_body(ctx, site)?;
    if has_verify_all(ctx, scope, mock, declaration.span)? {
        return None;
    }
    report(
        ctx,
        out,
        RuleCode::MissingVerifyAll,
        site,
        vec![name.clone()],
    )
}

fn check_times(
    ctx: &AnalysisContext<'_>,
    site: NodeId,
    arguments: &[NodeId],
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    let (first, rest) = arguments.split_first()?;
    let chain = extract_lambda_chain(ctx, site, *first)?;
    if rest.iter().any(|arg| supplies_times(ctx, *arg)) {
        return None;
    }
    report(
        ctx,
        out,
        RuleCode::VerifyWithoutTimes,
        site,
        vec![chain.display()],
    )
}

/// `Times.Once()`, a `Times` variable, `Times.Once` as a method group, or any
/// delegate producing `Times`.
fn supplies_times(ctx: &AnalysisContext<'_>, argument: NodeId) -> bool {
    let catalog = ctx.catalog;
    let returns_times = |ty: Option<SymbolId>| ty.is_some_and(|t| catalog.is_times_type(t));
    let Some(node) = ctx.expression(argument) else {
        return false;
    };
    if let Some(ty) = node.type_ {
        if catalog.is_times_type(ty) {
            return true;
        }
        let invoke = ctx
            .compilation
            .type_detail(ty)
            .and_then(|d| d.delegate_invoke)
            .and_then(|invoke| ctx.symbol(invoke))
            .and_then(|s| s.as_method());
        if let Some(invoke) = invoke {
            return returns_times(invoke.return_type);
        }
    }
    delegate_signature(ctx, argument).is_some_and(|d| returns_times(d.return_type))
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
            VerificationRule.check(&ctx, site, &mut out);
        }
        out
    }

    fn only(diags: Vec<Diagnostic>, code: RuleCode) -> Vec<Diagnostic> {
        diags.into_iter().filter(|d| d.rule == code).collect()
    }

    struct Service {
        foo: SymbolId,
        count: SymbolId,
        name: SymbolId,
    }

    fn service(fx: &mut MoqFixture) -> Service {
        let foo = fx.interface("IFoo");
        let int = fx.int();
        let string = fx.string();
        let count = fx.property(foo, "Count", int);
        let name = fx.property(foo, "Name", string);
        Service { foo, count, name }
    }

    mod missing_verification {
        use super::*;

        fn verifiable_setup(fx: &mut MoqFixture, s: &Service) -> SymbolId {
            let mock = fx.mock_local("mock", s.foo);
            let count = s.count;
            let setup = fx.setup(mock, |fx, m| fx.member(m, count));
            let verifiable = fx.verifiable(setup);
            fx.statement(verifiable);
            mock
        }

        #[test]
        fn unverified_setup_warns_at_verifiable() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            verifiable_setup(&mut fx, &s);
            let diags = only(run(fx), RuleCode::MissingVerification);
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].args, vec!["Count".to_string()]);
        }

        #[test]
        fn later_verify_without_arguments_covers_it() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            let mock = verifiable_setup(&mut fx, &s);
            let verify = fx.verify_empty(mock);
            fx.statement(verify);
            assert!(only(run(fx), RuleCode::MissingVerification).is_empty());
        }

        #[test]
        fn verify_of_the_same_member_covers_it() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            let mock = verifiable_setup(&mut fx, &s);
            let count = s.count;
            let times = fx.times_once();
            let verify =
                fx.verify_with_param_name(mock, "x", |fx, m| fx.member(m, count), Some(times));
            fx.statement(verify);
            assert!(only(run(fx), RuleCode::MissingVerification).is_empty());
        }

        #[test]
        fn verify_of_another_member_does_not() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            let mock = verifiable_setup(&mut fx, &s);
            let name = s.name;
            let times = fx.times_once();
            let verify = fx.verify(mock, |fx, m| fx.member(m, name), Some(times));
            fx.statement(verify);
            assert_eq!(only(run(fx), RuleCode::MissingVerification).len(), 1);
        }

        #[test]
        fn verify_before_the_setup_does_not_count() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            let mock = fx.mock_local("mock", s.foo);
            let verify = fx.verify_empty(mock);
            fx.statement(verify);
            let count = s.count;
            let setup = fx.setup(mock, |fx, m| fx.member(m, count));
            let verifiable = fx.verifiable(setup);
            fx.statement(verifiable);
            assert_eq!(only(run(fx), RuleCode::MissingVerification).len(), 1);
        }

        #[test]
        fn static_verify_listing_the_mock_covers_it() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            let mock = verifiable_setup(&mut fx, &s);
            let verify = fx.static_verify("Verify", &[mock]);
            fx.statement(verify);
            assert!(only(run(fx), RuleCode::MissingVerification).is_empty());
        }
    }

    mod missing_verify_all {
        use super::*;

        #[test]
        fn local_mock_without_verify_all_warns() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            fx.mock_local("mock", foo);
            let diags = only(run(fx), RuleCode::MissingVerifyAll);
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].args, vec!["mock".to_string()]);
        }

        #[test]
        fn verify_all_later_is_quiet() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let mock = fx.mock_local("mock", foo);
            let verify_all = fx.verify_all(mock);
            fx.statement(verify_all);
            assert!(only(run(fx), RuleCode::MissingVerifyAll).is_empty());
        }

        #[test]
        fn verify_all_inside_a_lambda_counts() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let mock = fx.mock_local("mock", foo);
            fx.in_lambda(|fx| {
                let verify_all = fx.verify_all(mock);
                fx.statement(verify_all);
            });
            assert!(only(run(fx), RuleCode::MissingVerifyAll).is_empty());
        }

        #[test]
        fn verify_all_of_another_mock_does_not_count() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let first = fx.mock_local("first", foo);
            fx.mock_local("second", foo);
            let verify_all = fx.verify_all(first);
            fx.statement(verify_all);
            let static_all = fx.static_verify("VerifyAll", &[first]);
            fx.statement(static_all);
            let diags = only(run(fx), RuleCode::MissingVerifyAll);
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].args, vec!["second".to_string()]);
        }
    }

    mod verify_times {
        use super::*;

        #[test]
        fn verify_without_times_warns() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            let mock = fx.mock_local("mock", s.foo);
            let count = s.count;
            let verify = fx.verify(mock, |fx, m| fx.member(m, count), None);
            fx.statement(verify);
            let diags = only(run(fx), RuleCode::VerifyWithoutTimes);
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].args, vec!["Count".to_string()]);
        }

        #[test]
        fn times_argument_is_quiet() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            let mock = fx.mock_local("mock", s.foo);
            let count = s.count;
            let times = fx.times_once();
            let verify = fx.verify(mock, |fx, m| fx.member(m, count), Some(times));
            fx.statement(verify);
            assert!(only(run(fx), RuleCode::VerifyWithoutTimes).is_empty());
        }

        #[test]
        fn times_variable_is_quiet() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            let mock = fx.mock_local("mock", s.foo);
            let once = fx.times_once();
            let times = fx.declare("times", once);
            let count = s.count;
            let reference = fx.ident(times);
            let verify = fx.verify(mock, |fx, m| fx.member(m, count), Some(reference));
            fx.statement(verify);
            assert!(only(run(fx), RuleCode::VerifyWithoutTimes).is_empty());
        }

        #[test]
        fn lambda_producing_times_is_quiet() {
            let mut fx = MoqFixture::new();
            let s = service(&mut fx);
            let mock = fx.mock_local("mock", s.foo);
            let times_type = fx.times_type();
            let factory = fx.lambda(&[], Some(times_type), |fx, _| fx.times_once());
            let count = s.count;
            let verify = fx.verify(mock, |fx, m| fx.member(m, count), Some(factory));
            fx.statement(verify);
            assert!(only(run(fx), RuleCode::VerifyWithoutTimes).is_empty());
        }

        #[test]
        fn verify_without_arguments_is_not_checked() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let mock = fx.mock_local("mock", foo);
            let verify = fx.verify_empty(mock);
            fx.statement(verify);
            assert!(only(run(fx), RuleCode::VerifyWithoutTimes).is_empty());
        }
    }

    mod static_verify {
        use super::*;

        #[test]
        fn static_verify_without_mocks_warns() {
            let mut fx = MoqFixture::new();
            let verify = fx.static_verify("Verify", &[]);
            fx.statement(verify);
            let verify_all = fx.static_verify("VerifyAll", &[]);
            fx.statement(verify_all);
            let diags = only(run(fx), RuleCode::StaticVerifyWithoutMocks);
            let names: Vec<&str> = diags.iter().map(|d| d.args[0].as_str()).collect();
            assert_eq!(names, vec!["Verify", "VerifyAll"]);
        }

        #[test]
        fn static_verify_with_a_mock_is_quiet() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let mock = fx.mock_local("mock", foo);
            let verify = fx.static_verify("Verify", &[mock]);
            fx.statement(verify);
            assert!(only(run(fx), RuleCode::StaticVerifyWithoutMocks).is_empty());
        }
    }
}
