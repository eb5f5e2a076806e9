//! Delegate rules for `Callback`, `Returns` and `ReturnsAsync`.
//!
//! - ML1006: the callback's parameters differ from the configured member's
//! - ML1007: a discarded callback parameter receives a matched argument
//! - ML1014: the `Returns` delegate's parameters or result differ

use super::{report, Rule};
use crate::chain::{extract_setup_chain, is_discard_name, preceding_call, ChainInvocation};
use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, RuleCode};
use crate::model::{NodeId, SymbolId};
use crate::signature::{
    check_parameters, check_return, delegate_signature, DelegateSignature, SignatureMismatch,
    Verdict,
};

pub struct CallbackRule;

impl Rule for CallbackRule {
    fn codes(&self) -> &'static [RuleCode] {
        &[
            RuleCode::CallbackSignatureMismatch,
            RuleCode::CallbackParameterIgnored,
            RuleCode::ReturnsSignatureMismatch,
        ]
    }

    fn check(&self, ctx: &AnalysisContext<'_>, site: NodeId, out: &mut Vec<Diagnostic>) {
        let Some((method, _)) = ctx.invocation(site) else {
            return;
        };
        let catalog = ctx.catalog;
        if catalog.is_callback_method(method) {
            check_callback(ctx, site, out).unwrap_or(());
        } else if catalog.is_returns_method(method) || catalog.is_returns_async_method(method) {
            let is_async = catalog.is_returns_async_method(method);
            check_returns(ctx, site, is_async, out).unwrap_or(());
        }
    }
}

/// Setup chain and delegate signature for a `.Callback(..)`/`.Returns(..)`
/// call.
fn chain_and_delegate(
    ctx: &AnalysisContext<'_>,
    site: NodeId,
) -> Option<(ChainInvocation, DelegateSignature)> {
    let (_, arguments) = ctx.invocation(site)?;
    let delegate = delegate_signature(ctx, *arguments.first()?)?;
    let setup = preceding_call(ctx, site, |s| ctx.catalog.is_setup_method(s))?;
    let chain = extract_setup_chain(ctx, setup)?;
    Some((chain, delegate))
}

fn check_callback(ctx: &AnalysisContext<'_>, site: NodeId, out: &mut Vec<Diagnostic>) -> Option<()> {
    let (chain, delegate) = chain_and_delegate(ctx, site)?;
    match check_parameters(ctx, &chain, &delegate)? {
        Verdict::Mismatch(mismatch) => report_mismatch(
            ctx,
            out,
            RuleCode::CallbackSignatureMismatch,
            &chain,
            &delegate,
            mismatch,
        ),
        Verdict::Compatible => check_ignored_parameters(ctx, &chain, &delegate, out),
    }
}

fn check_ignored_parameters(
    ctx: &AnalysisContext<'_>,
    chain: &ChainInvocation,
    delegate: &DelegateSignature,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    if !delegate.is_lambda(ctx) {
        return None;
    }
    let formals: &[SymbolId] = &ctx.symbol(chain.target.symbol())?.as_method()?.parameters;
    if formals.len() != delegate.parameters.len() {
        return None;
    }
    for (formal, parameter) in formals.iter().zip(&delegate.parameters) {
        if !is_discard_name(&parameter.name) {
            continue;
        }
        let matched = chain
            .arguments
            .iter()
            .any(|a| a.parameter == Some(*formal) && a.kind.is_matcher());
        if !matched {
            continue;
        }
        let formal_name = ctx.symbol(*formal)?.name.clone();
        report(
            ctx,
            out,
            RuleCode::CallbackParameterIgnored,
            parameter.node,
            vec![parameter.name.clone(), formal_name],
        );
    }
    Some(())
}

fn check_returns(
    ctx: &AnalysisContext<'_>,
    site: NodeId,
    is_async: bool,
    out: &mut Vec<Diagnostic>,
) -> Option<()> {
    let (chain, delegate) = chain_and_delegate(ctx, site)?;
    let verdict = match check_parameters(ctx, &chain, &delegate)? {
        Verdict::Compatible => check_return(ctx, &chain, &delegate, is_async)?,
        mismatch => mismatch,
    };
    let Verdict::Mismatch(mismatch) = verdict else {
        return None;
    };
    report_mismatch(
        ctx,
        out,
        RuleCode::ReturnsSignatureMismatch,
        &chain,
        &delegate,
        mismatch,
    )
}

fn report_mismatch(
    ctx: &AnalysisContext<'_>,
    out: &mut Vec<Diagnostic>,
    code: RuleCode,
    chain: &ChainInvocation,
    delegate: &DelegateSignature,
    mismatch: SignatureMismatch,
) -> Option<()> {
    let at = match mismatch {
        SignatureMismatch::ParameterType { node, .. } => node,
        _ => delegate.node,
    };
    report(
        ctx,
        out,
        code,
        at,
        vec![
            ctx.display_member(chain.target.symbol()),
            describe_mismatch(ctx, mismatch),
        ],
    )
}

fn describe_mismatch(ctx: &AnalysisContext<'_>, mismatch: SignatureMismatch) -> String {
    match mismatch {
        SignatureMismatch::PropertyWithParameters { count, .. } => format!(
            "a property takes no arguments but the delegate declares {} parameter(s)",
            count
        ),
        SignatureMismatch::ArityMismatch { expected, actual } => {
            format!("expected {} parameter(s), found {}", expected, actual)
        }
        SignatureMismatch::ParameterType {
            index,
            expected,
            actual,
            ..
        } => format!(
            "parameter {} is '{}' but '{}' is expected",
            index + 1,
            ctx.display_type(actual),
            ctx.display_type(expected)
        ),
        SignatureMismatch::ReturnType { expected, actual } => format!(
            "returns '{}' but '{}' is expected",
            ctx.display_type(actual),
            ctx.display_type(expected)
        ),
    }
}
