//! Chain extraction: from a Moq call site to structured facts.
//!
//! A setup-style call (`mock.Setup(m => m.A.B(It.IsAny<int>()))`) is reduced
//! to a [`ChainInvocation`]: the ordered members reached from the lambda
//! parameter (`A`, then `B`), the mocked target, and the arguments passed to
//! it, each classified and bound to its formal parameter.
//!
//! Accepted lambda bodies:
//! - `m => m.P` (property target)
//! - `m => m.A.M(args)` (method target)
//! - `m => m.P = value` (property target, `SetupSet`)
//!
//! Every other shape is "not extractable" and yields `None`.
//!
//! Companion calls are found along the fluent chain: [`following_call`] walks
//! calls applied to the current call's result, [`preceding_call`] walks
//! receivers back toward the mock.

use crate::cancel::CancelCheck;
use crate::context::AnalysisContext;
use crate::model::{
    AssignmentOperator, DeclarationKey, LiteralKind, NodeId, NodeKind, SymbolDetail, SymbolId,
    SymbolKind,
};

// ============================================================================
// Types
// ============================================================================

/// One resolved step of a member-access chain.
#[derive(Debug, Clone)]
pub struct ChainMember {
    pub name: String,
    pub symbol: SymbolId,
    pub key: DeclarationKey,
    /// Member access node naming this step.
    pub node: NodeId,
}

/// Classification of a call argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// `It.IsAny<T>()`
    AnyMatcher { type_argument: Option<SymbolId> },
    /// `It.Is<T>(predicate)`
    PredicateMatcher { type_argument: Option<SymbolId> },
    /// Any other `Moq.It` matcher.
    OtherMatcher,
    Literal,
    Null,
    Default,
    Expression,
}

impl ArgumentKind {
    pub fn is_matcher(&self) -> bool {
        matches!(
            self,
            ArgumentKind::AnyMatcher { .. }
                | ArgumentKind::PredicateMatcher { .. }
                | ArgumentKind::OtherMatcher
        )
    }

    /// Type argument of an `IsAny`/`Is` matcher.
    pub fn matcher_type(&self) -> Option<SymbolId> {
        match self {
            ArgumentKind::AnyMatcher { type_argument }
            | ArgumentKind::PredicateMatcher { type_argument } => *type_argument,
            _ => None,
        }
    }
}

/// One argument of the mocked call.
#[derive(Debug, Clone)]
pub struct InvocationArgument {
    /// The argument node as written.
    pub node: NodeId,
    /// The argument expression, wrappers removed.
    pub expression: NodeId,
    /// Method the expression invokes, when it is a call.
    pub symbol: Option<SymbolId>,
    pub kind: ArgumentKind,
    /// Formal parameter the argument binds to.
    pub parameter: Option<SymbolId>,
    /// Static type of the expression.
    pub type_: Option<SymbolId>,
}

/// What the chain ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainTarget {
    Method(SymbolId),
    Property(SymbolId),
}

impl ChainTarget {
    pub fn symbol(&self) -> SymbolId {
        match self {
            ChainTarget::Method(s) | ChainTarget::Property(s) => *s,
        }
    }
}

/// Mocked member reference plus its arguments.
///
/// Equality compares only the member keys, so two chains written with
/// different lambda parameter names or type arguments still pair up.
#[derive(Debug, Clone)]
pub struct ChainInvocation {
    /// The Moq call the lambda was passed to.
    pub call: NodeId,
    pub lambda: NodeId,
    pub members: Vec<ChainMember>,
    pub target: ChainTarget,
    pub arguments: Vec<InvocationArgument>,
}

impl PartialEq for ChainInvocation {
    fn eq(&self, other: &Self) -> bool {
        self.members.len() == other.members.len()
            && self
                .members
                .iter()
                .zip(&other.members)
                .all(|(a, b)| a.key == b.key)
    }
}

impl Eq for ChainInvocation {}

impl ChainInvocation {
    /// Last member of the chain.
    pub fn target_member(&self) -> Option<&ChainMember> {
        self.members.last()
    }

    /// `A.B` style rendering for messages.
    pub fn display(&self) -> String {
        self.members
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A single-parameter lambda.
#[derive(Debug, Clone, Copy)]
pub struct LambdaFacts {
    pub node: NodeId,
    pub parameter_node: NodeId,
    pub parameter: Option<SymbolId>,
    pub body: NodeId,
}

/// Facts of a `Raise`/`Raises` call whose lambda subscribes to an event.
#[derive(Debug, Clone)]
pub struct RaiseMethodCall {
    pub call: NodeId,
    pub event: SymbolId,
    /// Member access naming the event.
    pub event_node: NodeId,
    /// Parameter types the raised arguments must match, sender excluded.
    pub parameters: Vec<SymbolId>,
    /// Supplied argument nodes after the lambda.
    pub arguments: Vec<NodeId>,
}

/// Outcome of inspecting a raise lambda.
#[derive(Debug, Clone)]
pub enum RaiseTarget {
    Event(RaiseMethodCall),
    /// The lambda resolves, but not to an event subscription.
    NotAnEvent { node: NodeId, symbol: SymbolId },
}

// ============================================================================
// Extraction
// ============================================================================

/// Chain of a setup-style call with exactly one lambda argument.
pub fn extract_setup_chain(ctx: &AnalysisContext<'_>, call: NodeId) -> Option<ChainInvocation> {
    let (_, arguments) = ctx.invocation(call)?;
    match arguments {
        [only] => extract_lambda_chain(ctx, call, *only),
        _ => None,
    }
}

/// Chain of the lambda passed as `argument` to `call`. Used directly for
/// `Verify(expr, times)`, which carries extra arguments.
pub fn extract_lambda_chain(
    ctx: &AnalysisContext<'_>,
    call: NodeId,
    argument: NodeId,
) -> Option<ChainInvocation> {
    let lambda = single_parameter_lambda(ctx, argument)?;
    let body = ctx.expression(lambda.body)?;

    let mut members = Vec::new();
    let (target, arguments) = match &body.kind {
        NodeKind::MemberAccess { .. } => {
            collect_members(ctx, body.id, &lambda, &mut members)?;
            (property_target(ctx, &members)?, Vec::new())
        }
        NodeKind::Invocation { arguments, .. } => {
            collect_members(ctx, body.id, &lambda, &mut members)?;
            let method = members.last()?.symbol;
            ctx.symbol(method)?.as_method()?;
            (ChainTarget::Method(method), bind_arguments(ctx, arguments, method))
        }
        NodeKind::Assignment {
            target,
            operator: AssignmentOperator::Assign,
            ..
        } => {
            let target = ctx.expression(*target)?;
            if !matches!(target.kind, NodeKind::MemberAccess { .. }) {
                return None;
            }
            collect_members(ctx, target.id, &lambda, &mut members)?;
            (property_target(ctx, &members)?, Vec::new())
        }
        _ => return None,
    };

    Some(ChainInvocation {
        call,
        lambda: lambda.node,
        members,
        target,
        arguments,
    })
}

fn property_target(ctx: &AnalysisContext<'_>, members: &[ChainMember]) -> Option<ChainTarget> {
    let last = members.last()?;
    match ctx.symbol(last.symbol)?.kind() {
        SymbolKind::Property => Some(ChainTarget::Property(last.symbol)),
        _ => None,
    }
}

/// Lambda with exactly one parameter, wrappers skipped.
pub fn single_parameter_lambda(ctx: &AnalysisContext<'_>, expr: NodeId) -> Option<LambdaFacts> {
    let node = ctx.expression(expr)?;
    let NodeKind::Lambda { parameters, body } = &node.kind else {
        return None;
    };
    let [parameter_node] = parameters.as_slice() else {
        return None;
    };
    Some(LambdaFacts {
        node: node.id,
        parameter_node: *parameter_node,
        parameter: ctx.node(*parameter_node)?.symbol,
        body: *body,
    })
}

fn is_lambda_parameter(ctx: &AnalysisContext<'_>, expr: NodeId, lambda: &LambdaFacts) -> bool {
    let Some(node) = ctx.node(expr) else {
        return false;
    };
    let NodeKind::Identifier { name } = &node.kind else {
        return false;
    };
    match (node.symbol, lambda.parameter) {
        (Some(bound), Some(parameter)) => bound == parameter,
        _ => ctx.node(lambda.parameter_node).is_some_and(|p| {
            matches!(&p.kind, NodeKind::Parameter { name: declared } if declared == name)
        }),
    }
}

/// Push the members from the lambda parameter out to `expr`, outermost first.
fn collect_members(
    ctx: &AnalysisContext<'_>,
    expr: NodeId,
    lambda: &LambdaFacts,
    members: &mut Vec<ChainMember>,
) -> Option<()> {
    ctx.cancel.check()?;
    let node = ctx.expression(expr)?;
    match &node.kind {
        NodeKind::Identifier { .. } => is_lambda_parameter(ctx, node.id, lambda).then_some(()),
        NodeKind::MemberAccess { expression, .. } => {
            collect_members(ctx, *expression, lambda, members)?;
            members.push(chain_member(ctx, node.id, node.symbol?)?);
            Some(())
        }
        NodeKind::Invocation { expression, .. } => {
            let callee = ctx.expression(*expression)?;
            let NodeKind::MemberAccess {
                expression: receiver,
                ..
            } = &callee.kind
            else {
                return None;
            };
            collect_members(ctx, *receiver, lambda, members)?;
            members.push(chain_member(ctx, callee.id, node.symbol?)?);
            Some(())
        }
        _ => None,
    }
}

fn chain_member(ctx: &AnalysisContext<'_>, node: NodeId, symbol: SymbolId) -> Option<ChainMember> {
    let resolved = ctx.symbol(symbol)?;
    Some(ChainMember {
        name: resolved.name.clone(),
        symbol,
        key: ctx.compilation.declaration_key(symbol),
        node,
    })
}

/// Bind call arguments to the method's parameters, positionally or by name.
fn bind_arguments(
    ctx: &AnalysisContext<'_>,
    arguments: &[NodeId],
    method: SymbolId,
) -> Vec<InvocationArgument> {
    let parameters = ctx
        .symbol(method)
        .and_then(|s| s.as_method())
        .map(|m| m.parameters.as_slice())
        .unwrap_or(&[]);

    arguments
        .iter()
        .enumerate()
        .map(|(index, arg)| {
            let named = ctx.node(*arg).and_then(|n| match &n.kind {
                NodeKind::Argument {
                    name: Some(name), ..
                } => Some(name.as_str()),
                _ => None,
            });
            let parameter = match named {
                Some(name) => parameters
                    .iter()
                    .copied()
                    .find(|p| ctx.symbol(*p).is_some_and(|s| s.name == name)),
                None => parameters.get(index).copied(),
            };
            classify_argument(ctx, *arg, parameter)
        })
        .collect()
}

/// Classify one argument and attach its formal parameter.
pub fn classify_argument(
    ctx: &AnalysisContext<'_>,
    argument: NodeId,
    parameter: Option<SymbolId>,
) -> InvocationArgument {
    let expression = ctx.compilation.unwrap_expression(argument);
    let node = ctx.node(expression);
    let symbol = node.and_then(|n| match n.kind {
        NodeKind::Invocation { .. } => n.symbol,
        _ => None,
    });

    let kind = match node.map(|n| &n.kind) {
        Some(NodeKind::Literal { literal }) => match literal {
            LiteralKind::Null => ArgumentKind::Null,
            LiteralKind::Default => ArgumentKind::Default,
            _ => ArgumentKind::Literal,
        },
        Some(NodeKind::Invocation { .. }) => match symbol {
            Some(s) if ctx.catalog.is_it_is_any(s) => ArgumentKind::AnyMatcher {
                type_argument: first_type_argument(ctx, s),
            },
            Some(s) if ctx.catalog.is_it_is(s) => ArgumentKind::PredicateMatcher {
                type_argument: first_type_argument(ctx, s),
            },
            Some(s) if ctx.catalog.is_it_matcher(s) => ArgumentKind::OtherMatcher,
            _ => ArgumentKind::Expression,
        },
        _ => ArgumentKind::Expression,
    };

    InvocationArgument {
        node: argument,
        expression,
        symbol,
        kind,
        parameter,
        type_: node.and_then(|n| n.type_),
    }
}

fn first_type_argument(ctx: &AnalysisContext<'_>, method: SymbolId) -> Option<SymbolId> {
    ctx.symbol(method)?
        .as_method()?
        .type_arguments
        .first()
        .copied()
}

// ============================================================================
// Fluent chain navigation
// ============================================================================

/// Outermost parenthesized wrapper of `id`, or `id` itself.
fn outermost(ctx: &AnalysisContext<'_>, mut id: NodeId) -> NodeId {
    for _ in 0..ctx.compilation.nodes.len() {
        let Some(parent) = ctx.node(id).and_then(|n| n.parent).and_then(|p| ctx.node(p)) else {
            break;
        };
        match parent.kind {
            NodeKind::Parenthesized { .. } => id = parent.id,
            _ => break,
        }
    }
    id
}

/// First call applied, directly or further along the chain, to the result
/// of `call` whose method satisfies `is_companion`.
pub fn following_call(
    ctx: &AnalysisContext<'_>,
    call: NodeId,
    is_companion: impl Fn(SymbolId) -> bool,
) -> Option<NodeId> {
    let mut current = call;
    for _ in 0..ctx.compilation.nodes.len() {
        ctx.cancel.check()?;
        let wrapped = outermost(ctx, current);
        let access = ctx.node(ctx.node(wrapped)?.parent?)?;
        match &access.kind {
            NodeKind::MemberAccess { expression, .. } if *expression == wrapped => {}
            _ => return None,
        }
        let next = ctx.node(access.parent?)?;
        match &next.kind {
            NodeKind::Invocation { expression, .. } if *expression == access.id => {}
            _ => return None,
        }
        if is_companion(next.symbol?) {
            return Some(next.id);
        }
        current = next.id;
    }
    None
}

/// Nearest call among the receivers of `call` whose method satisfies
/// `is_companion`.
pub fn preceding_call(
    ctx: &AnalysisContext<'_>,
    call: NodeId,
    is_companion: impl Fn(SymbolId) -> bool,
) -> Option<NodeId> {
    let mut current = call;
    for _ in 0..ctx.compilation.nodes.len() {
        ctx.cancel.check()?;
        let receiver = ctx.receiver(current)?;
        let (symbol, _) = ctx.invocation(receiver)?;
        if is_companion(symbol) {
            return Some(receiver);
        }
        current = receiver;
    }
    None
}

/// The non-call expression the fluent chain of `call` starts from (usually
/// the mock variable).
pub fn fluent_root(ctx: &AnalysisContext<'_>, call: NodeId) -> Option<NodeId> {
    let mut current = call;
    for _ in 0..ctx.compilation.nodes.len() {
        ctx.cancel.check()?;
        let receiver = ctx.receiver(current)?;
        match ctx.node(receiver)?.kind {
            NodeKind::Invocation { .. } => current = receiver,
            _ => return Some(receiver),
        }
    }
    None
}

/// `_`, `__`, `___`: names that mark a lambda parameter as unused.
pub fn is_discard_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 3 && name.chars().all(|c| c == '_')
}

// ============================================================================
// Raise
// ============================================================================

/// Inspect the event lambda of a `Raise`/`Raises` call.
pub fn extract_raise(ctx: &AnalysisContext<'_>, call: NodeId) -> Option<RaiseTarget> {
    let (_, arguments) = ctx.invocation(call)?;
    let (first, rest) = arguments.split_first()?;
    let lambda = single_parameter_lambda(ctx, *first)?;
    let body = ctx.expression(lambda.body)?;

    let (target, subscribes) = match &body.kind {
        NodeKind::Assignment {
            target, operator, ..
        } => (
            *target,
            matches!(
                operator,
                AssignmentOperator::AddAssign | AssignmentOperator::SubtractAssign
            ),
        ),
        NodeKind::MemberAccess { .. } | NodeKind::Invocation { .. } => (body.id, false),
        _ => return None,
    };

    let target = ctx.expression(target)?;
    let mut members = Vec::new();
    collect_members(ctx, target.id, &lambda, &mut members)?;
    let symbol = ctx.symbol(members.last()?.symbol)?;

    let event = match (&symbol.detail, subscribes) {
        (SymbolDetail::Event(event), true) => event,
        _ => {
            return Some(RaiseTarget::NotAnEvent {
                node: target.id,
                symbol: symbol.id,
            })
        }
    };

    let delegate = event.delegate_type;
    let invoke = ctx.compilation.type_detail(delegate)?.delegate_invoke?;
    let mut parameters = Vec::new();
    for parameter in &ctx.symbol(invoke)?.as_method()?.parameters {
        parameters.push(ctx.symbol(*parameter)?.value_type()?);
    }
    if ctx.catalog.is_event_handler_type(delegate) && !parameters.is_empty() {
        parameters.remove(0);
    }

    Some(RaiseTarget::Event(RaiseMethodCall {
        call,
        event: symbol.id,
        event_node: target.id,
        parameters,
        arguments: rest.to_vec(),
    }))
}

// ============================================================================
// Tests
// ============================================================================
