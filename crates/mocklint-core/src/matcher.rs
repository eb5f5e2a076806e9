//! Member and overload matching.
//!
//! Supplied arguments are reduced to [`ArgumentFact`]s (a `null` literal, a
//! `default` literal, or a statically typed expression) and matched against
//! candidate members in declaration order. The first viable candidate wins;
//! no attempt is made to rank candidates the way a compiler would.
//!
//! Compatibility rules:
//! - `null` needs a formal type that accepts null: a reference type,
//!   `Nullable<T>`, or a reference-constrained type parameter
//! - `default` is accepted by every formal type
//! - anything else must be identical to, or derived from, the formal type,
//!   following base types and implemented interfaces transitively
//!
//! Every type derives from `System.Object`.

use std::collections::{HashSet, VecDeque};

use crate::cancel::CancelCheck;
use crate::context::AnalysisContext;
use crate::model::{LiteralKind, NodeId, NodeKind, SymbolId};

// ============================================================================
// Argument facts
// ============================================================================

/// What the matcher needs to know about one supplied argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppliedKind {
    Null,
    Default,
    Typed(SymbolId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentFact {
    /// The argument node as written.
    pub node: NodeId,
    pub kind: SuppliedKind,
}

impl ArgumentFact {
    pub fn type_(&self) -> Option<SymbolId> {
        match self.kind {
            SuppliedKind::Typed(ty) => Some(ty),
            SuppliedKind::Null | SuppliedKind::Default => None,
        }
    }
}

/// Facts for every argument, or `None` if any argument's type is unknown.
pub fn argument_facts(ctx: &AnalysisContext<'_>, arguments: &[NodeId]) -> Option<Vec<ArgumentFact>> {
    arguments
        .iter()
        .map(|arg| {
            let expr = ctx.expression(*arg)?;
            let kind = match &expr.kind {
                NodeKind::Literal {
                    literal: LiteralKind::Null,
                } => SuppliedKind::Null,
                NodeKind::Literal {
                    literal: LiteralKind::Default,
                } => SuppliedKind::Default,
                _ => SuppliedKind::Typed(expr.type_?),
            };
            Some(ArgumentFact { node: *arg, kind })
        })
        .collect()
}

/// Split off a leading `MockBehavior` argument.
///
/// Returns the remaining arguments and whether a behavior was present.
pub fn strip_behavior_argument<'f>(
    ctx: &AnalysisContext<'_>,
    facts: &'f [ArgumentFact],
) -> (&'f [ArgumentFact], bool) {
    match facts.split_first() {
        Some((first, rest))
            if first
                .type_()
                .is_some_and(|ty| ctx.catalog.is_mock_behavior_type(ty)) =>
        {
            (rest, true)
        }
        _ => (facts, false),
    }
}

// ============================================================================
// Overload matching
// ============================================================================

/// Candidate currently under consideration.
///
/// Loses viability on an arity mismatch or on the first incompatible
/// argument, but stays recorded so callers can report on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchedConstructor {
    pub candidate: Option<SymbolId>,
    pub viable: bool,
}

impl MatchedConstructor {
    fn into_result(self) -> MatchResult {
        MatchResult {
            matched: self.viable,
            candidate: self.candidate,
        }
    }
}

/// Outcome of [`match_members`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    /// The winning candidate, or the last one tried when nothing matched.
    pub candidate: Option<SymbolId>,
}

/// First-fit match of `supplied` against `candidates`, in order.
///
/// `None` when the analysis was cancelled or a candidate's parameter types
/// cannot be resolved.
pub fn match_members(
    ctx: &AnalysisContext<'_>,
    candidates: &[SymbolId],
    supplied: &[ArgumentFact],
) -> Option<MatchResult> {
    let mut current = MatchedConstructor::default();
    for candidate in candidates {
        ctx.cancel.check()?;
        current = MatchedConstructor {
            candidate: Some(*candidate),
            viable: true,
        };
        let parameters = &ctx.symbol(*candidate)?.as_method()?.parameters;
        if parameters.len() != supplied.len() {
            current.viable = false;
            continue;
        }
        for (parameter, fact) in parameters.iter().zip(supplied) {
            let formal = ctx.symbol(*parameter)?.value_type()?;
            if !is_compatible(ctx, fact, formal)? {
                current.viable = false;
                break;
            }
        }
        if current.viable {
            break;
        }
    }
    Some(current.into_result())
}

/// Whether one supplied argument converts to `formal`.
pub fn is_compatible(
    ctx: &AnalysisContext<'_>,
    fact: &ArgumentFact,
    formal: SymbolId,
) -> Option<bool> {
    match fact.kind {
        SuppliedKind::Null => Some(accepts_null(ctx, formal)),
        SuppliedKind::Default => Some(true),
        SuppliedKind::Typed(ty) => is_identical_or_derived(ctx, ty, formal),
    }
}

/// Reference types, `Nullable<T>` and reference-constrained type parameters.
pub fn accepts_null(ctx: &AnalysisContext<'_>, ty: SymbolId) -> bool {
    if ctx.catalog.is_nullable_type(ty) {
        return true;
    }
    ctx.compilation
        .type_detail(ty)
        .is_some_and(|detail| detail.is_reference_type())
}

/// Whether `ty` is `target` or reaches it through base types and interfaces.
///
/// `None` only on cancellation.
pub fn is_identical_or_derived(
    ctx: &AnalysisContext<'_>,
    ty: SymbolId,
    target: SymbolId,
) -> Option<bool> {
    if ctx.catalog.is_object_type(target) {
        return Some(true);
    }
    let comp = ctx.compilation;
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([ty]);
    while let Some(current) = queue.pop_front() {
        ctx.cancel.check()?;
        if !visited.insert(current) {
            continue;
        }
        if comp.same_type(current, target) {
            return Some(true);
        }
        let Some(detail) = comp.type_detail(current) else {
            continue;
        };
        queue.extend(detail.base_type);
        queue.extend(detail.interfaces.iter().copied());
    }
    Some(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::catalog::SymbolCatalog;
    use crate::fixture::MoqFixture;
    use crate::model::Accessibility;
    use std::sync::Arc;

    fn with_ctx<R>(fx: MoqFixture, f: impl FnOnce(&AnalysisContext<'_>) -> R) -> R {
        let catalog = SymbolCatalog::resolve(Arc::new(fx.finish())).unwrap();
        let cancel = CancellationToken::new();
        f(&AnalysisContext::new(&catalog, &cancel))
    }

    fn facts(ctx: &AnalysisContext<'_>, nodes: &[NodeId]) -> Vec<ArgumentFact> {
        argument_facts(ctx, nodes).unwrap()
    }

    mod derivation {
        use super::*;

        #[test]
        fn base_chain_and_interfaces_are_followed() {
            let mut fx = MoqFixture::new();
            let shape = fx.interface("IShape");
            let base = fx.class("Base");
            fx.implement(base, shape);
            let derived = fx.derived_class("Derived", base);
            let unrelated = fx.class("Unrelated");

            with_ctx(fx, |ctx| {
                assert_eq!(is_identical_or_derived(ctx, derived, base), Some(true));
                assert_eq!(is_identical_or_derived(ctx, derived, shape), Some(true));
                assert_eq!(is_identical_or_derived(ctx, base, derived), Some(false));
                assert_eq!(is_identical_or_derived(ctx, unrelated, base), Some(false));
            });
        }

        #[test]
        fn everything_derives_from_object() {
            let mut fx = MoqFixture::new();
            let point = fx.struct_type("Point");
            let object = fx.object();
            with_ctx(fx, |ctx| {
                assert_eq!(is_identical_or_derived(ctx, point, object), Some(true));
            });
        }

        #[test]
        fn cancellation_is_not_applicable() {
            let mut fx = MoqFixture::new();
            let base = fx.class("Base");
            let derived = fx.derived_class("Derived", base);
            let catalog = SymbolCatalog::resolve(Arc::new(fx.finish())).unwrap();
            let cancel = CancellationToken::new();
            cancel.cancel();
            let ctx = AnalysisContext::new(&catalog, &cancel);
            assert_eq!(is_identical_or_derived(&ctx, derived, base), None);
        }
    }

    mod null_and_default {
        use super::*;

        #[test]
        fn null_needs_a_nullable_formal() {
            let mut fx = MoqFixture::new();
            let int = fx.int();
            let string = fx.string();
            let nullable_int = fx.nullable_of(int);
            let constrained = fx.type_parameter("T", true);
            let unconstrained = fx.type_parameter("U", false);
            let null = fx.null();
            fx.statement(null);

            with_ctx(fx, |ctx| {
                let fact = facts(ctx, &[null])[0];
                assert_eq!(fact.kind, SuppliedKind::Null);
                assert_eq!(is_compatible(ctx, &fact, int), Some(false));
                assert_eq!(is_compatible(ctx, &fact, string), Some(true));
                assert_eq!(is_compatible(ctx, &fact, nullable_int), Some(true));
                assert_eq!(is_compatible(ctx, &fact, constrained), Some(true));
                assert_eq!(is_compatible(ctx, &fact, unconstrained), Some(false));
            });
        }

        #[test]
        fn default_is_always_compatible() {
            let mut fx = MoqFixture::new();
            let int = fx.int();
            let point = fx.struct_type("Point");
            let default = fx.default_literal();
            fx.statement(default);

            with_ctx(fx, |ctx| {
                let fact = facts(ctx, &[default])[0];
                assert_eq!(is_compatible(ctx, &fact, int), Some(true));
                assert_eq!(is_compatible(ctx, &fact, point), Some(true));
            });
        }

        #[test]
        fn untyped_argument_is_not_applicable() {
            let mut fx = MoqFixture::new();
            let int = fx.int();
            let number = fx.number(int);
            let untyped = fx.statement_lambda(&[]);
            fx.statement(number);
            fx.statement(untyped);

            with_ctx(fx, |ctx| {
                assert!(argument_facts(ctx, &[number]).is_some());
                assert!(argument_facts(ctx, &[number, untyped]).is_none());
            });
        }
    }

    mod overloads {
        use super::*;

        #[test]
        fn first_viable_candidate_wins() {
            let mut fx = MoqFixture::new();
            let widget = fx.class("Widget");
            let object = fx.object();
            let string = fx.string();
            let int = fx.int();
            let by_object = fx.constructor(widget, &[("value", object)], Accessibility::Public);
            let by_string = fx.constructor(widget, &[("value", string)], Accessibility::Public);
            let by_int = fx.constructor(widget, &[("value", int)], Accessibility::Public);
            let text = fx.string_literal();
            fx.statement(text);

            with_ctx(fx, |ctx| {
                let supplied = facts(ctx, &[text]);
                let result = match_members(ctx, &[by_object, by_string, by_int], &supplied).unwrap();
                assert!(result.matched);
                assert_eq!(result.candidate, Some(by_object));

                let result = match_members(ctx, &[by_int, by_string], &supplied).unwrap();
                assert_eq!(result.candidate, Some(by_string));
            });
        }

        #[test]
        fn no_match_keeps_last_candidate() {
            let mut fx = MoqFixture::new();
            let widget = fx.class("Widget");
            let int = fx.int();
            let first = fx.constructor(widget, &[], Accessibility::Public);
            let second = fx.constructor(widget, &[("a", int), ("b", int)], Accessibility::Private);
            let text = fx.string_literal();
            fx.statement(text);

            with_ctx(fx, |ctx| {
                let supplied = facts(ctx, &[text]);
                let result = match_members(ctx, &[first, second], &supplied).unwrap();
                assert!(!result.matched);
                assert_eq!(result.candidate, Some(second));
            });
        }

        #[test]
        fn empty_candidate_list_does_not_match() {
            let fx = MoqFixture::new();
            with_ctx(fx, |ctx| {
                let result = match_members(ctx, &[], &[]).unwrap();
                assert!(!result.matched);
                assert_eq!(result.candidate, None);
            });
        }

        #[test]
        fn leading_behavior_is_stripped_once() {
            let mut fx = MoqFixture::new();
            let strict = fx.behavior("Strict");
            let loose = fx.behavior("Loose");
            fx.statement(strict);
            fx.statement(loose);

            with_ctx(fx, |ctx| {
                let supplied = facts(ctx, &[strict, loose]);
                let (rest, had_behavior) = strip_behavior_argument(ctx, &supplied);
                assert!(had_behavior);
                assert_eq!(rest.len(), 1);
                assert_eq!(rest[0].node, loose);
            });
        }
    }
}
