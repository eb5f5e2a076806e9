//! End-to-end scenarios through the public analyzer API.
//!
//! Each test builds a compilation with `MoqFixture`, runs the full rule set
//! and looks only at the rule codes it is about. Plain `new Mock<T>()`
//! locals also draw ML1000 and ML1009, which most tests ignore.

use std::sync::Arc;

use mocklint_core::fixture::MoqFixture;
use mocklint_core::model::{Accessibility, NodeKind};
use mocklint_core::{
    Analysis, Analyzer, CancellationToken, CatalogCache, Compilation, MockLintError, RuleCode,
};

fn analyze(fx: MoqFixture) -> Analysis {
    analyze_compilation(fx.finish())
}

fn analyze_compilation(compilation: Compilation) -> Analysis {
    let compilation = Arc::new(compilation);
    let cache = CatalogCache::new();
    Analyzer::new().analyze(&compilation, &cache, &CancellationToken::new())
}

/// Diagnostics other than the creation-level warnings every plain mock gets.
fn interesting(analysis: &Analysis) -> Vec<RuleCode> {
    analysis
        .diagnostics
        .iter()
        .map(|d| d.rule)
        .filter(|code| !matches!(code, RuleCode::StrictBehavior | RuleCode::MissingVerifyAll))
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

/// `mock.Setup(m => m.F(It.IsAny<int>()))` on `void F(int)`.
fn setup_f(fx: &mut MoqFixture) -> mocklint_core::model::NodeId {
    let foo = fx.interface("IFoo");
    let int = fx.int();
    let f = fx.method(foo, "F", &[("value", int)], None);
    let mock = fx.mock_local("mock", foo);
    fx.setup(mock, |fx, m| {
        let any = fx.it_is_any(int);
        fx.call(m, f, &[any])
    })
}

#[test]
fn scenario_a_matching_callback_is_quiet() {
    let mut fx = MoqFixture::new();
    let setup = setup_f(&mut fx);
    let int = fx.int();
    let callback = fx.callback(setup, &[("x", int)]);
    fx.statement(callback);
    assert!(interesting(&analyze(fx)).is_empty());
}

#[test]
fn scenario_b_callback_parameter_type_mismatch() {
    let mut fx = MoqFixture::new();
    let setup = setup_f(&mut fx);
    let string = fx.string();
    let callback = fx.callback(setup, &[("x", string)]);
    fx.statement(callback);
    let analysis = analyze(fx);
    assert_eq!(
        interesting(&analysis),
        vec![RuleCode::CallbackSignatureMismatch]
    );
    let diagnostic = analysis
        .diagnostics
        .iter()
        .find(|d| d.rule == RuleCode::CallbackSignatureMismatch)
        .unwrap();
    assert_eq!(diagnostic.args[0], "IFoo.F");
    assert!(diagnostic.message.contains("IFoo.F"));
}

#[test]
fn scenario_c_interface_mock_with_two_arguments() {
    let mut fx = MoqFixture::new();
    let foo = fx.interface("IFoo");
    let int = fx.int();
    let one = fx.number(int);
    let two = fx.number(int);
    let creation = fx.new_mock(foo, &[one, two]);
    fx.declare("mock", creation);
    let analysis = analyze(fx);
    assert_eq!(
        interesting(&analysis),
        vec![
            RuleCode::InterfaceConstructorArguments,
            RuleCode::InterfaceConstructorArguments
        ]
    );
    assert_eq!(analysis.error_count(), 2);
}

/// `mock.Setup(m => m.P).Verifiable()` with no later verification.
fn verifiable_without_verify() -> MoqFixture {
    let mut fx = MoqFixture::new();
    let foo = fx.interface("IFoo");
    let int = fx.int();
    let p = fx.property(foo, "P", int);
    let mock = fx.mock_local("mock", foo);
    let setup = fx.setup(mock, |fx, m| fx.member(m, p));
    let verifiable = fx.verifiable(setup);
    fx.statement(verifiable);
    fx
}

#[test]
fn scenario_d_verifiable_without_verify() {
    let analysis = analyze(verifiable_without_verify());
    assert_eq!(interesting(&analysis), vec![RuleCode::MissingVerification]);
}

#[test]
fn scenario_d_later_verify_all_satisfies_both_rules() {
    let mut fx = MoqFixture::new();
    let foo = fx.interface("IFoo");
    let int = fx.int();
    let p = fx.property(foo, "P", int);
    let mock = fx.strict_mock_local("mock", foo);
    let setup = fx.setup(mock, |fx, m| fx.member(m, p));
    let returns = fx.returns_value(setup, int);
    let verifiable = fx.verifiable(returns);
    fx.statement(verifiable);
    let verify_all = fx.verify_all(mock);
    fx.statement(verify_all);
    assert!(analyze(fx).diagnostics.is_empty());
}

#[test]
fn scenario_e_raise_with_too_few_arguments() {
    let mut fx = MoqFixture::new();
    let foo = fx.interface("IFoo");
    let (string, int, boolean) = (fx.string(), fx.int(), fx.boolean());
    let handler = fx.delegate_type("ChangedHandler", &[string, int, boolean], None);
    let ev = fx.event(foo, "Ev", handler);
    let mock = fx.mock_local("mock", foo);
    let a = fx.string_literal();
    let one = fx.number(int);
    let raise = fx.raise(mock, ev, &[a, one]);
    fx.statement(raise);
    let analysis = analyze(fx);
    assert_eq!(interesting(&analysis), vec![RuleCode::RaiseSignatureMismatch]);
    let diagnostic = &analysis
        .diagnostics
        .iter()
        .find(|d| d.rule == RuleCode::RaiseSignatureMismatch)
        .unwrap();
    assert_eq!(diagnostic.args[0], "IFoo.Ev");
    assert!(diagnostic.args[1].contains('3'));
    assert!(diagnostic.args[1].contains('2'));
}

// ============================================================================
// Properties
// ============================================================================

/// Setup, callback, raise and a bad constructor call in one method.
fn busy_method() -> MoqFixture {
    let mut fx = MoqFixture::new();
    let setup = setup_f(&mut fx);
    let string = fx.string();
    let callback = fx.callback(setup, &[("x", string)]);
    fx.statement(callback);

    let service = fx.class("Service");
    fx.constructor(service, &[("name", string)], Accessibility::Public);
    let int = fx.int();
    let number = fx.number(int);
    let creation = fx.new_mock(service, &[number]);
    fx.declare("service", creation);
    fx
}

#[test]
fn analysis_is_deterministic() {
    let first = analyze(busy_method());
    for _ in 0..8 {
        assert_eq!(analyze(busy_method()), first);
    }
}

#[test]
fn json_round_trip_gives_the_same_analysis() {
    let compilation = busy_method().finish();
    let json = serde_json::to_string(&compilation).unwrap();
    let reloaded = Compilation::from_json(&json).unwrap();
    assert_eq!(analyze_compilation(reloaded), analyze(busy_method()));
}

#[test]
fn any_matching_constructor_is_enough() {
    let mut fx = MoqFixture::new();
    let service = fx.class("Service");
    let (int, string) = (fx.int(), fx.string());
    fx.constructor(service, &[("count", int)], Accessibility::Public);
    fx.constructor(service, &[("name", string)], Accessibility::Public);
    let name = fx.string_literal();
    let creation = fx.new_mock(service, &[name]);
    fx.declare("mock", creation);
    assert!(interesting(&analyze(fx)).is_empty());
}

#[test]
fn null_fits_reference_parameters_only() {
    let mut fx = MoqFixture::new();
    let service = fx.class("Service");
    let string = fx.string();
    fx.constructor(service, &[("name", string)], Accessibility::Public);
    let null = fx.null();
    let creation = fx.new_mock(service, &[null]);
    fx.declare("mock", creation);
    assert!(interesting(&analyze(fx)).is_empty());

    let mut fx = MoqFixture::new();
    let service = fx.class("Service");
    let int = fx.int();
    fx.constructor(service, &[("count", int)], Accessibility::Public);
    let null = fx.null();
    let creation = fx.new_mock(service, &[null]);
    fx.declare("mock", creation);
    assert_eq!(
        interesting(&analyze(fx)),
        vec![RuleCode::ConstructorArgumentsMismatch]
    );
}

#[test]
fn default_fits_any_parameter() {
    let mut fx = MoqFixture::new();
    let service = fx.class("Service");
    let int = fx.int();
    fx.constructor(service, &[("count", int)], Accessibility::Public);
    let default = fx.default_literal();
    let creation = fx.new_mock(service, &[default]);
    fx.declare("mock", creation);
    assert!(interesting(&analyze(fx)).is_empty());
}

#[test]
fn any_type_placeholder_matches_every_formal() {
    let mut fx = MoqFixture::new();
    let foo = fx.interface("IFoo");
    let int = fx.int();
    let f = fx.method(foo, "F", &[("value", int)], None);
    let mock = fx.mock_local("mock", foo);
    let any_type = fx.any_type();
    let setup = fx.setup(mock, |fx, m| {
        let any = fx.it_is_any(any_type);
        fx.call(m, f, &[any])
    });
    fx.statement(setup);
    assert!(interesting(&analyze(fx)).is_empty());
}

#[test]
fn parameterless_callback_is_exempt_from_arity() {
    let mut fx = MoqFixture::new();
    let setup = setup_f(&mut fx);
    let callback = fx.callback(setup, &[]);
    fx.statement(callback);
    assert!(interesting(&analyze(fx)).is_empty());
}

#[test]
fn compilation_without_mocks_is_quiet() {
    let mut fx = MoqFixture::new();
    let foo = fx.interface("IFoo");
    fx.method(foo, "F", &[], None);
    let analysis = analyze(fx);
    assert_eq!(analysis, Analysis::default());
}

#[test]
fn cache_shared_across_compilations_with_one_id() {
    let alone = analyze(verifiable_without_verify());
    let codes: Vec<RuleCode> = alone.diagnostics.iter().map(|d| d.rule).collect();
    assert_eq!(
        codes,
        vec![
            RuleCode::StrictBehavior,
            RuleCode::MissingVerifyAll,
            RuleCode::MissingVerification,
        ]
    );

    let earlier = Arc::new(busy_method().finish());
    let later = Arc::new(verifiable_without_verify().finish());
    assert_eq!(earlier.id, later.id);
    let cache = CatalogCache::new();
    let analyzer = Analyzer::new();
    let cancel = CancellationToken::new();
    let first = analyzer.analyze(&earlier, &cache, &cancel);
    assert!(!first.diagnostics.is_empty());
    assert_eq!(analyzer.analyze(&later, &cache, &cancel), alone);
}

#[test]
fn cyclic_parent_links_are_rejected_on_load() {
    let mut compilation = verifiable_without_verify().finish();
    let creation = compilation
        .nodes
        .iter()
        .find(|n| matches!(n.kind, NodeKind::ObjectCreation { .. }))
        .unwrap();
    let (creation, declaration) = (creation.id, creation.parent.unwrap());
    compilation.nodes[declaration.index()].parent = Some(creation);

    let json = serde_json::to_string(&compilation).unwrap();
    let err = Compilation::from_json(&json).unwrap_err();
    assert!(matches!(err, MockLintError::InvalidModel { .. }));
}
