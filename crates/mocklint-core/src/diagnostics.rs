//! Rule identifiers and diagnostic values.
//!
//! Every rule has a stable id (`ML1000`..), a kebab-case name, a default
//! severity and a positional message template. A [`Diagnostic`] stores the
//! template arguments next to the rendered message so consumers can
//! re-render or localize it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MockLintError;
use crate::types::Location;

/// Base of the per-rule documentation links.
pub const HELP_BASE_URI: &str = "https://github.com/tugtool/mocklint/blob/main/docs/rules";

// ============================================================================
// Severity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

// ============================================================================
// Rule codes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleCode {
    #[serde(rename = "ML1000")]
    StrictBehavior,
    #[serde(rename = "ML1001")]
    StrictSetupUnterminated,
    #[serde(rename = "ML1002")]
    ConstructorArgumentsMismatch,
    #[serde(rename = "ML1003")]
    InterfaceConstructorArguments,
    #[serde(rename = "ML1004")]
    NonOverridableSetup,
    #[serde(rename = "ML1005")]
    MatcherTypeMismatch,
    #[serde(rename = "ML1006")]
    CallbackSignatureMismatch,
    #[serde(rename = "ML1007")]
    CallbackParameterIgnored,
    #[serde(rename = "ML1008")]
    MissingVerification,
    #[serde(rename = "ML1009")]
    MissingVerifyAll,
    #[serde(rename = "ML1010")]
    VerifyWithoutTimes,
    #[serde(rename = "ML1011")]
    StaticVerifyWithoutMocks,
    #[serde(rename = "ML1012")]
    RaiseSignatureMismatch,
    #[serde(rename = "ML1013")]
    RaiseNonEvent,
    #[serde(rename = "ML1014")]
    ReturnsSignatureMismatch,
    #[serde(rename = "ML1015")]
    SealedTypeMock,
    #[serde(rename = "ML1016")]
    InaccessibleConstructor,
    #[serde(rename = "ML1017")]
    AsRequiresInterface,
}

impl RuleCode {
    pub const ALL: [RuleCode; 18] = [
        RuleCode::StrictBehavior,
        RuleCode::StrictSetupUnterminated,
        RuleCode::ConstructorArgumentsMismatch,
        RuleCode::InterfaceConstructorArguments,
        RuleCode::NonOverridableSetup,
        RuleCode::MatcherTypeMismatch,
        RuleCode::CallbackSignatureMismatch,
        RuleCode::CallbackParameterIgnored,
        RuleCode::MissingVerification,
        RuleCode::MissingVerifyAll,
        RuleCode::VerifyWithoutTimes,
        RuleCode::StaticVerifyWithoutMocks,
        RuleCode::RaiseSignatureMismatch,
        RuleCode::RaiseNonEvent,
        RuleCode::ReturnsSignatureMismatch,
        RuleCode::SealedTypeMock,
        RuleCode::InaccessibleConstructor,
        RuleCode::AsRequiresInterface,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            RuleCode::StrictBehavior => "ML1000",
            RuleCode::StrictSetupUnterminated => "ML1001",
            RuleCode::ConstructorArgumentsMismatch => "ML1002",
            RuleCode::InterfaceConstructorArguments => "ML1003",
            RuleCode::NonOverridableSetup => "ML1004",
            RuleCode::MatcherTypeMismatch => "ML1005",
            RuleCode::CallbackSignatureMismatch => "ML1006",
            RuleCode::CallbackParameterIgnored => "ML1007",
            RuleCode::MissingVerification => "ML1008",
            RuleCode::MissingVerifyAll => "ML1009",
            RuleCode::VerifyWithoutTimes => "ML1010",
            RuleCode::StaticVerifyWithoutMocks => "ML1011",
            RuleCode::RaiseSignatureMismatch => "ML1012",
            RuleCode::RaiseNonEvent => "ML1013",
            RuleCode::ReturnsSignatureMismatch => "ML1014",
            RuleCode::SealedTypeMock => "ML1015",
            RuleCode::InaccessibleConstructor => "ML1016",
            RuleCode::AsRequiresInterface => "ML1017",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuleCode::StrictBehavior => "strict-behavior",
            RuleCode::StrictSetupUnterminated => "strict-setup-unterminated",
            RuleCode::ConstructorArgumentsMismatch => "constructor-arguments-mismatch",
            RuleCode::InterfaceConstructorArguments => "interface-constructor-arguments",
            RuleCode::NonOverridableSetup => "non-overridable-setup",
            RuleCode::MatcherTypeMismatch => "matcher-type-mismatch",
            RuleCode::CallbackSignatureMismatch => "callback-signature-mismatch",
            RuleCode::CallbackParameterIgnored => "callback-parameter-ignored",
            RuleCode::MissingVerification => "missing-verification",
            RuleCode::MissingVerifyAll => "missing-verify-all",
            RuleCode::VerifyWithoutTimes => "verify-without-times",
            RuleCode::StaticVerifyWithoutMocks => "static-verify-without-mocks",
            RuleCode::RaiseSignatureMismatch => "raise-signature-mismatch",
            RuleCode::RaiseNonEvent => "raise-non-event",
            RuleCode::ReturnsSignatureMismatch => "returns-signature-mismatch",
            RuleCode::SealedTypeMock => "sealed-type-mock",
            RuleCode::InaccessibleConstructor => "inaccessible-constructor",
            RuleCode::AsRequiresInterface => "as-requires-interface",
        }
    }

    /// Default severity, before configuration overrides.
    pub fn severity(&self) -> Severity {
        match self {
            RuleCode::StrictBehavior
            | RuleCode::MatcherTypeMismatch
            | RuleCode::CallbackParameterIgnored
            | RuleCode::MissingVerification
            | RuleCode::MissingVerifyAll
            | RuleCode::VerifyWithoutTimes
            | RuleCode::StaticVerifyWithoutMocks => Severity::Warning,
            RuleCode::StrictSetupUnterminated
            | RuleCode::ConstructorArgumentsMismatch
            | RuleCode::InterfaceConstructorArguments
            | RuleCode::NonOverridableSetup
            | RuleCode::CallbackSignatureMismatch
            | RuleCode::RaiseSignatureMismatch
            | RuleCode::RaiseNonEvent
            | RuleCode::ReturnsSignatureMismatch
            | RuleCode::SealedTypeMock
            | RuleCode::InaccessibleConstructor
            | RuleCode::AsRequiresInterface => Severity::Error,
        }
    }

    /// Message template with `{0}`, `{1}` placeholders.
    pub fn template(&self) -> &'static str {
        match self {
            RuleCode::StrictBehavior => "Mock of '{0}' should be created with MockBehavior.Strict",
            RuleCode::StrictSetupUnterminated => {
                "Strict setup of '{0}' returns a value but has no Returns, Throws or CallBase"
            }
            RuleCode::ConstructorArgumentsMismatch => {
                "Constructor arguments ({0}) do not match any accessible constructor of '{1}'"
            }
            RuleCode::InterfaceConstructorArguments => {
                "Cannot pass constructor arguments to interface '{0}'"
            }
            RuleCode::NonOverridableSetup => {
                "'{0}' is not virtual, abstract or an interface member and cannot be configured"
            }
            RuleCode::MatcherTypeMismatch => {
                "Matcher type '{0}' does not match type '{2}' of parameter '{1}'"
            }
            RuleCode::CallbackSignatureMismatch => {
                "Callback does not match the signature of '{0}': {1}"
            }
            RuleCode::CallbackParameterIgnored => {
                "Callback parameter '{0}' is discarded but receives the value matched for '{1}'"
            }
            RuleCode::MissingVerification => {
                "Setup of '{0}' is marked Verifiable but never verified"
            }
            RuleCode::MissingVerifyAll => "Mock '{0}' is never checked with VerifyAll",
            RuleCode::VerifyWithoutTimes => {
                "Verify of '{0}' does not state how many times it is expected"
            }
            RuleCode::StaticVerifyWithoutMocks => "Mock.{0}() is called without any mocks",
            RuleCode::RaiseSignatureMismatch => {
                "Arguments raised for event '{0}' do not match its delegate: {1}"
            }
            RuleCode::RaiseNonEvent => "'{0}' is not an event subscription and cannot be raised",
            RuleCode::ReturnsSignatureMismatch => {
                "Returns delegate does not match the signature of '{0}': {1}"
            }
            RuleCode::SealedTypeMock => "Cannot mock sealed class '{0}'",
            RuleCode::InaccessibleConstructor => {
                "Constructor arguments ({0}) only match an inaccessible constructor of '{1}'"
            }
            RuleCode::AsRequiresInterface => "As<{0}>() requires an interface type",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RuleCode::StrictBehavior => {
                "Loose mocks silently return defaults for unexpected calls; prefer strict mocks."
            }
            RuleCode::StrictSetupUnterminated => {
                "A strict mock throws for a value-returning setup without a configured result."
            }
            RuleCode::ConstructorArgumentsMismatch => {
                "Arguments given to new Mock<T>(...) must match a constructor of T."
            }
            RuleCode::InterfaceConstructorArguments => {
                "Interfaces have no constructors; only a MockBehavior may be passed."
            }
            RuleCode::NonOverridableSetup => {
                "Moq can only intercept overridable members and interface members."
            }
            RuleCode::MatcherTypeMismatch => {
                "It.IsAny<T>() and It.Is<T>() should use the parameter's own type."
            }
            RuleCode::CallbackSignatureMismatch => {
                "Callback delegates are invoked with the mocked call's arguments."
            }
            RuleCode::CallbackParameterIgnored => {
                "A discarded callback parameter hides the value a matcher captured."
            }
            RuleCode::MissingVerification => {
                "Verifiable setups have no effect unless the mock is verified later."
            }
            RuleCode::MissingVerifyAll => {
                "A mock created in a test should be checked with VerifyAll before the test ends."
            }
            RuleCode::VerifyWithoutTimes => {
                "Verify without Times accepts any number of calls, including more than intended."
            }
            RuleCode::StaticVerifyWithoutMocks => {
                "Mock.Verify and Mock.VerifyAll verify nothing when given no mocks."
            }
            RuleCode::RaiseSignatureMismatch => {
                "Raised arguments must match the event delegate's parameters."
            }
            RuleCode::RaiseNonEvent => {
                "Raise and Raises need a lambda that subscribes to an event."
            }
            RuleCode::ReturnsSignatureMismatch => {
                "Returns delegates receive the call's arguments and produce its result."
            }
            RuleCode::SealedTypeMock => "Sealed classes cannot be proxied.",
            RuleCode::InaccessibleConstructor => {
                "The proxy cannot call a private constructor of the mocked class."
            }
            RuleCode::AsRequiresInterface => "Mock.As<T>() only adds interface implementations.",
        }
    }

    pub fn help_uri(&self) -> String {
        format!("{}/{}.md", HELP_BASE_URI, self.id())
    }

    pub fn from_id(id: &str) -> Option<RuleCode> {
        RuleCode::ALL.into_iter().find(|code| code.id() == id)
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for RuleCode {
    type Err = MockLintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleCode::from_id(s)
            .ok_or_else(|| MockLintError::invalid_args(format!("unknown rule id: {}", s)))
    }
}

// ============================================================================
// Diagnostic
// ============================================================================

/// Fill `{N}` placeholders with `args[N]`. Unknown placeholders stay as
/// written.
pub fn format_message(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            Some((args.get(index)?, close))
        });
        match replaced {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: RuleCode,
    pub name: String,
    pub severity: Severity,
    pub message: String,
    pub args: Vec<String>,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_locations: Vec<Location>,
    pub help_uri: String,
}

impl Diagnostic {
    pub fn new(rule: RuleCode, location: Location, args: Vec<String>) -> Self {
        Diagnostic {
            rule,
            name: rule.name().to_string(),
            severity: rule.severity(),
            message: format_message(rule.template(), &args),
            args,
            location,
            additional_locations: Vec::new(),
            help_uri: rule.help_uri(),
        }
    }

    pub fn with_additional_location(mut self, location: Location) -> Self {
        self.additional_locations.push(location);
        self
    }

    /// Ordering key: location first, then rule id.
    pub fn sort_key(&self) -> (&Location, RuleCode) {
        (&self.location, self.rule)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {}: {}",
            self.location, self.severity, self.rule, self.message
        )
    }
}
