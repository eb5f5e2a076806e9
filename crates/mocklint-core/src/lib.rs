//! Core engine for mocklint.
//!
//! This crate checks Moq mock configuration against the mocked types:
//! - Host model: syntax nodes and symbols lowered by a host adapter
//! - Symbol catalog: the mocking library's well-known types and methods
//! - Chain extraction, overload matching and delegate signature checks
//! - Companion-call correlation within a function body
//! - Rules ML1000 to ML1017 and the parallel analyzer driver
//! - Configuration, error types and JSON output types
//! - `MoqFixture` for building compilations in tests

pub mod cancel;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod context;
pub mod correlation;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod matcher;
pub mod model;
pub mod output;
pub mod rules;
pub mod signature;
pub mod text;
pub mod types;

pub use cancel::CancellationToken;
pub use catalog::{CatalogCache, SymbolCatalog};
pub use config::Config;
pub use diagnostics::{Diagnostic, RuleCode, Severity};
pub use engine::{Analysis, Analyzer};
pub use error::{MockLintError, MockLintResult, OutputErrorCode};
pub use model::{Compilation, CompilationId};
