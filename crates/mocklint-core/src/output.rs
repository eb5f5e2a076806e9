//! JSON output types for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** every response has `status` as its first field
//! 2. **Deterministic:** same input, same output (field order, array order)
//! 3. **Versioned:** `schema_version` lets consumers detect format changes

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, RuleCode, Severity};
use crate::engine::Analysis;
use crate::error::{MockLintError, OutputErrorCode};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Check
// ============================================================================

/// Diagnostic counts for a check response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    /// Library call sites that were analyzed.
    pub call_sites: usize,
}

/// Response for `mocklint check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Status: "ok", or "cancelled" for a partial result.
    pub status: String,
    pub schema_version: String,
    /// Compilation id the diagnostics belong to.
    pub compilation: String,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Summary,
}

impl CheckResponse {
    pub fn new(compilation: impl Into<String>, analysis: Analysis) -> Self {
        let summary = Summary {
            errors: analysis.error_count(),
            warnings: analysis.warning_count(),
            call_sites: analysis.call_sites,
        };
        let status = if analysis.cancelled { "cancelled" } else { "ok" };
        CheckResponse {
            status: status.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            compilation: compilation.into(),
            diagnostics: analysis.diagnostics,
            summary,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}

// ============================================================================
// Rules
// ============================================================================

/// One entry of `mocklint rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleInfo {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub enabled: bool,
    pub description: String,
    pub help_uri: String,
}

/// Response for `mocklint rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesResponse {
    pub status: String,
    pub schema_version: String,
    pub rules: Vec<RuleInfo>,
}

impl RulesResponse {
    /// List every rule; `is_enabled` and `severity_for` apply configuration.
    pub fn new(
        is_enabled: impl Fn(RuleCode) -> bool,
        severity_for: impl Fn(RuleCode) -> Severity,
    ) -> Self {
        let rules = RuleCode::ALL
            .iter()
            .map(|code| RuleInfo {
                id: code.id().to_string(),
                name: code.name().to_string(),
                severity: severity_for(*code),
                enabled: is_enabled(*code),
                description: code.description().to_string(),
                help_uri: code.help_uri(),
            })
            .collect();
        RulesResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            rules,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error details in an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the process exit code.
    pub code: u8,
    pub message: String,
}

/// Response written when a command fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &MockLintError) -> Self {
        Self::new(OutputErrorCode::from(err).code(), err.to_string())
    }

    pub fn new(code: u8, message: impl Into<String>) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo {
                code,
                message: message.into(),
            },
        }
    }
}

// ============================================================================
// Emitting
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit diagnostics one per line followed by a summary line.
pub fn emit_text(response: &CheckResponse, writer: &mut impl Write) -> io::Result<()> {
    for diagnostic in &response.diagnostics {
        writeln!(writer, "{}", diagnostic)?;
    }
    writeln!(
        writer,
        "{} error(s), {} warning(s) in {} call site(s)",
        response.summary.errors, response.summary.warnings, response.summary.call_sites
    )
}
