//! Error types and error code constants for mocklint.
//!
//! Analysis itself never fails: a call site the engine cannot make sense of is
//! simply "not applicable" and yields no diagnostics. Errors exist only at the
//! edges, when loading a compilation document or a config file, or when the
//! CLI receives bad arguments.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments or malformed input documents
//! - `3`: Resolution errors (file not found)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed document).
    InvalidArguments = 2,
    /// Resolution errors (file not found).
    ResolutionError = 3,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the library edges and the CLI.
#[derive(Debug, Error)]
pub enum MockLintError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Input file does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// A compilation document references ids that do not exist.
    #[error("invalid compilation model: {message}")]
    InvalidModel { message: String },

    /// A config file could not be read or parsed.
    #[error("config error: {message}")]
    Config { message: String },

    /// IO error while reading input.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

/// Result type for fallible mocklint operations.
pub type MockLintResult<T> = Result<T, MockLintError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&MockLintError> for OutputErrorCode {
    fn from(err: &MockLintError) -> Self {
        match err {
            MockLintError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            MockLintError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            MockLintError::InvalidModel { .. } => OutputErrorCode::InvalidArguments,
            MockLintError::Config { .. } => OutputErrorCode::InvalidArguments,
            MockLintError::Json(_) => OutputErrorCode::InvalidArguments,
            MockLintError::Io(_) => OutputErrorCode::InternalError,
            MockLintError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<MockLintError> for OutputErrorCode {
    fn from(err: MockLintError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl MockLintError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        MockLintError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        MockLintError::FileNotFound { path: path.into() }
    }

    /// Create an invalid model error.
    pub fn invalid_model(message: impl Into<String>) -> Self {
        MockLintError::InvalidModel {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        MockLintError::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        MockLintError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
