//! Source positions shared by the host model, diagnostics and output modules.
//!
//! Kept separate from the model so `diagnostics` and `output` can depend on
//! it without pulling in the whole compilation graph.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into a source file.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: u64,
    /// End byte offset (exclusive).
    pub end: u64,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when this span begins at or after the end of `other`.
    pub fn is_after(&self, other: &Span) -> bool {
        self.start >= other.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Location
// ============================================================================

/// Location of a diagnostic in a source file.
///
/// - `file`: path as the host reported it
/// - `line`/`col`: 1-indexed, present only when the host shipped source text
/// - `byte_start`/`byte_end`: the node span
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    /// File path.
    pub file: String,
    /// Line number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Column number (1-indexed, Unicode scalar values).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
    /// Byte offset from file start.
    pub byte_start: u64,
    /// Byte offset end, exclusive.
    pub byte_end: u64,
}

impl Location {
    /// Create a location from a file path and span, without line information.
    pub fn new(file: impl Into<String>, span: Span) -> Self {
        Location {
            file: file.into(),
            line: None,
            col: None,
            byte_start: span.start,
            byte_end: span.end,
        }
    }

    /// Attach a 1-indexed line and column.
    pub fn with_position(mut self, line: u32, col: u32) -> Self {
        self.line = Some(line);
        self.col = Some(col);
        self
    }

    /// The byte span this location covers.
    pub fn span(&self) -> Span {
        Span {
            start: self.byte_start,
            end: self.byte_end,
        }
    }

    /// Comparison key for deterministic sorting: (file, start, end).
    fn sort_key(&self) -> (&str, u64, u64) {
        (&self.file, self.byte_start, self.byte_end)
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.col) {
            (Some(line), Some(col)) => write!(f, "{}:{}:{}", self.file, line, col),
            _ => write!(f, "{}@{}", self.file, self.span()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
