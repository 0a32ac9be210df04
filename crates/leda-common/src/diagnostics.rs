//! Diagnostic values produced by every pipeline stage.
//!
//! Diagnostics are data, never exceptional control flow: each stage appends
//! to a `Vec<Diagnostic>` and continues with a placeholder. The taxonomy
//! below is fixed and closed - a finite, named set of problems rather than
//! thousands of numbered, templated messages, so it fits a plain Rust enum
//! with no numeric-code/template-string lookup table.

use crate::position::Range;
use crate::span::{LineIndex, Span};
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

/// A single reportable problem, tied to the source and range it was found
/// at. `message` is already rendered to text (for `TypeMismatch`, via the
/// `TypeMismatchReason` tree's `Display` impl) so the editor-integration
/// layer never has to know the taxonomy to show something useful.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: DiagnosticSeverity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(range: Range, severity: DiagnosticSeverity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self { range, severity, kind, message: message.into() }
    }

    #[must_use]
    pub fn error(range: Range, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(range, DiagnosticSeverity::Error, kind, message)
    }

    #[must_use]
    pub fn warning(range: Range, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(range, DiagnosticSeverity::Warning, kind, message)
    }
}

/// A diagnostic as produced by the lexer/parser/binder/checker, anchored to
/// a byte [`Span`] instead of a line/character [`Range`].
///
/// Every stage before `Source` works in byte offsets; only `Source` holds
/// the [`LineIndex`] needed to translate a span into the `Range` an external
/// caller can use, so raw diagnostics are collected here and converted once,
/// at the point they're published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDiagnostic {
    pub span: Span,
    pub severity: DiagnosticSeverity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl RawDiagnostic {
    #[must_use]
    pub fn new(span: Span, severity: DiagnosticSeverity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self { span, severity, kind, message: message.into() }
    }

    #[must_use]
    pub fn error(span: Span, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(span, DiagnosticSeverity::Error, kind, message)
    }

    #[must_use]
    pub fn warning(span: Span, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(span, DiagnosticSeverity::Warning, kind, message)
    }

    #[must_use]
    pub fn into_diagnostic(self, line_index: &LineIndex, source: &str) -> Diagnostic {
        Diagnostic::new(line_index.span_to_range(self.span, source), self.severity, self.kind, self.message)
    }
}

/// The fixed diagnostic taxonomy, grouped by the stage that produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticKind {
    // Lexical
    MalformedNumber,
    HexNumbersNotSupported,
    InvalidEscapeSequence,
    UnfinishedString,
    UnfinishedLongString,
    UnfinishedLongComment,
    InvalidLongStringDelimiter,
    InvalidCharacter,

    // Syntactic
    ExpectedTokenButGotToken,
    ExpectedExpressionButGotToken,
    DidNotExpectTokenHere,
    AmbiguousSyntax,
    CannotAssignToThis,

    // Semantic (binder)
    NameNotFound,
    ValueAlreadyDeclared,
    TypeAlreadyDeclared,
    NoImplicitGlobalFunction,

    // Type (checker)
    TypeMismatch,
    TypeNotCallable,
    TypeNotIndexable,
    TypeDoesntHaveKey,
    CantGetLength,
    CantNegate,
    ForLoopStartNotNumber,
    ForLoopLimitNotNumber,
    ForLoopStepNotNumber,
    NotEnoughArguments,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn diagnostic_round_trips_through_json() {
        let range = Range::new(Position::new(2, 4), Position::new(2, 9));
        let diag = Diagnostic::error(range, DiagnosticKind::NameNotFound, "name 'x' not found");

        let json = serde_json::to_string(&diag).expect("diagnostic should serialize");
        let back: Diagnostic = serde_json::from_str(&json).expect("diagnostic should deserialize");

        assert_eq!(diag, back);
    }
}
