//! Diagnostic construction. Kept separate from the typing logic itself so
//! the rules that decide *whether* something is an error stay distinct from
//! the rules that decide how an error is worded.

use crate::context::Checker;
use leda_common::{DiagnosticKind, RawDiagnostic, Span};
use leda_types::{Type, TypeMismatchReason};

impl Checker<'_> {
    pub(crate) fn report(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(RawDiagnostic::error(span, kind, message));
    }

    pub(crate) fn report_warning(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(RawDiagnostic::warning(span, kind, message));
    }

    /// Checks `target.assignable_from(&source)`, reporting a `TypeMismatch`
    /// at `span` if it fails. Returns whether the check passed, so callers
    /// can decide the result type of the position that failed (usually
    /// `target` itself, so one mismatch doesn't cascade further ones).
    pub(crate) fn check_assignable(&mut self, span: Span, target: &Type, source: &Type) -> bool {
        match target.assignable_from(source) {
            Ok(()) => true,
            Err(reason) => {
                self.report_mismatch(span, &reason);
                false
            }
        }
    }

    pub(crate) fn report_mismatch(&mut self, span: Span, reason: &TypeMismatchReason) {
        let message = reason.render(&self.resolver());
        self.report(span, DiagnosticKind::TypeMismatch, message);
    }
}
