use colored::Colorize;
use leda_common::{Diagnostic, DiagnosticSeverity};

/// Prints one diagnostic as `path:line:col: severity: message [Kind]` to
/// stderr, colored by severity. Positions are rendered 1-based, matching
/// the convention editors and compilers show to users even though
/// [`leda_common::Position`] itself is 0-based.
pub fn print_diagnostic(path: &str, diagnostic: &Diagnostic) {
    let location = format!("{}:{}:{}", path, diagnostic.range.start.line + 1, diagnostic.range.start.character + 1);
    let severity = match diagnostic.severity {
        DiagnosticSeverity::Error => "error".red().bold(),
        DiagnosticSeverity::Warning => "warning".yellow().bold(),
        DiagnosticSeverity::Information => "info".blue().bold(),
        DiagnosticSeverity::Hint => "hint".normal(),
    };
    eprintln!("{}: {}: {} [{}]", location.bold(), severity, diagnostic.message, diagnostic.kind);
}

/// Prints every diagnostic for `path` and returns whether any of them was an
/// error (callers use this to decide the process exit code).
pub fn print_diagnostics(path: &str, diagnostics: &[Diagnostic]) -> bool {
    let mut has_errors = false;
    for diagnostic in diagnostics {
        if diagnostic.severity == DiagnosticSeverity::Error {
            has_errors = true;
        }
        print_diagnostic(path, diagnostic);
    }
    has_errors
}
