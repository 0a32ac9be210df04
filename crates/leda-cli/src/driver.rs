use anyhow::{Context, Result};
use leda_project::Source;
use tracing::info_span;

use crate::args::CliArgs;
use crate::reporter;

/// Parses, binds, and checks every file in `args.files` in order, printing
/// diagnostics as each file finishes. Returns whether any file produced an
/// error-severity diagnostic, so `main` can pick the process exit code.
pub fn run(args: &CliArgs) -> Result<bool> {
    let mut had_errors = false;
    for path in &args.files {
        let _span = info_span!("check_file", path = %path.display()).entered();
        let code = std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))?;
        let display_path = path.display().to_string();
        let mut source = Source::new(display_path.clone(), code);
        let diagnostics = source.analyze();
        if reporter::print_diagnostics(&display_path, diagnostics) {
            had_errors = true;
        }
    }
    Ok(had_errors)
}
