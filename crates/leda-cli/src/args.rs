use std::path::PathBuf;

use clap::Parser;

/// Parse, bind, and check one or more Leda source files, printing any
/// diagnostics to stderr.
#[derive(Parser, Debug)]
#[command(name = "leda", version, about = "Leda language checker")]
pub struct CliArgs {
    /// Source files to check.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Disable colored output.
    #[arg(long = "noColor", alias = "no-color")]
    pub no_color: bool,
}
