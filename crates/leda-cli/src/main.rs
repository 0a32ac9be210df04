//! `leda`: a thin command-line front end over `leda-project` - parses,
//! binds, and checks the given files and prints their diagnostics.

mod args;
mod driver;
mod reporter;

use anyhow::Result;
use clap::Parser;

use args::CliArgs;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    colored::control::set_override(!args.no_color);

    let had_errors = driver::run(&args)?;
    if had_errors {
        std::process::exit(1);
    }
    Ok(())
}
