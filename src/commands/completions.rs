//! The `completions` subcommand: generate shell completion scripts.
use anyhow::Result;
use clap::CommandFactory as _;

use crate::cli::{Cli, CompletionsOpts};

/// Write a completion script for the requested shell to stdout.
///
/// # Errors
///
/// Currently infallible; returns `Result` for symmetry with the other
/// subcommands.
pub fn run(opts: &CompletionsOpts) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(opts.shell, &mut cmd, "winsetup", &mut std::io::stdout());
    Ok(())
}
