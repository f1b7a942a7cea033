use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the winsetup engine.
#[derive(Parser, Debug)]
#[command(
    name = "winsetup",
    about = "Declarative Windows system-configuration engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Keep going after a critical setting fails
    #[arg(long, global = true)]
    pub continue_on_critical_failure: bool,

    /// Emit line-delimited JSON outcome records on stdout
    #[arg(long, global = true)]
    pub json_lines: bool,

    /// Extra settings manifest (TOML)
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Override the outcome log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Fail package settings when the package manager is unavailable
    /// (default: skip them with a reason)
    #[arg(long, global = true)]
    pub require_package_manager: bool,

    /// Per-command timeout in seconds for system calls
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout: u64,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply the configuration settings to this machine
    Apply(ApplyOpts),
    /// Print the gathered host facts
    Facts,
    /// Generate shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Short name used for the per-command log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Apply(_) => "apply",
            Self::Facts => "facts",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}

/// Options for the `apply` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ApplyOpts {
    /// Skip settings whose id contains any of these strings
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only settings whose id contains any of these strings
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
