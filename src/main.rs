use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use winsetup_cli::cli::{Cli, Command};
use winsetup_cli::{commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    logging::init_subscriber(args.verbose, args.command.name(), args.global.json_lines);
    let log = Arc::new(logging::Logger::new(args.command.name()));

    // Outcome records are durable before the next setting is attempted,
    // so an interrupt never loses what already ran.
    ctrlc::set_handler(|| {
        tracing::warn!("interrupted; already-recorded outcomes are durable");
        std::process::exit(130);
    })?;

    match args.command {
        Command::Apply(ref opts) => commands::apply::run(&args.global, opts, &log),
        Command::Facts => commands::facts::run(&args.global, &log),
        Command::Completions(ref opts) => commands::completions::run(opts),
        Command::Version => {
            let version = option_env!("WINSETUP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            println!("winsetup {version}");
            Ok(())
        }
    }
}
