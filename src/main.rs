use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use provision_cli::cli::{self, Command};
use provision_cli::{commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let name = match &args.command {
        Command::Install(_) => "install",
        Command::Verify(_) => "verify",
        Command::Detect => "detect",
        Command::List | Command::Completions { .. } | Command::Version => {
            return run_offline(&args.command);
        }
    };
    logging::init_subscriber(args.verbose, name);
    let log = Arc::new(logging::Logger::new(name));

    match args.command {
        Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
        Command::Verify(opts) => commands::verify::run(&args.global, &opts, &log),
        _ => commands::detect::run(&args.global, &log),
    }
}

/// Commands that only print and need neither logging nor host access.
fn run_offline(command: &Command) -> Result<()> {
    match command {
        Command::List => commands::list::run(),
        Command::Completions { shell } => commands::completions::run(*shell),
        _ => {
            let version = option_env!("PROVISION_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            println!("provision {version}");
        }
    }
    Ok(())
}
