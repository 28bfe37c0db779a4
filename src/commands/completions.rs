//! `provision completions`: shell completion scripts.
use clap::CommandFactory as _;
use clap_complete::Shell;

use crate::cli::Cli;

/// Write completions for `shell` to stdout.
pub fn run(shell: Shell) {
    clap_complete::generate(shell, &mut Cli::command(), "provision", &mut std::io::stdout());
}
