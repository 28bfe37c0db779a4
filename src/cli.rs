//! Command-line definitions.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the tool provisioner.
#[derive(Parser, Debug)]
#[command(
    name = "provision",
    about = "Install developer tools with the host's package manager",
    version
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options accepted by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Treat the host as this OS id instead of detecting it (e.g. ubuntu, fedora, macos)
    #[arg(long = "os-override", value_name = "ID", global = true)]
    pub os_override: Option<String>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install one or more tools
    Install(InstallOpts),
    /// Check that installed tools run
    Verify(VerifyOpts),
    /// List the tools that can be installed
    List,
    /// Print the detected operating system and package manager
    Detect,
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
    /// Print version information
    Version,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// Tools to install, in order
    #[arg(required = true, value_name = "TOOL")]
    pub tools: Vec<String>,

    /// Use manual (archive/script) installs when the OS has no supported package manager
    #[arg(long)]
    pub manual_fallback: bool,
}

/// Options for the `verify` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct VerifyOpts {
    /// Tools to check (default: every known tool)
    #[arg(value_name = "TOOL")]
    pub tools: Vec<String>,
}
