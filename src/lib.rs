//! Developer tool provisioner.
//!
//! Installs language toolchains, cloud CLIs and build tools through the
//! host's native package manager, falling back to vendor archives, then
//! writes a shell-profile fragment and checks the tool runs.
//!
//! The public API is organised into layers:
//!
//! - **[`platform`]**: detect the OS profile
//! - **[`adapters`]**: one package manager behind a common trait
//! - **[`recipes`]**: per-tool install plans and version resolution
//! - **[`resources`]**: idempotent `check + apply` primitives (archives, symlinks, env fragments)
//! - **[`tasks`]**: a recipe driven from prerequisites to verification
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod net;
pub mod platform;
pub mod recipes;
pub mod resources;
pub mod tasks;
