//! `provision install`: install tools in request order.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::adapters;
use crate::cli::{GlobalOpts, InstallOpts};
use crate::logging::Logger;
use crate::recipes::catalog;
use crate::tasks::Task;
use crate::tasks::recipe::{RecipeTask, UnknownTool};

/// Run the install command.
///
/// # Errors
///
/// Returns an error if setup fails, the OS is unsupported, or any tool
/// fails to install.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    run_with(&setup, global.dry_run, opts, log)
}

/// Install `opts.tools` in order against an already prepared setup.
///
/// A failed tool is recorded and the batch moves on to the next one.
///
/// # Errors
///
/// Returns an error if no adapter exists for the OS (before any command
/// runs) or if at least one tool failed.
pub fn run_with(
    setup: &CommandSetup,
    dry_run: bool,
    opts: &InstallOpts,
    log: &Arc<Logger>,
) -> Result<()> {
    log.stage("Selecting package manager");
    let adapter = match adapters::for_profile(
        &setup.profile,
        Arc::clone(&setup.settings),
        Arc::clone(&setup.executor),
        Arc::clone(&setup.fetcher),
        opts.manual_fallback,
    ) {
        Ok(adapter) => adapter,
        Err(e) => {
            log.error(&e.to_string());
            if !opts.manual_fallback {
                log.info("pass --manual-fallback to use archive installs where available");
            }
            return Err(e.into());
        }
    };
    log.info(&format!("package manager: {}", adapter.kind()));
    if dry_run {
        log.dry_run("no changes will be made");
    }

    let ctx = setup
        .context(log, dry_run)
        .with_adapter(Arc::from(adapter));
    let tasks = tasks_for(&opts.tools);
    super::run_tasks_to_completion(tasks.iter().map(Box::as_ref), &ctx, log)
}

/// One task per requested name, preserving order; a repeated name is
/// installed once.
fn tasks_for(tools: &[String]) -> Vec<Box<dyn Task>> {
    let mut seen = std::collections::HashSet::new();
    tools
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .map(|name| -> Box<dyn Task> {
            catalog::find(name).map_or_else(
                || Box::new(UnknownTool::new(name.clone())) as Box<dyn Task>,
                |recipe| Box::new(RecipeTask::new(recipe)),
            )
        })
        .collect()
}
