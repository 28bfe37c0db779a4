//! `provision verify`: re-check installed tools.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, VerifyOpts};
use crate::logging::Logger;
use crate::recipes::catalog;
use crate::tasks::Task;
use crate::tasks::recipe::{UnknownTool, VerifyTask};

/// Run the verify command.
///
/// # Errors
///
/// Returns an error if setup fails or any checked tool is missing or
/// broken.
pub fn run(global: &GlobalOpts, opts: &VerifyOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    run_with(&setup, opts, log)
}

/// Check `opts.tools`, or every known tool when none are named.
///
/// # Errors
///
/// Returns an error if at least one check failed.
pub fn run_with(setup: &CommandSetup, opts: &VerifyOpts, log: &Arc<Logger>) -> Result<()> {
    let ctx = setup.context(log, false);
    let tasks: Vec<Box<dyn Task>> = if opts.tools.is_empty() {
        catalog::all()
            .into_iter()
            .map(|recipe| Box::new(VerifyTask::new(recipe)) as Box<dyn Task>)
            .collect()
    } else {
        opts.tools
            .iter()
            .map(|name| -> Box<dyn Task> {
                catalog::find(name).map_or_else(
                    || Box::new(UnknownTool::new(name.clone())) as Box<dyn Task>,
                    |recipe| Box::new(VerifyTask::new(recipe)),
                )
            })
            .collect()
    };

    log.stage("Verifying tools");
    super::run_tasks_to_completion(tasks.iter().map(Box::as_ref), &ctx, log)
}
