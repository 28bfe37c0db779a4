//! Per-tool tasks that drive recipes through the adapter and resources.
pub mod actions;
mod context;
pub mod recipe;
pub mod verify;

pub use context::Context;

use anyhow::Result;

use crate::logging::TaskStatus;

/// Result of a single task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// Task completed successfully.
    Ok,
    /// Task completed with non-fatal warnings.
    Warn(Vec<String>),
    /// Task was skipped with a reason.
    Skipped(String),
    /// Task ran in dry-run mode.
    DryRun,
}

/// A named, executable task.
pub trait Task: Send + Sync {
    /// Human-readable task name.
    fn name(&self) -> &str;

    /// Whether this task should run in the current context.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if any fatal step of the task fails.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// Execute a task, recording the result in the logger.
///
/// Errors never escape: a failed task is recorded and the caller moves on
/// to the next one.
pub fn execute(task: &dyn Task, ctx: &Context) {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (not applicable)", task.name()));
        ctx.log
            .record_task(task.name(), TaskStatus::Skipped, Some("not applicable"));
        return;
    }

    ctx.log.stage(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.record_task(task.name(), TaskStatus::Ok, None);
        }
        Ok(TaskResult::Warn(warnings)) => {
            for warning in &warnings {
                ctx.log.warn(&format!("{}: {warning}", task.name()));
            }
            ctx.log
                .record_task(task.name(), TaskStatus::Warn, Some(&warnings.join("; ")));
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(task.name(), TaskStatus::Skipped, Some(&reason));
        }
        Ok(TaskResult::DryRun) => {
            ctx.log.record_task(task.name(), TaskStatus::DryRun, None);
        }
        Err(e) => {
            ctx.log.error(&format!("{}: {e:#}", task.name()));
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
        }
    }
}

/// Shared helpers for task unit tests.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub mod test_helpers {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::Context;
    use crate::adapters;
    use crate::config::Settings;
    use crate::config::settings::Paths;
    use crate::exec::Executor;
    use crate::logging::{Log, Logger};
    use crate::net::{Fetcher, MockFetcher};
    use crate::platform::OsProfile;
    use crate::resources::test_helpers::MockExecutor;

    fn settings(root: Option<&Path>) -> Settings {
        let mut settings = Settings::default();
        settings.adapter.use_sudo = false;
        if let Some(root) = root {
            settings.paths = Paths::rooted_at(root);
        }
        settings
    }

    /// Context for `os_id` with no adapter and a fetcher that expects no
    /// calls.
    #[must_use]
    pub fn make_context(executor: Arc<MockExecutor>, os_id: &str) -> Context {
        Context::with_home(
            Arc::new(settings(None)),
            Arc::new(OsProfile::from_override(os_id)),
            Arc::new(Logger::new("test")),
            false,
            executor,
            Arc::new(MockFetcher::new()),
            PathBuf::from("/home/test"),
        )
    }

    /// Context for `os_id` with the matching adapter attached.
    #[must_use]
    pub fn adapter_context(executor: Arc<MockExecutor>, os_id: &str) -> Context {
        sandbox_context(None, executor, MockFetcher::new(), os_id).0
    }

    /// Context whose install paths live under `root`, returning the logger
    /// so tests can inspect recorded task state.
    #[must_use]
    pub fn sandbox_context(
        root: Option<&Path>,
        executor: Arc<MockExecutor>,
        fetcher: MockFetcher,
        os_id: &str,
    ) -> (Context, Arc<Logger>) {
        let settings = Arc::new(settings(root));
        let profile = OsProfile::from_override(os_id);
        let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher);
        let executor: Arc<dyn Executor> = executor;
        let adapter = adapters::for_profile(
            &profile,
            Arc::clone(&settings),
            Arc::clone(&executor),
            Arc::clone(&fetcher),
            true,
        )
        .expect("manual fallback always selects an adapter");
        let log = Arc::new(Logger::new("test"));
        let home = root.map_or_else(|| PathBuf::from("/home/test"), |r| r.join("home"));
        let ctx = Context::with_home(
            settings,
            Arc::new(profile),
            Arc::clone(&log) as Arc<dyn Log>,
            false,
            executor,
            fetcher,
            home,
        )
        .with_adapter(Arc::from(adapter));
        (ctx, log)
    }
}
