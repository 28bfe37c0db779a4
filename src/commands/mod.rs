//! Subcommand entry points and the setup they share.
pub mod completions;
pub mod detect;
pub mod install;
pub mod list;
pub mod verify;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::net::{Fetcher, HttpFetcher};
use crate::platform::{OsProfile, Resolver};
use crate::tasks::{self, Context, Task};

/// Shared state produced by the common command setup sequence.
///
/// Settings, the OS profile and the process-wide executor and HTTP agent
/// are built once here and handed to every command.
#[derive(Debug, Clone)]
pub struct CommandSetup {
    /// Effective settings.
    pub settings: Arc<Settings>,
    /// Detected or overridden OS.
    pub profile: Arc<OsProfile>,
    /// Expands `$HOME` in templates and fragments.
    pub home: PathBuf,
    /// Runs external commands.
    pub executor: Arc<dyn Executor>,
    /// HTTP agent shared by every download.
    pub fetcher: Arc<dyn Fetcher>,
}

impl CommandSetup {
    /// Load settings and resolve the OS profile for the running host.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be loaded or `HOME` is
    /// not set.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        log.stage("Loading configuration");
        let settings = Settings::load(global.config.as_deref())?;
        log.debug(&format!(
            "opt: {}, profile.d: {}",
            settings.paths.opt_dir.display(),
            settings.paths.profile_dir.display()
        ));

        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .context("HOME environment variable is not set")?;
        let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
            Duration::from_secs(settings.network.timeout_secs),
            settings.network.max_download_bytes,
        ));

        log.stage("Detecting operating system");
        let profile = resolve_profile(global, executor.as_ref());
        log.info(&format!("os: {profile}"));

        Ok(Self::new(settings, profile, home, executor, fetcher))
    }

    /// Assemble a setup from explicit parts.
    #[must_use]
    pub fn new(
        settings: Settings,
        profile: OsProfile,
        home: PathBuf,
        executor: Arc<dyn Executor>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            profile: Arc::new(profile),
            home,
            executor,
            fetcher,
        }
    }

    /// Task context without an adapter.
    #[must_use]
    pub fn context(&self, log: &Arc<Logger>, dry_run: bool) -> Context {
        Context::with_home(
            Arc::clone(&self.settings),
            Arc::clone(&self.profile),
            Arc::clone(log) as Arc<dyn Log>,
            dry_run,
            Arc::clone(&self.executor),
            Arc::clone(&self.fetcher),
            self.home.clone(),
        )
    }
}

/// `--os-override` wins over detection.
fn resolve_profile(global: &GlobalOpts, executor: &dyn Executor) -> OsProfile {
    global.os_override.as_deref().map_or_else(
        || Resolver::new(executor).resolve(),
        OsProfile::from_override,
    )
}

/// Execute every task in order, print the summary, and bail if any task failed.
///
/// # Errors
///
/// Returns an error naming the failed tools if one or more tasks recorded a
/// failure.
pub fn run_tasks_to_completion<'a>(
    tasks: impl IntoIterator<Item = &'a dyn Task>,
    ctx: &Context,
    log: &Logger,
) -> Result<()> {
    for task in tasks {
        tasks::execute(task, ctx);
    }

    log.print_summary();

    let failed = log.failed_tools();
    if !failed.is_empty() {
        anyhow::bail!("{} tool(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;

    #[test]
    fn override_skips_detection() {
        let executor = MockExecutor::default();
        let global = GlobalOpts {
            os_override: Some("Fedora".to_string()),
            ..GlobalOpts::default()
        };
        let profile = resolve_profile(&global, &executor);
        assert_eq!(profile.id, "fedora");
        assert_eq!(executor.call_count(), 0);
    }
}
