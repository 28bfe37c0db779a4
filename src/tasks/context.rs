//! Per-run state shared by every task.
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::adapters::PackageAdapter;
use crate::config::Settings;
use crate::error::{InstallError, InstallWarning};
use crate::exec::Executor;
use crate::logging::Log;
use crate::net::Fetcher;
use crate::platform::OsProfile;

/// Shared context for one run.
///
/// Built once per invocation after OS detection and adapter selection; every
/// recipe task borrows it.
pub struct Context {
    /// Effective settings.
    pub settings: Arc<Settings>,
    /// Detected (or overridden) OS profile.
    pub profile: Arc<OsProfile>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// User's home directory path.
    pub home: PathBuf,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// HTTP client.
    pub fetcher: Arc<dyn Fetcher>,
    /// Active package manager adapter, absent for read-only commands.
    pub adapter: Option<Arc<dyn PackageAdapter>>,
    /// Whether the package index has been refreshed since the last
    /// repository change.
    index_fresh: AtomicBool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.settings)
            .field("profile", &self.profile)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("home", &self.home)
            .field("executor", &"<dyn Executor>")
            .field("fetcher", &"<dyn Fetcher>")
            .field("adapter", &self.adapter.as_ref().map(|a| a.kind()))
            .field("index_fresh", &self.index_fresh)
            .finish()
    }
}

impl Context {
    /// Creates a context with an explicit home directory.
    #[must_use]
    pub fn with_home(
        settings: Arc<Settings>,
        profile: Arc<OsProfile>,
        log: Arc<dyn Log>,
        dry_run: bool,
        executor: Arc<dyn Executor>,
        fetcher: Arc<dyn Fetcher>,
        home: PathBuf,
    ) -> Self {
        Self {
            settings,
            profile,
            log,
            dry_run,
            home,
            executor,
            fetcher,
            adapter: None,
            index_fresh: AtomicBool::new(false),
        }
    }

    /// Attach the package manager adapter.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn PackageAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Replace the logger.
    #[must_use]
    pub fn with_log(mut self, log: Arc<dyn Log>) -> Self {
        self.log = log;
        self
    }

    /// Active adapter.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::UnsupportedOs`] when no adapter was selected.
    pub fn adapter(&self) -> Result<&dyn PackageAdapter, InstallError> {
        self.adapter
            .as_deref()
            .ok_or_else(|| InstallError::UnsupportedOs {
                id: self.profile.id.clone(),
            })
    }

    /// Refresh the package index unless it is already fresh.
    ///
    /// A failure is returned as an error when `fatal`, otherwise as a
    /// warning. The index stays stale after a failure, so the next caller
    /// tries again.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Refresh`] when the refresh fails and `fatal`
    /// is set, or [`InstallError::UnsupportedOs`] without an adapter.
    pub fn refresh_index(&self, fatal: bool) -> Result<Option<InstallWarning>, InstallError> {
        if self.index_fresh.load(Ordering::Acquire) {
            return Ok(None);
        }
        let adapter = self.adapter()?;
        match adapter.refresh() {
            Ok(()) => {
                self.index_fresh.store(true, Ordering::Release);
                Ok(None)
            }
            Err(InstallError::Refresh { command, exit_code }) if !fatal => {
                self.log
                    .warn(&format!("`{command}` exited with {exit_code}, continuing"));
                Ok(Some(InstallWarning::Refresh { command, exit_code }))
            }
            Err(e) => Err(e),
        }
    }

    /// Mark the package index stale (after a repository was added).
    pub fn invalidate_index(&self) {
        self.index_fresh.store(false, Ordering::Release);
    }

    /// Whether the index is currently considered fresh.
    #[must_use]
    pub fn index_is_fresh(&self) -> bool {
        self.index_fresh.load(Ordering::Acquire)
    }
}
