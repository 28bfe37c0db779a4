//! Vendor installer resource: download a script and run it with `sh`.
use anyhow::Result;

use super::{Applicable, ResourceChange};
use crate::error::InstallError;
use crate::exec::{Executor, command_line};
use crate::net::{Fetcher, download_to};

/// A downloaded installer script (e.g. `https://sh.rustup.rs`).
///
/// Running an installer has no observable "current state", so this only
/// implements [`Applicable`]; callers guard it with the recipe's probe.
#[derive(Debug)]
pub struct ScriptResource<'a> {
    /// Installer URL.
    pub url: String,
    /// Arguments passed to the installer.
    pub args: Vec<String>,
    fetcher: &'a dyn Fetcher,
    executor: &'a dyn Executor,
}

impl<'a> ScriptResource<'a> {
    /// Create a new installer resource.
    #[must_use]
    pub const fn new(
        url: String,
        args: Vec<String>,
        fetcher: &'a dyn Fetcher,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            url,
            args,
            fetcher,
            executor,
        }
    }

    /// Download the installer to a temp file and run it.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Download`] if the script cannot be fetched,
    /// [`InstallError::Command`] if `sh` cannot be spawned and
    /// [`InstallError::Script`] if it exits non-zero.
    pub fn install(&self) -> Result<ResourceChange, InstallError> {
        let download_error = |reason: String| InstallError::Download {
            url: self.url.clone(),
            reason,
        };
        let script = tempfile::Builder::new()
            .prefix("provision-installer-")
            .suffix(".sh")
            .tempfile()
            .map_err(|e| download_error(e.to_string()))?;
        download_to(self.fetcher, &self.url, script.path())
            .map_err(|e| download_error(e.to_string()))?;

        let path = script.path().to_string_lossy().to_string();
        let mut args: Vec<&str> = vec![path.as_str()];
        args.extend(self.args.iter().map(String::as_str));
        let command = command_line("sh", &args);

        let result = self
            .executor
            .run_unchecked("sh", &args)
            .map_err(|e| InstallError::Command {
                command: command.clone(),
                reason: format!("{e:#}"),
            })?;
        if !result.success {
            return Err(InstallError::Script {
                command,
                exit_code: result.code.unwrap_or(-1),
            });
        }
        Ok(ResourceChange::Applied)
    }
}

impl Applicable for ScriptResource<'_> {
    fn description(&self) -> String {
        format!("{} {}", self.url, self.args.join(" "))
            .trim_end()
            .to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        Ok(self.install()?)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::net::{FetchError, MockFetcher};
    use crate::resources::test_helpers::MockExecutor;

    fn serving_script() -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(b"#!/bin/sh\necho installed\n".to_vec()));
        fetcher
    }

    #[test]
    fn runs_downloaded_script_with_args() {
        let fetcher = serving_script();
        let executor = MockExecutor::ok("installed");
        let resource = ScriptResource::new(
            "https://sh.rustup.rs".to_string(),
            vec!["-y".to_string(), "--no-modify-path".to_string()],
            &fetcher,
            &executor,
        );
        assert_eq!(resource.install().unwrap(), ResourceChange::Applied);
        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sh");
        assert!(calls[0].1[0].ends_with(".sh"));
        assert_eq!(&calls[0].1[1..], ["-y", "--no-modify-path"]);
    }

    #[test]
    fn non_zero_exit_is_script_error() {
        let fetcher = serving_script();
        let executor = MockExecutor::fail();
        let resource =
            ScriptResource::new("https://sh.rustup.rs".to_string(), vec![], &fetcher, &executor);
        let err = resource.install().unwrap_err();
        assert!(matches!(err, InstallError::Script { exit_code: 1, .. }));
    }

    #[test]
    fn fetch_failure_runs_nothing() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|url| {
            Err(FetchError::Empty {
                url: url.to_string(),
            })
        });
        let executor = MockExecutor::ok("");
        let resource =
            ScriptResource::new("https://sh.rustup.rs".to_string(), vec![], &fetcher, &executor);
        assert!(matches!(
            resource.install().unwrap_err(),
            InstallError::Download { .. }
        ));
        assert_eq!(executor.call_count(), 0);
    }
}
