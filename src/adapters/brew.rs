//! macOS adapter (Homebrew). Never escalates privileges.
use super::{AdapterContext, PackageAdapter, RepositorySpec};
use crate::error::InstallError;
use crate::exec::Executor;
use crate::resources::ResourceChange;
use crate::resources::package::{CASK_PREFIX, PackageManagerKind};

/// Adapter for `brew`.
#[derive(Debug)]
pub struct BrewAdapter {
    ctx: AdapterContext,
}

impl BrewAdapter {
    /// Create an adapter over the shared context.
    #[must_use]
    pub const fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn has_tap(&self, tap: &str) -> bool {
        self.ctx
            .executor
            .run_unchecked("brew", &["tap"])
            .is_ok_and(|r| r.success && r.stdout.lines().any(|l| l.trim() == tap))
    }
}

impl PackageAdapter for BrewAdapter {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Brew
    }

    fn executor(&self) -> &dyn Executor {
        self.ctx.executor.as_ref()
    }

    fn refresh(&self) -> Result<(), InstallError> {
        self.ctx.refresh("brew", &["update"])
    }

    /// Formulae and casks go in separate batches.
    fn install(&self, names: &[String]) -> Result<(), InstallError> {
        let (casks, formulae): (Vec<&String>, Vec<&String>) =
            names.iter().partition(|n| n.starts_with(CASK_PREFIX));

        if !formulae.is_empty() {
            let mut args = vec!["install"];
            args.extend(formulae.iter().map(|n| n.as_str()));
            self.ctx.install("brew", &args, names)?;
        }
        if !casks.is_empty() {
            let mut args = vec!["install", "--cask"];
            args.extend(
                casks
                    .iter()
                    .filter_map(|n| n.strip_prefix(CASK_PREFIX)),
            );
            self.ctx.install("brew", &args, names)?;
        }
        Ok(())
    }

    fn add_repository(&self, spec: &RepositorySpec) -> Result<ResourceChange, InstallError> {
        let Some(tap) = spec.brew_tap.as_deref() else {
            return Err(spec.error("no Homebrew tap defined"));
        };
        if self.has_tap(tap) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.ctx
            .run("brew", &["tap", tap])
            .map_err(|(command, code)| spec.error(format!("`{command}` exited with {code}")))?;
        Ok(ResourceChange::Applied)
    }
}
