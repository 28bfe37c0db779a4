//! Fallback when no package manager is usable.
//!
//! Presence checks are PATH lookups; anything missing must be installed by
//! the user before vendor downloads can proceed.
use super::{AdapterContext, PackageAdapter, RepositorySpec};
use crate::error::InstallError;
use crate::exec::Executor;
use crate::resources::ResourceChange;
use crate::resources::package::PackageManagerKind;

/// Adapter that can only check, never install.
#[derive(Debug)]
pub struct ManualAdapter {
    ctx: AdapterContext,
}

impl ManualAdapter {
    /// Create an adapter over the shared context.
    #[must_use]
    pub const fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }
}

impl PackageAdapter for ManualAdapter {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Manual
    }

    fn executor(&self) -> &dyn Executor {
        self.ctx.executor.as_ref()
    }

    fn refresh(&self) -> Result<(), InstallError> {
        Ok(())
    }

    fn install(&self, names: &[String]) -> Result<(), InstallError> {
        Err(InstallError::MissingPrerequisites {
            packages: names.join(" "),
        })
    }

    fn add_repository(&self, spec: &RepositorySpec) -> Result<ResourceChange, InstallError> {
        Err(spec.error("no package manager available"))
    }
}
