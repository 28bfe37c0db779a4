//! Arch Linux adapter (`pacman`).
use super::{AdapterContext, PackageAdapter, RepositorySpec};
use crate::error::InstallError;
use crate::exec::Executor;
use crate::resources::ResourceChange;
use crate::resources::package::PackageManagerKind;

/// Adapter for `pacman`.
#[derive(Debug)]
pub struct PacmanAdapter {
    ctx: AdapterContext,
}

impl PacmanAdapter {
    /// Create an adapter over the shared context.
    #[must_use]
    pub const fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }
}

impl PackageAdapter for PacmanAdapter {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Pacman
    }

    fn executor(&self) -> &dyn Executor {
        self.ctx.executor.as_ref()
    }

    fn refresh(&self) -> Result<(), InstallError> {
        self.ctx.refresh("pacman", &["-Sy"])
    }

    fn install(&self, names: &[String]) -> Result<(), InstallError> {
        let mut args = vec!["-S", "--needed", "--noconfirm"];
        args.extend(names.iter().map(String::as_str));
        self.ctx.install("pacman", &args, names)
    }

    fn add_repository(&self, spec: &RepositorySpec) -> Result<ResourceChange, InstallError> {
        Err(spec.error("third-party repositories are not supported on pacman"))
    }
}
