//! Execution of rendered recipe [`Action`]s against the resources.
use std::path::PathBuf;

use crate::adapters::PackageAdapter;
use crate::error::{InstallError, InstallWarning};
use crate::recipes::Action;
use crate::resources::archive::ArchiveResource;
use crate::resources::file::FileResource;
use crate::resources::script::ScriptResource;
use crate::resources::symlink::SymlinkResource;
use crate::resources::{Applicable as _, Resource, ResourceChange, ResourceState};

use super::Context;

/// Apply one rendered action.
///
/// Package installs refresh the index first when it is stale; a tolerated
/// refresh failure is pushed to `warnings`.
///
/// # Errors
///
/// Returns the [`InstallError`] of the failing step.
pub fn apply(
    ctx: &Context,
    adapter: &dyn PackageAdapter,
    action: &Action,
    refresh_is_fatal: bool,
    warnings: &mut Vec<InstallWarning>,
) -> Result<ResourceChange, InstallError> {
    match action {
        Action::RunPackageManagerInstall(names) => {
            install_packages(ctx, adapter, names, refresh_is_fatal, warnings)
        }
        Action::AddRepository(spec) => {
            let change = adapter.add_repository(spec)?;
            if change == ResourceChange::Applied {
                ctx.log.info(&format!("added repository {}", spec.name));
                ctx.invalidate_index();
            }
            Ok(change)
        }
        Action::DownloadExtract {
            url,
            dest,
            strip_root,
            sha256,
        } => ArchiveResource::new(
            url.clone(),
            PathBuf::from(dest),
            *strip_root,
            sha256.clone(),
            ctx.fetcher.as_ref(),
        )
        .install(),
        Action::Symlink { src, dst } => {
            link(&SymlinkResource::new(PathBuf::from(src), PathBuf::from(dst)))
        }
        Action::WriteFile {
            path,
            content,
            mode,
        } => write_file(&FileResource::new(
            PathBuf::from(path),
            content.clone(),
            *mode,
        )),
        Action::DownloadRun { url, args } => ScriptResource::new(
            url.clone(),
            args.clone(),
            ctx.fetcher.as_ref(),
            ctx.executor.as_ref(),
        )
        .install(),
    }
}

/// Install whichever of `names` are missing, refreshing the index first.
///
/// # Errors
///
/// Returns [`InstallError::Refresh`] (when fatal) or the adapter's install
/// error.
pub fn install_packages(
    ctx: &Context,
    adapter: &dyn PackageAdapter,
    names: &[String],
    refresh_is_fatal: bool,
    warnings: &mut Vec<InstallWarning>,
) -> Result<ResourceChange, InstallError> {
    let missing = adapter.missing(names)?;
    if missing.is_empty() {
        ctx.log
            .debug(&format!("already installed: {}", names.join(" ")));
        return Ok(ResourceChange::AlreadyCorrect);
    }
    if let Some(warning) = ctx.refresh_index(refresh_is_fatal)? {
        warnings.push(warning);
    }
    ctx.log.info(&format!("installing {}", missing.join(" ")));
    adapter.install(&missing)?;
    Ok(ResourceChange::Applied)
}

fn link(resource: &SymlinkResource) -> Result<ResourceChange, InstallError> {
    let error = |reason: String| InstallError::Symlink {
        link: resource.target.display().to_string(),
        target: resource.source.display().to_string(),
        reason,
    };
    match resource.current_state().map_err(|e| error(format!("{e:#}")))? {
        ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
        ResourceState::Invalid { reason } => Err(error(reason)),
        ResourceState::Missing | ResourceState::Incorrect { .. } => {
            resource.apply().map_err(|e| error(format!("{e:#}")))
        }
    }
}

fn write_file(resource: &FileResource) -> Result<ResourceChange, InstallError> {
    let error = |reason: String| InstallError::WriteFile {
        path: resource.path.display().to_string(),
        reason,
    };
    match resource.current_state().map_err(|e| error(format!("{e:#}")))? {
        ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
        ResourceState::Invalid { reason } => Err(error(reason)),
        ResourceState::Missing | ResourceState::Incorrect { .. } => {
            resource.apply().map_err(|e| error(format!("{e:#}")))
        }
    }
}
