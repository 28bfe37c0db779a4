//! Stable symlink resource (e.g. `/opt/maven -> /opt/maven-3.9.6`).
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A symlink resource that can be checked and applied.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// What the symlink points to (usually a versioned directory).
    pub source: PathBuf,
    /// Where the symlink lives (the stable path).
    pub target: PathBuf,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }
}

impl Applicable for SymlinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.target.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        super::helpers::fs::ensure_parent_dir(&self.target)?;

        // Remove the old link before creating the new one.
        if self.target.symlink_metadata().is_ok() {
            remove_link(&self.target)
                .with_context(|| format!("remove existing: {}", self.target.display()))?;
        }

        create_symlink(&self.source, &self.target)
            .with_context(|| format!("create link: {}", self.target.display()))?;

        Ok(ResourceChange::Applied)
    }
}

impl Resource for SymlinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }

        let meta = self.target.symlink_metadata();
        if meta.as_ref().is_ok_and(std::fs::Metadata::is_dir) {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is a real directory", self.target.display()),
            });
        }

        std::fs::read_link(&self.target).map_or_else(
            |_| {
                if meta.is_ok() {
                    Ok(ResourceState::Incorrect {
                        current: "target is a regular file".to_string(),
                    })
                } else {
                    Ok(ResourceState::Missing)
                }
            },
            |existing| {
                if existing == self.source {
                    Ok(ResourceState::Correct)
                } else {
                    Ok(ResourceState::Incorrect {
                        current: format!("points to {}", existing.display()),
                    })
                }
            },
        )
    }
}

/// Create a symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "creating symlink {} -> {}",
                link.display(),
                target.display()
            )
        })
    }
    #[cfg(not(unix))]
    {
        anyhow::bail!(
            "symlinks are not supported on this platform: {} -> {}",
            link.display(),
            target.display()
        )
    }
}

/// Remove a symlink or file.  Real directories are refused.
fn remove_link(path: &Path) -> Result<()> {
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("reading metadata: {}", path.display()))?;
    if meta.is_dir() {
        anyhow::bail!("refusing to replace real directory {}", path.display());
    }
    std::fs::remove_file(path).with_context(|| format!("removing: {}", path.display()))
}
