//! Package manager kinds and the installed-package resource.
use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Package manager family selected from the OS id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackageManagerKind {
    /// Debian family (`apt-get`, `dpkg-query`).
    Apt,
    /// Red Hat family (`dnf`, falling back to `yum`).
    YumDnf,
    /// Arch Linux (`pacman`).
    Pacman,
    /// macOS (`brew`).
    Brew,
    /// No package manager; only PATH checks and vendor downloads.
    Manual,
    /// No adapter exists for the OS.
    Unsupported,
}

impl PackageManagerKind {
    /// Map a normalized OS id onto its package manager family.
    #[must_use]
    pub fn for_os_id(id: &str) -> Self {
        match id {
            "ubuntu" | "debian" => Self::Apt,
            "centos" | "rhel" | "fedora" => Self::YumDnf,
            "arch" => Self::Pacman,
            "macos" => Self::Brew,
            _ => Self::Unsupported,
        }
    }

    /// Short lower-case name used in logs and recipe listings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::YumDnf => "yum/dnf",
            Self::Pacman => "pacman",
            Self::Brew => "brew",
            Self::Manual => "manual",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix marking a Homebrew cask (`cask:docker`).
pub const CASK_PREFIX: &str = "cask:";

/// A single package whose presence can be queried.
///
/// Installation goes through the adapter in one batch, so [`Applicable::apply`]
/// only reports what would change.
#[derive(Debug)]
pub struct PackageResource<'a> {
    /// Package name as known to the manager (or program name for `Manual`).
    pub name: String,
    /// Manager that owns the package.
    pub kind: PackageManagerKind,
    executor: &'a dyn Executor,
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub const fn new(name: String, kind: PackageManagerKind, executor: &'a dyn Executor) -> Self {
        Self {
            name,
            kind,
            executor,
        }
    }

    /// Query command for this package, or `None` when the check is a PATH lookup.
    #[must_use]
    pub fn query_command(&self) -> Option<(&'static str, Vec<&str>)> {
        let name = self.name.as_str();
        match self.kind {
            PackageManagerKind::Apt => Some(("dpkg-query", vec!["-W", "-f=${Status}", name])),
            PackageManagerKind::YumDnf => Some(("rpm", vec!["-q", name])),
            PackageManagerKind::Pacman => Some(("pacman", vec!["-Q", name])),
            PackageManagerKind::Brew => Some(name.strip_prefix(CASK_PREFIX).map_or_else(
                || ("brew", vec!["list", "--versions", name]),
                |cask| ("brew", vec!["list", "--cask", "--versions", cask]),
            )),
            PackageManagerKind::Manual | PackageManagerKind::Unsupported => None,
        }
    }
}

/// Whether a dpkg `want flag status` triple says the files are on disk.
fn dpkg_installed(status: &str) -> bool {
    status.split_whitespace().last() == Some("installed")
}

impl Applicable for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.name, self.kind)
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.needs_change()? {
            Ok(ResourceChange::Applied)
        } else {
            Ok(ResourceChange::AlreadyCorrect)
        }
    }
}

impl Resource for PackageResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let present = match self.query_command() {
            Some((program, args)) => {
                let result = self.executor.run_unchecked(program, &args)?;
                result.success
                    && match self.kind {
                        // Removed packages keep a record (`deinstall ok config-files`).
                        PackageManagerKind::Apt => dpkg_installed(&result.stdout),
                        // `brew list --versions` exits 0 with empty output for unknown formulae.
                        PackageManagerKind::Brew => !result.stdout.trim().is_empty(),
                        _ => true,
                    }
            }
            None => self.executor.which(&self.name),
        };
        Ok(if present {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        })
    }
}
