//! Package manager adapters selected once per run from the [`OsProfile`].
//!
//! Each adapter exposes the same capability set ([`PackageAdapter`]) over a
//! different native tool.  Commands that need root go through [`Privilege`].
mod apt;
mod brew;
mod manual;
mod pacman;
mod yum;

use std::path::Path;
use std::sync::Arc;

pub use apt::AptAdapter;
pub use brew::BrewAdapter;
pub use manual::ManualAdapter;
pub use pacman::PacmanAdapter;
pub use yum::YumDnfAdapter;

use crate::config::Settings;
use crate::error::InstallError;
use crate::exec::{Executor, command_line};
use crate::net::Fetcher;
use crate::platform::OsProfile;
use crate::resources::helpers::fs::write_atomic;
use crate::resources::package::{PackageManagerKind, PackageResource};
use crate::resources::{Resource as _, ResourceChange};

/// How an RPM repository is described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpmRepo {
    /// Vendor-published `.repo` file fetched as-is.
    RepoFile {
        /// URL of the `.repo` file.
        url: String,
    },
    /// Repository rendered from its base URL.
    BaseUrl {
        /// `baseurl=` value.
        baseurl: String,
        /// `gpgkey=` value.
        gpgkey: String,
    },
}

/// A third-party package repository, described for every manager that
/// supports it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepositorySpec {
    /// File-safe repository name (`hashicorp`, `docker`, …).
    pub name: String,
    /// Signing key URL (apt keyring / `rpm --import`).
    pub key_url: Option<String>,
    /// APT source line; `{keyring}` is replaced with the key path.
    pub apt: Option<String>,
    /// RPM repository definition.
    pub rpm: Option<RpmRepo>,
    /// Homebrew tap (`hashicorp/tap`).
    pub brew_tap: Option<String>,
}

impl RepositorySpec {
    fn error(&self, reason: impl ToString) -> InstallError {
        InstallError::RepositoryAdd {
            repository: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Privilege escalation for package manager commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Run commands as-is (already root, or escalation disabled).
    Direct,
    /// Prefix commands with `sudo`.
    Sudo,
}

impl Privilege {
    /// Decide once whether commands need `sudo`.
    #[must_use]
    pub fn detect(executor: &dyn Executor, use_sudo: bool) -> Self {
        if !use_sudo {
            return Self::Direct;
        }
        let is_root = executor
            .run_unchecked("id", &["-u"])
            .is_ok_and(|r| r.success && r.stdout.trim() == "0");
        if !is_root && executor.which("sudo") {
            Self::Sudo
        } else {
            Self::Direct
        }
    }

    /// Final `(program, args)` for a command.
    #[must_use]
    pub fn wrap<'a>(self, program: &'a str, args: &[&'a str]) -> (&'a str, Vec<&'a str>) {
        match self {
            Self::Direct => (program, args.to_vec()),
            Self::Sudo => {
                let mut wrapped = Vec::with_capacity(args.len() + 1);
                wrapped.push(program);
                wrapped.extend_from_slice(args);
                ("sudo", wrapped)
            }
        }
    }
}

/// Shared state every adapter carries.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    /// Command runner.
    pub executor: Arc<dyn Executor>,
    /// HTTP client for keys and repository files.
    pub fetcher: Arc<dyn Fetcher>,
    /// Effective settings.
    pub settings: Arc<Settings>,
    /// Resolved privilege mode.
    pub privilege: Privilege,
}

impl AdapterContext {
    /// Run a (possibly elevated) command that must succeed.
    ///
    /// Returns the full command line and the exit code on failure so each
    /// caller can wrap it in its own error kind.
    fn run(&self, program: &str, args: &[&str]) -> Result<(), (String, i32)> {
        let (program, args) = self.privilege.wrap(program, args);
        let command = command_line(program, &args);
        tracing::debug!("running: {command}");
        match self.executor.run_unchecked(program, &args) {
            Ok(result) if result.success => Ok(()),
            Ok(result) => Err((command, result.code.unwrap_or(-1))),
            Err(e) => {
                tracing::debug!("{command}: {e:#}");
                Err((command, -1))
            }
        }
    }

    /// Run a package install command, mapping failure to
    /// [`InstallError::PackageInstall`].
    fn install(&self, program: &str, args: &[&str], names: &[String]) -> Result<(), InstallError> {
        self.run(program, args)
            .map_err(|(command, exit_code)| InstallError::PackageInstall {
                package: names.join(" "),
                command,
                exit_code,
            })
    }

    /// Run a refresh command, mapping failure to [`InstallError::Refresh`].
    fn refresh(&self, program: &str, args: &[&str]) -> Result<(), InstallError> {
        self.run(program, args)
            .map_err(|(command, exit_code)| InstallError::Refresh { command, exit_code })
    }

    /// Write a root-owned file: directly when running with enough rights,
    /// via `sudo install` otherwise.
    fn place_file(&self, dest: &Path, content: &[u8], spec: &RepositorySpec) -> Result<(), InstallError> {
        match self.privilege {
            Privilege::Direct => {
                write_atomic(dest, content, Some(0o644)).map_err(|e| spec.error(format!("{e:#}")))
            }
            Privilege::Sudo => {
                let staged = tempfile::NamedTempFile::new().map_err(|e| spec.error(e))?;
                std::fs::write(staged.path(), content).map_err(|e| spec.error(e))?;
                let src = staged.path().to_string_lossy().to_string();
                let dst = dest.to_string_lossy().to_string();
                self.run("install", &["-D", "-m", "0644", &src, &dst])
                    .map_err(|(command, code)| {
                        spec.error(format!("`{command}` exited with {code}"))
                    })
            }
        }
    }
}

/// Capability set of one package manager.
pub trait PackageAdapter: Send + Sync + std::fmt::Debug {
    /// Manager family.
    fn kind(&self) -> PackageManagerKind;

    /// Executor used for queries.
    fn executor(&self) -> &dyn Executor;

    /// Update the package index.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Refresh`] naming the command and exit code.
    fn refresh(&self) -> Result<(), InstallError>;

    /// Install `names` in a single batch command.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::PackageInstall`] when the command fails, or
    /// [`InstallError::MissingPrerequisites`] for the manual adapter.
    fn install(&self, names: &[String]) -> Result<(), InstallError>;

    /// Configure a third-party repository and its signing key.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::RepositoryAdd`] on network, permission or
    /// capability failure.
    fn add_repository(&self, spec: &RepositorySpec) -> Result<ResourceChange, InstallError>;

    /// Whether `name` is already installed.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Command`] if the query command cannot run.
    fn is_installed(&self, name: &str) -> Result<bool, InstallError> {
        PackageResource::new(name.to_string(), self.kind(), self.executor())
            .needs_change()
            .map(|missing| !missing)
            .map_err(|e| InstallError::Command {
                command: format!("query {name}"),
                reason: format!("{e:#}"),
            })
    }

    /// Subset of `names` not yet installed, in input order.
    ///
    /// # Errors
    ///
    /// Propagates [`PackageAdapter::is_installed`] failures.
    fn missing(&self, names: &[String]) -> Result<Vec<String>, InstallError> {
        let mut missing = Vec::new();
        for name in names {
            if !self.is_installed(name)? && !missing.contains(name) {
                missing.push(name.clone());
            }
        }
        Ok(missing)
    }

    /// Install whichever of `names` are missing; returns what was installed.
    ///
    /// # Errors
    ///
    /// Propagates query and install failures.
    fn ensure_installed(&self, names: &[String]) -> Result<Vec<String>, InstallError> {
        let missing = self.missing(names)?;
        if !missing.is_empty() {
            self.install(&missing)?;
        }
        Ok(missing)
    }
}

/// Select the adapter for `profile`.
///
/// Unsupported ids fail before any command runs, unless `manual_fallback`
/// is set, in which case the [`ManualAdapter`] is returned.
///
/// # Errors
///
/// Returns [`InstallError::UnsupportedOs`] for ids without an adapter.
pub fn for_profile(
    profile: &OsProfile,
    settings: Arc<Settings>,
    executor: Arc<dyn Executor>,
    fetcher: Arc<dyn Fetcher>,
    manual_fallback: bool,
) -> Result<Box<dyn PackageAdapter>, InstallError> {
    let kind = match PackageManagerKind::for_os_id(&profile.id) {
        PackageManagerKind::Unsupported if manual_fallback => PackageManagerKind::Manual,
        PackageManagerKind::Unsupported => {
            return Err(InstallError::UnsupportedOs {
                id: profile.id.clone(),
            });
        }
        kind => kind,
    };

    let privilege = match kind {
        PackageManagerKind::Brew | PackageManagerKind::Manual => Privilege::Direct,
        _ => Privilege::detect(executor.as_ref(), settings.adapter.use_sudo),
    };
    let ctx = AdapterContext {
        executor,
        fetcher,
        settings,
        privilege,
    };

    Ok(match kind {
        PackageManagerKind::Apt => Box::new(AptAdapter::new(ctx)),
        PackageManagerKind::YumDnf => Box::new(YumDnfAdapter::new(ctx)),
        PackageManagerKind::Pacman => Box::new(PacmanAdapter::new(ctx)),
        PackageManagerKind::Brew => Box::new(BrewAdapter::new(ctx)),
        PackageManagerKind::Manual | PackageManagerKind::Unsupported => {
            Box::new(ManualAdapter::new(ctx))
        }
    })
}
