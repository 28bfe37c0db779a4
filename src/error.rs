//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors built with [`thiserror`]; command
//! handlers at the CLI boundary convert them to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! InstallError    : fatal for one recipe, never for the whole batch
//! InstallWarning  : recorded in the summary, never blocks a recipe
//! VerifyError     : verifier outcome, folded into InstallWarning
//! ConfigError     : configuration file loading
//! ```
//!
//! Every message that stems from an external command names the command line
//! and its exit code.

use thiserror::Error;

/// Errors that abort a single recipe.
#[derive(Error, Debug)]
pub enum InstallError {
    /// No package manager adapter exists for the detected OS.
    #[error("unsupported operating system '{id}': no package manager adapter")]
    UnsupportedOs {
        /// Normalized OS identifier that was detected (or overridden).
        id: String,
    },

    /// The requested tool has no recipe.
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// Packages are missing and the active adapter cannot install packages.
    #[error("missing prerequisites with no package manager available: {packages}")]
    MissingPrerequisites {
        /// Space-separated list of missing packages.
        packages: String,
    },

    /// The package manager exited non-zero while installing.
    #[error("package install failed for {package}: `{command}` exited with {exit_code}")]
    PackageInstall {
        /// Package name(s) being installed.
        package: String,
        /// Full command line that failed.
        command: String,
        /// Exit code of the package manager (`-1` when killed by a signal).
        exit_code: i32,
    },

    /// A repository or signing key could not be configured.
    #[error("failed to add repository '{repository}': {reason}")]
    RepositoryAdd {
        /// Repository name from the recipe.
        repository: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// The package index refresh failed and the recipe treats that as fatal.
    #[error("package index refresh failed: `{command}` exited with {exit_code}")]
    Refresh {
        /// Full command line that failed.
        command: String,
        /// Exit code of the refresh command.
        exit_code: i32,
    },

    /// An archive or installer could not be downloaded.
    #[error("download failed for {url}: {reason}")]
    Download {
        /// URL that was requested.
        url: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A downloaded archive could not be unpacked.
    #[error("failed to extract {archive}: {reason}")]
    Extract {
        /// Archive URL or path.
        archive: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A stable symlink could not be created or replaced.
    #[error("failed to link {link} -> {target}: {reason}")]
    Symlink {
        /// Path of the symlink.
        link: String,
        /// Path the symlink should point to.
        target: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// An environment fragment could not be written.
    #[error("failed to write environment fragment {path}: {reason}")]
    EnvWrite {
        /// Fragment path.
        path: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A file declared by a recipe could not be written.
    #[error("failed to write {path}: {reason}")]
    WriteFile {
        /// Target path.
        path: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// The "latest" version could not be resolved from a releases feed.
    #[error("failed to resolve latest version from {feed}: {reason}")]
    VersionResolution {
        /// Feed URL.
        feed: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A downloaded vendor installer exited non-zero.
    #[error("installer `{command}` exited with {exit_code}")]
    Script {
        /// Full command line that failed.
        command: String,
        /// Exit code of the installer.
        exit_code: i32,
    },

    /// An external command could not be spawned at all.
    #[error("failed to execute `{command}`: {reason}")]
    Command {
        /// Full command line.
        command: String,
        /// Human-readable failure reason.
        reason: String,
    },
}

/// Non-fatal conditions collected per recipe and shown in the summary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallWarning {
    /// The package index refresh failed but the recipe tolerates it.
    #[error("package index refresh failed: `{command}` exited with {exit_code}")]
    Refresh {
        /// Full command line that failed.
        command: String,
        /// Exit code of the refresh command.
        exit_code: i32,
    },

    /// The tool was already present and the fragment would point at
    /// directories this run never created.
    #[error("left {path} unchanged: {missing} does not exist")]
    EnvSkipped {
        /// Fragment path.
        path: String,
        /// First missing directory.
        missing: String,
    },

    /// The verification command is not available.
    #[error("verification command `{command}` not found")]
    VerificationMissing {
        /// Program that could not be located.
        command: String,
    },

    /// The verification command ran but exited non-zero.
    #[error("verification `{command}` exited with {exit_code}")]
    VerificationFailed {
        /// Full command line.
        command: String,
        /// Exit code of the verification command.
        exit_code: i32,
    },
}

/// Outcome of a failed version check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The program is not on PATH (nor on the fragment's PATH entries).
    #[error("`{program}` not found")]
    NotFound {
        /// Program name.
        program: String,
    },

    /// The program exists but the check exited non-zero or could not run.
    #[error("`{command}` exited with {exit_code}")]
    Failed {
        /// Full command line.
        command: String,
        /// Exit code (`-1` when unavailable).
        exit_code: i32,
    },
}

impl From<VerifyError> for InstallWarning {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::NotFound { program } => Self::VerificationMissing { command: program },
            VerifyError::Failed { command, exit_code } => {
                Self::VerificationFailed { command, exit_code }
            }
        }
    }
}

/// Errors that arise from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("invalid config file {path}: {message}")]
    Parse {
        /// Path to the offending file.
        path: String,
        /// Parser message.
        message: String,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_os_names_detected_id() {
        let e = InstallError::UnsupportedOs {
            id: "gentoo".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "unsupported operating system 'gentoo': no package manager adapter"
        );
    }

    #[test]
    fn package_install_includes_command_and_exit_code() {
        let e = InstallError::PackageInstall {
            package: "curl".to_string(),
            command: "sudo apt-get install -y curl".to_string(),
            exit_code: 100,
        };
        let msg = e.to_string();
        assert!(msg.contains("curl"));
        assert!(msg.contains("`sudo apt-get install -y curl`"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn refresh_error_and_warning_share_wording() {
        let e = InstallError::Refresh {
            command: "apt-get update".to_string(),
            exit_code: 100,
        };
        let w = InstallWarning::Refresh {
            command: "apt-get update".to_string(),
            exit_code: 100,
        };
        assert_eq!(e.to_string(), w.to_string());
    }

    #[test]
    fn symlink_error_display() {
        let e = InstallError::Symlink {
            link: "/opt/maven".to_string(),
            target: "/opt/apache-maven-3.9.6".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "failed to link /opt/maven -> /opt/apache-maven-3.9.6: permission denied"
        );
    }

    #[test]
    fn verify_not_found_becomes_verification_missing() {
        let w: InstallWarning = VerifyError::NotFound {
            program: "mvn".to_string(),
        }
        .into();
        assert_eq!(
            w,
            InstallWarning::VerificationMissing {
                command: "mvn".to_string()
            }
        );
    }

    #[test]
    fn verify_failed_becomes_verification_failed() {
        let w: InstallWarning = VerifyError::Failed {
            command: "docker --version".to_string(),
            exit_code: 2,
        }
        .into();
        assert!(w.to_string().contains("docker --version"));
        assert!(w.to_string().contains('2'));
    }

    #[test]
    fn config_error_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "/etc/provision.toml".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/etc/provision.toml"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<InstallError>();
        assert_send_sync::<InstallWarning>();
        assert_send_sync::<VerifyError>();
        assert_send_sync::<ConfigError>();
    }

    #[test]
    fn install_error_converts_to_anyhow() {
        let e = InstallError::UnknownTool("kubectl".to_string());
        let _anyhow_err: anyhow::Error = e.into();
    }
}
