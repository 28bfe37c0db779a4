//! Runtime settings: install locations, network limits, privilege and
//! pinned tool versions.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::toml_loader::load_config;
use crate::error::ConfigError;

/// Top-level settings file (`config.toml`).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Filesystem locations.
    pub paths: Paths,
    /// HTTP behaviour.
    pub network: Network,
    /// Package manager behaviour.
    pub adapter: Adapter,
    /// Tool name to pinned version, overriding built-in defaults.
    pub versions: BTreeMap<String, String>,
}

/// `[paths]`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    /// Parent of versioned install directories.
    pub opt_dir: PathBuf,
    /// Directory for stable command symlinks.
    pub bin_dir: PathBuf,
    /// Directory holding shell-profile fragments.
    pub profile_dir: PathBuf,
    /// APT source list directory.
    pub apt_sources_dir: PathBuf,
    /// APT signing key directory.
    pub apt_keyrings_dir: PathBuf,
    /// YUM/DNF repository directory.
    pub yum_repos_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            opt_dir: PathBuf::from("/opt"),
            bin_dir: PathBuf::from("/usr/local/bin"),
            profile_dir: PathBuf::from("/etc/profile.d"),
            apt_sources_dir: PathBuf::from("/etc/apt/sources.list.d"),
            apt_keyrings_dir: PathBuf::from("/etc/apt/keyrings"),
            yum_repos_dir: PathBuf::from("/etc/yum.repos.d"),
        }
    }
}

impl Paths {
    /// Point every location below `root` (for sandboxed runs and tests).
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        let under = |p: PathBuf| root.join(p.strip_prefix("/").unwrap_or(&p));
        let defaults = Self::default();
        Self {
            opt_dir: under(defaults.opt_dir),
            bin_dir: under(defaults.bin_dir),
            profile_dir: under(defaults.profile_dir),
            apt_sources_dir: under(defaults.apt_sources_dir),
            apt_keyrings_dir: under(defaults.apt_keyrings_dir),
            yum_repos_dir: under(defaults.yum_repos_dir),
        }
    }
}

/// `[network]`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Network {
    /// Global per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Largest accepted response body in bytes.
    pub max_download_bytes: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_download_bytes: 1024 * 1024 * 1024,
        }
    }
}

/// `[adapter]`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Adapter {
    /// Prefix package manager commands with `sudo` when not running as root.
    pub use_sudo: bool,
}

impl Default for Adapter {
    fn default() -> Self {
        Self { use_sudo: true }
    }
}

impl Settings {
    /// Load settings from `explicit`, else the default location, else defaults.
    ///
    /// An explicitly named file must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) if !path.exists() => Err(ConfigError::Io {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            }),
            Some(path) => load_config(path),
            None => default_path().map_or_else(|| Ok(Self::default()), |p| load_config(&p)),
        }
    }

    /// Configured version for `tool`, if pinned in `[versions]`.
    #[must_use]
    pub fn version_for(&self, tool: &str) -> Option<&str> {
        self.versions.get(tool).map(String::as_str)
    }
}

/// `$XDG_CONFIG_HOME/provision/config.toml`, else `~/.config/provision/config.toml`.
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("provision").join("config.toml"))
}
