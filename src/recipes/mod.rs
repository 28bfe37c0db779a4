//! Declarative install recipes.
//!
//! A recipe lists, per package manager, the packages it needs first and the
//! [`Action`]s that install the tool.  Strings inside actions are templates
//! rendered with [`Vars`] right before execution.
pub mod catalog;
pub mod releases;

use std::collections::BTreeMap;
use std::path::Path;

use crate::adapters::{RepositorySpec, RpmRepo};
use crate::config::Settings;
use crate::config::settings::Paths;
use crate::error::InstallError;
use crate::net::Fetcher;
use crate::platform::OsProfile;
use crate::resources::package::PackageManagerKind;

/// Where a recipe's version comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    /// Built-in default, overridable through `[versions]`.
    Fixed(&'static str),
    /// Newest stable release from a JSON releases feed.
    Latest {
        /// Feed URL.
        feed_url: &'static str,
    },
    /// The install steps do not reference a version.
    Unversioned,
}

/// One install step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Install packages through the active adapter.
    RunPackageManagerInstall(Vec<String>),
    /// Configure a third-party repository.
    AddRepository(RepositorySpec),
    /// Download an archive and extract it into `dest`.
    DownloadExtract {
        /// Archive URL.
        url: String,
        /// Versioned destination directory.
        dest: String,
        /// Drop the archive's single top-level directory.
        strip_root: bool,
        /// Expected SHA-256 (hex).
        sha256: Option<String>,
    },
    /// Create or replace a stable symlink `dst -> src`.
    Symlink {
        /// Link target.
        src: String,
        /// Link path.
        dst: String,
    },
    /// Write a file with fixed content.
    WriteFile {
        /// Target path.
        path: String,
        /// File content.
        content: String,
        /// Unix mode.
        mode: Option<u32>,
    },
    /// Download a vendor installer and run it with `sh`.
    DownloadRun {
        /// Installer URL.
        url: String,
        /// Installer arguments.
        args: Vec<String>,
    },
}

impl Action {
    /// Package install action.
    #[must_use]
    pub fn packages(names: &[&str]) -> Self {
        Self::RunPackageManagerInstall(names.iter().map(ToString::to_string).collect())
    }

    /// Archive download action.
    #[must_use]
    pub fn download_extract(url: &str, dest: &str, strip_root: bool) -> Self {
        Self::DownloadExtract {
            url: url.to_string(),
            dest: dest.to_string(),
            strip_root,
            sha256: None,
        }
    }

    /// Symlink action.
    #[must_use]
    pub fn symlink(src: &str, dst: &str) -> Self {
        Self::Symlink {
            src: src.to_string(),
            dst: dst.to_string(),
        }
    }

    /// Installer download-and-run action.
    #[must_use]
    pub fn download_run(url: &str, args: &[&str]) -> Self {
        Self::DownloadRun {
            url: url.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    /// Every template string carried by the action.
    fn templates(&self) -> Vec<&str> {
        match self {
            Self::RunPackageManagerInstall(names) => names.iter().map(String::as_str).collect(),
            Self::AddRepository(spec) => {
                let mut out: Vec<&str> = [&spec.key_url, &spec.apt, &spec.brew_tap]
                    .into_iter()
                    .flatten()
                    .map(String::as_str)
                    .collect();
                match &spec.rpm {
                    Some(RpmRepo::RepoFile { url }) => out.push(url),
                    Some(RpmRepo::BaseUrl { baseurl, gpgkey }) => {
                        out.push(baseurl);
                        out.push(gpgkey);
                    }
                    None => {}
                }
                out
            }
            Self::DownloadExtract { url, dest, .. } => vec![url.as_str(), dest.as_str()],
            Self::Symlink { src, dst } => vec![src.as_str(), dst.as_str()],
            Self::WriteFile { path, content, .. } => vec![path.as_str(), content.as_str()],
            Self::DownloadRun { url, args } => {
                let mut out = vec![url.as_str()];
                out.extend(args.iter().map(String::as_str));
                out
            }
        }
    }

    /// Copy of the action with every template rendered.
    #[must_use]
    pub fn render(&self, vars: &Vars) -> Self {
        let r = |s: &String| vars.render(s);
        match self {
            Self::RunPackageManagerInstall(names) => {
                Self::RunPackageManagerInstall(names.iter().map(r).collect())
            }
            Self::AddRepository(spec) => Self::AddRepository(RepositorySpec {
                name: spec.name.clone(),
                key_url: spec.key_url.as_ref().map(r),
                apt: spec.apt.as_ref().map(r),
                rpm: spec.rpm.as_ref().map(|rpm| match rpm {
                    RpmRepo::RepoFile { url } => RpmRepo::RepoFile { url: r(url) },
                    RpmRepo::BaseUrl { baseurl, gpgkey } => RpmRepo::BaseUrl {
                        baseurl: r(baseurl),
                        gpgkey: r(gpgkey),
                    },
                }),
                brew_tap: spec.brew_tap.as_ref().map(r),
            }),
            Self::DownloadExtract {
                url,
                dest,
                strip_root,
                sha256,
            } => Self::DownloadExtract {
                url: r(url),
                dest: r(dest),
                strip_root: *strip_root,
                sha256: sha256.clone(),
            },
            Self::Symlink { src, dst } => Self::Symlink {
                src: r(src),
                dst: r(dst),
            },
            Self::WriteFile {
                path,
                content,
                mode,
            } => Self::WriteFile {
                path: r(path),
                content: r(content),
                mode: *mode,
            },
            Self::DownloadRun { url, args } => Self::DownloadRun {
                url: r(url),
                args: args.iter().map(r).collect(),
            },
        }
    }

    /// One-line description for logs and dry runs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::RunPackageManagerInstall(names) => format!("install packages: {}", names.join(" ")),
            Self::AddRepository(spec) => format!("add repository {}", spec.name),
            Self::DownloadExtract { url, dest, .. } => format!("download {url} -> {dest}"),
            Self::Symlink { src, dst } => format!("link {dst} -> {src}"),
            Self::WriteFile { path, .. } => format!("write {path}"),
            Self::DownloadRun { url, args } => {
                format!("run installer {url} {}", args.join(" ")).trim_end().to_string()
            }
        }
    }
}

/// Actions plus environment exports for one install path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    /// Ordered install steps.
    pub actions: Vec<Action>,
    /// `(name, value)` exports written to the tool's profile fragment.
    pub env: Vec<(String, String)>,
}

impl Plan {
    /// Plan with the given actions and no exports.
    #[must_use]
    pub const fn new(actions: Vec<Action>) -> Self {
        Self {
            actions,
            env: Vec::new(),
        }
    }

    /// Add an environment export.
    #[must_use]
    pub fn export(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Whether any action or export references `{version}`.
    #[must_use]
    pub fn needs_version(&self) -> bool {
        self.actions
            .iter()
            .flat_map(Action::templates)
            .chain(self.env.iter().map(|(_, v)| v.as_str()))
            .any(|t| t.contains("{version}"))
    }
}

/// A tool installer declared in the [`catalog`].
#[derive(Debug, Clone)]
pub struct InstallRecipe {
    /// Tool name used on the command line.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Version source.
    pub version: VersionSource,
    /// Program whose presence means the tool is installed.
    pub probe: Option<&'static str>,
    /// Packages required before the install steps run.
    pub prerequisites: BTreeMap<PackageManagerKind, Vec<String>>,
    /// Manager-native install paths.
    pub steps: BTreeMap<PackageManagerKind, Plan>,
    /// Vendor-download path used when the active manager has no entry.
    pub manual: Option<Plan>,
    /// Version command, e.g. `terraform version`.
    pub verify: Option<&'static str>,
    /// Whether a failed index refresh aborts this recipe.
    pub refresh_is_fatal: bool,
}

impl InstallRecipe {
    /// Start a recipe with no steps.
    #[must_use]
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            version: VersionSource::Unversioned,
            probe: None,
            prerequisites: BTreeMap::new(),
            steps: BTreeMap::new(),
            manual: None,
            verify: None,
            refresh_is_fatal: false,
        }
    }

    /// Set the version source.
    #[must_use]
    pub const fn version(mut self, version: VersionSource) -> Self {
        self.version = version;
        self
    }

    /// Set the presence probe.
    #[must_use]
    pub const fn probe(mut self, program: &'static str) -> Self {
        self.probe = Some(program);
        self
    }

    /// Set the verification command.
    #[must_use]
    pub const fn verify(mut self, command: &'static str) -> Self {
        self.verify = Some(command);
        self
    }

    /// Make index refresh failures fatal.
    #[must_use]
    pub const fn refresh_is_fatal(mut self) -> Self {
        self.refresh_is_fatal = true;
        self
    }

    /// Declare prerequisites for one manager.
    #[must_use]
    pub fn requires(mut self, kind: PackageManagerKind, packages: &[&str]) -> Self {
        self.prerequisites
            .insert(kind, packages.iter().map(ToString::to_string).collect());
        self
    }

    /// Declare the install path for one manager.
    #[must_use]
    pub fn on(mut self, kind: PackageManagerKind, plan: Plan) -> Self {
        self.steps.insert(kind, plan);
        self
    }

    /// Declare the vendor-download path.
    #[must_use]
    pub fn manual(mut self, plan: Plan) -> Self {
        self.manual = Some(plan);
        self
    }

    /// Install path for `kind`, falling back to the manual path.
    #[must_use]
    pub fn plan(&self, kind: PackageManagerKind) -> Option<&Plan> {
        self.steps.get(&kind).or(self.manual.as_ref())
    }

    /// Prerequisites for `kind`.
    #[must_use]
    pub fn prerequisites_for(&self, kind: PackageManagerKind) -> &[String] {
        self.prerequisites.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Managers with a native install path, plus `manual` when declared.
    #[must_use]
    pub fn supported(&self) -> Vec<&'static str> {
        let mut out: Vec<_> = self.steps.keys().map(|k| k.as_str()).collect();
        if self.manual.is_some() {
            out.push(PackageManagerKind::Manual.as_str());
        }
        out
    }

    /// Resolve the version to install.
    ///
    /// `[versions]` in the settings wins over both the built-in default and
    /// the releases feed.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::VersionResolution`] when the feed cannot be
    /// fetched or holds no stable release.
    pub fn resolve_version(
        &self,
        settings: &Settings,
        fetcher: &dyn Fetcher,
    ) -> Result<Option<String>, InstallError> {
        if let Some(pinned) = settings.version_for(self.name) {
            return Ok(Some(pinned.to_string()));
        }
        match &self.version {
            VersionSource::Fixed(default) => Ok(Some((*default).to_string())),
            VersionSource::Latest { feed_url } => {
                releases::latest_from_feed(fetcher, feed_url).map(Some)
            }
            VersionSource::Unversioned => Ok(None),
        }
    }
}

/// `{version}`-style placeholders for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vars {
    values: BTreeMap<&'static str, String>,
}

impl Vars {
    /// Variables derived from the OS profile, paths and home directory.
    #[must_use]
    pub fn new(profile: &OsProfile, paths: &Paths, home: &Path) -> Self {
        let uname_arch = std::env::consts::ARCH;
        let arch = match uname_arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            other => other,
        };
        let os = if profile.id == "macos" { "darwin" } else { "linux" };
        let values = BTreeMap::from([
            ("os", os.to_string()),
            ("arch", arch.to_string()),
            ("uname_arch", uname_arch.to_string()),
            ("id", profile.id.clone()),
            ("codename", profile.codename.clone()),
            ("opt", paths.opt_dir.display().to_string()),
            ("bin", paths.bin_dir.display().to_string()),
            ("home", home.display().to_string()),
        ]);
        Self { values }
    }

    /// Add the resolved version.
    #[must_use]
    pub fn with_version(mut self, version: Option<&str>) -> Self {
        if let Some(version) = version {
            self.values.insert("version", version.to_string());
        }
        self
    }

    /// Override one variable.
    #[must_use]
    pub fn set(mut self, key: &'static str, value: &str) -> Self {
        self.values.insert(key, value.to_string());
        self
    }

    /// Substitute every known `{name}`; unknown placeholders stay as-is.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        self.values
            .iter()
            .fold(template.to_string(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
    }
}
