//! Red Hat family adapter (`dnf`, falling back to `yum`).
use std::sync::OnceLock;

use super::{AdapterContext, PackageAdapter, RepositorySpec, RpmRepo};
use crate::error::InstallError;
use crate::exec::Executor;
use crate::resources::ResourceChange;
use crate::resources::package::PackageManagerKind;

/// Adapter for `dnf` / `yum`.
///
/// The tool is probed once on first use and cached for the rest of the run.
#[derive(Debug)]
pub struct YumDnfAdapter {
    ctx: AdapterContext,
    tool: OnceLock<&'static str>,
}

impl YumDnfAdapter {
    /// Create an adapter over the shared context.
    #[must_use]
    pub const fn new(ctx: AdapterContext) -> Self {
        Self {
            ctx,
            tool: OnceLock::new(),
        }
    }

    /// `dnf` when present, `yum` otherwise.
    #[must_use]
    pub fn probe_tool(executor: &dyn Executor) -> &'static str {
        if executor.which("dnf") { "dnf" } else { "yum" }
    }

    /// The probed tool, cached after the first call.
    pub fn tool(&self) -> &'static str {
        self.tool.get_or_init(|| {
            let tool = Self::probe_tool(self.ctx.executor.as_ref());
            tracing::debug!("using {tool} for rpm packages");
            tool
        })
    }

    fn import_key(&self, spec: &RepositorySpec, url: &str) -> Result<(), InstallError> {
        self.ctx
            .run("rpm", &["--import", url])
            .map_err(|(command, code)| spec.error(format!("`{command}` exited with {code}")))
    }
}

/// Render a `.repo` file for a base URL repository.
fn render_repo(name: &str, baseurl: &str, gpgkey: &str) -> String {
    format!(
        "[{name}]\nname={name}\nbaseurl={baseurl}\nenabled=1\ngpgcheck=1\ngpgkey={gpgkey}\n"
    )
}

impl PackageAdapter for YumDnfAdapter {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::YumDnf
    }

    fn executor(&self) -> &dyn Executor {
        self.ctx.executor.as_ref()
    }

    fn refresh(&self) -> Result<(), InstallError> {
        self.ctx.refresh(self.tool(), &["makecache"])
    }

    fn install(&self, names: &[String]) -> Result<(), InstallError> {
        let mut args = vec!["install", "-y"];
        args.extend(names.iter().map(String::as_str));
        self.ctx.install(self.tool(), &args, names)
    }

    fn add_repository(&self, spec: &RepositorySpec) -> Result<ResourceChange, InstallError> {
        let Some(repo) = &spec.rpm else {
            return Err(spec.error("no RPM repository defined"));
        };
        let path = self
            .ctx
            .settings
            .paths
            .yum_repos_dir
            .join(format!("{}.repo", spec.name));

        let content = match repo {
            RpmRepo::RepoFile { .. } if path.exists() => return Ok(ResourceChange::AlreadyCorrect),
            RpmRepo::RepoFile { url } => self
                .ctx
                .fetcher
                .fetch(url)
                .map_err(|e| spec.error(e))?,
            RpmRepo::BaseUrl { baseurl, gpgkey } => {
                let rendered = render_repo(&spec.name, baseurl, gpgkey);
                if std::fs::read_to_string(&path).is_ok_and(|c| c == rendered) {
                    return Ok(ResourceChange::AlreadyCorrect);
                }
                rendered.into_bytes()
            }
        };

        if let Some(url) = spec.key_url.as_deref() {
            self.import_key(spec, url)?;
        }
        self.ctx.place_file(&path, &content, spec)?;
        tracing::debug!("wrote {}", path.display());
        Ok(ResourceChange::Applied)
    }
}
