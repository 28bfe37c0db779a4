//! Debian family adapter (`apt-get` / `dpkg-query`).
use std::path::{Path, PathBuf};

use super::{AdapterContext, PackageAdapter, RepositorySpec};
use crate::error::InstallError;
use crate::exec::Executor;
use crate::resources::ResourceChange;
use crate::resources::package::PackageManagerKind;

/// Placeholder in an APT source line replaced with the keyring path.
const KEYRING_PLACEHOLDER: &str = "{keyring}";

/// Adapter for `apt-get`.
#[derive(Debug)]
pub struct AptAdapter {
    ctx: AdapterContext,
}

impl AptAdapter {
    /// Create an adapter over the shared context.
    #[must_use]
    pub const fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn keyrings_dir(&self) -> &Path {
        &self.ctx.settings.paths.apt_keyrings_dir
    }

    /// Keyring already placed for `name`, armored or binary.
    fn existing_keyring(&self, name: &str) -> Option<PathBuf> {
        ["asc", "gpg"]
            .iter()
            .map(|ext| self.keyrings_dir().join(format!("{name}.{ext}")))
            .find(|p| p.exists())
    }

    fn install_keyring(&self, spec: &RepositorySpec, url: &str) -> Result<PathBuf, InstallError> {
        let key = self
            .ctx
            .fetcher
            .fetch(url)
            .map_err(|e| spec.error(format!("signing key: {e}")))?;
        let ext = if key.starts_with(b"-----BEGIN PGP") {
            "asc"
        } else {
            "gpg"
        };
        let path = self.keyrings_dir().join(format!("{}.{ext}", spec.name));
        self.ctx.place_file(&path, &key, spec)?;
        tracing::debug!("installed keyring {}", path.display());
        Ok(path)
    }
}

/// Render a source line, substituting the keyring path.
fn render_source(line: &str, keyring: Option<&Path>) -> Option<String> {
    let rendered = match keyring {
        Some(path) => line.replace(KEYRING_PLACEHOLDER, &path.display().to_string()),
        None if line.contains(KEYRING_PLACEHOLDER) => return None,
        None => line.to_string(),
    };
    Some(format!("{}\n", rendered.trim()))
}

impl PackageAdapter for AptAdapter {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Apt
    }

    fn executor(&self) -> &dyn Executor {
        self.ctx.executor.as_ref()
    }

    fn refresh(&self) -> Result<(), InstallError> {
        self.ctx.refresh("apt-get", &["update"])
    }

    fn install(&self, names: &[String]) -> Result<(), InstallError> {
        let mut args = vec!["DEBIAN_FRONTEND=noninteractive", "apt-get", "install", "-y"];
        args.extend(names.iter().map(String::as_str));
        self.ctx.install("env", &args, names)
    }

    fn add_repository(&self, spec: &RepositorySpec) -> Result<ResourceChange, InstallError> {
        let Some(line) = spec.apt.as_deref() else {
            return Err(spec.error("no APT source defined"));
        };
        let list = self
            .ctx
            .settings
            .paths
            .apt_sources_dir
            .join(format!("{}.list", spec.name));

        let existing_key = self.existing_keyring(&spec.name);
        let mut changed = false;
        let keyring = match (spec.key_url.as_deref(), existing_key) {
            (_, Some(path)) => Some(path),
            (Some(url), None) => {
                changed = true;
                Some(self.install_keyring(spec, url)?)
            }
            (None, None) => None,
        };

        let content = render_source(line, keyring.as_deref())
            .ok_or_else(|| spec.error("source line needs a signing key but none is defined"))?;
        let current = std::fs::read_to_string(&list).ok();
        if current.as_deref() == Some(content.as_str()) {
            return Ok(if changed {
                ResourceChange::Applied
            } else {
                ResourceChange::AlreadyCorrect
            });
        }

        self.ctx.place_file(&list, content.as_bytes(), spec)?;
        tracing::debug!("wrote {}", list.display());
        Ok(ResourceChange::Applied)
    }
}
