//! Shell-profile fragments such as `/etc/profile.d/maven.sh`.
//!
//! A fragment is owned entirely by this tool: every write replaces the whole
//! file, so re-running never stacks duplicate `PATH` entries.
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::helpers::fs::write_atomic;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::error::InstallError;

const HEADER: &str = "# Managed by provision. Manual edits are overwritten.\n";
const MODE: u32 = 0o755;

/// Environment variables exported from one profile fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFragment {
    /// Fragment path.
    pub path: PathBuf,
    /// Ordered `(name, value)` pairs; later values may reference earlier names.
    pub exports: Vec<(String, String)>,
}

impl EnvFragment {
    /// Create an empty fragment at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            exports: Vec::new(),
        }
    }

    /// Add an export, replacing an earlier value for the same name.
    #[must_use]
    pub fn export(mut self, key: &str, value: &str) -> Self {
        if let Some(existing) = self.exports.iter_mut().find(|(k, _)| k == key) {
            existing.1 = value.to_string();
        } else {
            self.exports.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Render the fragment as POSIX shell.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        for (key, value) in &self.exports {
            out.push_str(&format!("export {key}=\"{}\"\n", value.replace('"', "\\\"")));
        }
        out
    }

    /// Write the fragment, skipping the write when the content is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::EnvWrite`] if the file cannot be written or
    /// its mode cannot be set.
    pub fn write(&self) -> Result<ResourceChange, InstallError> {
        let env_error = |e: anyhow::Error| InstallError::EnvWrite {
            path: self.path.display().to_string(),
            reason: format!("{e:#}"),
        };
        if !self.needs_change().map_err(env_error)? {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        write_atomic(&self.path, self.render().as_bytes(), Some(MODE)).map_err(env_error)?;
        Ok(ResourceChange::Applied)
    }

    /// Directories this fragment prepends to `PATH`, fully expanded.
    ///
    /// `$VAR` and `${VAR}` references resolve against earlier exports of the
    /// fragment, then `HOME`; entries that still reference other variables
    /// (such as the inherited `$PATH`) are dropped.
    #[must_use]
    pub fn path_prepends(&self, home: &Path) -> Vec<PathBuf> {
        self.expanded(home).1
    }

    /// Absolute directories named by the fragment that do not exist.
    ///
    /// Covers single-valued exports such as `JAVA_HOME` and every `PATH`
    /// prepend.
    #[must_use]
    pub fn missing_dirs(&self, home: &Path) -> Vec<PathBuf> {
        let (vars, dirs) = self.expanded(home);
        vars.into_iter()
            .skip(1)
            .map(|(_, value)| PathBuf::from(value))
            .filter(|p| p.is_absolute())
            .chain(dirs)
            .filter(|p| !p.is_dir())
            .collect()
    }

    /// Expanded single-valued exports (starting with `HOME`) and `PATH` prepends.
    fn expanded(&self, home: &Path) -> (Vec<(String, String)>, Vec<PathBuf>) {
        let mut vars: Vec<(String, String)> =
            vec![("HOME".to_string(), home.display().to_string())];
        let mut dirs = Vec::new();
        for (key, value) in &self.exports {
            let expanded = value
                .split(':')
                .map(|part| expand(part, &vars))
                .collect::<Vec<_>>();
            if key == "PATH" {
                dirs.extend(expanded.iter().flatten().map(PathBuf::from));
            } else if let [Some(single)] = expanded.as_slice() {
                vars.push((key.clone(), single.clone()));
            }
        }
        (vars, dirs)
    }
}

/// Expand `$VAR`/`${VAR}` in `input`; `None` when a name is unknown.
fn expand(input: &str, vars: &[(String, String)]) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(rest.get(..pos)?);
        let after = rest.get(pos + 1..)?;
        let (name, tail) = if let Some(braced) = after.strip_prefix('{') {
            let end = braced.find('}')?;
            (braced.get(..end)?, braced.get(end + 1..)?)
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (after.get(..end)?, after.get(end..)?)
        };
        let value = vars.iter().rev().find(|(k, _)| k == name)?;
        out.push_str(&value.1);
        rest = tail;
    }
    out.push_str(rest);
    Some(out)
}

impl Applicable for EnvFragment {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        Ok(self.write()?)
    }
}

impl Resource for EnvFragment {
    fn current_state(&self) -> Result<ResourceState> {
        match std::fs::read_to_string(&self.path) {
            Ok(existing) if existing == self.render() => Ok(ResourceState::Correct),
            Ok(_) => Ok(ResourceState::Incorrect {
                current: "content differs".to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ResourceState::Missing),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn maven(dir: &Path) -> EnvFragment {
        EnvFragment::new(dir.join("maven.sh"))
            .export("M2_HOME", "/opt/maven")
            .export("MAVEN_HOME", "/opt/maven")
            .export("PATH", "${M2_HOME}/bin:${PATH}")
    }

    #[test]
    fn render_quotes_values() {
        let dir = tempfile::tempdir().unwrap();
        insta::assert_snapshot!(maven(dir.path()).render(), @r#"
        # Managed by provision. Manual edits are overwritten.
        export M2_HOME="/opt/maven"
        export MAVEN_HOME="/opt/maven"
        export PATH="${M2_HOME}/bin:${PATH}"
        "#);
    }

    #[test]
    fn export_replaces_same_key() {
        let fragment = EnvFragment::new(PathBuf::from("/x.sh"))
            .export("JAVA_HOME", "/a")
            .export("JAVA_HOME", "/b");
        assert_eq!(fragment.exports, vec![("JAVA_HOME".to_string(), "/b".to_string())]);
    }

    #[test]
    fn second_write_replaces_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.sh");
        EnvFragment::new(path.clone())
            .export("A", "first")
            .write()
            .unwrap();
        EnvFragment::new(path.clone())
            .export("B", "second")
            .write()
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("first"));
        assert!(content.contains("export B=\"second\""));
    }

    #[test]
    fn rewrite_is_noop_and_keeps_single_path_export() {
        let dir = tempfile::tempdir().unwrap();
        let fragment = maven(dir.path());
        assert_eq!(fragment.write().unwrap(), ResourceChange::Applied);
        assert_eq!(fragment.write().unwrap(), ResourceChange::AlreadyCorrect);
        let content = std::fs::read_to_string(&fragment.path).unwrap();
        assert_eq!(content.matches("export PATH=").count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn fragment_is_executable() {
        use std::os::unix::fs::PermissionsExt as _;
        let dir = tempfile::tempdir().unwrap();
        let fragment = maven(dir.path());
        fragment.write().unwrap();
        let mode = std::fs::metadata(&fragment.path)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn unwritable_location_is_env_write_error() {
        let fragment = EnvFragment::new(PathBuf::from("/proc/provision-test/x.sh")).export("A", "1");
        assert!(matches!(
            fragment.write().unwrap_err(),
            InstallError::EnvWrite { .. }
        ));
    }

    #[test]
    fn path_prepends_expand_earlier_exports() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = maven(dir.path()).path_prepends(Path::new("/home/dev"));
        assert_eq!(dirs, vec![PathBuf::from("/opt/maven/bin")]);
    }

    #[test]
    fn missing_dirs_lists_absent_homes_and_bins() {
        let dir = tempfile::tempdir().unwrap();
        let jdk = dir.path().join("jvm/java-17");
        std::fs::create_dir_all(&jdk).unwrap();
        let fragment = EnvFragment::new(dir.path().join("java.sh"))
            .export("JAVA_HOME", &jdk.display().to_string())
            .export("M2_HOME", &dir.path().join("maven").display().to_string())
            .export("EDITOR", "vim")
            .export("PATH", "${M2_HOME}/bin:${JAVA_HOME}/bin:${PATH}");
        assert_eq!(
            fragment.missing_dirs(Path::new("/home/dev")),
            vec![
                dir.path().join("maven"),
                dir.path().join("maven/bin"),
                jdk.join("bin"),
            ]
        );

        std::fs::create_dir_all(jdk.join("bin")).unwrap();
        std::fs::create_dir_all(dir.path().join("maven/bin")).unwrap();
        assert!(fragment.missing_dirs(Path::new("/home/dev")).is_empty());
    }

    #[test]
    fn path_prepends_expand_home() {
        let fragment = EnvFragment::new(PathBuf::from("/rust.sh")).export("PATH", "$HOME/.cargo/bin:$PATH");
        assert_eq!(
            fragment.path_prepends(Path::new("/home/dev")),
            vec![PathBuf::from("/home/dev/.cargo/bin")]
        );
    }

    #[test]
    fn expand_unknown_variable_is_none() {
        assert_eq!(expand("${NOPE}/bin", &[]), None);
        assert_eq!(expand("/plain", &[]), Some("/plain".to_string()));
    }
}
