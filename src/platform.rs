//! OS profile detection.
//!
//! [`Resolver::resolve`] never fails: it walks a fixed priority list
//! (`/etc/os-release`, `lsb_release`, `uname -s`) and falls back to an
//! `unknown` profile when nothing answers.
use std::fmt;
use std::path::PathBuf;

use crate::exec::Executor;

/// Default location of the OS descriptor file.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Identifier used when detection yields nothing.
pub const UNKNOWN_ID: &str = "unknown";

/// Normalized identity of the running operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsProfile {
    /// Lower-case distribution id (`ubuntu`, `fedora`, `macos`, …).
    pub id: String,
    /// Version string as reported by the OS (may be empty).
    pub version_id: String,
    /// Release codename (may be empty).
    pub codename: String,
}

impl OsProfile {
    /// Build a profile, normalizing the id.
    #[must_use]
    pub fn new(id: &str, version_id: &str, codename: &str) -> Self {
        Self {
            id: normalize_id(id),
            version_id: unquote(version_id).to_string(),
            codename: unquote(codename).to_lowercase(),
        }
    }

    /// Profile used when detection fails entirely.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ID, "", "")
    }

    /// Profile forced from the command line; version and codename are empty.
    #[must_use]
    pub fn from_override(id: &str) -> Self {
        Self::new(id, "", "")
    }
}

impl fmt::Display for OsProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if !self.version_id.is_empty() {
            write!(f, " {}", self.version_id)?;
        }
        if !self.codename.is_empty() {
            write!(f, " ({})", self.codename)?;
        }
        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'')
}

/// Map the various spellings reported by os-release, `lsb_release` and
/// `uname` onto one id per distribution.
fn normalize_id(raw: &str) -> String {
    let id = unquote(raw).to_lowercase();
    match id.as_str() {
        "" => UNKNOWN_ID.to_string(),
        "darwin" | "macosx" | "mac os x" => "macos".to_string(),
        "redhat" | "redhatenterpriseserver" | "redhatenterprise" => "rhel".to_string(),
        "archlinux" | "arch linux" => "arch".to_string(),
        "centosstream" | "centos stream" => "centos".to_string(),
        _ => id,
    }
}

/// Parse the contents of an os-release file.
///
/// Returns `None` when the file carries no `ID=` line.
#[must_use]
pub fn parse_os_release(content: &str) -> Option<OsProfile> {
    let mut id = None;
    let mut version = "";
    let mut codename = "";
    let mut ubuntu_codename = "";

    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "ID" => id = Some(value),
            "VERSION_ID" => version = value,
            "VERSION_CODENAME" => codename = value,
            "UBUNTU_CODENAME" => ubuntu_codename = value,
            _ => {}
        }
    }

    let codename = if unquote(codename).is_empty() {
        ubuntu_codename
    } else {
        codename
    };
    id.filter(|v| !unquote(v).is_empty())
        .map(|id| OsProfile::new(id, version, codename))
}

/// Detects the [`OsProfile`] of the running host.
#[derive(Debug)]
pub struct Resolver<'a> {
    os_release: PathBuf,
    executor: &'a dyn Executor,
}

impl<'a> Resolver<'a> {
    /// Create a resolver that reads the standard os-release location.
    #[must_use]
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self {
            os_release: PathBuf::from(OS_RELEASE_PATH),
            executor,
        }
    }

    /// Read the OS descriptor from a different path (for testing).
    #[must_use]
    pub fn with_os_release(mut self, path: impl Into<PathBuf>) -> Self {
        self.os_release = path.into();
        self
    }

    /// Detect the running OS, first match wins.
    #[must_use]
    pub fn resolve(&self) -> OsProfile {
        if let Some(profile) = self.from_os_release() {
            return profile;
        }
        if let Some(profile) = self.from_lsb_release() {
            return profile;
        }
        self.from_uname()
    }

    fn from_os_release(&self) -> Option<OsProfile> {
        let content = std::fs::read_to_string(&self.os_release).ok()?;
        parse_os_release(&content)
    }

    fn from_lsb_release(&self) -> Option<OsProfile> {
        if !self.executor.which("lsb_release") {
            return None;
        }
        let id = self.query("lsb_release", &["-si"])?;
        let version = self.query("lsb_release", &["-sr"]).unwrap_or_default();
        let codename = self.query("lsb_release", &["-sc"]).unwrap_or_default();
        Some(OsProfile::new(&id, &version, &codename))
    }

    fn from_uname(&self) -> OsProfile {
        let Some(kernel) = self.query("uname", &["-s"]) else {
            return OsProfile::unknown();
        };
        let mut profile = OsProfile::new(&kernel, "", "");
        if profile.id == "macos"
            && let Some(version) = self.query("sw_vers", &["-productVersion"])
        {
            profile.version_id = version;
        }
        profile
    }

    /// Run a detection command and return its trimmed stdout, if any.
    fn query(&self, program: &str, args: &[&str]) -> Option<String> {
        let result = self.executor.run_unchecked(program, args).ok()?;
        let out = result.stdout.trim();
        (result.success && !out.is_empty()).then(|| out.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;

    const UBUNTU: &str = r#"PRETTY_NAME="Ubuntu 22.04.3 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
VERSION="22.04.3 LTS (Jammy Jellyfish)"
VERSION_CODENAME=jammy
ID=ubuntu
ID_LIKE=debian
UBUNTU_CODENAME=jammy
"#;

    fn missing_os_release() -> PathBuf {
        PathBuf::from("/nonexistent/os-release-for-tests")
    }

    #[test]
    fn parse_ubuntu_os_release() {
        let profile = parse_os_release(UBUNTU).unwrap();
        assert_eq!(profile, OsProfile::new("ubuntu", "22.04", "jammy"));
    }

    #[test]
    fn parse_falls_back_to_ubuntu_codename() {
        let profile =
            parse_os_release("ID=linuxmint\nVERSION_ID=\"21.2\"\nUBUNTU_CODENAME=jammy\n")
                .unwrap();
        assert_eq!(profile.id, "linuxmint");
        assert_eq!(profile.codename, "jammy");
    }

    #[test]
    fn parse_quoted_rhel_id() {
        let profile = parse_os_release("NAME=\"RHEL\"\nID=\"rhel\"\nVERSION_ID=\"9.3\"\n").unwrap();
        assert_eq!(profile.id, "rhel");
        assert_eq!(profile.version_id, "9.3");
        assert_eq!(profile.codename, "");
    }

    #[test]
    fn parse_without_id_is_none() {
        assert!(parse_os_release("NAME=Something\n").is_none());
        assert!(parse_os_release("ID=\"\"\n").is_none());
    }

    #[test]
    fn resolve_prefers_os_release_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("os-release");
        std::fs::write(&path, "ID=arch\nBUILD_ID=rolling\n").unwrap();

        let executor = MockExecutor::fail();
        let profile = Resolver::new(&executor).with_os_release(&path).resolve();
        assert_eq!(profile.id, "arch");
        assert_eq!(executor.call_count(), 0, "no command should run");
    }

    #[test]
    fn resolve_uses_lsb_release_when_file_missing() {
        let executor = MockExecutor::with_responses(vec![
            (true, "Debian\n".to_string()),
            (true, "12\n".to_string()),
            (true, "bookworm\n".to_string()),
        ])
        .with_which(true);
        let profile = Resolver::new(&executor)
            .with_os_release(missing_os_release())
            .resolve();
        assert_eq!(profile, OsProfile::new("debian", "12", "bookworm"));
        assert_eq!(executor.calls()[0].0, "lsb_release");
    }

    #[test]
    fn resolve_normalizes_lsb_redhat_id() {
        let executor = MockExecutor::with_responses(vec![
            (true, "RedHatEnterpriseServer\n".to_string()),
            (true, "8.9\n".to_string()),
            (true, "Ootpa\n".to_string()),
        ])
        .with_which(true);
        let profile = Resolver::new(&executor)
            .with_os_release(missing_os_release())
            .resolve();
        assert_eq!(profile.id, "rhel");
        assert_eq!(profile.codename, "ootpa");
    }

    #[test]
    fn resolve_falls_back_to_uname_on_macos() {
        let executor = MockExecutor::with_responses(vec![
            (true, "Darwin\n".to_string()),
            (true, "14.2.1\n".to_string()),
        ]);
        let profile = Resolver::new(&executor)
            .with_os_release(missing_os_release())
            .resolve();
        assert_eq!(profile.id, "macos");
        assert_eq!(profile.version_id, "14.2.1");
        assert_eq!(executor.calls()[0].0, "uname");
        assert_eq!(executor.calls()[1].0, "sw_vers");
    }

    #[test]
    fn resolve_uname_linux_has_empty_metadata() {
        let executor = MockExecutor::ok("Linux\n");
        let profile = Resolver::new(&executor)
            .with_os_release(missing_os_release())
            .resolve();
        assert_eq!(profile, OsProfile::new("linux", "", ""));
    }

    #[test]
    fn resolve_is_infallible() {
        let executor = MockExecutor::fail();
        let profile = Resolver::new(&executor)
            .with_os_release(missing_os_release())
            .resolve();
        assert_eq!(profile, OsProfile::unknown());
    }

    #[test]
    fn override_is_normalized() {
        assert_eq!(OsProfile::from_override("Darwin").id, "macos");
        assert_eq!(OsProfile::from_override("  Fedora ").id, "fedora");
        assert_eq!(OsProfile::from_override("").id, UNKNOWN_ID);
    }

    #[test]
    fn display_includes_optional_fields() {
        assert_eq!(
            OsProfile::new("ubuntu", "22.04", "jammy").to_string(),
            "ubuntu 22.04 (jammy)"
        );
        assert_eq!(OsProfile::new("arch", "", "").to_string(), "arch");
    }
}
