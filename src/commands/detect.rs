//! `provision detect`: print the detected OS and package manager.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::adapters::YumDnfAdapter;
use crate::cli::GlobalOpts;
use crate::logging::Logger;
use crate::platform::OsProfile;
use crate::resources::package::PackageManagerKind;

/// Print the detected OS profile and the package manager it maps to.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let kind = PackageManagerKind::for_os_id(&setup.profile.id);
    let tool = (kind == PackageManagerKind::YumDnf)
        .then(|| YumDnfAdapter::probe_tool(setup.executor.as_ref()));
    for line in report(&setup.profile, kind, tool) {
        println!("{line}");
    }
    Ok(())
}

fn report(profile: &OsProfile, kind: PackageManagerKind, tool: Option<&str>) -> Vec<String> {
    let or_none = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    let manager = tool.map_or_else(|| kind.to_string(), |tool| format!("{kind} ({tool})"));
    vec![
        format!("id:              {}", profile.id),
        format!("version:         {}", or_none(&profile.version_id)),
        format!("codename:        {}", or_none(&profile.codename)),
        format!("package manager: {manager}"),
    ]
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn report_ubuntu() {
        let profile = OsProfile::new("ubuntu", "22.04", "jammy");
        insta::assert_snapshot!(report(&profile, PackageManagerKind::Apt, None).join("\n"), @r"
        id:              ubuntu
        version:         22.04
        codename:        jammy
        package manager: apt
        ");
    }

    #[test]
    fn report_names_yum_tool() {
        let profile = OsProfile::from_override("fedora");
        let lines = report(&profile, PackageManagerKind::YumDnf, Some("dnf"));
        assert_eq!(lines[1], "version:         -");
        assert_eq!(lines[3], "package manager: yum/dnf (dnf)");
    }

    #[test]
    fn report_unsupported() {
        let profile = OsProfile::from_override("gentoo");
        let lines = report(&profile, PackageManagerKind::Unsupported, None);
        assert_eq!(lines[3], "package manager: unsupported");
    }
}
