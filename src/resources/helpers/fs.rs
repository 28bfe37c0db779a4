//! File-system resource helpers.
use anyhow::{Context as _, Result};
use std::io::Write as _;
use std::path::Path;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Replace the contents of `path` in one step.
///
/// The content goes to a temp file in the same directory which is then
/// renamed over `path`, so readers never observe a partial write.  When
/// `mode` is given it is applied before the rename (Unix only).
///
/// # Errors
///
/// Returns an error if the parent cannot be created, the temp file cannot be
/// written, or the rename fails.
pub fn write_atomic(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    ensure_parent_dir(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(content)
        .with_context(|| format!("write temp file for {}", path.display()))?;
    tmp.flush()?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("chmod {mode:o} {}", tmp.path().display()))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(path)
        .with_context(|| format!("rename into place: {}", path.display()))?;
    Ok(())
}
