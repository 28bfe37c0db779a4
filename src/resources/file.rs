//! Whole-file content resource (repository definitions, recipe-declared files).
use anyhow::Result;
use std::path::PathBuf;

use super::helpers::fs::write_atomic;
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A file whose entire content is owned by this tool.
#[derive(Debug, Clone)]
pub struct FileResource {
    /// Destination path.
    pub path: PathBuf,
    /// Desired content.
    pub content: String,
    /// Unix permission bits applied on write.
    pub mode: Option<u32>,
}

impl FileResource {
    /// Create a new file resource.
    #[must_use]
    pub const fn new(path: PathBuf, content: String, mode: Option<u32>) -> Self {
        Self {
            path,
            content,
            mode,
        }
    }
}

impl Applicable for FileResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        write_atomic(&self.path, self.content.as_bytes(), self.mode)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for FileResource {
    fn current_state(&self) -> Result<ResourceState> {
        if self.path.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is a directory", self.path.display()),
            });
        }
        match std::fs::read_to_string(&self.path) {
            Ok(existing) if existing == self.content => Ok(ResourceState::Correct),
            Ok(existing) => Ok(ResourceState::Incorrect {
                current: format!("{} bytes differ", existing.len()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ResourceState::Missing),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_then_correct_after_apply() {
        let dir = tempfile::tempdir().unwrap();
        let resource = FileResource::new(
            dir.path().join("sources.list.d").join("hashicorp.list"),
            "deb [signed-by=/k.gpg] https://apt.releases.hashicorp.com jammy main\n".to_string(),
            None,
        );
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        resource.apply().unwrap();
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
        assert!(!resource.needs_change().unwrap());
    }

    #[test]
    fn incorrect_when_content_differs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.repo");
        std::fs::write(&path, "old").unwrap();
        let resource = FileResource::new(path, "new".to_string(), None);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
    }

    #[test]
    fn directory_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let resource = FileResource::new(dir.path().to_path_buf(), String::new(), None);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }
}
