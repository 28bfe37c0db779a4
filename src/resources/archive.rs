//! Versioned archive resource: download, verify, extract, move into place.
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Result;
use sha2::{Digest as _, Sha256};

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::error::InstallError;
use crate::net::Fetcher;

/// Archive formats recognised from the URL suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz` / `.tgz`
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from a URL or file name.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.ends_with(".zip") {
            Some(Self::Zip)
        } else if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// An archive extracted into a versioned directory such as
/// `/opt/maven-3.9.6`.
///
/// The destination only ever appears fully populated: extraction happens in
/// a staging directory next to it and ends with a rename.
#[derive(Debug)]
pub struct ArchiveResource<'a> {
    /// Archive URL.
    pub url: String,
    /// Final directory.
    pub dest: PathBuf,
    /// Drop the single top-level directory most vendor archives carry.
    pub strip_root: bool,
    /// Expected SHA-256 of the archive (lower-case hex).
    pub sha256: Option<String>,
    fetcher: &'a dyn Fetcher,
}

impl<'a> ArchiveResource<'a> {
    /// Create a new archive resource.
    #[must_use]
    pub const fn new(
        url: String,
        dest: PathBuf,
        strip_root: bool,
        sha256: Option<String>,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            url,
            dest,
            strip_root,
            sha256,
            fetcher,
        }
    }

    /// Download and extract unless the destination already exists.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Download`] when the body is empty, cannot be
    /// fetched, or fails the checksum, and [`InstallError::Extract`] when the
    /// archive cannot be unpacked or moved into place.  The destination is
    /// never created on error.
    pub fn install(&self) -> Result<ResourceChange, InstallError> {
        if self.dest.exists() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let format = ArchiveFormat::from_url(&self.url)
            .ok_or_else(|| self.extract_error("unsupported archive format"))?;

        let bytes = self.fetcher.fetch(&self.url).map_err(|e| self.download_error(e))?;
        if bytes.is_empty() {
            return Err(self.download_error("empty response body"));
        }
        if let Some(expected) = &self.sha256 {
            let actual = sha256_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(self.download_error(format!(
                    "checksum mismatch: expected {expected}, got {actual}"
                )));
            }
        }

        let parent = self.dest.parent().unwrap_or_else(|| Path::new("/"));
        std::fs::create_dir_all(parent).map_err(|e| self.extract_error(e))?;
        let staging = tempfile::Builder::new()
            .prefix(".provision-stage-")
            .tempdir_in(parent)
            .map_err(|e| self.extract_error(e))?;

        unpack(format, &bytes, staging.path()).map_err(|e| self.extract_error(format!("{e:#}")))?;

        let root = if self.strip_root {
            single_root_dir(staging.path()).map_err(|e| self.extract_error(e))?
        } else {
            None
        };
        let src = root.as_deref().unwrap_or_else(|| staging.path());
        std::fs::rename(src, &self.dest).map_err(|e| {
            self.extract_error(format!("move into {}: {e}", self.dest.display()))
        })?;
        Ok(ResourceChange::Applied)
    }

    fn download_error(&self, reason: impl ToString) -> InstallError {
        InstallError::Download {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }

    fn extract_error(&self, reason: impl ToString) -> InstallError {
        InstallError::Extract {
            archive: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Applicable for ArchiveResource<'_> {
    fn description(&self) -> String {
        format!("{} -> {}", self.url, self.dest.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        Ok(self.install()?)
    }
}

impl Resource for ArchiveResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if self.dest.exists() {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}

/// Lower-case hex SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn unpack(format: ArchiveFormat, bytes: &[u8], into: &Path) -> Result<()> {
    match format {
        ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
            archive.extract(into)?;
        }
        ArchiveFormat::TarGz => {
            let decoder = flate2::read::GzDecoder::new(bytes);
            tar::Archive::new(decoder).unpack(into)?;
        }
    }
    Ok(())
}

/// The only entry of `dir` when it is a directory.
fn single_root_dir(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    if entries.len() != 1 {
        return Ok(None);
    }
    let only = entries.pop().map(|e| e.path());
    Ok(only.filter(|p| p.is_dir()))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use super::*;
    use crate::net::{FetchError, MockFetcher};
    use std::io::Write as _;

    /// Build a `.tar.gz` holding `files` (path, content).
    pub(crate) fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (path, content) in files {
            writer
                .start_file(*path, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn serving(bytes: Vec<u8>) -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(move |_| Ok(bytes.clone()));
        fetcher
    }

    #[test]
    fn format_from_url() {
        assert_eq!(
            ArchiveFormat::from_url("https://x/terraform_1.6.6_linux_amd64.zip"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(
            ArchiveFormat::from_url("https://x/apache-maven-3.9.6-bin.tar.gz?mirror=1"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(ArchiveFormat::from_url("https://x/tool.pkg"), None);
    }

    #[test]
    fn sha256_hex_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn tar_gz_with_root_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("maven-3.9.6");
        let fetcher = serving(tar_gz(&[
            ("apache-maven-3.9.6/bin/mvn", "#!/bin/sh\n"),
            ("apache-maven-3.9.6/conf/settings.xml", "<settings/>"),
        ]));
        let resource = ArchiveResource::new(
            "https://example.test/apache-maven-3.9.6-bin.tar.gz".to_string(),
            dest.clone(),
            true,
            None,
            &fetcher,
        );
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        assert_eq!(resource.install().unwrap(), ResourceChange::Applied);
        assert!(dest.join("bin/mvn").is_file());
        assert!(dest.join("conf/settings.xml").is_file());
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn zip_without_root_is_moved_whole() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("terraform-1.6.6");
        let fetcher = serving(zip_bytes(&[("terraform", "binary")]));
        let resource = ArchiveResource::new(
            "https://example.test/terraform_1.6.6_linux_amd64.zip".to_string(),
            dest.clone(),
            true,
            None,
            &fetcher,
        );
        resource.install().unwrap();
        assert_eq!(
            std::fs::read_to_string(dest.join("terraform")).unwrap(),
            "binary"
        );
    }

    #[test]
    fn existing_destination_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("gradle-8.5");
        std::fs::create_dir(&dest).unwrap();
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().never();
        let resource = ArchiveResource::new(
            "https://example.test/gradle-8.5-bin.zip".to_string(),
            dest,
            true,
            None,
            &fetcher,
        );
        assert_eq!(resource.install().unwrap(), ResourceChange::AlreadyCorrect);
    }

    #[test]
    fn fetch_failure_is_download_error_and_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("maven-3.9.6");
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|url| {
            Err(FetchError::Request {
                url: url.to_string(),
                reason: "status code 404".to_string(),
            })
        });
        let resource = ArchiveResource::new(
            "https://example.test/apache-maven-3.9.6-bin.tar.gz".to_string(),
            dest.clone(),
            true,
            None,
            &fetcher,
        );
        let err = resource.install().unwrap_err();
        assert!(matches!(err, InstallError::Download { .. }));
        assert!(err.to_string().contains("apache-maven-3.9.6-bin.tar.gz"));
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_body_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = serving(Vec::new());
        let resource = ArchiveResource::new(
            "https://example.test/a.zip".to_string(),
            dir.path().join("a"),
            false,
            None,
            &fetcher,
        );
        let err = resource.install().unwrap_err();
        assert!(err.to_string().contains("empty response body"));
    }

    #[test]
    fn checksum_mismatch_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = serving(zip_bytes(&[("f", "x")]));
        let resource = ArchiveResource::new(
            "https://example.test/a.zip".to_string(),
            dir.path().join("a"),
            false,
            Some("00".repeat(32)),
            &fetcher,
        );
        let err = resource.install().unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
        assert!(!dir.path().join("a").exists());
    }

    #[test]
    fn matching_checksum_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("f", "x")]);
        let digest = sha256_hex(&bytes);
        let fetcher = serving(bytes);
        let resource = ArchiveResource::new(
            "https://example.test/a.zip".to_string(),
            dir.path().join("a"),
            false,
            Some(digest.to_uppercase()),
            &fetcher,
        );
        assert_eq!(resource.install().unwrap(), ResourceChange::Applied);
    }

    #[test]
    fn corrupt_archive_is_extract_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = serving(b"not a gzip stream".to_vec());
        let resource = ArchiveResource::new(
            "https://example.test/a.tar.gz".to_string(),
            dir.path().join("a"),
            true,
            None,
            &fetcher,
        );
        let err = resource.install().unwrap_err();
        assert!(matches!(err, InstallError::Extract { .. }));
        assert!(!dir.path().join("a").exists());
    }
}
