//! "Latest version" resolution from a JSON releases feed.
//!
//! The feed is an array of objects with at least a `version` field and an
//! optional `is_prerelease` flag (the HashiCorp releases API shape).
use serde::Deserialize;

use crate::error::InstallError;
use crate::net::Fetcher;

/// One entry of a releases feed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    /// Version string, e.g. `1.6.6`.
    pub version: String,
    /// Explicit prerelease flag.
    #[serde(default)]
    pub is_prerelease: bool,
}

/// Newest stable release: entries flagged as prereleases, or whose version
/// carries a semver pre-release suffix, or that do not parse, are ignored.
#[must_use]
pub fn select_latest(releases: &[Release]) -> Option<semver::Version> {
    releases
        .iter()
        .filter(|r| !r.is_prerelease)
        .filter_map(|r| semver::Version::parse(r.version.trim_start_matches('v')).ok())
        .filter(|v| v.pre.is_empty())
        .max()
}

/// Fetch `feed_url` and return the newest stable version.
///
/// # Errors
///
/// Returns [`InstallError::VersionResolution`] when the feed cannot be
/// fetched, is not valid JSON, or contains no stable release.
pub fn latest_from_feed(fetcher: &dyn Fetcher, feed_url: &str) -> Result<String, InstallError> {
    let error = |reason: String| InstallError::VersionResolution {
        feed: feed_url.to_string(),
        reason,
    };
    let body = fetcher.fetch(feed_url).map_err(|e| error(e.to_string()))?;
    let releases: Vec<Release> =
        serde_json::from_slice(&body).map_err(|e| error(format!("invalid feed: {e}")))?;
    let latest =
        select_latest(&releases).ok_or_else(|| error("no stable release found".to_string()))?;
    tracing::debug!("latest release from {feed_url}: {latest}");
    Ok(latest.to_string())
}
