//! Resolution of an installed Chrome version to a chromedriver release.
//!
//! The Chrome for Testing availability index maps milestones (major versions)
//! to the latest release and its per-platform download URLs. The index is
//! fetched fresh on every resolution and never persisted.

use crate::http::HttpClient;
use crate::platform::Platform;
use crate::version::major_version;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;

const RELEASE_INDEX_HOST_PATH: &str =
    "googlechromelabs.github.io/chrome-for-testing/latest-versions-per-milestone-with-downloads.json";

/// URL of the release index, over https or plain http.
pub fn release_index_url(no_ssl: bool) -> String {
    let scheme = if no_ssl { "http" } else { "https" };
    format!("{}://{}", scheme, RELEASE_INDEX_HOST_PATH)
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReleaseIndex {
    pub milestones: HashMap<String, Milestone>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Milestone {
    pub milestone: String,
    pub version: String,
    #[serde(default)]
    pub downloads: Downloads,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Downloads {
    #[serde(default)]
    pub chromedriver: Vec<DownloadOption>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DownloadOption {
    pub platform: String,
    pub url: String,
}

/// A chromedriver release matched to the installed Chrome and current platform.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelease {
    /// Major version, the cache key.
    pub milestone: String,
    /// Full release version, e.g. "120.0.6099.109".
    pub version: String,
    /// Download URL of the platform's zip archive.
    pub url: String,
}

/// Resolves the chromedriver release matching `installed_version`.
///
/// Returns `Ok(None)` when the index has no entry for the installed milestone
/// or no artifact for the current platform; these are soft "nothing to do"
/// outcomes. Fetch and parse failures are hard errors.
#[tracing::instrument(skip(http))]
pub async fn resolve(
    http: &HttpClient,
    index_url: &str,
    installed_version: &str,
    platform: &Platform,
) -> Result<Option<ResolvedRelease>> {
    let major = major_version(installed_version);

    let index: ReleaseIndex = http
        .get_json(index_url)
        .await
        .context("Failed to fetch the chromedriver release index")?;

    let Some(milestone) = index.milestones.get(major) else {
        debug!("No chromedriver release found for milestone {}.", major);
        return Ok(None);
    };

    let tag = platform.tag();
    let Some(option) = milestone
        .downloads
        .chromedriver
        .iter()
        .find(|o| o.platform.contains(&tag))
    else {
        warn!(
            "Milestone {} has no chromedriver artifact for platform {}.",
            major, tag
        );
        return Ok(None);
    };

    debug!(
        "Resolved Chrome {} to chromedriver {} at {}",
        installed_version, milestone.version, option.url
    );

    Ok(Some(ResolvedRelease {
        milestone: milestone.milestone.clone(),
        version: milestone.version.clone(),
        url: option.url.clone(),
    }))
}
