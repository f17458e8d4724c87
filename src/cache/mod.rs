//! The on-disk chromedriver cache.
//!
//! Each cached binary lives at `<base>/<major_version>/<chromedriver[.exe]>`.
//! A cached binary is valid when it exists and reports exactly the expected
//! release version; anything else (missing, truncated, stale major) fails the
//! check and triggers a fresh download. Old major-version directories are
//! never evicted.
//!
//! Known limitation: there is no file locking, so concurrent callers targeting
//! the same cache directory may interleave downloads. Within a single process
//! the temp-file write plus atomic rename keeps a crash from leaving a
//! truncated binary in place.

use crate::archive::{archive_stem, extract_binary};
use crate::http::HttpClient;
use crate::platform::OsFamily;
use crate::resolver::ResolvedRelease;
use crate::runtime::Runtime;
use crate::version::extract_numeric;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Ensures the release's binary is present and valid in the cache, downloading
/// it if necessary, and returns its path.
///
/// The fast path (cache hit) performs no network access.
#[tracing::instrument(skip(runtime, http))]
pub async fn ensure_cached<R: Runtime>(
    runtime: &R,
    http: &HttpClient,
    release: &ResolvedRelease,
    base_dir: &Path,
    family: OsFamily,
) -> Result<PathBuf> {
    let driver_dir = base_dir.join(&release.milestone);
    let driver_path = driver_dir.join(family.driver_filename());

    if is_cached_version(runtime, &driver_path, &release.version) {
        info!("chromedriver {} is already installed.", release.version);
    } else {
        info!("Downloading chromedriver ({})...", release.version);
        runtime.create_dir_all(&driver_dir)?;

        let archive = http.get_bytes(&release.url).await?;
        let binary = extract_binary(&archive, family.driver_filename(), archive_stem(&release.url))
            .with_context(|| format!("Malformed chromedriver archive from {}", release.url))?;

        // Materialize under a temporary name and rename into place so a crash
        // mid-write cannot leave a truncated binary at the final path.
        let temp_path = driver_dir.join(format!("{}.download", family.driver_filename()));
        runtime.write(&temp_path, &binary)?;
        runtime.rename(&temp_path, &driver_path)?;
    }

    if !runtime.is_executable(&driver_path) {
        runtime.set_permissions(&driver_path, 0o744)?;
    }

    Ok(driver_path)
}

/// Whether the cached binary exists and self-reports exactly `expected`.
pub fn is_cached_version<R: Runtime>(runtime: &R, driver_path: &Path, expected: &str) -> bool {
    if !runtime.is_file(driver_path) {
        return false;
    }

    let Ok(output) = runtime.command_stdout(driver_path, &["-v".to_string()]) else {
        debug!("Cached chromedriver at {:?} failed to report a version.", driver_path);
        return false;
    };

    match extract_numeric(&output) {
        Some(version) => version == expected,
        None => false,
    }
}
