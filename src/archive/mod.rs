//! Extraction of the driver binary from a downloaded zip archive.

use anyhow::{Context, Result, anyhow};
use log::debug;
use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

/// Extracts a single named binary from an in-memory zip archive.
///
/// Depending on the release packaging era the entry is either at the archive
/// root (`chromedriver`) or nested one level under a folder named after the
/// archive's base filename (`chromedriver-linux64/chromedriver`). The nested
/// layout is tried first since that is what current releases ship.
pub fn extract_binary(archive: &[u8], file_name: &str, archive_stem: &str) -> Result<Vec<u8>> {
    let cursor = Cursor::new(archive);
    let mut zip = ZipArchive::new(cursor).context("Failed to parse zip archive")?;

    let nested = format!("{}/{}", archive_stem, file_name);
    for candidate in [nested.as_str(), file_name] {
        match zip.by_name(candidate) {
            Ok(mut entry) => {
                debug!("Extracting {} from archive...", candidate);
                let mut contents = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut contents)
                    .with_context(|| format!("Failed to read archive entry {}", candidate))?;
                return Ok(contents);
            }
            Err(ZipError::FileNotFound) => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open archive entry {}", candidate));
            }
        }
    }

    Err(anyhow!(
        "Archive does not contain {} (looked for {} and {})",
        file_name,
        nested,
        file_name
    ))
}

/// The base filename of a download URL, without extension.
/// `https://host/path/chromedriver-linux64.zip` yields `chromedriver-linux64`.
pub fn archive_stem(url: &str) -> &str {
    let file_name = url.rsplit('/').next().unwrap_or(url);
    file_name.split('.').next().unwrap_or(file_name)
}
