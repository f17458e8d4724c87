//! Probing the locally installed Chrome/Chromium version.
//!
//! Every failure mode here (no executable found, non-zero exit, unparseable
//! output) collapses to `None`: callers treat absence as "Chrome is not
//! installed, nothing to install" rather than an error.

use crate::platform::OsFamily;
use crate::runtime::Runtime;
use crate::version::{self, Version};
use log::debug;
use std::path::{Path, PathBuf};

/// Candidate executable names searched on PATH, in priority order.
const LINUX_CANDIDATES: [&str; 6] = [
    "google-chrome",
    "google-chrome-stable",
    "google-chrome-beta",
    "google-chrome-dev",
    "chromium-browser",
    "chromium",
];

const MAC_CHROME_PATH: &str = "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome";

/// Chrome records the version of the last launched browser under this key.
const WINDOWS_VERSION_KEY: &str = r"HKEY_CURRENT_USER\Software\Google\Chrome\BLBeacon";

/// Returns the version of the Chrome installed on this host, or `None` if it
/// cannot be determined.
#[tracing::instrument(skip(runtime))]
pub fn installed_version<R: Runtime>(runtime: &R, family: OsFamily) -> Option<String> {
    let version = match family {
        OsFamily::Linux => linux_version(runtime),
        OsFamily::Mac => mac_version(runtime),
        OsFamily::Windows => windows_version(runtime),
    };

    if version.is_none() {
        debug!("Could not determine installed Chrome version.");
    }
    version
}

fn linux_version<R: Runtime>(runtime: &R) -> Option<String> {
    let Some(executable) = find_binary_in_path(runtime, &LINUX_CANDIDATES) else {
        debug!("No Chrome executable found on PATH.");
        return None;
    };

    let output = runtime
        .command_stdout(&executable, &["--version".to_string()])
        .ok()?;
    parse_version_output(&output)
}

fn mac_version<R: Runtime>(runtime: &R) -> Option<String> {
    let output = runtime
        .command_stdout(Path::new(MAC_CHROME_PATH), &["--version".to_string()])
        .ok()?;
    parse_version_output(&output)
}

fn windows_version<R: Runtime>(runtime: &R) -> Option<String> {
    if let Ok(output) = runtime.command_stdout(
        Path::new("reg"),
        &[
            "query".to_string(),
            WINDOWS_VERSION_KEY.to_string(),
            "/v".to_string(),
            "version".to_string(),
        ],
    ) && let Some(version) = parse_reg_output(&output)
    {
        return Some(version);
    }

    // Registry value missing or reg unavailable: query the same key through
    // PowerShell instead.
    debug!("Falling back to PowerShell for the Chrome version query.");
    let script = r"(Get-ItemProperty -Path 'HKCU:\Software\Google\Chrome\BLBeacon').version";
    let output = runtime
        .command_stdout(
            Path::new("powershell"),
            &[
                "-NoProfile".to_string(),
                "-Command".to_string(),
                script.to_string(),
            ],
        )
        .ok()?;
    validated(output.trim())
}

/// Searches each candidate name across the directories of PATH; the first
/// candidate that resolves to an executable file wins.
fn find_binary_in_path<R: Runtime>(runtime: &R, candidates: &[&str]) -> Option<PathBuf> {
    let path_var = runtime.env_var("PATH").ok()?;
    for name in candidates {
        for dir in std::env::split_paths(&path_var) {
            let binary = dir.join(name);
            if runtime.is_file(&binary) && runtime.is_executable(&binary) {
                return Some(binary);
            }
        }
    }
    None
}

/// Parses output such as `Google Chrome 120.0.6099.109` or
/// `Chromium 120.0.6099.129 snap`, stripping the product-name prefix.
fn parse_version_output(output: &str) -> Option<String> {
    let stripped = output
        .replace("Google Chrome", "")
        .replace("Chromium", "");
    validated(stripped.trim().split_whitespace().next()?)
}

/// Pulls the version value out of `reg query` output:
/// `    version    REG_SZ    120.0.6099.109`
fn parse_reg_output(output: &str) -> Option<String> {
    let line = output.lines().find(|l| l.contains("REG_SZ"))?;
    validated(line.split_whitespace().last()?)
}

/// Accepts a candidate version string only if its major component is numeric.
fn validated(candidate: &str) -> Option<String> {
    candidate
        .parse::<Version>()
        .ok()
        .map(|_| candidate.to_string())
}
