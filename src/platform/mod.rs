//! Platform identification for chromedriver artifact selection.
//!
//! Maps the host OS family and CPU architecture to the canonical platform tag
//! used in chromedriver download URLs (e.g. `linux64`, `mac-arm64`, `win32`).

use crate::version::Version;
use anyhow::{Result, anyhow};

/// chromedriver artifacts for Apple silicon were published under the
/// Rosetta-era `mac64_m1` name before this release and under the native
/// `mac_arm64`/`mac-arm64` names from it onwards.
pub const MAC_ARM_NATIVE_TAG_SINCE: [u32; 4] = [106, 0, 5249, 61];

/// Host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    Mac,
    Windows,
}

impl OsFamily {
    /// Detect the OS family of the running host.
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    pub(crate) fn from_os(os: &str) -> Result<Self> {
        match os {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::Mac),
            "windows" => Ok(Self::Windows),
            other => Err(anyhow!(
                "Could not determine chromedriver download URL for this platform: {}",
                other
            )),
        }
    }

    /// Filename of the chromedriver binary on this OS family.
    pub fn driver_filename(&self) -> &'static str {
        match self {
            Self::Windows => "chromedriver.exe",
            _ => "chromedriver",
        }
    }
}

/// The resolved platform half of a download URL: OS family plus the
/// architecture suffix its artifacts are named with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub family: OsFamily,
    arch_suffix: &'static str,
}

impl Platform {
    /// Identify the platform of the running host.
    ///
    /// `version_hint` is the target chromedriver version; it only matters on
    /// Apple silicon, where the artifact naming convention changed at
    /// [`MAC_ARM_NATIVE_TAG_SINCE`].
    #[tracing::instrument]
    pub fn identify(version_hint: Option<&Version>) -> Result<Self> {
        Self::from_parts(OsFamily::current()?, std::env::consts::ARCH, version_hint)
    }

    pub(crate) fn from_parts(
        family: OsFamily,
        arch: &str,
        version_hint: Option<&Version>,
    ) -> Result<Self> {
        let arch_suffix = match family {
            OsFamily::Linux => match arch {
                "x86_64" | "aarch64" => "64",
                other => {
                    return Err(anyhow!(
                        "Could not determine chromedriver download URL for linux/{}",
                        other
                    ));
                }
            },
            OsFamily::Mac => match arch {
                "aarch64" => {
                    let legacy = version_hint
                        .map(|v| v.is_before(&MAC_ARM_NATIVE_TAG_SINCE))
                        .unwrap_or(false);
                    if legacy { "64_m1" } else { "-arm64" }
                }
                "x86_64" => "-x64",
                other => {
                    return Err(anyhow!(
                        "Could not determine Mac processor architecture: {}",
                        other
                    ));
                }
            },
            // 32-bit chromedriver runs on 64-bit Windows hosts too
            OsFamily::Windows => "32",
        };

        Ok(Self {
            family,
            arch_suffix,
        })
    }

    /// Canonical tag matched against the platform field of download options,
    /// e.g. `linux64`, `mac-arm64`, `mac-x64`, `win32`.
    pub fn tag(&self) -> String {
        let family = match self.family {
            OsFamily::Linux => "linux",
            OsFamily::Mac => "mac",
            OsFamily::Windows => "win",
        };
        format!("{}{}", family, self.arch_suffix)
    }
}
