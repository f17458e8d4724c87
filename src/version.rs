//! Version string handling for Chrome and chromedriver releases.
//!
//! Chrome reports versions as dot-separated numeric components
//! (e.g. "120.0.6099.109"). The leading component is the major version and is
//! the granularity at which chromedriver releases are cached and resolved.

use anyhow::{Context, Result, anyhow};
use std::str::FromStr;

/// Returns the major version, i.e. the substring before the first `.`.
pub fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Extracts the first run of digits and dots from a string.
///
/// Used to pull the numeric version out of tool output such as
/// `ChromeDriver 120.0.6099.109 (abcdef-refs/...)`.
pub fn extract_numeric(s: &str) -> Option<&str> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// A parsed dot-separated version, comparable component-wise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    components: Vec<u32>,
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let components = s
            .split('.')
            .map(|c| {
                c.parse::<u32>()
                    .with_context(|| format!("Invalid version component {:?} in {:?}", c, s))
            })
            .collect::<Result<Vec<u32>>>()?;

        if components.is_empty() {
            return Err(anyhow!("Empty version string"));
        }

        Ok(Self { components })
    }
}

impl Version {
    pub fn major(&self) -> u32 {
        self.components[0]
    }

    /// Component-wise comparison against a fixed version, missing components
    /// compare as zero (so "106.0" equals [106, 0, 0, 0]).
    pub fn is_before(&self, other: &[u32]) -> bool {
        let len = self.components.len().max(other.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.get(i).copied().unwrap_or(0);
            if a != b {
                return a < b;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_version_is_substring_before_first_dot() {
        assert_eq!(major_version("120.0.6099.109"), "120");
        assert_eq!(major_version("99.1"), "99");
        assert_eq!(major_version("7"), "7");
    }

    #[test]
    fn test_parse_full_version() {
        let v: Version = "120.0.6099.109".parse().unwrap();
        assert_eq!(v.major(), 120);
    }

    #[test]
    fn test_parse_rejects_non_numeric_components() {
        assert!("120.0b.1".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
        assert!("abc".parse::<Version>().is_err());
    }

    #[test]
    fn test_is_before_component_wise() {
        let v: Version = "105.0.5195.52".parse().unwrap();
        assert!(v.is_before(&[106, 0, 5249, 61]));

        let v: Version = "106.0.5249.61".parse().unwrap();
        assert!(!v.is_before(&[106, 0, 5249, 61]));

        let v: Version = "120.0.6099.109".parse().unwrap();
        assert!(!v.is_before(&[106, 0, 5249, 61]));
    }

    #[test]
    fn test_is_before_pads_missing_components_with_zero() {
        let v: Version = "106".parse().unwrap();
        assert!(v.is_before(&[106, 0, 5249, 61]));

        let v: Version = "106.0.5249.61".parse().unwrap();
        assert!(!v.is_before(&[106]));
    }

    #[test]
    fn test_extract_numeric() {
        assert_eq!(
            extract_numeric("ChromeDriver 120.0.6099.109 (abc-refs/branch)"),
            Some("120.0.6099.109")
        );
        assert_eq!(extract_numeric("120.0"), Some("120.0"));
        assert_eq!(extract_numeric("no digits here"), None);
    }
}
