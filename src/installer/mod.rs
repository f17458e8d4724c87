//! The install facade: probe the browser, resolve a release, populate the
//! cache, and publish the binary's directory on PATH.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};

use crate::browser;
use crate::cache;
use crate::http::HttpClient;
use crate::platform::{OsFamily, Platform};
use crate::resolver;
use crate::runtime::Runtime;
use crate::version::Version;

/// Default cache root, a fixed location under the user's home directory.
pub fn default_cache_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home = runtime
        .home_dir()
        .context("Could not determine home directory for the chromedriver cache")?;
    Ok(home.join(".cdri"))
}

/// Installs the chromedriver matching the installed Chrome and returns its
/// path, or `None` when Chrome is absent or no matching release exists.
///
/// On success the binary's directory is prepended to the process-wide PATH
/// (once; already-present directories are left alone).
#[tracing::instrument(skip(runtime))]
pub async fn install<R: Runtime + 'static>(
    runtime: R,
    target_dir: Option<PathBuf>,
    no_ssl: bool,
    index_url: Option<String>,
) -> Result<Option<PathBuf>> {
    let http = HttpClient::new(Client::new());
    let index_url = index_url.unwrap_or_else(|| resolver::release_index_url(no_ssl));
    let family = OsFamily::current()?;
    run(
        &runtime,
        &http,
        &index_url,
        family,
        std::env::consts::ARCH,
        target_dir,
    )
    .await
}

/// Install flow with every collaborator injected; [`install`] wires in the
/// real ones.
#[tracing::instrument(skip(runtime, http))]
pub async fn run<R: Runtime>(
    runtime: &R,
    http: &HttpClient,
    index_url: &str,
    family: OsFamily,
    arch: &str,
    target_dir: Option<PathBuf>,
) -> Result<Option<PathBuf>> {
    let Some(browser_version) = browser::installed_version(runtime, family) else {
        debug!("Chrome is not installed.");
        return Ok(None);
    };
    info!("Installed Chrome version: {}", browser_version);

    let hint: Version = browser_version
        .parse()
        .with_context(|| format!("Unparseable Chrome version {:?}", browser_version))?;
    let platform = Platform::from_parts(family, arch, Some(&hint))?;

    let Some(release) = resolver::resolve(http, index_url, &browser_version, &platform).await?
    else {
        warn!("Can not find chromedriver for currently installed chrome version.");
        return Ok(None);
    };

    let base_dir = match target_dir {
        Some(dir) => {
            if !runtime.is_dir(&dir) {
                bail!("Invalid target directory: {}", dir.display());
            }
            dir
        }
        None => default_cache_root(runtime)?,
    };

    let driver_path = cache::ensure_cached(runtime, http, &release, &base_dir, family).await?;

    if let Some(driver_dir) = driver_path.parent() {
        publish_on_search_path(runtime, driver_dir);
    }

    Ok(Some(driver_path))
}

/// Returns the version of the Chrome installed on this host.
pub fn browser_version<R: Runtime>(runtime: &R) -> Result<Option<String>> {
    let family = OsFamily::current()?;
    Ok(browser::installed_version(runtime, family))
}

/// Prepends `dir` to the process-wide PATH unless it is already a segment of
/// it. All environment access goes through the snapshot-in, snapshot-out
/// [`prepend_search_path`] so the decision itself is testable.
fn publish_on_search_path<R: Runtime>(runtime: &R, dir: &Path) {
    let snapshot = runtime.env_var("PATH").ok();
    match prepend_search_path(snapshot.as_deref(), dir) {
        Ok(Some(updated)) => {
            debug!("Prepending {:?} to PATH", dir);
            runtime.set_env_var("PATH", &updated);
        }
        Ok(None) => {
            debug!("{:?} is already on PATH", dir);
        }
        Err(e) => {
            warn!("Could not update PATH with {:?}: {}", dir, e);
        }
    }
}

/// Pure PATH computation: given the current PATH snapshot, returns the new
/// value with `dir` prepended, or `None` when `dir` is already present.
///
/// Membership is an exact segment-wise check, so a directory that happens to
/// be a substring of another PATH entry is not mistaken for present.
pub fn prepend_search_path(snapshot: Option<&str>, dir: &Path) -> Result<Option<String>> {
    let Some(current) = snapshot else {
        return Ok(Some(dir.to_string_lossy().into_owned()));
    };

    if std::env::split_paths(current).any(|segment| segment == dir) {
        return Ok(None);
    }

    let joined =
        std::env::join_paths(std::iter::once(dir.to_path_buf()).chain(std::env::split_paths(current)))
            .with_context(|| format!("Cannot place {:?} on PATH", dir))?;

    Ok(Some(joined.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use zip::CompressionMethod;
    use zip::ZipWriter;
    use zip::write::FileOptions;

    fn join(paths: &[&str]) -> String {
        std::env::join_paths(paths.iter().map(Path::new))
            .unwrap()
            .into_string()
            .unwrap()
    }

    #[test]
    fn test_prepend_search_path_fresh() {
        let snapshot = join(&["/usr/bin", "/bin"]);
        let updated = prepend_search_path(Some(&snapshot), Path::new("/cache/120"))
            .unwrap()
            .unwrap();
        assert_eq!(updated, join(&["/cache/120", "/usr/bin", "/bin"]));
    }

    #[test]
    fn test_prepend_search_path_already_present() {
        let snapshot = join(&["/cache/120", "/usr/bin"]);
        let updated = prepend_search_path(Some(&snapshot), Path::new("/cache/120")).unwrap();
        assert_eq!(updated, None);
    }

    #[test]
    fn test_prepend_search_path_substring_is_not_membership() {
        // "/cache/12" is a substring of "/cache/120" but a different segment
        let snapshot = join(&["/cache/120", "/usr/bin"]);
        let updated = prepend_search_path(Some(&snapshot), Path::new("/cache/12"))
            .unwrap()
            .unwrap();
        assert_eq!(updated, join(&["/cache/12", "/cache/120", "/usr/bin"]));
    }

    #[test]
    fn test_prepend_search_path_unset() {
        let updated = prepend_search_path(None, Path::new("/cache/120"))
            .unwrap()
            .unwrap();
        assert_eq!(updated, "/cache/120");
    }

    #[test]
    fn test_prepend_search_path_applied_twice_is_stable() {
        let snapshot = join(&["/usr/bin"]);
        let first = prepend_search_path(Some(&snapshot), Path::new("/cache/120"))
            .unwrap()
            .unwrap();
        let second = prepend_search_path(Some(&first), Path::new("/cache/120")).unwrap();
        assert_eq!(second, None);
    }

    #[test]
    fn test_default_cache_root_requires_home() {
        let mut runtime = MockRuntime::new();
        runtime.expect_home_dir().returning(|| None);
        assert!(default_cache_root(&runtime).is_err());

        let mut runtime = MockRuntime::new();
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));
        assert_eq!(
            default_cache_root(&runtime).unwrap(),
            PathBuf::from("/home/user/.cdri")
        );
    }

    fn index_body(server_url: &str) -> String {
        format!(
            r#"{{
                "milestones": {{
                    "120": {{
                        "milestone": "120",
                        "version": "120.0.6099.109",
                        "downloads": {{
                            "chromedriver": [
                                {{"platform": "linux64", "url": "{}/120/chromedriver-linux64.zip"}}
                            ]
                        }}
                    }}
                }}
            }}"#,
            server_url
        )
    }

    fn driver_archive() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions<()> = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o755);
        zip.start_file("chromedriver-linux64/chromedriver", options)
            .unwrap();
        zip.write_all(b"driver bytes").unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn expect_linux_chrome(runtime: &mut MockRuntime, version: &'static str) {
        runtime
            .expect_env_var()
            .with(eq("PATH"))
            .returning(|_| Ok("/usr/bin".to_string()));
        runtime
            .expect_is_file()
            .withf(|p| p == Path::new("/usr/bin/google-chrome"))
            .returning(|_| true);
        runtime
            .expect_is_executable()
            .withf(|p| p == Path::new("/usr/bin/google-chrome"))
            .returning(|_| true);
        runtime
            .expect_command_stdout()
            .withf(|program, _| program == Path::new("/usr/bin/google-chrome"))
            .returning(move |_, _| Ok(format!("Google Chrome {} \n", version)));
    }

    #[tokio::test]
    async fn test_run_end_to_end_on_mocked_host() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let index_mock = server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(index_body(&url))
            .create_async()
            .await;
        let archive_mock = server
            .mock("GET", "/120/chromedriver-linux64.zip")
            .with_status(200)
            .with_body(driver_archive())
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        expect_linux_chrome(&mut runtime, "120.0.6099.109");

        // Cache miss: final binary not on disk yet
        runtime
            .expect_is_file()
            .withf(|p| p == Path::new("/cache/120/chromedriver"))
            .returning(|_| false);
        runtime
            .expect_is_dir()
            .with(eq(PathBuf::from("/cache")))
            .returning(|_| true);
        runtime
            .expect_create_dir_all()
            .with(eq(PathBuf::from("/cache/120")))
            .returning(|_| Ok(()));
        runtime
            .expect_write()
            .withf(|path, contents| {
                path == Path::new("/cache/120/chromedriver.download") && contents == b"driver bytes"
            })
            .returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .with(
                eq(PathBuf::from("/cache/120/chromedriver.download")),
                eq(PathBuf::from("/cache/120/chromedriver")),
            )
            .returning(|_, _| Ok(()));
        runtime
            .expect_is_executable()
            .withf(|p| p == Path::new("/cache/120/chromedriver"))
            .returning(|_| false);
        runtime
            .expect_set_permissions()
            .with(eq(PathBuf::from("/cache/120/chromedriver")), eq(0o744u32))
            .returning(|_, _| Ok(()));

        // PATH publication: the expected value is computed segment-wise
        let expected_path = std::env::join_paths([Path::new("/cache/120"), Path::new("/usr/bin")])
            .unwrap()
            .into_string()
            .unwrap();
        runtime
            .expect_set_env_var()
            .with(eq("PATH"), eq(expected_path))
            .times(1)
            .returning(|_, _| ());

        let http = HttpClient::new(Client::new());
        let result = run(
            &runtime,
            &http,
            &format!("{}/index.json", url),
            OsFamily::Linux,
            "x86_64",
            Some(PathBuf::from("/cache")),
        )
        .await
        .unwrap();

        index_mock.assert_async().await;
        archive_mock.assert_async().await;
        assert_eq!(result, Some(PathBuf::from("/cache/120/chromedriver")));
    }

    #[tokio::test]
    async fn test_run_returns_none_when_browser_absent() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .with(eq("PATH"))
            .returning(|_| Ok("/usr/bin".to_string()));
        runtime.expect_is_file().returning(|_| false);

        let http = HttpClient::new(Client::new());
        // No index mock needed: the flow must stop before any network access
        let result = run(
            &runtime,
            &http,
            "http://127.0.0.1:1/index.json",
            OsFamily::Linux,
            "x86_64",
            None,
        )
        .await
        .unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_run_returns_none_when_no_release_matches() {
        let mut server = mockito::Server::new_async().await;

        let _index_mock = server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(r#"{"milestones": {}}"#)
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        expect_linux_chrome(&mut runtime, "120.0.6099.109");

        let http = HttpClient::new(Client::new());
        let result = run(
            &runtime,
            &http,
            &format!("{}/index.json", server.url()),
            OsFamily::Linux,
            "x86_64",
            Some(PathBuf::from("/cache")),
        )
        .await
        .unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_run_rejects_missing_target_directory() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _index_mock = server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(index_body(&url))
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        expect_linux_chrome(&mut runtime, "120.0.6099.109");
        runtime
            .expect_is_dir()
            .with(eq(PathBuf::from("/does/not/exist")))
            .returning(|_| false);

        let http = HttpClient::new(Client::new());
        let result = run(
            &runtime,
            &http,
            &format!("{}/index.json", url),
            OsFamily::Linux,
            "x86_64",
            Some(PathBuf::from("/does/not/exist")),
        )
        .await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid target directory"));
    }

    #[tokio::test]
    async fn test_run_propagates_index_fetch_failure() {
        let mut server = mockito::Server::new_async().await;
        let _index_mock = server
            .mock("GET", "/index.json")
            .with_status(500)
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        expect_linux_chrome(&mut runtime, "120.0.6099.109");

        let http = HttpClient::new(Client::new());
        let result = run(
            &runtime,
            &http,
            &format!("{}/index.json", server.url()),
            OsFamily::Linux,
            "x86_64",
            Some(PathBuf::from("/cache")),
        )
        .await;

        assert!(result.is_err());
    }
}
