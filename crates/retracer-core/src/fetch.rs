//! Repository checkout and static-file download behind a narrow interface.

use crate::config::ProxyConfig;
use crate::error::{Result, RetracerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::debug;

pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub trait Fetcher {
    /// Clone `url` into `dest`. Skips when `dest` already exists.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;
    /// Pull the checkout in `dir` up to date.
    fn update_checkout(&self, dir: &Path) -> Result<()>;
    /// Download `url` into `dest`, replacing any partial file.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Production implementation: `git` subprocess plus a blocking HTTP client,
/// both honoring the configured outbound proxies. No retries; a failure is
/// surfaced to the lifecycle step that requested the fetch.
pub struct NetFetcher {
    git: PathBuf,
    proxies: ProxyConfig,
}

impl NetFetcher {
    pub fn new(proxies: ProxyConfig) -> Result<Self> {
        let git =
            which::which("git").map_err(|_| RetracerError::BinaryNotFound("git".to_string()))?;
        Ok(Self { git, proxies })
    }

    fn run_git(&self, action: &'static str, args: &[&str]) -> Result<()> {
        let mut cmd = Command::new(&self.git);
        cmd.args(args);
        for (key, value) in self.proxies.proxy_env() {
            cmd.env(key, value);
        }
        let output = cmd.output().map_err(|e| RetracerError::Git {
            action,
            detail: e.to_string(),
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RetracerError::Git {
                action,
                detail: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    fn http_client(&self) -> Result<reqwest::blocking::Client> {
        let mut builder = reqwest::blocking::Client::builder().timeout(DOWNLOAD_TIMEOUT);
        if let Some(url) = self.proxies.http.as_deref() {
            builder = builder.proxy(reqwest::Proxy::http(url).map_err(|e| {
                RetracerError::Download {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            })?);
        }
        if let Some(url) = self.proxies.https.as_deref() {
            builder = builder.proxy(reqwest::Proxy::https(url).map_err(|e| {
                RetracerError::Download {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            })?);
        }
        builder.build().map_err(|e| RetracerError::Download {
            url: String::new(),
            detail: e.to_string(),
        })
    }
}

impl Fetcher for NetFetcher {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        if dest.exists() {
            debug!(dest = %dest.display(), "checkout already exists, skipping clone");
            return Ok(());
        }
        let dest_str = dest.to_string_lossy();
        self.run_git("clone", &["clone", "-b", "main", url, &dest_str])?;
        debug!(url, dest = %dest.display(), "repository cloned");
        Ok(())
    }

    fn update_checkout(&self, dir: &Path) -> Result<()> {
        let dir_str = dir.to_string_lossy();
        self.run_git("pull", &["-C", &dir_str, "pull"])?;
        debug!(dir = %dir.display(), "checkout updated");
        Ok(())
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let client = self.http_client()?;
        let mut response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| RetracerError::Download {
                url: url.to_string(),
                detail: e.to_string(),
            })?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_dir = dest.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(tmp_dir)?;
        response
            .copy_to(tmp.as_file_mut())
            .map_err(|e| RetracerError::Download {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        tmp.as_file_mut().flush()?;
        tmp.persist(dest).map_err(|e| e.error)?;
        debug!(url, dest = %dest.display(), "download complete");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Construct directly so the tests do not require a git binary; none of
    // them actually invoke it.
    fn fetcher() -> NetFetcher {
        NetFetcher {
            git: PathBuf::from("git"),
            proxies: ProxyConfig::default(),
        }
    }

    #[test]
    fn clone_skips_existing_checkout() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("checkout");
        std::fs::create_dir_all(&dest).unwrap();
        // Would fail against this junk URL if the skip didn't short-circuit.
        fetcher()
            .clone_repo("https://invalid.invalid/repo", &dest)
            .unwrap();
    }

    #[test]
    fn download_writes_destination_file() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/apport_duplicates.db")
            .with_status(200)
            .with_body(b"sqlite-bytes")
            .create();

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("srv/apport_duplicates.db");
        let url = format!("{}/apport_duplicates.db", server.url());
        fetcher().download(&url, &dest).unwrap();

        mock.assert();
        assert_eq!(std::fs::read(&dest).unwrap(), b"sqlite-bytes");
    }

    #[test]
    fn download_propagates_http_errors() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/apport_duplicates.db")
            .with_status(503)
            .create();

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("apport_duplicates.db");
        let url = format!("{}/apport_duplicates.db", server.url());
        let err = fetcher().download(&url, &dest).unwrap_err();
        assert!(matches!(err, RetracerError::Download { .. }));
        assert!(!dest.exists());
    }
}
