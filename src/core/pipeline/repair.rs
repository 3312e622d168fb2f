// ─── File Repair ───
// Optional stage that restores missing or damaged libraries before the
// natives are extracted.

use std::path::PathBuf;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::core::abort::AbortFlag;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{download_verified, validate_sha1};
use crate::core::version::{resolve_library_tokens, LibraryToken, VersionDescriptor};

const DOWNLOAD_CONCURRENCY: usize = 8;

#[async_trait]
pub trait FileRepair: Send + Sync {
    async fn repair(
        &self,
        version: &VersionDescriptor,
        abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<()>;
}

/// One library to fetch.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
}

/// Concurrent, SHA-1 validated library downloader.
pub struct LibraryRepair {
    client: Client,
    libraries_dir: PathBuf,
}

impl LibraryRepair {
    pub fn new(client: Client, libraries_dir: PathBuf) -> Self {
        Self {
            client,
            libraries_dir,
        }
    }

    /// Libraries that are missing or fail their checksum.
    pub async fn missing_entries(&self, tokens: &[LibraryToken]) -> Vec<DownloadEntry> {
        let mut entries = Vec::new();
        for token in tokens {
            let Some(url) = token.download_url.clone() else {
                continue;
            };
            let intact = match (&token.sha1, token.local_path.exists()) {
                (_, false) => false,
                (Some(expected), true) => validate_sha1(&token.local_path, expected)
                    .await
                    .unwrap_or(false),
                (None, true) => true,
            };
            if !intact {
                entries.push(DownloadEntry {
                    url,
                    dest: token.local_path.clone(),
                    sha1: token.sha1.clone(),
                });
            }
        }
        entries
    }

    async fn download_file(&self, entry: &DownloadEntry, abort: &AbortFlag) -> LauncherResult<()> {
        abort.check()?;
        download_verified(&self.client, &entry.url, &entry.dest, entry.sha1.as_deref()).await
    }
}

#[async_trait]
impl FileRepair for LibraryRepair {
    #[instrument(skip_all, fields(version = %version.name))]
    async fn repair(
        &self,
        version: &VersionDescriptor,
        abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<()> {
        let tokens = resolve_library_tokens(&version.json, &self.libraries_dir);
        let entries = self.missing_entries(&tokens).await;
        if entries.is_empty() {
            debug!("All {} libraries are intact", tokens.len());
            progress(1.0);
            return Ok(());
        }

        info!(
            "Repairing {} libraries, concurrency={}",
            entries.len(),
            DOWNLOAD_CONCURRENCY
        );
        let total = entries.len();
        let mut done = 0usize;
        let mut failures = Vec::new();

        let mut downloads = stream::iter(entries)
            .map(|entry| async move {
                let result = self.download_file(&entry, abort).await;
                (entry, result)
            })
            .buffer_unordered(DOWNLOAD_CONCURRENCY);

        while let Some((entry, result)) = downloads.next().await {
            done += 1;
            progress(done as f64 / total as f64);
            match result {
                Ok(()) => {}
                Err(e) if e.is_aborted() => return Err(e),
                Err(e) => {
                    warn!("Library download failed: {} ({})", entry.url, e);
                    failures.push(entry);
                }
            }
        }

        match failures.first() {
            None => Ok(()),
            Some(first) => Err(LauncherError::user(format!(
                "Failed to download {} game files, first was {}. Please check your network and try again.",
                failures.len(),
                first.url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{library_token, temp_dir};

    fn token(path: PathBuf, sha1: Option<&str>, url: Option<&str>) -> LibraryToken {
        LibraryToken {
            download_url: url.map(str::to_string),
            sha1: sha1.map(str::to_string),
            ..library_token(&path, false)
        }
    }

    #[tokio::test]
    async fn only_missing_or_damaged_libraries_are_listed() {
        let dir = temp_dir("repair", "missing");
        let good = dir.join("good.jar");
        let bad = dir.join("bad.jar");
        let unchecked = dir.join("unchecked.jar");
        std::fs::write(&good, b"abc").unwrap();
        std::fs::write(&bad, b"abd").unwrap();
        std::fs::write(&unchecked, b"whatever").unwrap();

        let repair = LibraryRepair::new(Client::new(), dir.clone());
        let sha = "a9993e364706816aba3e25717850c26c9cd0d89d";
        let tokens = vec![
            token(good, Some(sha), Some("https://example.invalid/good.jar")),
            token(bad.clone(), Some(sha), Some("https://example.invalid/bad.jar")),
            token(unchecked, None, Some("https://example.invalid/unchecked.jar")),
            token(dir.join("absent.jar"), None, Some("https://example.invalid/absent.jar")),
            token(dir.join("no-url.jar"), None, None),
        ];

        let entries = repair.missing_entries(&tokens).await;
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.invalid/bad.jar", "https://example.invalid/absent.jar"]
        );
        assert_eq!(entries[0].dest, bad);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn aborted_download_does_not_touch_network() {
        let dir = temp_dir("repair", "abort");
        let repair = LibraryRepair::new(Client::new(), dir.clone());
        let abort = AbortFlag::new();
        abort.abort();
        let entry = DownloadEntry {
            url: "https://example.invalid/x.jar".into(),
            dest: dir.join("x.jar"),
            sha1: None,
        };
        assert!(repair.download_file(&entry, &abort).await.unwrap_err().is_aborted());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
