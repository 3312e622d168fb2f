// ─── HTTP ───
// Shared client plus the verified download used by runtime installs and
// library repair.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

const APP_USER_AGENT: &str = concat!("InterfaceOficial/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(Duration::from_secs(20))
        .timeout(Duration::from_secs(120))
        .build()
}

/// GET `url`, treating any non-2xx status as `DownloadFailed`.
pub async fn fetch_bytes(client: &Client, url: &str) -> LauncherResult<Vec<u8>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LauncherError::DownloadFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn check_sha1(bytes: &[u8], expected: Option<&str>, path: &Path) -> LauncherResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = sha1_hex(bytes);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(LauncherError::Sha1Mismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Download `url` to `dest`. Nothing is written when the checksum fails.
pub async fn download_verified(
    client: &Client,
    url: &str,
    dest: &Path,
    expected_sha1: Option<&str>,
) -> LauncherResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let bytes = fetch_bytes(client, url).await?;
    check_sha1(&bytes, expected_sha1, dest)?;

    // Handle dropped before returning so the file is not locked on Windows.
    {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| LauncherError::io(dest, source))?;
        file.write_all(&bytes)
            .await
            .map_err(|source| LauncherError::io(dest, source))?;
        file.flush()
            .await
            .map_err(|source| LauncherError::io(dest, source))?;
    }

    debug!("Downloaded: {} -> {:?}", url, dest);
    Ok(())
}

/// Compare an existing file against its expected SHA-1.
pub async fn validate_sha1(path: &Path, expected: &str) -> LauncherResult<bool> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| LauncherError::io(path, source))?;
    Ok(sha1_hex(&bytes).eq_ignore_ascii_case(expected))
}
