// ─── Runtime Installer ───
// Downloads a Java runtime from Mojang's runtime manifest. Every file is
// SHA-1 verified into a staging folder, which is then renamed into place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::core::abort::AbortFlag;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{download_verified, fetch_bytes, sha1_hex};

use super::interval::RuntimeTarget;

const RUNTIME_MANIFEST_URL: &str = "https://launchermeta.mojang.com/v1/products/java-runtime/2ec0cc96c44e5a76b9c8b7c39df7210883d12871/all.json";
const RUNTIME_LOCK_STALE_SECS: i64 = 60 * 10;
const MIN_FREE_DISK_BYTES: u64 = 512 * 1024 * 1024;
const DOWNLOAD_CONCURRENCY: usize = 8;

/// Installs a runtime matching `target`, returning its root folder.
#[async_trait]
pub trait RuntimeInstaller: Send + Sync {
    async fn install(
        &self,
        target: RuntimeTarget,
        abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<PathBuf>;

    /// Fails with a user-visible error when `target` cannot be installed,
    /// so the user is never asked to confirm a download that cannot work.
    async fn ensure_available(&self, _target: RuntimeTarget) -> LauncherResult<()> {
        Ok(())
    }
}

// ── Manifest model ──

#[derive(Debug, Deserialize)]
struct ComponentEntry {
    manifest: ManifestRef,
    version: ComponentVersion,
}

#[derive(Debug, Deserialize)]
struct ManifestRef {
    sha1: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ComponentVersion {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ComponentManifest {
    files: BTreeMap<String, RuntimeFile>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RuntimeFile {
    Directory,
    File {
        #[serde(default)]
        executable: bool,
        downloads: FileDownloads,
    },
    Link {
        target: String,
    },
}

#[derive(Debug, Deserialize)]
struct FileDownloads {
    raw: RawDownload,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDownload {
    sha1: String,
    url: String,
}

pub struct MojangRuntimeInstaller {
    client: reqwest::Client,
    runtimes_root: PathBuf,
    manifest_url: String,
}

impl MojangRuntimeInstaller {
    pub fn new(client: reqwest::Client, runtimes_root: PathBuf) -> Self {
        Self {
            client,
            runtimes_root,
            manifest_url: RUNTIME_MANIFEST_URL.to_string(),
        }
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        expected_sha1: Option<&str>,
    ) -> LauncherResult<T> {
        let bytes = fetch_bytes(&self.client, url).await?;
        if let Some(expected) = expected_sha1 {
            let actual = sha1_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::Sha1Mismatch {
                    path: PathBuf::from(url),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn pick_component(&self, target: RuntimeTarget) -> LauncherResult<(String, ComponentEntry)> {
        if target.major() < 8 {
            return Err(not_downloadable(target));
        }
        let platform = platform_key()?;
        let all: BTreeMap<String, BTreeMap<String, Vec<ComponentEntry>>> =
            self.fetch_json(&self.manifest_url, None).await?;
        choose_component(all, platform, target)
    }
}

fn not_downloadable(target: RuntimeTarget) -> LauncherError {
    LauncherError::user(format!(
        "Java {target} cannot be downloaded automatically, please install it manually."
    ))
}

/// First component on `platform` whose published version satisfies `target`.
fn choose_component(
    mut all: BTreeMap<String, BTreeMap<String, Vec<ComponentEntry>>>,
    platform: &str,
    target: RuntimeTarget,
) -> LauncherResult<(String, ComponentEntry)> {
    let components = all.remove(platform).ok_or_else(|| {
        LauncherError::user(format!("No Java downloads are published for {platform}"))
    })?;

    components
        .into_iter()
        .filter_map(|(name, mut entries)| {
            if entries.is_empty() {
                return None;
            }
            let entry = entries.remove(0);
            let (major, update) = component_version(&entry.version.name)?;
            target.accepts(major, update).then_some((name, entry))
        })
        .next()
        .ok_or_else(|| not_downloadable(target))
}

#[async_trait]
impl RuntimeInstaller for MojangRuntimeInstaller {
    async fn ensure_available(&self, target: RuntimeTarget) -> LauncherResult<()> {
        self.pick_component(target).await.map(|_| ())
    }

    #[instrument(skip(self, abort, progress))]
    async fn install(
        &self,
        target: RuntimeTarget,
        abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<PathBuf> {
        tokio::fs::create_dir_all(&self.runtimes_root)
            .await
            .map_err(|source| LauncherError::Io {
                path: self.runtimes_root.clone(),
                source,
            })?;

        let (component, entry) = self.pick_component(target).await?;
        info!("Installing Java runtime {} ({})", component, entry.version.name);
        abort.check()?;

        let lock_path = self.runtimes_root.join(format!(".downloading_{component}.lock"));
        let _lock = acquire_runtime_lock(&lock_path, abort).await?;

        let manifest: ComponentManifest = self
            .fetch_json(&entry.manifest.url, Some(&entry.manifest.sha1))
            .await?;
        ensure_min_disk_space(&self.runtimes_root, MIN_FREE_DISK_BYTES)?;

        let runtime_root = self.runtimes_root.join(&component);
        let staging = self
            .runtimes_root
            .join("temp")
            .join(format!("{}_dir", Uuid::new_v4()));
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|source| LauncherError::Io {
                path: staging.clone(),
                source,
            })?;

        let started = Instant::now();
        let result = populate(&self.client, &manifest, &staging, abort, progress).await;
        if let Err(err) = result {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(err);
        }
        info!("Runtime files downloaded in {:?}", started.elapsed());

        let version_file = staging.join(".version");
        tokio::fs::write(&version_file, &entry.version.name)
            .await
            .map_err(|source| LauncherError::Io {
                path: version_file,
                source,
            })?;

        swap_into_place(&staging, &runtime_root).await?;
        progress(1.0);
        Ok(runtime_root)
    }
}

async fn populate(
    client: &reqwest::Client,
    manifest: &ComponentManifest,
    staging: &Path,
    abort: &AbortFlag,
    progress: &(dyn Fn(f64) + Send + Sync),
) -> LauncherResult<()> {
    let mut downloads = Vec::new();
    let mut links = Vec::new();

    for (relative, file) in &manifest.files {
        let dest = staging.join(relative);
        match file {
            RuntimeFile::Directory => {
                tokio::fs::create_dir_all(&dest)
                    .await
                    .map_err(|source| LauncherError::Io { path: dest, source })?;
            }
            RuntimeFile::File {
                executable,
                downloads: files,
            } => downloads.push((dest, files.raw.clone(), *executable)),
            RuntimeFile::Link { target } => links.push((dest, target.clone())),
        }
    }

    let total = downloads.len().max(1);
    let done = AtomicUsize::new(0);
    let done = &done;

    let failures: Vec<LauncherError> = stream::iter(downloads)
        .map(|(dest, raw, executable)| async move {
            abort.check()?;
            download_verified(client, &raw.url, &dest, Some(&raw.sha1)).await?;
            if executable {
                mark_executable(&dest)?;
            }
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            progress(finished as f64 / total as f64 * 0.99);
            Ok::<(), LauncherError>(())
        })
        .buffer_unordered(DOWNLOAD_CONCURRENCY)
        .filter_map(|result| async move { result.err() })
        .collect()
        .await;

    abort.check()?;
    if let Some(first) = failures.into_iter().next() {
        return Err(first);
    }

    for (dest, target) in links {
        create_link(&dest, &target)?;
    }
    Ok(())
}

async fn swap_into_place(staging: &Path, runtime_root: &Path) -> LauncherResult<()> {
    let backup_root = runtime_root.with_extension("backup");
    if backup_root.exists() {
        let _ = tokio::fs::remove_dir_all(&backup_root).await;
    }
    if runtime_root.exists() {
        tokio::fs::rename(runtime_root, &backup_root)
            .await
            .map_err(|source| LauncherError::Io {
                path: backup_root.clone(),
                source,
            })?;
    }

    if let Err(source) = tokio::fs::rename(staging, runtime_root).await {
        if backup_root.exists() {
            let _ = tokio::fs::rename(&backup_root, runtime_root).await;
        }
        return Err(LauncherError::Io {
            path: runtime_root.to_path_buf(),
            source,
        });
    }

    let _ = tokio::fs::remove_dir_all(&backup_root).await;
    Ok(())
}

fn mark_executable(path: &Path) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .map_err(|source| LauncherError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn create_link(path: &Path, target: &str) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::os::unix::fs::symlink(target, path).map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    #[cfg(not(unix))]
    debug!("Skipping runtime link {:?} -> {}", path, target);
    Ok(())
}

// ── Locking ──

struct RuntimeLockGuard {
    path: PathBuf,
}

impl Drop for RuntimeLockGuard {
    fn drop(&mut self) {
        if let Err(source) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock {:?}: {}", self.path, source);
        }
    }
}

async fn acquire_runtime_lock(lock_path: &Path, abort: &AbortFlag) -> LauncherResult<RuntimeLockGuard> {
    let mut attempts = 0_u32;
    loop {
        attempts += 1;
        match tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(lock_path)
            .await
        {
            Ok(mut file) => {
                let payload = serde_json::json!({
                    "pid": std::process::id(),
                    "timestamp": Utc::now().timestamp(),
                });
                file.write_all(payload.to_string().as_bytes())
                    .await
                    .map_err(|source| LauncherError::Io {
                        path: lock_path.to_path_buf(),
                        source,
                    })?;
                return Ok(RuntimeLockGuard {
                    path: lock_path.to_path_buf(),
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                abort.check()?;
                remove_stale_lock(lock_path).await;
                if attempts % 20 == 0 {
                    info!("Waiting for runtime lock at {:?}", lock_path);
                }
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
            Err(source) => {
                return Err(LauncherError::Io {
                    path: lock_path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

async fn remove_stale_lock(lock_path: &Path) {
    let Ok(content) = tokio::fs::read_to_string(lock_path).await else {
        return;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) else {
        return;
    };
    let timestamp = value
        .get("timestamp")
        .and_then(|v| v.as_i64())
        .unwrap_or_default();
    if Utc::now().timestamp().saturating_sub(timestamp) > RUNTIME_LOCK_STALE_SECS {
        let _ = tokio::fs::remove_file(lock_path).await;
    }
}

fn ensure_min_disk_space(path: &Path, minimum_bytes: u64) -> LauncherResult<()> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut best_len = 0usize;
    let mut available = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if canonical.starts_with(mount) {
            let len = mount.as_os_str().len();
            if len >= best_len {
                best_len = len;
                available = Some(disk.available_space());
            }
        }
    }
    match available {
        Some(bytes) if bytes < minimum_bytes => Err(LauncherError::user(format!(
            "Not enough disk space to install Java: {} MB free, {} MB required",
            bytes / 1024 / 1024,
            minimum_bytes / 1024 / 1024
        ))),
        _ => Ok(()),
    }
}

// ── Platform ──

fn platform_key() -> LauncherResult<&'static str> {
    let key = match (std::env::consts::OS, std::env::consts::ARCH) {
        ("windows", "x86_64") => "windows-x64",
        ("windows", "x86") => "windows-x86",
        ("windows", "aarch64") => "windows-arm64",
        ("macos", "x86_64") => "mac-os",
        ("macos", "aarch64") => "mac-os-arm64",
        ("linux", "x86_64") => "linux",
        ("linux", "x86") => "linux-i386",
        (os, arch) => {
            return Err(LauncherError::user(format!(
                "Automatic Java download is not available on {os}/{arch}"
            )))
        }
    };
    Ok(key)
}

/// Major and update of a published runtime: `8u51` → (8, 51),
/// `1.8.0_51` → (8, 51), `17.0.8` → (17, 8).
fn component_version(name: &str) -> Option<(u32, u32)> {
    let mut numbers: Vec<u32> = name
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse::<u32>().ok())
        .collect();
    if numbers.first() == Some(&1) && numbers.len() > 1 {
        numbers.remove(0);
    }
    let major = *numbers.first()?;
    let update = if numbers.len() > 1 { numbers[numbers.len() - 1] } else { 0 };
    Some((major, update))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_version_handles_both_schemes() {
        assert_eq!(component_version("17.0.8"), Some((17, 8)));
        assert_eq!(component_version("8u51"), Some((8, 51)));
        assert_eq!(component_version("1.8.0_51"), Some((8, 51)));
        assert_eq!(component_version("21.0.3"), Some((21, 3)));
        assert_eq!(component_version("none"), None);
    }

    fn runtime_manifest(legacy: &str) -> BTreeMap<String, BTreeMap<String, Vec<ComponentEntry>>> {
        let entry = |name: &str| {
            serde_json::json!([{
                "manifest": { "sha1": "abc", "url": "https://x/manifest.json" },
                "version": { "name": name, "released": "2021-01-01T00:00:00+00:00" }
            }])
        };
        serde_json::from_value(serde_json::json!({
            "windows-x64": {
                "java-runtime-gamma": entry("17.0.8"),
                "jre-legacy": entry(legacy),
                "minecraft-java-exe": []
            }
        }))
        .unwrap()
    }

    #[test]
    fn legacy_runtime_below_8u141_is_not_picked() {
        let err = choose_component(runtime_manifest("8u51"), "windows-x64", RuntimeTarget::Java8u141)
            .unwrap_err();
        assert!(matches!(err, LauncherError::UserVisible(ref m) if m.contains("8u141")));

        let (name, entry) =
            choose_component(runtime_manifest("8u51"), "windows-x64", RuntimeTarget::Major(8)).unwrap();
        assert_eq!((name.as_str(), entry.version.name.as_str()), ("jre-legacy", "8u51"));
    }

    #[test]
    fn legacy_runtime_at_or_above_8u141_is_picked() {
        let (name, _) =
            choose_component(runtime_manifest("8u202"), "windows-x64", RuntimeTarget::Java8u141).unwrap();
        assert_eq!(name, "jre-legacy");
        let (name, _) =
            choose_component(runtime_manifest("8u51"), "windows-x64", RuntimeTarget::Major(17)).unwrap();
        assert_eq!(name, "java-runtime-gamma");
        assert!(choose_component(runtime_manifest("8u51"), "mac-os", RuntimeTarget::Major(17)).is_err());
    }

    #[test]
    fn component_manifest_parses_all_file_kinds() {
        let manifest: ComponentManifest = serde_json::from_value(serde_json::json!({
            "files": {
                "bin": { "type": "directory" },
                "bin/java": {
                    "type": "file",
                    "executable": true,
                    "downloads": { "raw": { "sha1": "abc", "size": 3, "url": "https://x/java" } }
                },
                "legal/java.base/LICENSE": { "type": "link", "target": "../LICENSE" }
            }
        }))
        .unwrap();
        assert_eq!(manifest.files.len(), 3);
        assert!(matches!(manifest.files["bin"], RuntimeFile::Directory));
        assert!(matches!(manifest.files["bin/java"], RuntimeFile::File { executable: true, .. }));
        assert!(matches!(manifest.files["legal/java.base/LICENSE"], RuntimeFile::Link { .. }));
    }

    #[tokio::test]
    async fn swap_replaces_existing_runtime() {
        let base = std::env::temp_dir().join(format!("interface-runtime-swap-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&base);
        let staging = base.join("temp/new_dir");
        let target = base.join("java-runtime-gamma");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(staging.join(".version"), "17.0.8").unwrap();
        std::fs::write(target.join(".version"), "17.0.1").unwrap();

        swap_into_place(&staging, &target).await.unwrap();

        assert_eq!(std::fs::read_to_string(target.join(".version")).unwrap(), "17.0.8");
        assert!(!staging.exists());
        assert!(!target.with_extension("backup").exists());
        let _ = std::fs::remove_dir_all(&base);
    }

    #[tokio::test]
    async fn java_7_is_never_downloaded() {
        let dir = std::env::temp_dir().join(format!("interface-runtime-java7-{}", std::process::id()));
        let installer = MojangRuntimeInstaller::new(reqwest::Client::new(), dir.clone());
        let err = installer
            .install(RuntimeTarget::Major(7), &AbortFlag::new(), &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::UserVisible(_)));
        let err = installer.ensure_available(RuntimeTarget::Major(7)).await.unwrap_err();
        assert!(matches!(err, LauncherError::UserVisible(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
