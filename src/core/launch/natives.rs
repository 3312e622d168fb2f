// ─── Natives Extraction ───
// Keeps `<version>-natives` in sync with the natives archives the version
// needs. Files whose size already matches the archive entry are left alone,
// files no archive produced are removed.

use std::collections::HashSet;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::result::ZipError;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::LauncherPaths;
use crate::core::version::{LibraryToken, VersionDescriptor};

use super::secrets::launch_log;

/// What one extraction pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativesReport {
    pub written: Vec<PathBuf>,
    pub up_to_date: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Targets left untouched because another process holds them.
    pub skipped: Vec<PathBuf>,
}

/// Native library extensions of this platform.
pub fn native_extensions() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &[".dll"]
    } else if cfg!(target_os = "macos") {
        &[".dylib", ".jnilib"]
    } else {
        &[".so"]
    }
}

fn is_native_entry(name: &str) -> bool {
    if name.contains("META-INF") {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    native_extensions().iter().any(|ext| lower.ends_with(ext))
}

/// Folder the natives are extracted to. Java cannot load libraries from
/// non-ASCII paths on every platform, so those fall back to launcher folders.
pub fn natives_dir(version: &VersionDescriptor, paths: &LauncherPaths) -> PathBuf {
    let preferred = version.path.join(version.natives_dir_name());
    if preferred.to_string_lossy().is_ascii() {
        return preferred;
    }

    let [data, temp] = paths.natives_fallback_dirs();
    if data.to_string_lossy().is_ascii() {
        data
    } else {
        temp
    }
}

/// Extract every natives token into `target_dir`.
pub async fn extract_natives(tokens: &[LibraryToken], target_dir: &Path) -> LauncherResult<NativesReport> {
    let archives: Vec<PathBuf> = tokens
        .iter()
        .filter(|token| token.is_natives)
        .map(|token| token.local_path.clone())
        .collect();
    let target_dir = target_dir.to_path_buf();

    tokio::task::spawn_blocking(move || extract_natives_blocking(&archives, &target_dir)).await?
}

fn extract_natives_blocking(archives: &[PathBuf], target_dir: &Path) -> LauncherResult<NativesReport> {
    std::fs::create_dir_all(target_dir).map_err(|source| LauncherError::Io {
        path: target_dir.to_path_buf(),
        source,
    })?;

    launch_log("Extracting natives files");
    let mut report = NativesReport::default();
    let mut kept: HashSet<PathBuf> = HashSet::new();

    for archive in archives {
        if let Err(e) = extract_archive(archive, target_dir, &mut report, &mut kept) {
            if !is_corrupt_archive(&e) {
                return Err(e);
            }
            launch_log(&format!("Failed to open natives file: {} ({})", archive.display(), e));
            if let Err(remove_err) = std::fs::remove_file(archive) {
                if remove_err.kind() != ErrorKind::NotFound {
                    warn!("Cannot delete broken natives archive {:?}: {}", archive, remove_err);
                }
            }
            return Err(LauncherError::user(format!(
                "Cannot open natives file ({}), it may be corrupted. Please try launching the game again.",
                archive.display()
            )));
        }
    }

    remove_stale_files(target_dir, &kept, &mut report)?;
    Ok(report)
}

fn extract_archive(
    archive_path: &Path,
    target_dir: &Path,
    report: &mut NativesReport,
    kept: &mut HashSet<PathBuf>,
) -> LauncherResult<()> {
    let file = File::open(archive_path).map_err(|source| LauncherError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !is_native_entry(entry.name()) {
            continue;
        }
        let Some(file_name) = entry.name().rsplit(['/', '\\']).next().map(str::to_string) else {
            continue;
        };
        if file_name.is_empty() {
            continue;
        }

        let dest = target_dir.join(&file_name);
        kept.insert(dest.clone());

        if let Ok(meta) = std::fs::metadata(&dest) {
            if meta.len() == entry.size() {
                debug!("No need to extract: {:?}", dest);
                report.up_to_date.push(dest);
                continue;
            }
            if let Err(e) = std::fs::remove_file(&dest) {
                if e.kind() == ErrorKind::PermissionDenied {
                    launch_log(&format!(
                        "Access denied when deleting {}, the game is probably running, skipping extraction",
                        dest.display()
                    ));
                    report.skipped.push(dest);
                    continue;
                }
            }
        }

        let mut out = match open_for_write(&dest) {
            Ok(out) => out,
            Err(e) => {
                launch_log(&format!("Cannot write {}, skipping: {}", dest.display(), e));
                report.skipped.push(dest);
                continue;
            }
        };
        // Read errors belong to the archive, write errors to the destination.
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(ZipError::from)?;
        out.write_all(&bytes)
            .map_err(|source| LauncherError::io(&dest, source))?;
        launch_log(&format!("Extracted: {}", dest.display()));
        report.written.push(dest);
    }

    Ok(())
}

/// Only a failure reading the archive itself means it is damaged.
fn is_corrupt_archive(error: &LauncherError) -> bool {
    matches!(
        error,
        LauncherError::Zip(ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) | ZipError::Io(_))
    )
}

/// Create `dest`; when it cannot be opened, move it aside and try once more.
fn open_for_write(dest: &Path) -> std::io::Result<File> {
    match File::create(dest) {
        Ok(file) => Ok(file),
        Err(first) if dest.exists() => {
            let aside = dest.with_file_name(format!(
                "{}.{}.old",
                dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
                uuid::Uuid::new_v4().simple()
            ));
            debug!("Moving {:?} aside after {}", dest, first);
            std::fs::rename(dest, &aside)?;
            File::create(dest)
        }
        Err(first) => Err(first),
    }
}

fn remove_stale_files(target_dir: &Path, kept: &HashSet<PathBuf>, report: &mut NativesReport) -> LauncherResult<()> {
    let entries = std::fs::read_dir(target_dir).map_err(|source| LauncherError::Io {
        path: target_dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if kept.contains(&path) || path.is_dir() {
            continue;
        }
        launch_log(&format!("Deleting: {}", path.display()));
        match std::fs::remove_file(&path) {
            Ok(()) => report.removed.push(path),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                launch_log(&format!(
                    "Access denied when deleting extra files, skipping the rest of the cleanup: {e}"
                ));
                break;
            }
            Err(e) => warn!("Cannot delete {:?}: {}", path, e),
        }
    }

    Ok(())
}
