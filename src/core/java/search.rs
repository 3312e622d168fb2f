// ─── Java Search ───
// Enumerates Java runtimes installed on the host.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::error::LauncherResult;

use super::entry::{java_exe, locate_java_binary, JavaEntry};

/// Source of installed runtimes.
#[async_trait]
pub trait JavaLocator: Send + Sync {
    async fn scan(&self) -> LauncherResult<Vec<JavaEntry>>;
}

/// Looks in `JAVA_HOME`, `PATH`, the usual install folders, the official
/// launcher's runtimes and the runtimes this launcher downloaded.
#[derive(Debug, Clone)]
pub struct HostJavaLocator {
    managed_root: PathBuf,
    minecraft_root: PathBuf,
}

impl HostJavaLocator {
    pub fn new(managed_root: PathBuf, minecraft_root: PathBuf) -> Self {
        Self {
            managed_root,
            minecraft_root,
        }
    }

    fn collect_candidates(&self) -> Vec<(PathBuf, bool)> {
        let mut out = Vec::new();

        if let Ok(home) = std::env::var("JAVA_HOME") {
            if !home.trim().is_empty() {
                out.push((Path::new(&home).join("bin").join(java_exe()), true));
            }
        }

        if let Some(path_var) = std::env::var_os("PATH") {
            for dir in std::env::split_paths(&path_var) {
                let candidate = dir.join(java_exe());
                if candidate.is_file() {
                    out.push((candidate, true));
                }
            }
        }

        for root in runtime_roots(&self.managed_root, &self.minecraft_root) {
            out.push((locate_java_binary(&root), false));
        }

        out
    }
}

#[async_trait]
impl JavaLocator for HostJavaLocator {
    async fn scan(&self) -> LauncherResult<Vec<JavaEntry>> {
        let candidates = self.collect_candidates();
        let entries = tokio::task::spawn_blocking(move || probe_all(candidates)).await?;
        info!("Found {} Java runtime(s)", entries.len());
        Ok(entries)
    }
}

fn probe_all(candidates: Vec<(PathBuf, bool)>) -> Vec<JavaEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for (path, registered) in candidates {
        if !path.is_file() {
            continue;
        }
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if !seen.insert(key) {
            continue;
        }
        match JavaEntry::probe(&path) {
            Some(mut entry) => {
                entry.has_environment_registration = registered;
                debug!("Java {} at {:?}", entry.version, entry.executable_path);
                entries.push(entry);
            }
            None => debug!("Ignoring unusable Java at {:?}", path),
        }
    }

    entries
}

/// Folders that each hold one unpacked runtime.
fn runtime_roots(managed_root: &Path, minecraft_root: &Path) -> Vec<PathBuf> {
    let mut parents = vec![managed_root.to_path_buf()];

    // Official launcher layout: runtime/<component>/<platform>/<component>
    if let Ok(components) = std::fs::read_dir(minecraft_root.join("runtime")) {
        for component in components.filter_map(Result::ok) {
            if let Ok(platforms) = std::fs::read_dir(component.path()) {
                for platform in platforms.filter_map(Result::ok) {
                    parents.push(platform.path());
                }
            }
        }
    }

    if cfg!(target_os = "windows") {
        for var in ["ProgramFiles", "ProgramFiles(x86)"] {
            if let Ok(base) = std::env::var(var) {
                let base = PathBuf::from(base);
                for vendor in ["Java", "Eclipse Adoptium", "Zulu", "Microsoft", "BellSoft"] {
                    parents.push(base.join(vendor));
                }
            }
        }
    } else if cfg!(target_os = "macos") {
        parents.push(PathBuf::from("/Library/Java/JavaVirtualMachines"));
        if let Some(home) = dirs::home_dir() {
            parents.push(home.join("Library/Java/JavaVirtualMachines"));
        }
    } else {
        parents.push(PathBuf::from("/usr/lib/jvm"));
        parents.push(PathBuf::from("/usr/java"));
        parents.push(PathBuf::from("/opt/java"));
        if let Some(home) = dirs::home_dir() {
            parents.push(home.join(".sdkman/candidates/java"));
        }
    }

    let mut roots = Vec::new();
    for parent in parents {
        let Ok(children) = std::fs::read_dir(&parent) else {
            continue;
        };
        for child in children.filter_map(Result::ok) {
            let path = child.path();
            let is_staging = path.file_name().is_some_and(|n| n == "temp");
            if path.is_dir() && !is_staging {
                roots.push(path);
            }
        }
    }
    roots
}
