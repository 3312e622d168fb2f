use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "InterfaceOficial";

/// Well-known directories used during a launch.
#[derive(Debug, Clone)]
pub struct LauncherPaths {
    data_dir: PathBuf,
    temp_dir: PathBuf,
    minecraft_root: PathBuf,
}

impl LauncherPaths {
    pub fn new(data_dir: PathBuf, temp_dir: PathBuf, minecraft_root: PathBuf) -> Self {
        Self {
            data_dir,
            temp_dir,
            minecraft_root,
        }
    }

    /// Per-user data directory of the launcher (config, runtimes, agents).
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// The `.minecraft` folder holding `versions/`, `libraries/` and `assets/`.
    pub fn minecraft_root(&self) -> &Path {
        &self.minecraft_root
    }

    pub fn with_minecraft_root(mut self, root: PathBuf) -> Self {
        self.minecraft_root = root;
        self
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.minecraft_root.join("versions")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.minecraft_root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.minecraft_root.join("assets")
    }

    pub fn runtimes_dir(&self) -> PathBuf {
        self.data_dir.join("runtimes")
    }

    pub fn default_script_path(&self) -> PathBuf {
        let file = if cfg!(windows) {
            "LatestLaunch.bat"
        } else {
            "LatestLaunch.sh"
        };
        self.temp_dir.join(file)
    }

    /// Natives folders tried in order when the version folder is not ASCII.
    pub fn natives_fallback_dirs(&self) -> [PathBuf; 2] {
        [
            self.data_dir.join("natives"),
            std::env::temp_dir().join(APP_DIR_NAME).join("natives"),
        ]
    }
}

static LAUNCHER_PATHS: OnceLock<LauncherPaths> = OnceLock::new();

/// Process-wide default paths, created on first use.
pub fn launcher_paths() -> LauncherResult<&'static LauncherPaths> {
    if let Some(paths) = LAUNCHER_PATHS.get() {
        return Ok(paths);
    }

    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME);
    let temp_dir = std::env::temp_dir().join(APP_DIR_NAME);

    let paths = LauncherPaths {
        data_dir: canonical_or_create_dir(&data_dir)?,
        temp_dir: canonical_or_create_dir(&temp_dir)?,
        minecraft_root: default_minecraft_root(),
    };

    Ok(LAUNCHER_PATHS.get_or_init(|| paths))
}

fn default_minecraft_root() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("minecraft")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    }
}

pub fn canonical_or_create_dir(path: &Path) -> LauncherResult<PathBuf> {
    std::fs::create_dir_all(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::canonicalize(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert a path to the string handed to Java.
pub fn safe_path_str(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java fails to resolve extended-length `\\?\C:\...` paths.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}
