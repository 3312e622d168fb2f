use std::path::PathBuf;
use std::sync::Arc;

use crate::core::abort::AbortFlag;
use crate::core::auth::{Credential, LoginController, LoginType};
use crate::core::config::{keys, ConfigExt, ConfigStore};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::{JavaEntry, JavaSelector};
use crate::core::launch::LaunchArguments;
use crate::core::notify::{HostWindow, Notifier};
use crate::core::paths::LauncherPaths;
use crate::core::version::VersionDescriptor;

use super::repair::FileRepair;

/// Per-invocation options, fixed once the pipeline starts.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Server to join on startup, ahead of the version setting.
    pub server_override: Option<String>,
    /// Write a launch script instead of starting the game. An empty path
    /// means the launcher's default script location.
    pub script_export_path: Option<PathBuf>,
    /// Launch this version instead of the selected one.
    pub version_override: Option<String>,
    pub extra_args: Vec<String>,
}

impl LaunchOptions {
    pub fn exports_script(&self) -> bool {
        self.script_export_path.is_some()
    }
}

/// Long-lived collaborators shared by every launch.
pub struct LaunchServices {
    pub config: Arc<dyn ConfigStore>,
    pub notifier: Arc<dyn Notifier>,
    pub window: Arc<dyn HostWindow>,
    pub paths: LauncherPaths,
    pub java: JavaSelector,
    pub login: LoginController,
    /// Repairs missing game files before extraction; skipped when absent.
    pub repair: Option<Arc<dyn FileRepair>>,
}

impl LaunchServices {
    pub fn is_unified_pass(&self) -> bool {
        self.login.login_type() == Some(LoginType::UnifiedPass)
    }

    /// Whether `version` runs in its own folder.
    pub fn is_isolated(&self, version: &str) -> bool {
        match self.config.lookup(keys::VERSION_INDIE, Some(version)) {
            Some(serde_json::Value::Bool(isolated)) => isolated,
            _ => self.config.get_bool(keys::LAUNCH_INDIE, None),
        }
    }

    /// Load `name` from the `.minecraft` folder with its game directory set.
    pub fn load_version(&self, name: &str) -> LauncherResult<VersionDescriptor> {
        let root = self.paths.minecraft_root();
        let version = VersionDescriptor::load(root, name)?;
        Ok(version.with_isolation(self.is_isolated(name), root))
    }
}

/// State of one launch. Values are bound once by the stage that produces
/// them and read by the stages after it.
pub struct LaunchContext {
    pub version: Arc<VersionDescriptor>,
    pub options: LaunchOptions,
    pub abort: AbortFlag,
    pub java: Option<JavaEntry>,
    pub credential: Option<Credential>,
    pub arguments: Option<LaunchArguments>,
    pub natives_dir: PathBuf,
}

impl LaunchContext {
    pub fn new(version: VersionDescriptor, options: LaunchOptions, abort: AbortFlag) -> Self {
        Self {
            version: Arc::new(version),
            options,
            abort,
            java: None,
            credential: None,
            arguments: None,
            natives_dir: PathBuf::new(),
        }
    }

    pub fn java(&self) -> LauncherResult<&JavaEntry> {
        self.java
            .as_ref()
            .ok_or_else(|| LauncherError::Other("no Java bound to this launch".into()))
    }

    pub fn credential(&self) -> LauncherResult<&Credential> {
        self.credential
            .as_ref()
            .ok_or_else(|| LauncherError::Other("no credential bound to this launch".into()))
    }

    pub fn arguments(&self) -> LauncherResult<&LaunchArguments> {
        self.arguments
            .as_ref()
            .ok_or_else(|| LauncherError::Other("launch arguments were not built".into()))
    }
}
