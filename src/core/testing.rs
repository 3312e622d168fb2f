// Fixtures shared by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::abort::AbortFlag;
use crate::core::auth::{Credential, HttpMsAuthApi, HttpYggdrasilApi, LoginController, SessionType};
use crate::core::config::{keys, ConfigStore, MemoryConfigStore};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::{JavaEntry, JavaLocator, JavaSelector, JavaVersion, RuntimeInstaller, RuntimeTarget};
use crate::core::notify::testing::RecordingHost;
use crate::core::paths::LauncherPaths;
use crate::core::pipeline::{FileRepair, LaunchServices};
use crate::core::version::{LibraryToken, VersionDescriptor};

/// Fresh, empty directory under the system temp dir.
pub fn temp_dir(scope: &str, name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("interface-{}-{}-{}", scope, name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_version(root: &Path, name: &str, body: &Value) {
    let dir = root.join("versions").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{name}.json")), body.to_string()).unwrap();
}

pub fn library_token(path: &Path, is_natives: bool) -> LibraryToken {
    LibraryToken {
        name: None,
        local_path: path.to_path_buf(),
        is_natives,
        download_url: None,
        sha1: None,
    }
}

/// A runtime reporting version `1.<minor>.0_<revision>`.
pub fn java_entry(executable: &Path, minor: u32, revision: u32, is_64bit: bool) -> JavaEntry {
    JavaEntry {
        executable_path: executable.to_path_buf(),
        windowed_executable_path: executable.to_path_buf(),
        bin_folder: executable.parent().map(Path::to_path_buf).unwrap_or_default(),
        version: JavaVersion::new(1, minor, 0, revision),
        is_64bit,
        has_environment_registration: false,
    }
}

pub fn java_at(executable: &Path, minor: u32) -> JavaEntry {
    java_entry(executable, minor, 1, true)
}

pub fn credential(session_type: SessionType) -> Credential {
    Credential {
        display_name: "Steve".into(),
        uuid: "00000000000030059000000004c7e3b3".into(),
        access_token: "token-abc".into(),
        client_token: "client-xyz".into(),
        session_type,
        raw_profile: None,
        agent: None,
    }
}

// ── Service fakes ──

pub struct FixedLocator(pub Vec<JavaEntry>);

#[async_trait]
impl JavaLocator for FixedLocator {
    async fn scan(&self) -> LauncherResult<Vec<JavaEntry>> {
        Ok(self.0.clone())
    }
}

pub struct NoInstaller;

#[async_trait]
impl RuntimeInstaller for NoInstaller {
    async fn install(
        &self,
        _target: RuntimeTarget,
        _abort: &AbortFlag,
        _progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<PathBuf> {
        Err(LauncherError::Other("offline".into()))
    }
}

pub struct CountingRepair {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingRepair {
    pub fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileRepair for CountingRepair {
    async fn repair(
        &self,
        _version: &VersionDescriptor,
        _abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress(0.5);
        if self.fail {
            Err(LauncherError::user("repair failed"))
        } else {
            Ok(())
        }
    }
}

// ── Pipeline harness ──

/// A `.minecraft` holding one 1.20.1 version, an offline player and
/// recording host callbacks. Removed on drop.
pub struct Harness {
    pub root: PathBuf,
    pub host: Arc<RecordingHost>,
    pub config: Arc<MemoryConfigStore>,
}

impl Harness {
    pub fn new(name: &str) -> Self {
        let root = temp_dir("pipeline", name);
        write_version(
            &root.join(".minecraft"),
            "1.20.1",
            &json!({
                "id": "1.20.1",
                "mainClass": "net.minecraft.client.main.Main",
                "releaseTime": "2023-06-12T13:25:51+00:00",
                "type": "release",
                "arguments": {
                    "game": ["--username", "${auth_player_name}", "--accessToken", "${auth_access_token}"],
                    "jvm": ["-cp", "${classpath}"]
                }
            }),
        );
        let config = Arc::new(MemoryConfigStore::default());
        config.set(keys::LOGIN_LEGACY_NAME, json!("Steve")).unwrap();
        config.set(keys::LAUNCH_RAM, json!(1024)).unwrap();
        Self {
            root,
            host: Arc::new(RecordingHost::default()),
            config,
        }
    }

    pub fn paths(&self) -> LauncherPaths {
        LauncherPaths::new(
            self.root.join("data"),
            self.root.join("temp"),
            self.root.join(".minecraft"),
        )
    }

    pub fn services(&self, javas: Vec<JavaEntry>, repair: Option<Arc<dyn FileRepair>>) -> Arc<LaunchServices> {
        self.services_with_host(self.host.clone(), javas, repair)
    }

    /// Like `services`, with Java selection prompts answered by `java_host`.
    pub fn services_with_host(
        &self,
        java_host: Arc<RecordingHost>,
        javas: Vec<JavaEntry>,
        repair: Option<Arc<dyn FileRepair>>,
    ) -> Arc<LaunchServices> {
        let config: Arc<dyn ConfigStore> = self.config.clone();
        let client = reqwest::Client::new();
        Arc::new(LaunchServices {
            config: config.clone(),
            notifier: self.host.clone(),
            window: self.host.clone(),
            paths: self.paths(),
            java: JavaSelector::new(
                config.clone(),
                java_host,
                Arc::new(FixedLocator(javas)),
                Arc::new(NoInstaller),
            ),
            login: LoginController::new(
                config,
                Arc::new(HttpMsAuthApi::new(client.clone(), "client".into(), self.host.clone())),
                Arc::new(HttpYggdrasilApi::new(client)),
            ),
            repair,
        })
    }

    pub fn version(&self, services: &LaunchServices) -> VersionDescriptor {
        services.load_version("1.20.1").unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}
