use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

use super::ConfigStore;

const CONFIG_FILE: &str = "launcher_config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigTables {
    #[serde(default)]
    global: Map<String, Value>,
    #[serde(default)]
    versions: BTreeMap<String, Map<String, Value>>,
}

impl ConfigTables {
    fn lookup(&self, key: &str, version: Option<&str>) -> Option<Value> {
        version
            .and_then(|name| self.versions.get(name))
            .and_then(|table| table.get(key))
            .or_else(|| self.global.get(key))
            .cloned()
    }
}

fn lock(tables: &Mutex<ConfigTables>) -> MutexGuard<'_, ConfigTables> {
    // A panic while holding the lock cannot leave a half-written map behind.
    tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─── In-memory store ───

/// Settings that live only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    tables: Mutex<ConfigTables>,
}

impl ConfigStore for MemoryConfigStore {
    fn lookup(&self, key: &str, version: Option<&str>) -> Option<Value> {
        lock(&self.tables).lookup(key, version)
    }

    fn set(&self, key: &str, value: Value) -> LauncherResult<()> {
        lock(&self.tables).global.insert(key.to_string(), value);
        Ok(())
    }

    fn set_for_version(&self, key: &str, version: &str, value: Value) -> LauncherResult<()> {
        lock(&self.tables)
            .versions
            .entry(version.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}

// ─── JSON file store ───

/// Settings persisted to `launcher_config.json`.
///
/// Every write goes to a temp file first and is renamed over the old one, so
/// a crash mid-write leaves the previous file intact.
#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    tables: Mutex<ConfigTables>,
}

impl JsonConfigStore {
    pub fn open(dir: &Path) -> LauncherResult<Self> {
        std::fs::create_dir_all(dir).map_err(|source| LauncherError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(CONFIG_FILE);
        let tables = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("Ignoring unreadable config {:?}: {}", path, err);
                ConfigTables::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ConfigTables::default(),
            Err(source) => return Err(LauncherError::Io { path, source }),
        };
        debug!("Loaded config from {:?}", path);
        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, tables: &ConfigTables) -> LauncherResult<()> {
        let payload = serde_json::to_vec_pretty(tables)?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, payload).map_err(|source| LauncherError::Io {
            path: staging.clone(),
            source,
        })?;
        std::fs::rename(&staging, &self.path).map_err(|source| LauncherError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl ConfigStore for JsonConfigStore {
    fn lookup(&self, key: &str, version: Option<&str>) -> Option<Value> {
        lock(&self.tables).lookup(key, version)
    }

    fn set(&self, key: &str, value: Value) -> LauncherResult<()> {
        let mut tables = lock(&self.tables);
        tables.global.insert(key.to_string(), value);
        self.persist(&tables)
    }

    fn set_for_version(&self, key: &str, version: &str, value: Value) -> LauncherResult<()> {
        let mut tables = lock(&self.tables);
        tables
            .versions
            .entry(version.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.persist(&tables)
    }
}
