// ─── Configuration ───
// Key/value settings with per-version overrides. The launch engine only
// talks to the `ConfigStore` trait; storage is up to the host.

pub mod keys;
mod store;

use serde_json::Value;

use crate::core::error::LauncherResult;

pub use store::{JsonConfigStore, MemoryConfigStore};

/// Persistent settings consumed by the launch engine.
///
/// Reads and writes are atomic per key. A version-scoped lookup falls back
/// to the global value when the version has no entry of its own.
pub trait ConfigStore: Send + Sync {
    /// Raw lookup without built-in defaults.
    fn lookup(&self, key: &str, version: Option<&str>) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> LauncherResult<()>;

    fn set_for_version(&self, key: &str, version: &str, value: Value) -> LauncherResult<()>;
}

/// Typed accessors layered over any `ConfigStore`.
pub trait ConfigExt {
    fn get(&self, key: &str, version: Option<&str>) -> Value;
    fn get_str(&self, key: &str, version: Option<&str>) -> String;
    fn get_i64(&self, key: &str, version: Option<&str>) -> i64;
    fn get_bool(&self, key: &str, version: Option<&str>) -> bool;
    /// Version value when non-empty, otherwise the global fallback key.
    fn version_or_global(&self, version_key: &str, version: &str, global_key: &str) -> String;
}

impl<T: ConfigStore + ?Sized> ConfigExt for T {
    fn get(&self, key: &str, version: Option<&str>) -> Value {
        self.lookup(key, version)
            .or_else(|| keys::default_value(key))
            .unwrap_or(Value::Null)
    }

    fn get_str(&self, key: &str, version: Option<&str>) -> String {
        match self.get(key, version) {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn get_i64(&self, key: &str, version: Option<&str>) -> i64 {
        match self.get(key, version) {
            Value::Number(n) => n.as_i64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            Value::Bool(b) => i64::from(b),
            _ => 0,
        }
    }

    fn get_bool(&self, key: &str, version: Option<&str>) -> bool {
        match self.get(key, version) {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn version_or_global(&self, version_key: &str, version: &str, global_key: &str) -> String {
        let scoped = self.get_str(version_key, Some(version));
        if scoped.trim().is_empty() {
            self.get_str(global_key, None)
        } else {
            scoped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_scope_falls_back_to_global() {
        let store = MemoryConfigStore::default();
        store.set("LaunchArgumentWindowType", json!(0)).unwrap();
        assert_eq!(store.get_i64("LaunchArgumentWindowType", Some("1.20.1")), 0);

        store
            .set_for_version("LaunchArgumentWindowType", "1.20.1", json!(2))
            .unwrap();
        assert_eq!(store.get_i64("LaunchArgumentWindowType", Some("1.20.1")), 2);
        assert_eq!(store.get_i64("LaunchArgumentWindowType", Some("1.8.9")), 0);
        assert_eq!(store.get_i64("LaunchArgumentWindowType", None), 0);
    }

    #[test]
    fn built_in_defaults_apply_when_unset() {
        let store = MemoryConfigStore::default();
        assert_eq!(store.get_i64(keys::LAUNCH_WINDOW_TYPE, None), 1);
        assert_eq!(store.get_str(keys::LAUNCH_ARGUMENT_INFO, None), "Interface");
        assert!(store.get_bool(keys::LAUNCH_INDIE, None));
        assert_eq!(store.get_str("SomethingUnknown", None), "");
    }

    #[test]
    fn version_or_global_skips_empty_scoped_values() {
        let store = MemoryConfigStore::default();
        store.set(keys::LAUNCH_ADVANCE_GAME, json!("--demo")).unwrap();
        store
            .set_for_version(keys::VERSION_ADVANCE_GAME, "a", json!("  "))
            .unwrap();
        assert_eq!(
            store.version_or_global(keys::VERSION_ADVANCE_GAME, "a", keys::LAUNCH_ADVANCE_GAME),
            "--demo"
        );
        store
            .set_for_version(keys::VERSION_ADVANCE_GAME, "a", json!("--width 10"))
            .unwrap();
        assert_eq!(
            store.version_or_global(keys::VERSION_ADVANCE_GAME, "a", keys::LAUNCH_ADVANCE_GAME),
            "--width 10"
        );
    }
}
