// ─── Java Launch Wrapper ───
// The wrapper jar becomes the `-jar` entry point and starts the real main
// class itself. The desktop launcher installs it under
// `<data>/resources/`; it is copied next to the launcher data before each
// launch because a stale copy may have been left read-only.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::config::{keys, ConfigExt, ConfigStore};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::{safe_path_str, LauncherPaths};

use super::secrets::launch_log;

pub const WRAPPER_FILE: &str = "JavaWrapper.jar";
const WRAPPER_FALLBACK_FILE: &str = "JavaWrapper2.jar";
const BOOTSTRAP_EXPORTS: &str =
    "--add-exports cpw.mods.bootstraplauncher/cpw.mods.bootstraplauncher=ALL-UNNAMED";

/// Where the launcher install keeps the pristine wrapper jar.
pub fn wrapper_source(paths: &LauncherPaths) -> PathBuf {
    paths.data_dir().join("resources").join(WRAPPER_FILE)
}

/// Whether the wrapper is allowed globally and for `version`.
pub fn wrapper_enabled(config: &dyn ConfigStore, version: &str) -> bool {
    !config.get_bool(keys::LAUNCH_ADVANCE_DISABLE_JLW, None)
        && !config.get_bool(keys::VERSION_ADVANCE_DISABLE_JLW, Some(version))
}

/// Copy the wrapper from `source` into `work_dir` and return the copy.
///
/// `None` when no wrapper is installed. A copy that cannot be overwritten
/// is deleted and rewritten; if that fails too the jar is written under a
/// second name.
pub fn extract_wrapper(source: &Path, work_dir: &Path) -> LauncherResult<Option<PathBuf>> {
    let bytes = match std::fs::read(source) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Java wrapper {:?} is not installed, launching without it", source);
            return Ok(None);
        }
        Err(source_err) => return Err(LauncherError::io(source, source_err)),
    };
    std::fs::create_dir_all(work_dir).map_err(|e| LauncherError::io(work_dir, e))?;

    let target = work_dir.join(WRAPPER_FILE);
    debug!("Java wrapper path: {:?}", target);
    let Err(first) = std::fs::write(&target, &bytes) else {
        return Ok(Some(target));
    };
    if !target.exists() {
        return Err(LauncherError::io(&target, first));
    }

    launch_log(&format!("Cannot overwrite the Java wrapper, recreating it: {first}"));
    let rewritten = std::fs::remove_file(&target).and_then(|()| std::fs::write(&target, &bytes));
    match rewritten {
        Ok(()) => Ok(Some(target)),
        Err(second) => {
            launch_log(&format!("Cannot recreate the Java wrapper, using a new file name: {second}"));
            let fallback = work_dir.join(WRAPPER_FALLBACK_FILE);
            std::fs::write(&fallback, &bytes).map_err(|e| LauncherError::io(&fallback, e))?;
            Ok(Some(fallback))
        }
    }
}

/// JVM flags placing the wrapper in front of the main class.
pub fn wrapper_flags(wrapper: &Path, work_dir: &Path, java_code: u32) -> Vec<String> {
    let mut flags = Vec::with_capacity(3);
    if java_code >= 9 {
        flags.push(BOOTSTRAP_EXPORTS.to_string());
    }
    let tmp = safe_path_str(work_dir);
    flags.push(format!(
        "-Doolloo.jlw.tmpdir=\"{}\"",
        tmp.trim_end_matches(['/', '\\'])
    ));
    flags.push(format!("-jar \"{}\"", safe_path_str(wrapper)));
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MemoryConfigStore;
    use crate::core::testing::temp_dir;
    use serde_json::json;

    #[test]
    fn disabled_globally_or_per_version() {
        let config = MemoryConfigStore::default();
        assert!(wrapper_enabled(&config, "1.20.1"));

        config
            .set_for_version(keys::VERSION_ADVANCE_DISABLE_JLW, "1.20.1", json!(true))
            .unwrap();
        assert!(!wrapper_enabled(&config, "1.20.1"));
        assert!(wrapper_enabled(&config, "1.12.2"));

        config.set(keys::LAUNCH_ADVANCE_DISABLE_JLW, json!(true)).unwrap();
        assert!(!wrapper_enabled(&config, "1.12.2"));
    }

    #[test]
    fn missing_wrapper_is_skipped() {
        let root = temp_dir("wrapper", "missing");
        let extracted = extract_wrapper(&root.join("resources").join(WRAPPER_FILE), &root).unwrap();
        assert_eq!(extracted, None);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn wrapper_is_copied_over_stale_copy() {
        let root = temp_dir("wrapper", "copy");
        let source = root.join("resources").join(WRAPPER_FILE);
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, b"wrapper-v2").unwrap();
        let work = root.join("work");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::write(work.join(WRAPPER_FILE), b"wrapper-v1").unwrap();

        let extracted = extract_wrapper(&source, &work).unwrap().unwrap();
        assert_eq!(extracted, work.join(WRAPPER_FILE));
        assert_eq!(std::fs::read(&extracted).unwrap(), b"wrapper-v2");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn blocked_target_falls_back_to_second_name() {
        let root = temp_dir("wrapper", "blocked");
        let source = root.join(WRAPPER_FILE);
        std::fs::write(&source, b"wrapper").unwrap();
        let work = root.join("work");
        // A directory in the way can neither be written nor removed as a file.
        std::fs::create_dir_all(work.join(WRAPPER_FILE).join("held")).unwrap();

        let extracted = extract_wrapper(&source, &work).unwrap().unwrap();
        assert_eq!(extracted, work.join(WRAPPER_FALLBACK_FILE));
        assert_eq!(std::fs::read(&extracted).unwrap(), b"wrapper");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn exports_only_for_modular_runtimes() {
        let work = Path::new("/launcher/data");
        let wrapper = work.join(WRAPPER_FILE);

        let modern = wrapper_flags(&wrapper, work, 17);
        assert_eq!(modern.len(), 3);
        assert_eq!(modern[0], BOOTSTRAP_EXPORTS);
        assert_eq!(modern[1], "-Doolloo.jlw.tmpdir=\"/launcher/data\"");
        assert_eq!(modern[2], "-jar \"/launcher/data/JavaWrapper.jar\"");

        let legacy = wrapper_flags(&wrapper, work, 8);
        assert_eq!(legacy.len(), 2);
        assert!(legacy[0].starts_with("-Doolloo.jlw.tmpdir="));
    }
}
