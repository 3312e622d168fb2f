// ─── Custom Commands ───
// User-defined shell commands run before the game, and the `{token}`
// replacement shared by those commands and the launch script.

use std::path::PathBuf;
use std::process::Stdio;

use chrono::Local;
use tracing::{instrument, warn};

use crate::core::abort::AbortFlag;
use crate::core::auth::{Credential, SessionType};
use crate::core::config::{keys, ConfigExt, ConfigStore};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JavaEntry;
use crate::core::paths::LauncherPaths;
use crate::core::version::VersionDescriptor;

use super::secrets::launch_log;

/// Values available to `{token}` replacement.
#[derive(Debug, Clone)]
pub struct ReplaceValues {
    pub minecraft_root: PathBuf,
    pub version_path: PathBuf,
    pub indie_path: PathBuf,
    pub java_folder: PathBuf,
    pub user: String,
    pub uuid: String,
    pub session_type: SessionType,
    pub version_name: String,
    /// Vanilla name, or the version name when it is not recognised.
    pub game_version: String,
}

impl ReplaceValues {
    pub fn new(
        paths: &LauncherPaths,
        version: &VersionDescriptor,
        java: &JavaEntry,
        credential: &Credential,
    ) -> Self {
        let game_version = if version.code.is_unknown() {
            version.name.clone()
        } else {
            version.game_name.clone()
        };
        Self {
            minecraft_root: paths.minecraft_root().to_path_buf(),
            version_path: version.path.clone(),
            indie_path: version.indie_path.clone(),
            java_folder: java.bin_folder.clone(),
            user: credential.display_name.clone(),
            uuid: credential.uuid.clone(),
            session_type: credential.session_type,
            version_name: version.name.clone(),
            game_version,
        }
    }
}

fn login_label(session_type: SessionType) -> &'static str {
    match session_type {
        SessionType::Legacy => "Offline",
        SessionType::Microsoft => "Microsoft",
        SessionType::UnifiedPass => "Unified Pass",
        SessionType::AuthInjector => "Authlib-Injector",
    }
}

/// Expand `{minecraft}`, `{user}`, `{version}` and friends in `raw`.
pub fn argument_replace(raw: &str, values: &ReplaceValues, with_time: bool) -> String {
    let mut text = raw
        .replace("{minecraft}", &values.minecraft_root.to_string_lossy())
        .replace("{verpath}", &values.version_path.to_string_lossy())
        .replace("{verindie}", &values.indie_path.to_string_lossy())
        .replace("{java}", &values.java_folder.to_string_lossy())
        .replace("{user}", &values.user)
        .replace("{uuid}", &values.uuid);

    if with_time {
        let now = Local::now();
        text = text
            .replace("{date}", &now.format("%Y/%m/%d").to_string())
            .replace("{time}", &now.format("%H:%M:%S").to_string());
    }

    let cwd = std::env::current_dir()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default();
    text.replace("{login}", login_label(values.session_type))
        .replace("{name}", &values.version_name)
        .replace("{version}", &values.game_version)
        .replace("{path}", &cwd)
}

/// The global then the version command, expanded, empty ones skipped.
pub fn custom_commands(config: &dyn ConfigStore, values: &ReplaceValues) -> Vec<String> {
    [
        config.get_str(keys::LAUNCH_ADVANCE_RUN, None),
        config.get_str(keys::VERSION_ADVANCE_RUN, Some(&values.version_name)),
    ]
    .into_iter()
    .filter(|command| !command.trim().is_empty())
    .map(|command| argument_replace(command.trim(), values, true))
    .collect()
}

fn should_wait(config: &dyn ConfigStore, version: &str) -> bool {
    match config.lookup(keys::VERSION_ADVANCE_RUN_WAIT, Some(version)) {
        Some(serde_json::Value::Bool(wait)) => wait,
        _ => config.get_bool(keys::LAUNCH_ADVANCE_RUN_WAIT, None),
    }
}

fn shell_command(command: &str) -> tokio::process::Command {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut cmd = tokio::process::Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    };
    cmd.stdin(Stdio::null()).kill_on_drop(false);
    cmd
}

/// Run the configured commands in the game directory.
///
/// Failures are logged and never stop the launch; an abort while waiting
/// kills the running command.
#[instrument(skip_all)]
pub async fn run_custom_commands(
    config: &dyn ConfigStore,
    values: &ReplaceValues,
    abort: &AbortFlag,
) -> LauncherResult<()> {
    let wait = should_wait(config, &values.version_name);
    for command in custom_commands(config, values) {
        abort.check()?;
        launch_log(&format!("Running custom command: {command}"));

        let mut child = match shell_command(&command).current_dir(&values.indie_path).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Custom command failed to start: {}", e);
                launch_log(&format!("Custom command failed to start: {e}"));
                continue;
            }
        };
        if !wait {
            continue;
        }

        tokio::select! {
            status = child.wait() => match status {
                Ok(status) => launch_log(&format!("Custom command exited with {status}")),
                Err(e) => launch_log(&format!("Custom command failed: {e}")),
            },
            _ = abort.cancelled() => {
                let _ = child.start_kill();
                return Err(LauncherError::Aborted);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MemoryConfigStore;
    use crate::core::testing::temp_dir;
    use serde_json::json;
    use std::time::Duration;

    fn values(indie: PathBuf) -> ReplaceValues {
        ReplaceValues {
            minecraft_root: PathBuf::from("/games/.minecraft"),
            version_path: PathBuf::from("/games/.minecraft/versions/Fabric 1.20.1"),
            indie_path: indie,
            java_folder: PathBuf::from("/jdk/bin"),
            user: "Steve".into(),
            uuid: "abc".into(),
            session_type: SessionType::AuthInjector,
            version_name: "Fabric 1.20.1".into(),
            game_version: "1.20.1".into(),
        }
    }

    #[test]
    fn tokens_are_replaced() {
        let values = values(PathBuf::from("/indie"));
        let text = argument_replace(
            "{user}/{uuid} {login} {name} ({version}) in {verindie} via {java} {date}",
            &values,
            false,
        );
        assert_eq!(
            text,
            "Steve/abc Authlib-Injector Fabric 1.20.1 (1.20.1) in /indie via /jdk/bin {date}"
        );
        assert!(!argument_replace("{date} {time}", &values, true).contains('{'));
    }

    #[test]
    fn commands_run_global_first_and_skip_blank() {
        let config = MemoryConfigStore::default();
        config.set(keys::LAUNCH_ADVANCE_RUN, json!("echo {user}")).unwrap();
        config
            .set_for_version(keys::VERSION_ADVANCE_RUN, "Fabric 1.20.1", json!("  "))
            .unwrap();
        let commands = custom_commands(&config, &values(PathBuf::from("/indie")));
        assert_eq!(commands, vec!["echo Steve".to_string()]);
    }

    #[test]
    fn version_wait_setting_overrides_global() {
        let config = MemoryConfigStore::default();
        assert!(should_wait(&config, "a"));
        config
            .set_for_version(keys::VERSION_ADVANCE_RUN_WAIT, "a", json!(false))
            .unwrap();
        assert!(!should_wait(&config, "a"));
        assert!(should_wait(&config, "b"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn commands_run_in_game_directory() {
        let dir = temp_dir("custom", "cwd");
        let config = MemoryConfigStore::default();
        config
            .set(keys::LAUNCH_ADVANCE_RUN, json!("echo {user} > marker.txt"))
            .unwrap();

        run_custom_commands(&config, &values(dir.clone()), &AbortFlag::new())
            .await
            .unwrap();
        let marker = std::fs::read_to_string(dir.join("marker.txt")).unwrap();
        assert_eq!(marker.trim(), "Steve");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abort_kills_waiting_command() {
        let dir = temp_dir("custom", "abort");
        let config = MemoryConfigStore::default();
        config.set(keys::LAUNCH_ADVANCE_RUN, json!("sleep 30")).unwrap();
        let abort = AbortFlag::new();
        let trigger = abort.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.abort();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_custom_commands(&config, &values(dir.clone()), &abort),
        )
        .await
        .expect("command was killed");
        assert!(matches!(result, Err(LauncherError::Aborted)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn failing_command_does_not_abort() {
        let dir = temp_dir("custom", "fail");
        let config = MemoryConfigStore::default();
        config.set(keys::LAUNCH_ADVANCE_RUN, json!("exit 3")).unwrap();
        assert!(run_custom_commands(&config, &values(dir.clone()), &AbortFlag::new())
            .await
            .is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
