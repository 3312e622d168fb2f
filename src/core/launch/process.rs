// ─── Game Process ───
// Spawns the game with the built arguments and forwards its output to the
// launch log.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::{debug, info, instrument, warn};

use crate::core::abort::AbortFlag;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::safe_path_str;

use super::secrets::launch_log;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// What the game process is started with.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub executable: PathBuf,
    pub args: Vec<String>,
    /// Working directory and redirected `APPDATA`.
    pub indie_dir: PathBuf,
    pub natives_dir: PathBuf,
}

/// The running game. Owned by exactly one watcher once supervision starts.
#[derive(Debug)]
pub struct ProcessHandle {
    pub(crate) child: Child,
    pub pid: Option<u32>,
}

impl ProcessHandle {
    pub fn from_child(child: Child) -> Self {
        let pid = child.id();
        Self { child, pid }
    }
}

/// Start the game. If an abort arrived while spawning, the fresh process is
/// killed straight away.
#[instrument(skip_all, fields(java = %request.executable.display()))]
pub async fn spawn_game(request: &SpawnRequest, abort: &AbortFlag) -> LauncherResult<ProcessHandle> {
    let mut cmd = tokio::process::Command::new(&request.executable);
    cmd.args(&request.args)
        .current_dir(&request.indie_dir)
        .envs(game_environment(request, |name| std::env::var(name).ok()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(target_os = "windows")]
    cmd.creation_flags(CREATE_NO_WINDOW);

    launch_log(&format!("Launching game process: {}", request.executable.display()));

    let mut child = cmd
        .spawn()
        .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;

    if abort.is_aborted() {
        launch_log("Terminating game process due to launch cancellation");
        let _ = child.start_kill();
        return Err(LauncherError::Aborted);
    }

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, "[MC]"));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, "[MC/ERR]"));
    }

    let handle = ProcessHandle::from_child(child);
    info!("Game process started (pid {:?})", handle.pid);
    Ok(handle)
}

async fn forward_lines<R: AsyncRead + Unpin>(stream: R, tag: &'static str) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end();
        if !line.trim().is_empty() {
            launch_log(&format!("{tag} {line}"));
        }
    }
}

/// Variable the dynamic loader searches for native libraries.
fn library_path_var() -> &'static str {
    if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Variables set on the game process: `APPDATA` is the isolation folder
/// and the natives folder leads the library search path. `inherited` reads
/// the launcher's own environment.
fn game_environment(
    request: &SpawnRequest,
    inherited: impl Fn(&str) -> Option<String>,
) -> Vec<(&'static str, String)> {
    let mut env = vec![("APPDATA", safe_path_str(&request.indie_dir))];

    let var = library_path_var();
    let natives = PathBuf::from(safe_path_str(&request.natives_dir));
    let mut search = vec![natives.clone()];
    if let Some(existing) = inherited(var) {
        search.extend(
            std::env::split_paths(&existing)
                .filter(|dir| !dir.as_os_str().is_empty() && *dir != natives),
        );
    }
    match std::env::join_paths(&search) {
        Ok(joined) => env.push((var, joined.to_string_lossy().into_owned())),
        Err(e) => warn!("Cannot add natives folder to {}: {}", var, e),
    }
    debug!("Game environment: {:?}", env);
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(natives: &str) -> SpawnRequest {
        SpawnRequest {
            executable: PathBuf::from("/jdk/bin/java"),
            args: vec![],
            indie_dir: PathBuf::from("/games/.minecraft/versions/1.20.1"),
            natives_dir: PathBuf::from(natives),
        }
    }

    fn value<'e>(env: &'e [(&'static str, String)], name: &str) -> Option<&'e str> {
        env.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }

    #[test]
    fn appdata_points_at_isolation_folder() {
        let env = game_environment(&request("/games/natives"), |_| None);
        assert_eq!(value(&env, "APPDATA"), Some("/games/.minecraft/versions/1.20.1"));
        assert_eq!(value(&env, library_path_var()), Some("/games/natives"));
    }

    #[cfg(unix)]
    #[test]
    fn natives_lead_the_inherited_search_path_once() {
        let natives = "/games/.minecraft/versions/1.20.1/1.20.1-natives";
        let inherited = format!("/usr/lib::{natives}:/opt/gl/lib");
        let env = game_environment(&request(natives), |name| {
            (name == library_path_var()).then(|| inherited.clone())
        });
        assert_eq!(
            value(&env, library_path_var()),
            Some(format!("{natives}:/usr/lib:/opt/gl/lib").as_str())
        );
    }

    #[tokio::test]
    async fn missing_executable_is_an_execution_error() {
        let dir = std::env::temp_dir();
        let request = SpawnRequest {
            executable: dir.join("interface-no-such-java-binary"),
            args: vec![],
            indie_dir: dir.clone(),
            natives_dir: dir,
        };
        let err = spawn_game(&request, &AbortFlag::new()).await.unwrap_err();
        assert!(matches!(err, LauncherError::JavaExecution(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abort_before_return_kills_process() {
        let dir = std::env::temp_dir();
        let request = SpawnRequest {
            executable: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), "sleep 30".into()],
            indie_dir: dir.clone(),
            natives_dir: dir,
        };
        let abort = AbortFlag::new();
        abort.abort();
        let err = spawn_game(&request, &abort).await.unwrap_err();
        assert!(err.is_aborted());
    }
}
