// ─── Process Watcher ───
// Supervises the game after spawn. The game counts as started once it has
// survived the startup window; exiting before that is a crash.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tracing::{info, warn};

use crate::core::abort::AbortFlag;
use crate::core::error::{LauncherError, LauncherResult};

use super::process::ProcessHandle;
use super::secrets::launch_log;

/// How long the game must stay alive before it counts as running.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Loading,
    Running,
    Crashed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    /// The startup window elapsed (or a window was seen).
    Started,
    Exited,
}

impl GameState {
    pub fn is_terminal(self) -> bool {
        matches!(self, GameState::Crashed | GameState::Closed)
    }

    /// The only transitions: Loading → Running | Crashed, Running → Closed.
    pub fn next(self, event: WatchEvent) -> GameState {
        match (self, event) {
            (GameState::Loading, WatchEvent::Started) => GameState::Running,
            (GameState::Loading, WatchEvent::Exited) => GameState::Crashed,
            (GameState::Running, WatchEvent::Exited) => GameState::Closed,
            (state, _) => state,
        }
    }
}

/// Called once with the exit code when a running game exits.
pub type ExitCallback = Box<dyn FnOnce(Option<i32>) + Send + 'static>;

pub struct ProcessWatcher {
    state: watch::Receiver<GameState>,
    kill: Arc<Notify>,
}

impl ProcessWatcher {
    /// Take ownership of the process and start supervising it.
    pub fn spawn(handle: ProcessHandle, startup: Duration, on_exit: ExitCallback) -> Self {
        let (tx, rx) = watch::channel(GameState::Loading);
        let kill = Arc::new(Notify::new());
        tokio::spawn(supervise(handle, startup, tx, kill.clone(), on_exit));
        Self { state: rx, kill }
    }

    pub fn state(&self) -> GameState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.state.clone()
    }

    pub fn kill(&self) {
        self.kill.notify_one();
    }

    /// Wait until the game is running. A crash during startup is reported
    /// as a silent failure, its output is already in the log.
    pub async fn wait_started(&mut self, abort: &AbortFlag) -> LauncherResult<()> {
        loop {
            match *self.state.borrow_and_update() {
                GameState::Running | GameState::Closed => return Ok(()),
                GameState::Crashed => {
                    return Err(LauncherError::Silent("game crashed during startup".into()))
                }
                GameState::Loading => {}
            }

            tokio::select! {
                changed = self.state.changed() => {
                    if changed.is_err() {
                        return Err(LauncherError::Silent("game watcher stopped".into()));
                    }
                }
                _ = abort.cancelled() => {
                    launch_log("Killing game process due to launch cancellation");
                    self.kill();
                    return Err(LauncherError::Aborted);
                }
            }
        }
    }
}

async fn supervise(
    mut handle: ProcessHandle,
    startup: Duration,
    tx: watch::Sender<GameState>,
    kill: Arc<Notify>,
    on_exit: ExitCallback,
) {
    let timer = tokio::time::sleep(startup);
    tokio::pin!(timer);
    let mut started = false;

    let status = loop {
        tokio::select! {
            status = handle.child.wait() => break status,
            _ = &mut timer, if !started => {
                started = true;
                tx.send_modify(|state| *state = state.next(WatchEvent::Started));
                launch_log("Game window detected!");
            }
            _ = kill.notified() => {
                if let Err(e) = handle.child.start_kill() {
                    warn!("Cannot kill game process: {}", e);
                }
            }
        }
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!("Lost track of game process: {}", e);
            None
        }
    };
    launch_log(&format!("Game process exited with code {}", code.map_or("unknown".to_string(), |c| c.to_string())));

    let before = *tx.borrow();
    tx.send_modify(|state| *state = state.next(WatchEvent::Exited));
    match before {
        GameState::Loading => launch_log("Game crashed during startup!"),
        GameState::Running => on_exit(code),
        _ => info!("Exit after terminal state {:?}", before),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn transitions_are_monotonic() {
        use GameState::*;
        assert_eq!(Loading.next(WatchEvent::Started), Running);
        assert_eq!(Loading.next(WatchEvent::Exited), Crashed);
        assert_eq!(Running.next(WatchEvent::Exited), Closed);
        assert_eq!(Running.next(WatchEvent::Started), Running);
        assert_eq!(Crashed.next(WatchEvent::Started), Crashed);
        assert_eq!(Closed.next(WatchEvent::Exited), Closed);
        assert!(Crashed.is_terminal() && Closed.is_terminal());
        assert!(!Running.is_terminal());
    }

    #[cfg(unix)]
    fn shell(script: &str) -> ProcessHandle {
        let child = tokio::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(script)
            .spawn()
            .unwrap();
        ProcessHandle::from_child(child)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn early_exit_is_a_silent_crash() {
        let exits = Arc::new(Mutex::new(Vec::new()));
        let seen = exits.clone();
        let mut watcher = ProcessWatcher::spawn(
            shell("exit 1"),
            Duration::from_secs(5),
            Box::new(move |code| seen.lock().unwrap().push(code)),
        );

        let err = watcher.wait_started(&AbortFlag::new()).await.unwrap_err();
        assert!(matches!(err, LauncherError::Silent(_)));
        assert_eq!(watcher.state(), GameState::Crashed);
        assert!(exits.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn surviving_startup_runs_then_reports_exit() {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let mut watcher = ProcessWatcher::spawn(
            shell("sleep 0.3; exit 3"),
            Duration::from_millis(50),
            Box::new(move |code| {
                let _ = done_tx.send(code);
            }),
        );

        watcher.wait_started(&AbortFlag::new()).await.unwrap();
        let code = tokio::time::timeout(Duration::from_secs(5), done_rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code, Some(3));

        let mut states = watcher.subscribe();
        let _ = states.wait_for(|state| *state == GameState::Closed).await;
        assert_eq!(watcher.state(), GameState::Closed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abort_while_loading_kills_the_game() {
        let mut watcher = ProcessWatcher::spawn(
            shell("sleep 30"),
            Duration::from_secs(30),
            Box::new(|_| {}),
        );
        let abort = AbortFlag::new();
        abort.abort();

        let err = watcher.wait_started(&abort).await.unwrap_err();
        assert!(err.is_aborted());

        let mut states = watcher.subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|state| state.is_terminal()),
        )
        .await
        .expect("process was killed")
        .unwrap();
    }
}
