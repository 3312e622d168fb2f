// ─── Post-launch Handling ───

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::core::config::{keys, ConfigExt, ConfigStore};
use crate::core::notify::{HostWindow, Notifier};

use super::secrets::launch_log;
use super::watcher::ExitCallback;

/// What happens to the launcher window once the game is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityPolicy {
    Close,
    /// Hidden, shown again when the game exits.
    HideUntilExit,
    Hide,
    Minimize,
    Keep,
}

impl VisibilityPolicy {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => VisibilityPolicy::Close,
            2 => VisibilityPolicy::HideUntilExit,
            3 => VisibilityPolicy::Hide,
            4 => VisibilityPolicy::Minimize,
            _ => VisibilityPolicy::Keep,
        }
    }
}

/// Music toggle, visibility policy and the launch counter.
pub fn run_post_launch(config: &dyn ConfigStore, window: &dyn HostWindow) {
    launch_log("Starting post-launch processing");

    if config.get_bool(keys::UI_MUSIC_STOP, None) {
        window.pause_music();
        info!("Music paused");
    } else if config.get_bool(keys::UI_MUSIC_START, None) {
        window.resume_music();
        info!("Music resumed");
    }

    let code = config.get_i64(keys::LAUNCH_VISIBLE, None);
    launch_log(&format!("Launcher visibility: {code}"));
    match VisibilityPolicy::from_code(code) {
        VisibilityPolicy::Close => {
            launch_log("Closing launcher as configured");
            window.close();
        }
        VisibilityPolicy::HideUntilExit | VisibilityPolicy::Hide => {
            launch_log("Hiding launcher as configured");
            window.hide();
        }
        VisibilityPolicy::Minimize => {
            launch_log("Minimizing launcher as configured");
            window.minimize();
        }
        VisibilityPolicy::Keep => {}
    }

    let count = config.get_i64(keys::SYSTEM_LAUNCH_COUNT, None) + 1;
    if let Err(e) = config.set(keys::SYSTEM_LAUNCH_COUNT, json!(count)) {
        warn!("Cannot store launch count: {}", e);
    }
}

/// Callback run when a game that reached Running exits.
pub fn exit_handler(
    config: Arc<dyn ConfigStore>,
    notifier: Arc<dyn Notifier>,
    window: Arc<dyn HostWindow>,
) -> ExitCallback {
    Box::new(move |code| {
        let code = code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
        info!("Game exited with code {}", code);

        if config.get_bool(keys::LAUNCH_NOTIFY_EXIT, None) {
            notifier.show_notification(
                "Minecraft has exited",
                &format!("The game process has ended with code {code}"),
            );
        }
        if VisibilityPolicy::from_code(config.get_i64(keys::LAUNCH_VISIBLE, None))
            == VisibilityPolicy::HideUntilExit
        {
            window.show();
        }
    })
}
