// ─── Host Callbacks ───
// The launch engine never renders anything itself. Hints, blocking
// messages and window actions are forwarded to whatever hosts it.

use tracing::{error, info, warn};

/// Severity of a transient hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintLevel {
    Info,
    Finish,
    Critical,
}

/// User-facing notifications. Only invoked for user-visible outcomes.
pub trait Notifier: Send + Sync {
    fn show_hint(&self, message: &str, level: HintLevel);

    fn show_blocking_message(&self, message: &str, title: &str);

    /// Ask a yes/no question. Returning `false` cancels the operation.
    fn confirm(&self, title: &str, message: &str) -> bool;

    /// Desktop notification, used when the game exits.
    fn show_notification(&self, title: &str, body: &str) {
        self.show_hint(&format!("{title}: {body}"), HintLevel::Info);
    }
}

/// Actions on the launcher's own window.
pub trait HostWindow: Send + Sync {
    fn close(&self);
    fn hide(&self);
    fn minimize(&self);
    fn show(&self);
    fn pause_music(&self);
    fn resume_music(&self);
}

/// Notifier for headless use: everything goes to the log.
#[derive(Debug, Clone)]
pub struct TracingNotifier {
    /// Answer given to every confirmation prompt.
    pub auto_confirm: bool,
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self { auto_confirm: true }
    }
}

impl Notifier for TracingNotifier {
    fn show_hint(&self, message: &str, level: HintLevel) {
        match level {
            HintLevel::Critical => warn!("[hint] {}", message),
            HintLevel::Info | HintLevel::Finish => info!("[hint] {}", message),
        }
    }

    fn show_blocking_message(&self, message: &str, title: &str) {
        error!("[{}] {}", title, message);
    }

    fn confirm(&self, title: &str, message: &str) -> bool {
        info!(
            "[{}] {} -> {}",
            title,
            message,
            if self.auto_confirm { "yes" } else { "no" }
        );
        self.auto_confirm
    }
}

/// Window that does nothing, for hosts without one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWindow;

impl HostWindow for NoWindow {
    fn close(&self) {}
    fn hide(&self) {}
    fn minimize(&self) {}
    fn show(&self) {}
    fn pause_music(&self) {}
    fn resume_music(&self) {}
}
