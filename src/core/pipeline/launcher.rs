// ─── Launcher ───
// Entry point used by hosts: rejects concurrent launches, runs the
// pre-checks, drives one `LaunchPipeline` and reports how it ended.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info, instrument};

use crate::core::error::{ErrorKind, LauncherError, LauncherResult};
use crate::core::notify::HintLevel;
use crate::core::paths::safe_path_str;
use crate::core::version::VersionDescriptor;

use super::context::{LaunchOptions, LaunchServices};
use super::loader::{LaunchOutcome, LaunchPipeline};
use super::task::TaskState;

pub const ALREADY_LAUNCHING: &str = "A game is already launching!";

pub struct Launcher {
    services: Arc<LaunchServices>,
    active: Mutex<Option<Arc<LaunchPipeline>>>,
}

/// Clears the active pipeline when the launch ends, however it ends.
struct ActiveGuard<'a> {
    launcher: &'a Launcher,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        *self.launcher.active() = None;
    }
}

impl Launcher {
    pub fn new(services: Arc<LaunchServices>) -> Self {
        Self {
            services,
            active: Mutex::new(None),
        }
    }

    pub fn services(&self) -> &Arc<LaunchServices> {
        &self.services
    }

    fn active(&self) -> MutexGuard<'_, Option<Arc<LaunchPipeline>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_launching(&self) -> bool {
        self.active()
            .as_ref()
            .is_some_and(|pipeline| pipeline.state() == TaskState::Loading)
    }

    /// Progress of the running launch, if any.
    pub fn progress(&self) -> Option<f64> {
        self.active().as_ref().map(|pipeline| pipeline.progress())
    }

    /// Cancel the running launch. Returns whether one was running.
    pub fn abort(&self) -> bool {
        match self.active().as_ref() {
            Some(pipeline) => {
                pipeline.abort();
                true
            }
            None => false,
        }
    }

    /// Launch `selected`, or `options.version_override` when set.
    ///
    /// Every outcome is reported through the notifier before returning.
    #[instrument(skip(self, options))]
    pub async fn start(&self, selected: &str, options: LaunchOptions) -> LauncherResult<LaunchOutcome> {
        let notifier = self.services.notifier.clone();
        let pipeline = {
            let mut active = self.active();
            if active.is_some() {
                notifier.show_hint(ALREADY_LAUNCHING, HintLevel::Critical);
                return Err(LauncherError::Silent("a launch is already running".into()));
            }
            let pipeline = Arc::new(LaunchPipeline::new(self.services.clone()));
            *active = Some(pipeline.clone());
            pipeline
        };
        let _guard = ActiveGuard { launcher: self };

        let name = options.version_override.as_deref().unwrap_or(selected);
        if options.version_override.is_some() {
            info!("Switching to version {} before launch", name);
        }
        let version = match self.services.load_version(name) {
            Ok(version) => version,
            Err(e) => {
                let reason = format!("Cannot launch Minecraft: {e}");
                notifier.show_hint(&reason, HintLevel::Critical);
                return Err(LauncherError::Silent(reason));
            }
        };

        let exporting = options.exports_script();
        let result = match self.precheck(&version) {
            Ok(()) => pipeline.run(version.clone(), options).await,
            Err(e) => Err(e),
        };
        self.report(&version, exporting, &result);
        result
    }

    /// Conditions checked before any stage runs.
    pub fn precheck(&self, version: &VersionDescriptor) -> LauncherResult<()> {
        for path in [&version.indie_path, &version.path] {
            let text = safe_path_str(path);
            if text.contains('!') || text.contains(';') {
                return Err(LauncherError::user(format!(
                    "The game path contains \"!\" or \";\", which stops Minecraft from starting. Move the game to another folder.\n\nPath: {text}"
                )));
            }
        }
        let blocked = self.services.login.login_able(Some(&version.name));
        if !blocked.is_empty() {
            return Err(LauncherError::user(blocked));
        }
        info!("Pre-checks passed");
        Ok(())
    }

    fn report(&self, version: &VersionDescriptor, exporting: bool, result: &LauncherResult<LaunchOutcome>) {
        let notifier = &self.services.notifier;
        let title = if exporting {
            "Export Launch Script Failed"
        } else {
            "Launch Failed"
        };

        match result {
            Ok(LaunchOutcome::Launched(_)) => {
                notifier.show_hint(&format!("{} launched successfully!", version.name), HintLevel::Finish);
            }
            Ok(LaunchOutcome::ScriptExported(_)) => {
                notifier.show_hint("Launch script export successful!", HintLevel::Finish);
            }
            Err(e) if e.is_aborted() => {
                let hint = if exporting {
                    "Export launch script cancelled!"
                } else {
                    "Launch cancelled!"
                };
                notifier.show_hint(hint, HintLevel::Info);
            }
            Err(e) => match e.kind() {
                ErrorKind::Silent => info!("Launch stopped: {}", e),
                ErrorKind::UserVisible(message) => notifier.show_blocking_message(&message, title),
                ErrorKind::Unclassified => {
                    error!("Launch failed: {:?}", e);
                    notifier.show_blocking_message(&e.to_string(), title);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{keys, ConfigStore};
    use crate::core::testing::{java_at, Harness};
    use crate::core::pipeline::loader::GameSession;
    use serde_json::json;
    use std::path::PathBuf;

    #[cfg(unix)]
    #[tokio::test]
    async fn script_export_is_reported_as_success() {
        let harness = Harness::new("facade-export");
        let services = harness.services(vec![java_at(&PathBuf::from("/bin/sh"), 17)], None);
        let launcher = Launcher::new(services);

        let outcome = launcher
            .start(
                "1.20.1",
                LaunchOptions {
                    script_export_path: Some(harness.root.join("launch.sh")),
                    ..LaunchOptions::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, LaunchOutcome::ScriptExported(_)));
        assert_eq!(
            harness.host.hints(),
            vec![("Launch script export successful!".to_string(), HintLevel::Finish)]
        );
        assert!(!launcher.is_launching());
        assert_eq!(launcher.progress(), None);
    }

    #[tokio::test]
    async fn unknown_override_version_is_reported() {
        let harness = Harness::new("facade-override");
        let launcher = Launcher::new(harness.services(vec![], None));

        let err = launcher
            .start(
                "1.20.1",
                LaunchOptions {
                    version_override: Some("missing".into()),
                    ..LaunchOptions::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::Silent(_)));
        let hints = harness.host.hints();
        assert_eq!(hints.len(), 1);
        assert!(hints[0].0.starts_with("Cannot launch Minecraft: "));
        assert_eq!(hints[0].1, HintLevel::Critical);
    }

    #[tokio::test]
    async fn empty_player_name_fails_precheck() {
        let harness = Harness::new("facade-name");
        harness.config.set(keys::LOGIN_LEGACY_NAME, json!("")).unwrap();
        let launcher = Launcher::new(harness.services(vec![], None));

        let err = launcher.start("1.20.1", LaunchOptions::default()).await.unwrap_err();
        assert!(matches!(err, LauncherError::UserVisible(_)));
        assert_eq!(
            harness.host.messages(),
            vec![("Player name cannot be empty".to_string(), "Launch Failed".to_string())]
        );
    }

    #[tokio::test]
    async fn second_launch_is_rejected_while_one_runs() {
        let harness = Harness::new("facade-busy");
        let launcher = Launcher::new(harness.services(vec![], None));
        *launcher.active() = Some(Arc::new(LaunchPipeline::new(launcher.services().clone())));

        let err = launcher.start("1.20.1", LaunchOptions::default()).await.unwrap_err();
        assert!(matches!(err, LauncherError::Silent(_)));
        assert_eq!(
            harness.host.hints(),
            vec![(ALREADY_LAUNCHING.to_string(), HintLevel::Critical)]
        );
        assert!(launcher.abort());
    }

    #[tokio::test]
    async fn cancelled_launch_reports_info_hint() {
        let harness = Harness::new("facade-cancel");
        let launcher = Launcher::new(harness.services(vec![], None));
        let version = launcher.services().load_version("1.20.1").unwrap();

        launcher.report(&version, true, &Err(LauncherError::Aborted));
        launcher.report(&version, false, &Err(LauncherError::Aborted));
        launcher.report(&version, false, &Err(LauncherError::Silent("shown".into())));
        launcher.report(&version, false, &Ok(LaunchOutcome::Launched(GameSession::finished(None))));
        assert_eq!(
            harness.host.hints(),
            vec![
                ("Export launch script cancelled!".to_string(), HintLevel::Info),
                ("Launch cancelled!".to_string(), HintLevel::Info),
                ("1.20.1 launched successfully!".to_string(), HintLevel::Finish),
            ]
        );
        assert!(harness.host.messages().is_empty());
    }

    #[test]
    fn unclassified_errors_show_their_text() {
        let harness = Harness::new("facade-unclassified");
        let launcher = Launcher::new(harness.services(vec![], None));
        let version = launcher.services().load_version("1.20.1").unwrap();

        launcher.report(&version, true, &Err(LauncherError::Other("disk on fire".into())));
        assert_eq!(
            harness.host.messages(),
            vec![("disk on fire".to_string(), "Export Launch Script Failed".to_string())]
        );
    }

    #[test]
    fn paths_with_separators_fail_precheck() {
        let harness = Harness::new("facade-bang");
        let launcher = Launcher::new(harness.services(vec![], None));
        let mut version = launcher.services().load_version("1.20.1").unwrap();
        version.indie_path = PathBuf::from("/games/wow!/versions/1.20.1");

        let err = launcher.precheck(&version).unwrap_err();
        assert!(matches!(err, LauncherError::UserVisible(ref m) if m.contains("Path: /games/wow!")));
    }
}
