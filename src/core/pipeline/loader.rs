// ─── Launch Pipeline ───
// Runs the launch stages in order over one `LaunchContext`. Get Java and
// Complete files run in the background and are joined by the stage that
// needs their result.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::core::abort::AbortFlag;
use crate::core::config::{keys, ConfigExt};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JavaEntry;
use crate::core::launch::arguments::{ArgumentBuilder, LaunchArguments, LAUNCHER_NAME, LAUNCHER_VERSION};
use crate::core::launch::custom::{custom_commands, run_custom_commands, ReplaceValues};
use crate::core::launch::natives::{extract_natives, natives_dir};
use crate::core::launch::post_launch::{exit_handler, run_post_launch};
use crate::core::launch::prerun::run_prerun;
use crate::core::launch::process::{spawn_game, SpawnRequest};
use crate::core::launch::script::{write_launch_script, LaunchScript};
use crate::core::launch::secrets::launch_log;
use crate::core::launch::watcher::{GameState, ProcessWatcher, STARTUP_TIMEOUT};
use crate::core::paths::safe_path_str;
use crate::core::version::VersionDescriptor;

use super::context::{LaunchContext, LaunchOptions, LaunchServices};
use super::task::{ComboTask, StageSpec, TaskState};

pub const GET_JAVA: usize = 0;
pub const LOGIN: usize = 1;
pub const COMPLETE_FILES: usize = 2;
pub const LAUNCH_PARAMETERS: usize = 3;
pub const EXTRACT_FILES: usize = 4;
pub const PRERUN: usize = 5;
pub const CUSTOM_COMMANDS: usize = 6;
pub const LAUNCH_PROCESS: usize = 7;
pub const WAIT_WINDOW: usize = 8;
pub const END_PROCESSING: usize = 9;

const fn stage(name: &'static str, weight: u32, blocking: bool, optional: bool) -> StageSpec {
    StageSpec {
        name,
        weight,
        blocking,
        optional,
    }
}

pub const LAUNCH_STAGES: [StageSpec; 10] = [
    stage("Get Java", 4, false, false),
    stage("Login", 3, true, false),
    stage("Complete files", 15, false, true),
    stage("Get launch parameters", 2, true, false),
    stage("Extract files", 2, true, false),
    stage("Pre-launch processing", 1, true, false),
    stage("Execute custom commands", 1, true, false),
    stage("Launch process", 2, true, false),
    stage("Wait for game window", 1, true, false),
    stage("End processing", 1, true, false),
];

/// How a successful pipeline ended.
#[derive(Debug, Clone)]
pub enum LaunchOutcome {
    Launched(GameSession),
    ScriptExported(PathBuf),
}

/// A game that reached Running. Its watcher keeps running after the
/// pipeline is done.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub pid: Option<u32>,
    state: watch::Receiver<GameState>,
}

impl GameSession {
    #[cfg(test)]
    pub(crate) fn finished(pid: Option<u32>) -> Self {
        let (_, state) = watch::channel(GameState::Closed);
        Self { pid, state }
    }

    pub fn state(&self) -> GameState {
        *self.state.borrow()
    }

    /// Wait until the game process has exited.
    pub async fn wait_exit(&mut self) -> GameState {
        let result = match self.state.wait_for(|state| state.is_terminal()).await {
            Ok(state) => Some(*state),
            Err(_) => None,
        };
        match result {
            Some(state) => state,
            None => self.state(),
        }
    }
}

/// A background stage. Dropping it cancels the stage if still running.
struct BackgroundStage<T> {
    handle: Option<JoinHandle<LauncherResult<T>>>,
}

impl<T> BackgroundStage<T> {
    fn none() -> Self {
        Self { handle: None }
    }

    async fn join(&mut self) -> Option<LauncherResult<T>> {
        let handle = self.handle.take()?;
        Some(handle.await.map_err(LauncherError::from).and_then(|result| result))
    }
}

impl<T> Drop for BackgroundStage<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub struct LaunchPipeline {
    services: Arc<LaunchServices>,
    tasks: ComboTask,
    abort: AbortFlag,
    startup_timeout: Duration,
}

impl LaunchPipeline {
    pub fn new(services: Arc<LaunchServices>) -> Self {
        Self {
            services,
            tasks: ComboTask::new(&LAUNCH_STAGES),
            abort: AbortFlag::new(),
            startup_timeout: STARTUP_TIMEOUT,
        }
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn tasks(&self) -> &ComboTask {
        &self.tasks
    }

    pub fn progress(&self) -> f64 {
        self.tasks.progress()
    }

    pub fn state(&self) -> TaskState {
        self.tasks.state()
    }

    /// Request cancellation; stages notice it at their next check point.
    pub fn abort(&self) {
        self.abort.abort();
    }

    #[instrument(skip_all, fields(version = %version.name))]
    pub async fn run(&self, version: VersionDescriptor, options: LaunchOptions) -> LauncherResult<LaunchOutcome> {
        if !self.tasks.set_state(TaskState::Loading) {
            return Err(LauncherError::Other("launch pipeline already used".into()));
        }
        let mut ctx = LaunchContext::new(version, options, self.abort.clone());
        let mut java = self.spawn_java(&ctx);

        let mut result = self.run_stages(&mut ctx, &mut java).await;

        // A failed background stage stops the others through the abort flag;
        // report its error rather than the abort it caused.
        if matches!(&result, Err(e) if e.is_aborted()) {
            if let Some(Err(first)) = java.join().await {
                if !first.is_aborted() {
                    result = Err(first);
                }
            }
        }

        match &result {
            Ok(_) => {
                self.tasks.abort_unfinished();
                self.tasks.set_state(TaskState::Finished);
            }
            Err(e) if e.is_aborted() => {
                self.tasks.abort_unfinished();
                self.tasks.set_state(TaskState::Aborted);
            }
            Err(e) => {
                warn!("Launch failed: {}", e);
                self.abort.abort();
                self.tasks.abort_unfinished();
                self.tasks.set_state(TaskState::Failed);
            }
        }
        result
    }

    async fn run_stages(
        &self,
        ctx: &mut LaunchContext,
        java: &mut BackgroundStage<JavaEntry>,
    ) -> LauncherResult<LaunchOutcome> {
        let services = self.services.clone();

        // ── Login ──
        let version_name = ctx.version.name.clone();
        let credential = self
            .stage(LOGIN, async {
                let data = services.login.login_data(Some(&version_name))?;
                let report = self.tasks.reporter(LOGIN);
                services.login.start(&data, false, &self.abort, &report).await
            })
            .await?;
        ctx.credential = Some(credential);

        // ── Complete files ──
        let mut repair = self.spawn_repair(ctx);

        // ── Get launch parameters ──
        let selected = java
            .join()
            .await
            .unwrap_or_else(|| Err(LauncherError::Other("Java stage was not started".into())))?;
        ctx.java = Some(selected);
        ctx.natives_dir = natives_dir(&ctx.version, &services.paths);
        let arguments = self
            .stage(LAUNCH_PARAMETERS, async { self.build_arguments(ctx) })
            .await?;
        ctx.arguments = Some(arguments);

        if let Some(target) = ctx.options.script_export_path.clone() {
            self.join_repair(&mut repair).await?;
            let path = if target.as_os_str().is_empty() {
                services.paths.default_script_path()
            } else {
                target
            };
            let written = self.export_script(ctx, &path).await?;
            launch_log(&format!("Launch script saved to: {}", written.display()));
            return Ok(LaunchOutcome::ScriptExported(written));
        }

        // ── Extract files ──
        self.join_repair(&mut repair).await?;
        let natives = ctx.natives_dir.clone();
        self.stage(EXTRACT_FILES, async {
            let report = extract_natives(&ctx.arguments()?.library_tokens, &natives).await?;
            info!(
                "Natives: {} written, {} up to date, {} removed, {} skipped",
                report.written.len(),
                report.up_to_date.len(),
                report.removed.len(),
                report.skipped.len()
            );
            Ok(())
        })
        .await?;

        // ── Pre-launch processing ──
        self.stage(PRERUN, async {
            run_prerun(
                services.config.as_ref(),
                services.notifier.as_ref(),
                services.paths.minecraft_root(),
                &ctx.version,
                ctx.credential()?,
            )
            .await;
            Ok(())
        })
        .await?;

        // ── Execute custom commands ──
        let values = self.replace_values(ctx)?;
        self.stage(CUSTOM_COMMANDS, async {
            run_custom_commands(services.config.as_ref(), &values, &self.abort).await
        })
        .await?;

        // ── Launch process ──
        let handle = self
            .stage(LAUNCH_PROCESS, async {
                let java = ctx.java()?;
                let executable = if cfg!(target_os = "windows") && java.windowed_executable_path.exists() {
                    java.windowed_executable_path.clone()
                } else {
                    java.executable_path.clone()
                };
                let request = SpawnRequest {
                    executable,
                    args: ctx.arguments()?.argv.clone(),
                    indie_dir: ctx.version.indie_path.clone(),
                    natives_dir: ctx.natives_dir.clone(),
                };
                spawn_game(&request, &self.abort).await
            })
            .await?;
        let pid = handle.pid;

        // ── Wait for game window ──
        let state = self
            .stage(WAIT_WINDOW, async {
                self.log_summary(ctx)?;
                let on_exit = exit_handler(
                    services.config.clone(),
                    services.notifier.clone(),
                    services.window.clone(),
                );
                let mut watcher = ProcessWatcher::spawn(handle, self.startup_timeout, on_exit);
                watcher.wait_started(&self.abort).await?;
                Ok(watcher.subscribe())
            })
            .await?;

        // ── End processing ──
        self.stage(END_PROCESSING, async {
            run_post_launch(services.config.as_ref(), services.window.as_ref());
            Ok(())
        })
        .await?;

        Ok(LaunchOutcome::Launched(GameSession { pid, state }))
    }

    /// Run one blocking stage, checking for an abort first.
    async fn stage<T>(&self, index: usize, work: impl Future<Output = LauncherResult<T>>) -> LauncherResult<T> {
        self.abort.check()?;
        self.tasks.begin(index);
        launch_log(&format!("Stage: {}", LAUNCH_STAGES[index].name));
        let result = work.await;
        self.tasks.settle(index, &result);
        result
    }

    fn spawn_stage<T, F>(&self, index: usize, work: F) -> BackgroundStage<T>
    where
        T: Send + 'static,
        F: Future<Output = LauncherResult<T>> + Send + 'static,
    {
        let tasks = self.tasks.clone();
        let abort = self.abort.clone();
        let optional = LAUNCH_STAGES[index].optional;
        tasks.begin(index);
        launch_log(&format!("Stage: {}", LAUNCH_STAGES[index].name));

        let handle = tokio::spawn(async move {
            let result = work.await;
            tasks.settle(index, &result);
            if let Err(e) = &result {
                if !optional && !e.is_aborted() {
                    abort.abort();
                }
            }
            result
        });
        BackgroundStage {
            handle: Some(handle),
        }
    }

    fn spawn_java(&self, ctx: &LaunchContext) -> BackgroundStage<JavaEntry> {
        let services = self.services.clone();
        let version = ctx.version.clone();
        let abort = self.abort.clone();
        let report = self.tasks.reporter(GET_JAVA);
        self.spawn_stage(GET_JAVA, async move {
            abort.check()?;
            let java = services
                .java
                .select(&version, services.is_unified_pass(), &abort, &report)
                .await?;
            launch_log(&format!(
                "Selected Java: {} ({})",
                java.version,
                java.executable_path.display()
            ));
            Ok(java)
        })
    }

    fn spawn_repair(&self, ctx: &LaunchContext) -> BackgroundStage<()> {
        let Some(repair) = self.services.repair.clone() else {
            self.tasks.skip(COMPLETE_FILES);
            return BackgroundStage::none();
        };
        let version = ctx.version.clone();
        let abort = self.abort.clone();
        let report = self.tasks.reporter(COMPLETE_FILES);
        self.spawn_stage(COMPLETE_FILES, async move {
            abort.check()?;
            repair.repair(&version, &abort, &report).await
        })
    }

    /// Wait for file repair. Its failure is logged, an abort is not swallowed.
    async fn join_repair(&self, repair: &mut BackgroundStage<()>) -> LauncherResult<()> {
        match repair.join().await {
            Some(Err(e)) if e.is_aborted() => Err(e),
            Some(Err(e)) => {
                warn!("File repair failed, continuing: {}", e);
                launch_log(&format!("File repair failed: {e}"));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn build_arguments(&self, ctx: &LaunchContext) -> LauncherResult<LaunchArguments> {
        let builder = ArgumentBuilder {
            config: self.services.config.as_ref(),
            notifier: self.services.notifier.as_ref(),
            paths: &self.services.paths,
            version: &ctx.version,
            java: ctx.java()?,
            credential: ctx.credential()?,
            options: &ctx.options,
            natives_dir: &ctx.natives_dir,
        };
        builder.build()
    }

    fn replace_values(&self, ctx: &LaunchContext) -> LauncherResult<ReplaceValues> {
        Ok(ReplaceValues::new(
            &self.services.paths,
            &ctx.version,
            ctx.java()?,
            ctx.credential()?,
        ))
    }

    async fn export_script(&self, ctx: &LaunchContext, path: &Path) -> LauncherResult<PathBuf> {
        let java = ctx.java()?;
        let credential = ctx.credential()?;
        let values = self.replace_values(ctx)?;
        let script = LaunchScript {
            version_name: ctx.version.name.clone(),
            indie_path: ctx.version.indie_path.clone(),
            java_path: java.executable_path.clone(),
            java_code: java.version_code(),
            arguments: ctx.arguments()?.argv.clone(),
            custom_commands: custom_commands(self.services.config.as_ref(), &values),
            session_tokens: vec![credential.access_token.clone(), credential.client_token.clone()],
        };
        write_launch_script(&script, path).await
    }

    fn log_summary(&self, ctx: &LaunchContext) -> LauncherResult<()> {
        let version = &ctx.version;
        let java = ctx.java()?;
        let credential = ctx.credential()?;
        let arguments = ctx.arguments()?;
        let paths = &self.services.paths;

        launch_log("~ Basic Parameters ~");
        launch_log(&format!("Launcher Version: {LAUNCHER_NAME} {LAUNCHER_VERSION}"));
        launch_log(&format!(
            "Game Version: {} (Detected as 1.{}.{})",
            version.game_name, version.code.main, version.code.sub
        ));
        launch_log(&format!("Asset Index: {}", version.json.asset_index_name()));
        launch_log(&format!(
            "Inherited Version: {}",
            version.inherits_from.as_deref().unwrap_or("None")
        ));
        launch_log(&format!(
            "Allocated Memory: {:.1} GB ({} MB)",
            arguments.ram_mb as f64 / 1024.0,
            arguments.ram_mb
        ));
        launch_log(&format!("MC Folder: {}", safe_path_str(paths.minecraft_root())));
        launch_log(&format!("Version Folder: {}", safe_path_str(&version.path)));
        launch_log(&format!("Version Isolation: {}", version.indie_path == version.path));
        launch_log(&format!(
            "Java Info: Java {} ({}-bit) at {}",
            java.version,
            if java.is_64bit { 64 } else { 32 },
            java.executable_path.display()
        ));
        launch_log(&format!(
            "Environment Variables: {}",
            if java.has_environment_registration { "Set" } else { "Not Set" }
        ));
        launch_log(&format!("Natives Folder: {}", safe_path_str(&ctx.natives_dir)));
        launch_log("");
        launch_log("~ Login Parameters ~");
        launch_log(&format!("Player Username: {}", credential.display_name));
        launch_log(&format!("AccessToken: {}", credential.access_token));
        launch_log(&format!("ClientToken: {}", credential.client_token));
        launch_log(&format!("UUID: {}", credential.uuid));
        launch_log(&format!("Login Method: {}", credential.session_type));
        launch_log("");

        let title = self
            .services
            .config
            .get_str(keys::LAUNCH_TITLE, Some(&version.name));
        if !title.trim().is_empty() {
            info!("Window title: {}", title);
        }
        Ok(())
    }
}
