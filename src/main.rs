//! Interface Launch - headless Minecraft launcher
//!
//! # Commands
//!
//! - `interface-launch launch <version>` - Launch a version and wait for it to exit
//! - `interface-launch launch <version> --export-script [path]` - Write a launch script instead
//! - `interface-launch java` - List the Java runtimes found on this machine
//! - `interface-launch set <key> <value>` - Change a launcher setting
//!
//! Settings live in `launcher_config.json` under the launcher data
//! directory and are shared with the desktop launcher.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info, warn};

use interface_core::core::auth::{HttpMsAuthApi, HttpYggdrasilApi, LoginController};
use interface_core::core::config::{keys, ConfigExt, ConfigStore, JsonConfigStore};
use interface_core::core::error::{ErrorKind, LauncherResult};
use interface_core::core::http::build_http_client;
use interface_core::core::java::{HostJavaLocator, JavaLocator, JavaSelector, MojangRuntimeInstaller};
use interface_core::core::notify::{NoWindow, TracingNotifier};
use interface_core::core::paths::launcher_paths;
use interface_core::core::pipeline::{LibraryRepair, LaunchOptions, LaunchOutcome, LaunchServices, Launcher};

/// Interface Launch - headless Minecraft launcher
#[derive(Parser)]
#[command(name = "interface-launch")]
#[command(about = "Launch Minecraft versions from the command line")]
#[command(version)]
struct Cli {
    /// Use this .minecraft folder instead of the default one
    #[arg(long, global = true)]
    minecraft_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a version
    Launch {
        /// Version folder name under versions/
        version: String,

        /// Join this server once the game has loaded
        #[arg(long)]
        server: Option<String>,

        /// Write a launch script instead of starting the game
        #[arg(long, num_args = 0..=1, value_name = "PATH")]
        export_script: Option<Option<PathBuf>>,

        /// Extra game argument, may be repeated
        #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
        extra_args: Vec<String>,

        /// Return as soon as the game window is up
        #[arg(long)]
        no_wait: bool,
    },

    /// List installed Java runtimes
    Java,

    /// Change a setting. The value is parsed as JSON, falling back to a string.
    Set {
        key: String,
        value: String,

        /// Store the value for this version only
        #[arg(long)]
        version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    interface_core::init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Launch {
            version,
            server,
            export_script,
            extra_args,
            no_wait,
        } => {
            let options = LaunchOptions {
                server_override: server,
                script_export_path: export_script.map(Option::unwrap_or_default),
                version_override: None,
                extra_args,
            };
            launch(cli.minecraft_dir, &version, options, no_wait).await
        }
        Commands::Java => list_java(cli.minecraft_dir).await,
        Commands::Set {
            key,
            value,
            version,
        } => set_config(&key, &value, version.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Launch failures were already reported through the notifier.
            if e.kind() != ErrorKind::Silent {
                error!("{}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn open_config() -> LauncherResult<Arc<JsonConfigStore>> {
    let paths = launcher_paths()?;
    Ok(Arc::new(JsonConfigStore::open(paths.data_dir())?))
}

fn build_services(minecraft_dir: Option<PathBuf>) -> LauncherResult<LaunchServices> {
    let mut paths = launcher_paths()?.clone();
    if let Some(root) = minecraft_dir {
        paths = paths.with_minecraft_root(root);
    }
    let config: Arc<dyn ConfigStore> = open_config()?;
    let notifier = Arc::new(TracingNotifier::default());
    let client = build_http_client()?;

    let locator = Arc::new(HostJavaLocator::new(
        paths.runtimes_dir(),
        paths.minecraft_root().to_path_buf(),
    ));
    let installer = Arc::new(MojangRuntimeInstaller::new(client.clone(), paths.runtimes_dir()));
    let java = JavaSelector::new(config.clone(), notifier.clone(), locator, installer);

    let client_id = config.get_str(keys::LOGIN_MS_CLIENT_ID, None);
    let login = LoginController::new(
        config.clone(),
        Arc::new(HttpMsAuthApi::new(client.clone(), client_id, notifier.clone())),
        Arc::new(HttpYggdrasilApi::new(client.clone())),
    );
    let repair = Arc::new(LibraryRepair::new(client, paths.libraries_dir()));

    Ok(LaunchServices {
        config,
        notifier,
        window: Arc::new(NoWindow),
        paths,
        java,
        login,
        repair: Some(repair),
    })
}

async fn launch(
    minecraft_dir: Option<PathBuf>,
    version: &str,
    options: LaunchOptions,
    no_wait: bool,
) -> LauncherResult<()> {
    let launcher = Arc::new(Launcher::new(Arc::new(build_services(minecraft_dir)?)));

    let interrupt = {
        let launcher = launcher.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() && launcher.abort() {
                warn!("Interrupted, cancelling launch");
            }
        })
    };

    let outcome = launcher.start(version, options).await;
    interrupt.abort();

    match outcome? {
        LaunchOutcome::ScriptExported(path) => {
            println!("{}", path.display());
        }
        LaunchOutcome::Launched(mut session) => {
            if let Some(pid) = session.pid {
                info!("Game running with pid {}", pid);
            }
            if !no_wait {
                let state = session.wait_exit().await;
                info!("Game finished: {:?}", state);
            }
        }
    }
    Ok(())
}

async fn list_java(minecraft_dir: Option<PathBuf>) -> LauncherResult<()> {
    let paths = launcher_paths()?;
    let minecraft_root = minecraft_dir.unwrap_or_else(|| paths.minecraft_root().to_path_buf());
    let locator = HostJavaLocator::new(paths.runtimes_dir(), minecraft_root);

    let mut entries = locator.scan().await?;
    entries.sort_by(|a, b| a.preference(b));
    for entry in entries {
        println!(
            "{:<16} {:<6} {}",
            entry.version.to_string(),
            if entry.is_64bit { "64-bit" } else { "32-bit" },
            entry.executable_path.display()
        );
    }
    Ok(())
}

fn set_config(key: &str, raw: &str, version: Option<&str>) -> LauncherResult<()> {
    let config = open_config()?;
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    match version {
        Some(version) => config.set_for_version(key, version, value)?,
        None => config.set(key, value)?,
    }
    info!("Saved {} to {}", key, config.path().display());
    Ok(())
}
