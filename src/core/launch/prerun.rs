// ─── Pre-launch Processing ───
// Files the game reads on startup: the official launcher's profile registry
// and `options.txt`. Failures here never stop a launch.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{instrument, warn};

use crate::core::auth::{Credential, SessionType};
use crate::core::config::{keys, ConfigExt, ConfigStore};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::notify::{HintLevel, Notifier};
use crate::core::version::VersionDescriptor;

use super::secrets::launch_log;

const PROFILE_ACCOUNT_ID: &str = "00000111112222233333444445555566";
const PROFILE_ID: &str = "66666555554444433333222221111100";

pub const ALEX_SKIN_HINT: &str =
    "This Minecraft version does not support Alex skins yet, your skin may appear as Steve!";

/// Run every pre-launch step for the bound version and credential.
#[instrument(skip_all, fields(version = %version.name))]
pub async fn run_prerun(
    config: &dyn ConfigStore,
    notifier: &dyn Notifier,
    minecraft_root: &Path,
    version: &VersionDescriptor,
    credential: &Credential,
) {
    launch_log("Starting pre-launch processing");

    if credential.session_type == SessionType::Microsoft {
        let profiles = minecraft_root.join("launcher_profiles.json");
        if let Err(e) = update_launcher_profiles(&profiles, credential).await {
            warn!("Failed to update launcher_profiles.json: {}", e);
            let _ = tokio::fs::remove_file(&profiles).await;
            match update_launcher_profiles(&profiles, credential).await {
                Ok(()) => launch_log("Updated launcher_profiles.json after deletion"),
                Err(e) => warn!("Failed to update launcher_profiles.json even after deletion: {}", e),
            }
        }
    }

    let language = config.get_str(keys::LAUNCH_LANGUAGE, None);
    let window_type = config.get_i64(keys::LAUNCH_WINDOW_TYPE, None);
    if let Err(e) = update_options(&version.indie_path, version.code.main, &language, window_type).await {
        warn!("Failed to update options.txt: {}", e);
    }

    if needs_alex_skin_warning(config, version, credential) {
        notifier.show_hint(ALEX_SKIN_HINT, HintLevel::Critical);
    }
}

fn needs_alex_skin_warning(config: &dyn ConfigStore, version: &VersionDescriptor, credential: &Credential) -> bool {
    if credential.session_type != SessionType::Legacy || !(2..=7).contains(&version.code.main) {
        return false;
    }
    match config.get_i64(keys::LAUNCH_SKIN_TYPE, None) {
        2 => true,
        4 => config.get_bool(keys::LAUNCH_SKIN_SLIM, None),
        _ => false,
    }
}

// ── launcher_profiles.json ──

async fn update_launcher_profiles(path: &Path, credential: &Credential) -> LauncherResult<()> {
    if !path.exists() {
        let empty = json!({ "profiles": {}, "settings": {}, "version": {} });
        write_json(path, &empty).await?;
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let mut profiles: Map<String, Value> = serde_json::from_str(&raw)?;

    profiles.insert(
        "authenticationDatabase".into(),
        json!({
            PROFILE_ACCOUNT_ID: {
                "username": credential.display_name.replace('"', "-"),
                "profiles": {
                    PROFILE_ID: { "displayName": credential.display_name }
                }
            }
        }),
    );
    profiles.insert("clientToken".into(), json!(credential.client_token));
    profiles.insert(
        "selectedUser".into(),
        json!({ "account": PROFILE_ACCOUNT_ID, "profile": PROFILE_ID }),
    );

    write_json(path, &Value::Object(profiles)).await?;
    launch_log("Updated launcher_profiles.json");
    Ok(())
}

async fn write_json(path: &Path, value: &Value) -> LauncherResult<()> {
    let body = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, body)
        .await
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })
}

// ── options.txt ──

/// `key:value` lines of a game options file, order preserved.
#[derive(Debug, Clone, Default)]
pub struct GameOptions {
    path: PathBuf,
    lines: Vec<String>,
}

impl GameOptions {
    pub async fn load(path: &Path) -> LauncherResult<Self> {
        let lines = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(LauncherError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            lines,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            (k == key).then_some(v)
        })
    }

    pub fn set(&mut self, key: &str, value: &str) {
        let entry = format!("{key}:{value}");
        match self
            .lines
            .iter_mut()
            .find(|line| line.split_once(':').is_some_and(|(k, _)| k == key))
        {
            Some(line) => *line = entry,
            None => self.lines.push(entry),
        }
    }

    /// Set `key` and write the file straight away.
    pub async fn write(&mut self, key: &str, value: &str) -> LauncherResult<()> {
        self.set(key, value);
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LauncherError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let mut body = self.lines.join("\n");
        body.push('\n');
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|source| LauncherError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Language written for a version: old versions spell the region upper-case.
pub fn language_for_version(required: &str, main_code: u32) -> String {
    if main_code >= 12 || required.len() < 2 || !required.is_char_boundary(required.len() - 2) {
        return required.to_string();
    }
    let (head, region) = required.split_at(required.len() - 2);
    format!("{}{}", head, region.to_uppercase())
}

async fn update_options(indie: &Path, main_code: u32, language: &str, window_type: i64) -> LauncherResult<()> {
    let mut path = indie.join("options.txt");
    let mut options = GameOptions::load(&path).await?;

    if !path.exists() {
        let yosbr = indie.join("config").join("yosbr").join("options.txt");
        if yosbr.exists() {
            launch_log("Will modify options.txt in Yosbr Mod");
            path = yosbr;
            options = GameOptions::load(&path).await?;
            options.write("lang", "none").await?;
        }
    }

    let current = options.get("lang").unwrap_or("none").to_string();
    let required = if current == "none" || !indie.join("saves").exists() {
        if language.trim().is_empty() {
            "en_us".to_string()
        } else {
            language.trim().to_lowercase()
        }
    } else {
        current.to_lowercase()
    };
    let target = language_for_version(&required, main_code);

    if current == target {
        launch_log(&format!(
            "Required language is {target}, current language is {current}, no change needed"
        ));
    } else {
        options.write("lang", "-").await?;
        options.write("lang", &target).await?;
        launch_log(&format!("Changed language from {current} to {target}"));
    }

    match window_type {
        0 => options.write("fullscreen", "true").await?,
        1 => {}
        _ => options.write("fullscreen", "false").await?,
    }
    Ok(())
}
