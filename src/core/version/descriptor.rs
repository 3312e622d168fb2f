// ─── Version Descriptor ───
// Identity of an installed game version: manifest, release date, numeric
// code and installed modloaders. Loaded once before a launch and never
// mutated while the launch runs.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::error::{LauncherError, LauncherResult};

use super::library::MavenCoordinate;
use super::version_file::VersionJson;

/// Main code used for snapshots and names that carry no `1.X` number.
pub const UNKNOWN_MAIN_CODE: u32 = 99;

/// `1.main.sub` of a game version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameCode {
    pub main: u32,
    pub sub: u32,
}

impl GameCode {
    pub fn is_unknown(&self) -> bool {
        self.main == UNKNOWN_MAIN_CODE
    }

    /// Extract the first `1.X[.Y]` run from a version name.
    pub fn parse(name: &str) -> Self {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"(?:^|[^0-9.])1\.(\d+)(?:\.(\d+))?").expect("valid version pattern")
        });

        let Some(caps) = pattern.captures(name) else {
            return Self {
                main: UNKNOWN_MAIN_CODE,
                sub: 0,
            };
        };
        let main = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(UNKNOWN_MAIN_CODE);
        let sub = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        Self { main, sub }
    }
}

/// Installed modloaders and their versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modloaders {
    pub forge: Option<String>,
    pub fabric: Option<String>,
    pub optifine: Option<String>,
}

impl Modloaders {
    pub fn detect(json: &VersionJson) -> Self {
        let mut found = Self::default();
        for lib in &json.libraries {
            let Some(coord) = MavenCoordinate::parse(&lib.name) else {
                continue;
            };
            match (coord.group_id.as_str(), coord.artifact_id.as_str()) {
                ("net.minecraftforge", "forge" | "fmlloader" | "minecraftforge") => {
                    if found.forge.is_none() {
                        found.forge = Some(forge_build(&coord.version));
                    }
                }
                ("net.fabricmc", "fabric-loader") => {
                    found.fabric.get_or_insert(coord.version);
                }
                ("optifine", "OptiFine") => {
                    let version = coord
                        .version
                        .split_once('_')
                        .map(|(_, tail)| tail.to_string())
                        .unwrap_or(coord.version);
                    found.optifine.get_or_insert(version);
                }
                _ => {}
            }
        }
        found
    }
}

/// `1.12.2-14.23.5.2860` → `14.23.5.2860`; `1.7.10-10.13.4.1614-1.7.10` → `10.13.4.1614`.
fn forge_build(version: &str) -> String {
    let mut parts = version.split('-');
    let first = parts.next().unwrap_or(version);
    match parts.next() {
        Some(build) if first.starts_with("1.") => build.to_string(),
        _ => first.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct VersionDescriptor {
    pub name: String,
    /// `versions/<name>`
    pub path: PathBuf,
    /// Game directory handed to the process.
    pub indie_path: PathBuf,
    /// Vanilla version name the code was read from.
    pub game_name: String,
    pub code: GameCode,
    pub release_time: DateTime<Utc>,
    pub modloaders: Modloaders,
    pub inherits_from: Option<String>,
    pub json: VersionJson,
    /// The merged manifest as loaded from disk.
    pub raw_json: Value,
    jar_path: PathBuf,
}

impl VersionDescriptor {
    /// Load `versions/<name>/<name>.json`, merging any `inheritsFrom` parent.
    #[instrument(skip(minecraft_root))]
    pub fn load(minecraft_root: &Path, name: &str) -> LauncherResult<Self> {
        let versions_dir = minecraft_root.join("versions");
        let path = versions_dir.join(name);
        let own = read_json(&path.join(format!("{name}.json")))?;

        let inherits_from = own
            .get("inheritsFrom")
            .and_then(Value::as_str)
            .filter(|parent| !parent.is_empty())
            .map(ToString::to_string);

        let raw_json = match &inherits_from {
            Some(parent) => {
                let parent_json = read_json(&versions_dir.join(parent).join(format!("{parent}.json")))?;
                VersionJson::merge_with_parent_json(&own, &parent_json)
            }
            None => own,
        };
        let json: VersionJson = serde_json::from_value(raw_json.clone())?;

        let game_name = inherits_from
            .clone()
            .or_else(|| json.id.clone())
            .unwrap_or_else(|| name.to_string());
        let code = GameCode::parse(&game_name);
        let release_time = json
            .release_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(DateTime::UNIX_EPOCH);
        let modloaders = Modloaders::detect(&json);

        let own_jar = path.join(format!("{name}.jar"));
        let jar_path = if own_jar.exists() {
            own_jar
        } else {
            let fallback = json.jar.clone().or_else(|| inherits_from.clone());
            match fallback {
                Some(jar) => versions_dir.join(&jar).join(format!("{jar}.jar")),
                None => own_jar,
            }
        };

        debug!(
            "Loaded version {} (game {} code 1.{}.{}, loaders {:?})",
            name, game_name, code.main, code.sub, modloaders
        );

        Ok(Self {
            name: name.to_string(),
            indie_path: path.clone(),
            path,
            game_name,
            code,
            release_time,
            modloaders,
            inherits_from,
            json,
            raw_json,
            jar_path,
        })
    }

    /// Choose the game directory: the version folder when isolated, the
    /// `.minecraft` root otherwise.
    pub fn with_isolation(mut self, isolated: bool, minecraft_root: &Path) -> Self {
        self.indie_path = if isolated {
            self.path.clone()
        } else {
            minecraft_root.to_path_buf()
        };
        self
    }

    pub fn has_forge(&self) -> bool {
        self.modloaders.forge.is_some()
    }

    pub fn has_fabric(&self) -> bool {
        self.modloaders.fabric.is_some()
    }

    pub fn has_optifine(&self) -> bool {
        self.modloaders.optifine.is_some()
    }

    /// Client jar placed at the end of the classpath.
    pub fn jar_path(&self) -> &Path {
        &self.jar_path
    }

    /// Manifest-recommended Java major, if any.
    pub fn recommended_java(&self) -> Option<u32> {
        self.json.java_version.as_ref().map(|j| j.major_version)
    }

    pub fn natives_dir_name(&self) -> String {
        format!("{}-natives", self.name)
    }
}

fn read_json(path: &Path) -> LauncherResult<Value> {
    let raw = std::fs::read_to_string(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}
