// ─── Version File ───
// Parses a Mojang version JSON and evaluates OS / feature rules.

use serde::Deserialize;
use serde_json::{Map, Value};

/// A parsed (and possibly inheritance-merged) Mojang version JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    /// Asset index name on manifests predating `assetIndex`.
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexInfo {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Value>,
    #[serde(default)]
    pub jvm: Vec<Value>,
}

// ─── Library Entry with Rules ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub natives: Option<Map<String, Value>>,
    /// Maven repository base for loader libraries without `downloads`.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
}

// ─── Rule Evaluation ───

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

impl Rule {
    fn applies(&self) -> bool {
        let os_matches = match &self.os {
            None => true,
            Some(os) => {
                let name_ok = os.name.as_deref().map_or(true, |name| name == current_os_name());
                let arch_ok = os.arch.as_deref().map_or(true, |arch| arch == current_arch_name());
                name_ok && arch_ok
            }
        };
        // Launcher features (demo user, custom resolution, quick play) are
        // never advertised; the builder adds those flags itself.
        let features_match = match &self.features {
            None => true,
            Some(features) => features.values().all(|v| v.as_bool() == Some(false)),
        };
        os_matches && features_match
    }
}

/// Mojang rule semantics: start disallowed, the last applicable rule wins.
pub fn rules_allow(rules: &[Rule]) -> bool {
    let mut allowed = false;
    for rule in rules {
        if rule.applies() {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

impl LibraryEntry {
    pub fn is_allowed_for_current_os(&self) -> bool {
        match &self.rules {
            Some(rules) => rules_allow(rules),
            None => true,
        }
    }

    /// Native classifier for this platform, e.g. `natives-windows-64`.
    pub fn native_classifier_for_current_os(&self) -> Option<String> {
        let natives = self.natives.as_ref()?;
        natives.get(current_os_name())?.as_str().map(|s| {
            let arch = if cfg!(target_pointer_width = "64") {
                "64"
            } else {
                "32"
            };
            s.replace("${arch}", arch)
        })
    }
}

/// Mojang OS name for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

fn current_arch_name() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "x86",
        "aarch64" => "arm64",
        _ => "x86_64",
    }
}

impl VersionJson {
    /// True when the manifest uses the structured `arguments` block.
    pub fn has_structured_arguments(&self) -> bool {
        self.arguments.is_some()
    }

    pub fn structured_game_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.game.iter().flat_map(extract_argument_values).collect(),
            None => vec![],
        }
    }

    pub fn structured_jvm_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.jvm.iter().flat_map(extract_argument_values).collect(),
            None => vec![],
        }
    }

    pub fn asset_index_name(&self) -> String {
        self.asset_index
            .as_ref()
            .map(|index| index.id.clone())
            .or_else(|| self.assets.clone())
            .unwrap_or_else(|| "legacy".to_string())
    }

    /// Merge a child version JSON over its parent.
    ///
    /// Scalar keys of the child win. Libraries are concatenated child first;
    /// structured arguments are concatenated parent first.
    pub fn merge_with_parent_json(current_json: &Value, parent_json: &Value) -> Value {
        let mut merged = parent_json.clone();

        if let Some(obj) = current_json.as_object() {
            for (k, v) in obj {
                match k.as_str() {
                    "libraries" => {
                        let mut libraries = v.as_array().cloned().unwrap_or_default();
                        if let Some(parent_libs) = parent_json["libraries"].as_array() {
                            libraries.extend(parent_libs.iter().cloned());
                        }
                        merged[k] = Value::Array(libraries);
                    }
                    "arguments" => {
                        let mut arguments = parent_json
                            .get("arguments")
                            .cloned()
                            .unwrap_or_else(|| Value::Object(Map::new()));
                        for section in ["game", "jvm"] {
                            let Some(child_section) = v.get(section).and_then(Value::as_array)
                            else {
                                continue;
                            };
                            let mut combined = arguments
                                .get(section)
                                .and_then(Value::as_array)
                                .cloned()
                                .unwrap_or_default();
                            combined.extend(child_section.iter().cloned());
                            arguments[section] = Value::Array(combined);
                        }
                        merged[k] = arguments;
                    }
                    _ => merged[k] = v.clone(),
                }
            }
        }

        merged
    }
}

pub fn extract_argument_values(value: &Value) -> Vec<String> {
    if let Some(arg) = value.as_str() {
        return vec![arg.to_string()];
    }

    let Some(obj) = value.as_object() else {
        return vec![];
    };

    if let Some(rules) = obj.get("rules") {
        let rules: Vec<Rule> = serde_json::from_value(rules.clone()).unwrap_or_default();
        if !rules_allow(&rules) {
            return vec![];
        }
    }

    match obj.get("value") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}
