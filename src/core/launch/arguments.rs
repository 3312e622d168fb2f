// ─── Launch Arguments ───
// Builds the full command line of the game: JVM flags, game flags, token
// substitution, server auto-connect and the user's extra arguments.
//
// The line is assembled as text first (manifests and settings are text),
// then split into argv once every token has been resolved.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, instrument, warn};

use crate::core::auth::{AgentBinding, Credential};
use crate::core::config::{keys, ConfigExt, ConfigStore};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JavaEntry;
use crate::core::notify::{HintLevel, Notifier};
use crate::core::paths::{safe_path_str, LauncherPaths};
use crate::core::pipeline::LaunchOptions;
use crate::core::version::{resolve_library_tokens, LibraryToken, VersionDescriptor};

use super::secrets::{launch_log, mask_tokens, LOG_MASK};
use super::wrapper::{extract_wrapper, wrapper_enabled, wrapper_flags, wrapper_source};

pub const LAUNCHER_NAME: &str = "InterfaceOficial";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

const HEAP_DUMP_FLAG: &str =
    "-XX:HeapDumpPath=MojangTricksIntelDriversForPerformance_javaw.exe_minecraft.exe.heapdump";
const LOG4J_FLAG: &str = "-Dlog4j2.formatMsgNoLookups=true";
const DEFAULT_SERVER_PORT: &str = "25565";
const OPTIFINE_SERVER_HINT: &str = "OptiFine may not be compatible with automatic server connection, which could cause texture loss or even game crashes!";
pub const NO_MAIN_CLASS: &str = "No mainClass item in version json!";

/// Result of argument construction.
#[derive(Debug, Clone)]
pub struct LaunchArguments {
    /// Arguments handed to the runtime, quotes already resolved.
    pub argv: Vec<String>,
    /// Every library the version needs, natives included.
    pub library_tokens: Vec<LibraryToken>,
    /// Heap size in MB.
    pub ram_mb: u64,
}

impl LaunchArguments {
    /// The arguments as one line, quoted where needed.
    pub fn command_line(&self) -> String {
        self.argv
            .iter()
            .map(|arg| quote_argument(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything the command line is built from. All borrowed, nothing mutated.
pub struct ArgumentBuilder<'a> {
    pub config: &'a dyn ConfigStore,
    pub notifier: &'a dyn Notifier,
    pub paths: &'a LauncherPaths,
    pub version: &'a VersionDescriptor,
    pub java: &'a JavaEntry,
    pub credential: &'a Credential,
    pub options: &'a LaunchOptions,
    pub natives_dir: &'a Path,
}

impl ArgumentBuilder<'_> {
    #[instrument(skip_all, fields(version = %self.version.name))]
    pub fn build(&self) -> LauncherResult<LaunchArguments> {
        launch_log("Starting to get Minecraft launch arguments");
        let version = self.version;
        let ram_mb = version_ram_mb(
            self.config,
            &version.name,
            self.java.is_64bit,
            physical_memory_mb(),
        );

        // ── JVM ──
        let mut jvm = self.jvm_args(ram_mb);
        for (position, agent) in self.agent_flags().into_iter().enumerate() {
            jvm.insert(position, agent);
        }
        if self.java.version_code() > 8 {
            add_encoding_flags(&mut jvm);
        }
        jvm.extend(self.wrapper_flags()?);
        let main_class = version
            .json
            .main_class
            .as_deref()
            .filter(|class| !class.trim().is_empty())
            .ok_or_else(|| LauncherError::user(NO_MAIN_CLASS))?;
        jvm.push(main_class.to_string());

        // ── Game ──
        let mut line = jvm.join(" ");
        if let Some(flat) = version
            .json
            .minecraft_arguments
            .as_deref()
            .filter(|args| !args.trim().is_empty())
        {
            launch_log("Getting old Game arguments");
            line.push(' ');
            line.push_str(flat);
        }
        let structured_game = version.json.structured_game_args();
        if !structured_game.is_empty() {
            launch_log("Getting new Game arguments");
            line.push(' ');
            line.push_str(&join_quoted(&structured_game));
        }

        // ── Tokens ──
        let library_tokens =
            resolve_library_tokens(&version.json, &self.paths.libraries_dir());
        let classpath = build_classpath(&library_tokens, version.jar_path());
        let mut table = self.token_table(&classpath);
        if table_value(&table, "${version_type}").is_empty() {
            line = line.replace(" --versionType ${version_type}", "");
            set_table_value(&mut table, "${version_type}", "\"\"");
        }
        line = substitute_tokens(&line, &table);

        // ── Fixups and extras ──
        line = line.replace(" -Dos.name=Windows 10", " -Dos.name=\"Windows 10\"");
        if self.config.get_i64(keys::LAUNCH_WINDOW_TYPE, None) == 0 {
            line.push_str(" --fullscreen");
        }
        for extra in &self.options.extra_args {
            line.push(' ');
            line.push_str(extra.trim());
        }
        if let Some(server) = self.server_address() {
            line.push_str(&server_clause(&server, version.release_time));
            if !is_quick_play(version.release_time) && version.has_optifine() {
                self.notifier
                    .show_hint(OPTIFINE_SERVER_HINT, HintLevel::Critical);
            }
        }
        let custom_game = self.config.version_or_global(
            keys::VERSION_ADVANCE_GAME,
            &version.name,
            keys::LAUNCH_ADVANCE_GAME,
        );
        if !custom_game.trim().is_empty() {
            line.push(' ');
            line.push_str(custom_game.trim());
        }

        let argv = drop_unresolved(split_arguments(&line));
        let arguments = LaunchArguments {
            argv,
            library_tokens,
            ram_mb,
        };
        launch_log("Minecraft launch arguments:");
        launch_log(&mask_tokens(
            &arguments.command_line(),
            &[self.credential.access_token.as_str(), self.credential.client_token.as_str()],
            LOG_MASK,
        ));
        Ok(arguments)
    }

    fn custom_jvm(&self) -> String {
        let mut custom = self.config.version_or_global(
            keys::VERSION_ADVANCE_JVM,
            &self.version.name,
            keys::LAUNCH_ADVANCE_JVM,
        );
        if !custom.contains(LOG4J_FLAG) {
            custom.push(' ');
            custom.push_str(LOG4J_FLAG);
        }
        custom
            .replace(" -XX:MaxDirectMemorySize=256M", "")
            .trim()
            .to_string()
    }

    /// Custom flags, manifest flags, then heap. Flat manifests carry no JVM
    /// section, so the library path and classpath are added here.
    fn jvm_args(&self, ram_mb: u64) -> Vec<String> {
        let structured = self.version.json.has_structured_arguments();
        launch_log(if structured {
            "Getting new JVM arguments"
        } else {
            "Getting old JVM arguments"
        });
        let mut list = vec![self.custom_jvm()];
        if structured {
            list.extend(
                self.version
                    .json
                    .structured_jvm_args()
                    .iter()
                    .map(|arg| quote_if_spaced(arg)),
            );
        }
        list.push(HEAP_DUMP_FLAG.to_string());
        list.push(format!("-Xmn{}m", (ram_mb as f64 * 0.15).floor() as u64));
        list.push(format!("-Xmx{ram_mb}m"));
        if !structured {
            list.push(format!(
                "\"-Djava.library.path={}\"",
                safe_path_str(self.natives_dir)
            ));
            list.push("-cp ${classpath}".to_string());
        }
        list
    }

    fn wrapper_flags(&self) -> LauncherResult<Vec<String>> {
        if !wrapper_enabled(self.config, &self.version.name) {
            return Ok(vec![]);
        }
        let work_dir = self.paths.data_dir();
        Ok(extract_wrapper(&wrapper_source(self.paths), work_dir)?
            .map(|wrapper| wrapper_flags(&wrapper, work_dir, self.java.version_code()))
            .unwrap_or_default())
    }

    /// `-javaagent` flags required by third-party sessions.
    fn agent_flags(&self) -> Vec<String> {
        let Some(agent) = &self.credential.agent else {
            return vec![];
        };
        match agent {
            AgentBinding::UnifiedPass { server_id } => {
                let jar = self.agent_jar("nide8auth.jar");
                vec![format!(
                    "-Dnide8auth.client=true -javaagent:\"{jar}\"={server_id}"
                )]
            }
            AgentBinding::AuthlibInjector { server, prefetched } => {
                let jar = self.agent_jar("authlib-injector.jar");
                vec![format!(
                    "-javaagent:\"{jar}\"={server} -Dauthlibinjector.side=client -Dauthlibinjector.yggdrasil.prefetched={prefetched}"
                )]
            }
        }
    }

    fn agent_jar(&self, file: &str) -> String {
        let path = self.paths.data_dir().join(file);
        if !path.exists() {
            warn!("Authentication agent {:?} is missing", path);
        }
        safe_path_str(&path)
    }

    fn server_address(&self) -> Option<String> {
        self.options
            .server_override
            .clone()
            .filter(|server| !server.trim().is_empty())
            .or_else(|| {
                let configured = self
                    .config
                    .get_str(keys::VERSION_SERVER_ENTER, Some(&self.version.name));
                (!configured.trim().is_empty()).then_some(configured)
            })
            .map(|server| server.trim().to_string())
    }

    fn token_table(&self, classpath: &str) -> Vec<(&'static str, String)> {
        let version = self.version;
        let credential = self.credential;
        let root = self.paths.minecraft_root();
        let libraries = safe_path_str(&self.paths.libraries_dir());
        let assets = safe_path_str(&self.paths.assets_dir());
        let version_type = self.config.version_or_global(
            keys::VERSION_ARGUMENT_INFO,
            &version.name,
            keys::LAUNCH_ARGUMENT_INFO,
        );

        vec![
            ("${classpath_separator}", classpath_separator().to_string()),
            ("${natives_directory}", safe_path_str(self.natives_dir)),
            ("${library_directory}", libraries.clone()),
            ("${libraries_directory}", libraries),
            ("${launcher_name}", LAUNCHER_NAME.to_string()),
            ("${launcher_version}", LAUNCHER_VERSION.to_string()),
            ("${version_name}", version.name.clone()),
            ("${version_type}", version_type.trim().to_string()),
            ("${game_directory}", safe_path_str(&version.indie_path)),
            ("${assets_root}", assets),
            ("${user_properties}", "{}".to_string()),
            ("${auth_player_name}", credential.display_name.clone()),
            ("${auth_uuid}", credential.uuid.clone()),
            ("${auth_access_token}", credential.access_token.clone()),
            ("${access_token}", credential.access_token.clone()),
            ("${auth_session}", credential.access_token.clone()),
            ("${auth_xuid}", credential.uuid.clone()),
            ("${clientid}", credential.client_token.clone()),
            ("${user_type}", credential.session_type.user_type().to_string()),
            (
                "${resolution_width}",
                self.config.get_i64(keys::LAUNCH_WINDOW_WIDTH, None).to_string(),
            ),
            (
                "${resolution_height}",
                self.config.get_i64(keys::LAUNCH_WINDOW_HEIGHT, None).to_string(),
            ),
            (
                "${game_assets}",
                safe_path_str(&root.join("assets").join("virtual").join("legacy")),
            ),
            ("${assets_index_name}", version.json.asset_index_name()),
            ("${classpath}", classpath.to_string()),
        ]
    }
}

fn table_value<'t>(table: &'t [(&'static str, String)], key: &str) -> &'t str {
    table
        .iter()
        .find(|(token, _)| *token == key)
        .map(|(_, value)| value.as_str())
        .unwrap_or_default()
}

fn set_table_value(table: &mut [(&'static str, String)], key: &str, value: &str) {
    for (token, current) in table.iter_mut() {
        if *token == key {
            *current = value.to_string();
        }
    }
}

/// Replace every token occurrence. Values with spaces or a drive letter
/// are quoted.
pub fn substitute_tokens(line: &str, table: &[(&'static str, String)]) -> String {
    let mut line = line.to_string();
    for (token, value) in table {
        if !line.contains(token) {
            continue;
        }
        let value = if value.contains(' ') || value.contains(":\\") {
            format!("\"{value}\"")
        } else {
            value.clone()
        };
        line = line.replace(token, &value);
    }
    line
}

/// Heap size for a version in MB.
///
/// Explicit settings win. Otherwise a quarter of physical memory, kept
/// between 1 and 4 GB. 32-bit runtimes cannot address more than 1 GB.
pub fn version_ram_mb(config: &dyn ConfigStore, version: &str, is_64bit: bool, total_mb: u64) -> u64 {
    let configured = [
        config.get_i64(keys::VERSION_RAM, Some(version)),
        config.get_i64(keys::LAUNCH_RAM, None),
    ]
    .into_iter()
    .find(|ram| *ram > 0)
    .map(|ram| ram as u64);

    let ram = configured.unwrap_or_else(|| (total_mb / 4).clamp(1024, 4096));
    if is_64bit {
        ram
    } else {
        ram.min(1024)
    }
}

fn physical_memory_mb() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    system.total_memory() / 1024 / 1024
}

fn add_encoding_flags(jvm: &mut Vec<String>) {
    let joined = jvm.join(" ");
    for (prefix, flag) in [
        ("-Dfile.encoding=", "-Dfile.encoding=UTF-8"),
        ("-Dstdout.encoding=", "-Dstdout.encoding=UTF-8"),
        ("-Dstderr.encoding=", "-Dstderr.encoding=UTF-8"),
    ] {
        if !joined.contains(prefix) {
            jvm.push(flag.to_string());
        }
    }
}

/// Platform-specific Java classpath separator.
pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Library archives first, then the client jar. Natives never go on the
/// classpath.
pub fn build_classpath(tokens: &[LibraryToken], jar: &Path) -> String {
    let mut entries: Vec<String> = tokens
        .iter()
        .filter(|token| !token.is_natives)
        .map(|token| safe_path_str(&token.local_path))
        .collect();
    entries.push(safe_path_str(jar));
    dedup_preserving_order(&mut entries);
    debug!("Classpath has {} entries", entries.len());
    entries.join(classpath_separator())
}

fn dedup_preserving_order(entries: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    entries.retain(|entry| {
        let key = if cfg!(target_os = "windows") {
            entry.to_lowercase()
        } else {
            entry.clone()
        };
        seen.insert(key)
    });
}

fn quick_play_since() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 4, 4, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn is_quick_play(release_time: DateTime<Utc>) -> bool {
    release_time >= quick_play_since()
}

/// Flags joining `server` on startup, with a leading space.
pub fn server_clause(server: &str, release_time: DateTime<Utc>) -> String {
    if is_quick_play(release_time) {
        return format!(" --quickPlayMultiplayer \"{server}\"");
    }
    match server.split_once(':') {
        Some((host, port)) => format!(" --server {host} --port {port}"),
        None => format!(" --server {server} --port {DEFAULT_SERVER_PORT}"),
    }
}

fn quote_if_spaced(arg: &str) -> String {
    if arg.contains(' ') && !arg.starts_with('"') {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

fn join_quoted(args: &[String]) -> String {
    args.iter()
        .map(|arg| quote_if_spaced(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a command line on whitespace outside double quotes. Quotes are
/// removed; `""` yields an empty argument.
pub fn split_arguments(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}

/// Drop arguments still holding a `${...}` token, and the option that
/// introduced them.
fn drop_unresolved(args: Vec<String>) -> Vec<String> {
    let mut kept = Vec::with_capacity(args.len());
    for arg in args {
        if arg.contains("${") {
            debug!("Dropping unresolved argument {}", arg);
            drop_dangling_option(&mut kept);
            continue;
        }
        kept.push(arg);
    }
    kept
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}

/// Quote an argument so `split_arguments` reads it back unchanged.
pub fn quote_argument(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::SessionType;
    use crate::core::config::MemoryConfigStore;
    use crate::core::launch::wrapper::WRAPPER_FILE;
    use crate::core::notify::testing::RecordingHost;
    use crate::core::testing::{credential, java_entry, library_token, temp_dir, write_version};
    use serde_json::json;
    use std::path::PathBuf;

    fn java(minor: u32, is_64bit: bool) -> JavaEntry {
        java_entry(Path::new("/jdk/bin/java"), minor, 1, is_64bit)
    }

    struct Fixture {
        root: PathBuf,
        paths: LauncherPaths,
        config: MemoryConfigStore,
        host: RecordingHost,
    }

    impl Fixture {
        fn new(name: &str) -> Self {
            let root = temp_dir("args", name);
            let paths = LauncherPaths::new(root.join("data"), root.join("tmp"), root.join("mc"));
            let config = MemoryConfigStore::default();
            config.set(keys::LAUNCH_RAM, json!(2048)).unwrap();
            Self {
                root,
                paths,
                config,
                host: RecordingHost::default(),
            }
        }

        fn build(
            &self,
            version: &VersionDescriptor,
            java: &JavaEntry,
            credential: &Credential,
            options: &LaunchOptions,
        ) -> LauncherResult<LaunchArguments> {
            let natives = self.root.join("natives");
            ArgumentBuilder {
                config: &self.config,
                notifier: &self.host,
                paths: &self.paths,
                version,
                java,
                credential,
                options,
                natives_dir: &natives,
            }
            .build()
        }
    }

    fn legacy_version(fixture: &Fixture) -> VersionDescriptor {
        write_version(
            fixture.paths.minecraft_root(),
            "1.8.9",
            &json!({
                "id": "1.8.9",
                "mainClass": "net.minecraft.client.main.Main",
                "releaseTime": "2015-12-03T09:24:39+00:00",
                "assets": "1.8",
                "minecraftArguments": "--username ${auth_player_name} --version ${version_name} --accessToken ${auth_access_token} --userProperties ${user_properties} --userType ${user_type} --versionType ${version_type}",
                "libraries": [
                    { "name": "com.mojang:netty:1.6" }
                ]
            }),
        );
        VersionDescriptor::load(fixture.paths.minecraft_root(), "1.8.9").unwrap()
    }

    fn modern_version(fixture: &Fixture) -> VersionDescriptor {
        write_version(
            fixture.paths.minecraft_root(),
            "1.20.1",
            &json!({
                "id": "1.20.1",
                "mainClass": "net.minecraft.client.main.Main",
                "releaseTime": "2023-06-12T13:25:51+00:00",
                "assetIndex": { "id": "5" },
                "arguments": {
                    "game": [
                        "--username", "${auth_player_name}",
                        "--gameDir", "${game_directory}",
                        "--assetIndex", "${assets_index_name}",
                        "--xuid", "${auth_xuid}",
                        "--quickPlayPath", "${quickPlayPath}",
                        { "rules": [{ "action": "allow", "features": { "has_custom_resolution": true } }],
                          "value": ["--width", "${resolution_width}"] }
                    ],
                    "jvm": [
                        "-Djava.library.path=${natives_directory}",
                        "-Dminecraft.launcher.brand=${launcher_name}",
                        "-cp", "${classpath}"
                    ]
                },
                "libraries": []
            }),
        );
        VersionDescriptor::load(fixture.paths.minecraft_root(), "1.20.1").unwrap()
    }

    #[test]
    fn flat_manifest_builds_classic_command_line() {
        let fixture = Fixture::new("flat");
        let version = legacy_version(&fixture);
        let args = fixture
            .build(&version, &java(8, true), &credential(SessionType::Microsoft), &LaunchOptions::default())
            .unwrap();
        let argv = &args.argv;

        assert!(argv[0].starts_with("-XX:+UseG1GC"));
        assert!(argv.contains(&LOG4J_FLAG.to_string()));
        assert!(argv.contains(&"-Xmn307m".to_string()));
        assert!(argv.contains(&"-Xmx2048m".to_string()));
        let cp = argv.iter().position(|a| a == "-cp").unwrap();
        assert!(argv[cp + 1].ends_with("1.8.9.jar"));
        assert_eq!(argv[cp + 2], "net.minecraft.client.main.Main");

        let user = argv.iter().position(|a| a == "--username").unwrap();
        assert_eq!(argv[user + 1], "Steve");
        let token = argv.iter().position(|a| a == "--accessToken").unwrap();
        assert_eq!(argv[token + 1], "token-abc");
        let kind = argv.iter().position(|a| a == "--userType").unwrap();
        assert_eq!(argv[kind + 1], "msa");
        let kind = argv.iter().position(|a| a == "--versionType").unwrap();
        assert_eq!(argv[kind + 1], "Interface");
        assert!(!argv.iter().any(|a| a.starts_with("-Dfile.encoding")));
        assert!(argv.iter().all(|a| !a.contains("${")));

        let _ = std::fs::remove_dir_all(&fixture.root);
    }

    #[test]
    fn structured_manifest_drops_unresolved_and_feature_gated_args() {
        let fixture = Fixture::new("structured");
        let version = modern_version(&fixture);
        let args = fixture
            .build(&version, &java(17, true), &credential(SessionType::Microsoft), &LaunchOptions::default())
            .unwrap();
        let argv = &args.argv;

        assert!(argv.contains(&"-Dminecraft.launcher.brand=InterfaceOficial".to_string()));
        assert!(argv.contains(&"-Dfile.encoding=UTF-8".to_string()));
        assert!(argv.contains(&"-Dstderr.encoding=UTF-8".to_string()));
        let main = argv
            .iter()
            .position(|a| a == "net.minecraft.client.main.Main")
            .unwrap();
        let encoding = argv.iter().position(|a| a == "-Dfile.encoding=UTF-8").unwrap();
        assert!(encoding < main);

        assert!(!argv.contains(&"--quickPlayPath".to_string()));
        assert!(!argv.contains(&"--width".to_string()));
        let xuid = argv.iter().position(|a| a == "--xuid").unwrap();
        assert_eq!(argv[xuid + 1], "00000000000030059000000004c7e3b3");
        let index = argv.iter().position(|a| a == "--assetIndex").unwrap();
        assert_eq!(argv[index + 1], "5");

        let _ = std::fs::remove_dir_all(&fixture.root);
    }

    #[test]
    fn empty_version_type_removes_its_clause() {
        let fixture = Fixture::new("versiontype");
        fixture.config.set(keys::LAUNCH_ARGUMENT_INFO, json!("")).unwrap();
        let version = legacy_version(&fixture);
        let args = fixture
            .build(&version, &java(8, true), &credential(SessionType::Microsoft), &LaunchOptions::default())
            .unwrap();
        assert!(!args.argv.contains(&"--versionType".to_string()));
        assert_eq!(args.argv.last().map(String::as_str), Some("msa"));

        let _ = std::fs::remove_dir_all(&fixture.root);
    }

    #[test]
    fn missing_main_class_is_user_visible() {
        let fixture = Fixture::new("nomain");
        write_version(
            fixture.paths.minecraft_root(),
            "broken",
            &json!({ "id": "broken", "libraries": [] }),
        );
        let version = VersionDescriptor::load(fixture.paths.minecraft_root(), "broken").unwrap();
        let err = fixture
            .build(&version, &java(17, true), &credential(SessionType::Microsoft), &LaunchOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), NO_MAIN_CLASS);

        let _ = std::fs::remove_dir_all(&fixture.root);
    }

    #[test]
    fn agents_extras_and_custom_args_are_placed() {
        let fixture = Fixture::new("extras");
        fixture.config.set(keys::LAUNCH_WINDOW_TYPE, json!(0)).unwrap();
        fixture
            .config
            .set(keys::LAUNCH_ADVANCE_GAME, json!("--demo"))
            .unwrap();
        let version = legacy_version(&fixture);
        let mut credential = credential(SessionType::Microsoft);
        credential.session_type = SessionType::AuthInjector;
        credential.agent = Some(AgentBinding::AuthlibInjector {
            server: "https://skins.example/api/yggdrasil/".into(),
            prefetched: "eyJtZXRhIjp7fX0=".into(),
        });
        let options = LaunchOptions {
            extra_args: vec!["  --extra  ".into()],
            server_override: Some("play.example.com".into()),
            ..Default::default()
        };

        let args = fixture.build(&version, &java(8, true), &credential, &options).unwrap();
        let argv = &args.argv;

        assert!(argv[0].starts_with("-javaagent:"));
        assert!(argv[0].ends_with("authlib-injector.jar=https://skins.example/api/yggdrasil/"));
        assert_eq!(argv[1], "-Dauthlibinjector.side=client");
        assert_eq!(
            argv[2],
            "-Dauthlibinjector.yggdrasil.prefetched=eyJtZXRhIjp7fX0="
        );
        let tail: Vec<&str> = argv[argv.len() - 7..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            ["--fullscreen", "--extra", "--server", "play.example.com", "--port", "25565", "--demo"]
        );
        assert!(fixture.host.hints().is_empty());

        let _ = std::fs::remove_dir_all(&fixture.root);
    }

    #[test]
    fn installed_wrapper_runs_before_main_class() {
        let fixture = Fixture::new("wrapper");
        let source = fixture.paths.data_dir().join("resources").join(WRAPPER_FILE);
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, b"jar").unwrap();
        let version = modern_version(&fixture);

        let args = fixture
            .build(&version, &java(17, true), &credential(SessionType::Microsoft), &LaunchOptions::default())
            .unwrap();
        let argv = &args.argv;
        let main = argv
            .iter()
            .position(|a| a == "net.minecraft.client.main.Main")
            .unwrap();
        assert_eq!(argv[main - 2], "-jar");
        assert!(argv[main - 1].ends_with(WRAPPER_FILE));
        assert!(argv[main - 3].starts_with("-Doolloo.jlw.tmpdir="));
        assert_eq!(
            argv[main - 4],
            "cpw.mods.bootstraplauncher/cpw.mods.bootstraplauncher=ALL-UNNAMED"
        );
        let encoding = argv.iter().position(|a| a == "-Dfile.encoding=UTF-8").unwrap();
        assert!(encoding < main - 5);

        fixture
            .config
            .set_for_version(keys::VERSION_ADVANCE_DISABLE_JLW, "1.20.1", json!(true))
            .unwrap();
        let args = fixture
            .build(&version, &java(17, true), &credential(SessionType::Microsoft), &LaunchOptions::default())
            .unwrap();
        assert!(!args.argv.contains(&"-jar".to_string()));

        let _ = std::fs::remove_dir_all(&fixture.root);
    }

    #[test]
    fn command_line_splits_back_to_argv() {
        let arguments = LaunchArguments {
            argv: vec![
                "-Xmx2048m".into(),
                "-Dos.name=Windows 10".into(),
                String::new(),
                "--gameDir".into(),
                "C:\\Games\\My Pack".into(),
            ],
            library_tokens: vec![],
            ram_mb: 2048,
        };
        let line = arguments.command_line();
        assert_eq!(
            line,
            "-Xmx2048m \"-Dos.name=Windows 10\" \"\" --gameDir \"C:\\Games\\My Pack\""
        );
        assert_eq!(split_arguments(&line), arguments.argv);
    }

    #[test]
    fn server_clause_depends_on_release_date() {
        let new = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let old = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(
            server_clause("play.example.com", new),
            " --quickPlayMultiplayer \"play.example.com\""
        );
        assert_eq!(
            server_clause("play.example.com", old),
            " --server play.example.com --port 25565"
        );
        assert_eq!(
            server_clause("mc.example.org:25570", old),
            " --server mc.example.org --port 25570"
        );
    }

    #[test]
    fn substitution_is_idempotent_and_quotes_once() {
        let table = vec![
            ("${game_directory}", "C:\\Games\\My Pack".to_string()),
            ("${auth_player_name}", "Steve".to_string()),
        ];
        let line = "--username ${auth_player_name} --gameDir ${game_directory} --again ${auth_player_name}";
        let once = substitute_tokens(line, &table);
        assert_eq!(
            once,
            "--username Steve --gameDir \"C:\\Games\\My Pack\" --again Steve"
        );
        assert_eq!(substitute_tokens(&once, &table), once);
        assert!(!once.contains("${"));
    }

    #[test]
    fn split_respects_quotes() {
        assert_eq!(
            split_arguments(r#"-javaagent:"C:\a b\agent.jar"=srv  -Dos.name="Windows 10" "" x"#),
            vec![
                r"-javaagent:C:\a b\agent.jar=srv".to_string(),
                "-Dos.name=Windows 10".to_string(),
                String::new(),
                "x".to_string(),
            ]
        );
    }

    #[test]
    fn ram_defaults_and_caps() {
        let config = MemoryConfigStore::default();
        assert_eq!(version_ram_mb(&config, "v", true, 16 * 1024), 4096);
        assert_eq!(version_ram_mb(&config, "v", true, 8 * 1024), 2048);
        assert_eq!(version_ram_mb(&config, "v", true, 2 * 1024), 1024);
        assert_eq!(version_ram_mb(&config, "v", false, 16 * 1024), 1024);

        config.set(keys::LAUNCH_RAM, json!(6144)).unwrap();
        assert_eq!(version_ram_mb(&config, "v", true, 2 * 1024), 6144);
        config.set_for_version(keys::VERSION_RAM, "v", json!(3072)).unwrap();
        assert_eq!(version_ram_mb(&config, "v", true, 2 * 1024), 3072);
    }

    #[test]
    fn classpath_skips_natives_and_ends_with_jar() {
        let tokens = vec![
            library_token(Path::new("/mc/libraries/a.jar"), false),
            library_token(Path::new("/mc/libraries/a-natives.jar"), true),
            library_token(Path::new("/mc/libraries/a.jar"), false),
        ];
        let cp = build_classpath(&tokens, Path::new("/mc/versions/x/x.jar"));
        let sep = classpath_separator();
        assert_eq!(cp, format!("/mc/libraries/a.jar{sep}/mc/versions/x/x.jar"));
    }
}
