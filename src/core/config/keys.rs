//! Setting names read by the launch engine, with their built-in defaults.

use serde_json::{json, Value};

// ── Launch ──────────────────────────────────────────────
pub const LAUNCH_WINDOW_TYPE: &str = "LaunchArgumentWindowType";
pub const LAUNCH_WINDOW_WIDTH: &str = "LaunchArgumentWindowWidth";
pub const LAUNCH_WINDOW_HEIGHT: &str = "LaunchArgumentWindowHeight";
pub const LAUNCH_ARGUMENT_INFO: &str = "LaunchArgumentInfo";
pub const LAUNCH_TITLE: &str = "LaunchArgumentTitle";
pub const LAUNCH_VISIBLE: &str = "LaunchArgumentVisible";
pub const LAUNCH_PRIORITY: &str = "LaunchArgumentPriority";
pub const LAUNCH_INDIE: &str = "LaunchArgumentIndieV2";
pub const LAUNCH_RAM: &str = "LaunchArgumentRam";
pub const LAUNCH_JAVA_PATH: &str = "LaunchArgumentJavaPath";
pub const LAUNCH_ADVANCE_JVM: &str = "LaunchAdvanceJvm";
pub const LAUNCH_ADVANCE_GAME: &str = "LaunchAdvanceGame";
pub const LAUNCH_ADVANCE_RUN: &str = "LaunchAdvanceRun";
pub const LAUNCH_ADVANCE_RUN_WAIT: &str = "LaunchAdvanceRunWait";
pub const LAUNCH_ADVANCE_DISABLE_JLW: &str = "LaunchAdvanceDisableJLW";
pub const LAUNCH_LANGUAGE: &str = "LaunchLanguage";
pub const LAUNCH_NOTIFY_EXIT: &str = "LaunchNotifyExit";
pub const LAUNCH_SKIN_TYPE: &str = "LaunchSkinType";
pub const LAUNCH_SKIN_SLIM: &str = "LaunchSkinSlim";

// ── Version scoped ──────────────────────────────────────
pub const VERSION_ARGUMENT_INFO: &str = "VersionArgumentInfo";
pub const VERSION_INDIE: &str = "VersionArgumentIndieV2";
pub const VERSION_RAM: &str = "VersionArgumentRam";
pub const VERSION_JAVA_PATH: &str = "VersionArgumentJavaPath";
pub const VERSION_ADVANCE_JVM: &str = "VersionAdvanceJvm";
pub const VERSION_ADVANCE_GAME: &str = "VersionAdvanceGame";
pub const VERSION_ADVANCE_RUN: &str = "VersionAdvanceRun";
pub const VERSION_ADVANCE_RUN_WAIT: &str = "VersionAdvanceRunWait";
pub const VERSION_ADVANCE_DISABLE_JLW: &str = "VersionAdvanceDisableJLW";
pub const VERSION_SERVER_ENTER: &str = "VersionServerEnter";
pub const VERSION_SERVER_NIDE: &str = "VersionServerNide";
pub const VERSION_SERVER_AUTH: &str = "VersionServerAuthServer";

// ── Host ────────────────────────────────────────────────
pub const UI_MUSIC_STOP: &str = "UiMusicStop";
pub const UI_MUSIC_START: &str = "UiMusicStart";
pub const SYSTEM_LAUNCH_COUNT: &str = "SystemLaunchCount";

// ── Login ───────────────────────────────────────────────
pub const LOGIN_TYPE: &str = "LoginType";
pub const LOGIN_LEGACY_NAME: &str = "LoginLegacyName";
pub const LOGIN_MS_JSON: &str = "LoginMsJson";
pub const LOGIN_MS_CLIENT_ID: &str = "LoginMsClientId";
pub const LOGIN_NIDE_EMAIL: &str = "LoginNideEmail";
pub const LOGIN_NIDE_PASS: &str = "LoginNidePass";
pub const LOGIN_AUTH_EMAIL: &str = "LoginAuthEmail";
pub const LOGIN_AUTH_PASS: &str = "LoginAuthPass";

pub const CACHE_MS_OAUTH_REFRESH: &str = "CacheMsV2OAuthRefresh";
pub const CACHE_MS_ACCESS: &str = "CacheMsV2Access";
pub const CACHE_MS_UUID: &str = "CacheMsV2Uuid";
pub const CACHE_MS_NAME: &str = "CacheMsV2Name";
pub const CACHE_MS_PROFILE_JSON: &str = "CacheMsV2ProfileJson";

pub const CACHE_NIDE_ACCESS: &str = "CacheNideAccess";
pub const CACHE_NIDE_CLIENT: &str = "CacheNideClient";
pub const CACHE_NIDE_UUID: &str = "CacheNideUuid";
pub const CACHE_NIDE_NAME: &str = "CacheNideName";
pub const CACHE_NIDE_USERNAME: &str = "CacheNideUsername";
pub const CACHE_NIDE_PASS: &str = "CacheNidePass";

pub const CACHE_AUTH_ACCESS: &str = "CacheAuthAccess";
pub const CACHE_AUTH_CLIENT: &str = "CacheAuthClient";
pub const CACHE_AUTH_UUID: &str = "CacheAuthUuid";
pub const CACHE_AUTH_NAME: &str = "CacheAuthName";
pub const CACHE_AUTH_USERNAME: &str = "CacheAuthUsername";
pub const CACHE_AUTH_PASS: &str = "CacheAuthPass";

/// Public client id used for the device code flow when none is configured.
pub const MS_CLIENT_ID_FALLBACK: &str = "00000000402B5328";

/// Separator used by the legacy name history in `LoginLegacyName`.
pub const LEGACY_NAME_SEPARATOR: char = '¨';

pub const DEFAULT_JVM_ARGS: &str =
    "-XX:+UseG1GC -XX:-UseAdaptiveSizePolicy -XX:-OmitStackTraceInFastThrow";

pub fn default_value(key: &str) -> Option<Value> {
    let value = match key {
        LAUNCH_WINDOW_TYPE => json!(1),
        LAUNCH_WINDOW_WIDTH => json!(854),
        LAUNCH_WINDOW_HEIGHT => json!(480),
        LAUNCH_ARGUMENT_INFO => json!("Interface"),
        LAUNCH_VISIBLE => json!(1),
        LAUNCH_PRIORITY => json!(1),
        LAUNCH_INDIE => json!(true),
        LAUNCH_ADVANCE_JVM => json!(DEFAULT_JVM_ARGS),
        LAUNCH_ADVANCE_RUN_WAIT => json!(true),
        LAUNCH_LANGUAGE => json!("en_us"),
        LAUNCH_NOTIFY_EXIT => json!(false),
        LAUNCH_SKIN_TYPE => json!(0),
        LOGIN_TYPE => json!(0),
        LOGIN_MS_CLIENT_ID => json!(MS_CLIENT_ID_FALLBACK),
        LOGIN_MS_JSON => json!("{}"),
        SYSTEM_LAUNCH_COUNT => json!(0),
        UI_MUSIC_STOP | UI_MUSIC_START => json!(false),
        _ => return None,
    };
    Some(value)
}
