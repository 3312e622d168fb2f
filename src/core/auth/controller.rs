// ─── Login Controller ───
// Builds the login input from settings, dispatches to the scheme's handler
// and writes the resulting session back to the cache keys.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::core::abort::AbortFlag;
use crate::core::config::{keys, ConfigExt, ConfigStore};
use crate::core::error::{LauncherError, LauncherResult};

use super::server::{self, CachedSession};
use super::{
    legacy, microsoft, Credential, LegacyLogin, LoginData, LoginType, MsAuthApi, MsLogin,
    ServerLogin, SessionType, YggdrasilApi,
};

/// A Microsoft login younger than this is reused without any network call.
const MS_CACHE_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Cache key set of one Yggdrasil scheme.
struct ServerKeys {
    access: &'static str,
    client: &'static str,
    uuid: &'static str,
    name: &'static str,
    user_name: &'static str,
    password: &'static str,
    login_email: &'static str,
    login_pass: &'static str,
    version_server: &'static str,
}

const NIDE_KEYS: ServerKeys = ServerKeys {
    access: keys::CACHE_NIDE_ACCESS,
    client: keys::CACHE_NIDE_CLIENT,
    uuid: keys::CACHE_NIDE_UUID,
    name: keys::CACHE_NIDE_NAME,
    user_name: keys::CACHE_NIDE_USERNAME,
    password: keys::CACHE_NIDE_PASS,
    login_email: keys::LOGIN_NIDE_EMAIL,
    login_pass: keys::LOGIN_NIDE_PASS,
    version_server: keys::VERSION_SERVER_NIDE,
};

const AUTH_KEYS: ServerKeys = ServerKeys {
    access: keys::CACHE_AUTH_ACCESS,
    client: keys::CACHE_AUTH_CLIENT,
    uuid: keys::CACHE_AUTH_UUID,
    name: keys::CACHE_AUTH_NAME,
    user_name: keys::CACHE_AUTH_USERNAME,
    password: keys::CACHE_AUTH_PASS,
    login_email: keys::LOGIN_AUTH_EMAIL,
    login_pass: keys::LOGIN_AUTH_PASS,
    version_server: keys::VERSION_SERVER_AUTH,
};

fn server_keys(kind: LoginType) -> &'static ServerKeys {
    if kind == LoginType::UnifiedPass {
        &NIDE_KEYS
    } else {
        &AUTH_KEYS
    }
}

pub struct LoginController {
    config: Arc<dyn ConfigStore>,
    ms_api: Arc<dyn MsAuthApi>,
    ygg_api: Arc<dyn YggdrasilApi>,
    ms_refreshed_at: Mutex<Option<Instant>>,
}

impl LoginController {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        ms_api: Arc<dyn MsAuthApi>,
        ygg_api: Arc<dyn YggdrasilApi>,
    ) -> Self {
        Self {
            config,
            ms_api,
            ygg_api,
            ms_refreshed_at: Mutex::new(None),
        }
    }

    pub fn login_type(&self) -> Option<LoginType> {
        LoginType::from_code(self.config.get_i64(keys::LOGIN_TYPE, None))
    }

    fn legacy_name(&self) -> String {
        self.config
            .get_str(keys::LOGIN_LEGACY_NAME, None)
            .split(keys::LEGACY_NAME_SEPARATOR)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        let value = self.config.get_str(key, None);
        (!value.is_empty()).then_some(value)
    }

    /// Display name of the current account, if any is known.
    pub fn login_name(&self) -> Option<String> {
        let preferred = match self.login_type() {
            Some(LoginType::Microsoft) => self.non_empty(keys::CACHE_MS_NAME),
            Some(LoginType::UnifiedPass) => self.non_empty(keys::CACHE_NIDE_NAME),
            Some(LoginType::AuthInjector) => self.non_empty(keys::CACHE_AUTH_NAME),
            Some(LoginType::Legacy) => Some(self.legacy_name()).filter(|n| !n.is_empty()),
            None => None,
        };
        preferred
            .or_else(|| self.non_empty(keys::CACHE_MS_NAME))
            .or_else(|| self.non_empty(keys::CACHE_NIDE_NAME))
            .or_else(|| self.non_empty(keys::CACHE_AUTH_NAME))
            .or_else(|| Some(self.legacy_name()).filter(|n| !n.is_empty()))
    }

    /// Empty when a login can start, otherwise the reason it cannot.
    pub fn login_able(&self, version: Option<&str>) -> String {
        match self.login_type() {
            Some(LoginType::Microsoft) => String::new(),
            Some(LoginType::Legacy) => {
                if self.legacy_name().is_empty() {
                    "Player name cannot be empty".into()
                } else {
                    String::new()
                }
            }
            Some(kind @ (LoginType::UnifiedPass | LoginType::AuthInjector)) => {
                let scheme = server_keys(kind);
                if !self.config.get_str(scheme.access, None).is_empty() {
                    return String::new();
                }
                if self.config.get_str(scheme.login_email, None).trim().is_empty() {
                    "Please enter your account".into()
                } else if self.config.get_str(scheme.login_pass, None).is_empty() {
                    "Please enter your password".into()
                } else if self.config.get_str(scheme.version_server, version).trim().is_empty() {
                    "No authentication server is set for this version".into()
                } else {
                    String::new()
                }
            }
            None => "Unknown login type".into(),
        }
    }

    /// Login input for the configured scheme.
    pub fn login_data(&self, version: Option<&str>) -> LauncherResult<LoginData> {
        let kind = self
            .login_type()
            .ok_or_else(|| LauncherError::user("Unknown login type"))?;
        let data = match kind {
            LoginType::Legacy => LoginData::Legacy(LegacyLogin {
                user_name: self.legacy_name(),
                skin_type: self.config.get_i64(keys::LAUNCH_SKIN_TYPE, None),
                skin_name: String::new(),
            }),
            LoginType::Microsoft => LoginData::Microsoft(MsLogin {
                oauth_refresh_token: self.config.get_str(keys::CACHE_MS_OAUTH_REFRESH, None),
                access_token: self.config.get_str(keys::CACHE_MS_ACCESS, None),
                uuid: self.config.get_str(keys::CACHE_MS_UUID, None),
                user_name: self.config.get_str(keys::CACHE_MS_NAME, None),
                profile_json: self.config.get_str(keys::CACHE_MS_PROFILE_JSON, None),
            }),
            LoginType::UnifiedPass | LoginType::AuthInjector => {
                let scheme = server_keys(kind);
                let server = self.config.get_str(scheme.version_server, version).trim().to_string();
                let base_url = if kind == LoginType::UnifiedPass {
                    server::unified_pass_base(&server)
                } else {
                    server::auth_injector_base(&server)
                };
                let login = ServerLogin {
                    user_name: self.config.get_str(scheme.login_email, None),
                    password: self.config.get_str(scheme.login_pass, None),
                    base_url,
                    server,
                    force_reselect_profile: false,
                };
                if kind == LoginType::UnifiedPass {
                    LoginData::UnifiedPass(login)
                } else {
                    LoginData::AuthInjector(login)
                }
            }
        };
        Ok(data)
    }

    /// Produce a credential for `data`, updating the cache on success.
    #[instrument(skip_all, fields(kind = ?data.login_type()))]
    pub async fn start(
        &self,
        data: &LoginData,
        force_restart: bool,
        abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<Credential> {
        abort.check()?;
        let credential = match data {
            LoginData::Legacy(input) => {
                info!("Login method: Offline ({})", input.user_name);
                legacy::login(input)
            }
            LoginData::Microsoft(input) => {
                self.start_microsoft(input, force_restart, abort, progress)
                    .await?
            }
            LoginData::UnifiedPass(input) => {
                self.start_server(SessionType::UnifiedPass, input, abort, progress)
                    .await?
            }
            LoginData::AuthInjector(input) => {
                self.start_server(SessionType::AuthInjector, input, abort, progress)
                    .await?
            }
        };
        progress(1.0);
        Ok(credential)
    }

    async fn start_microsoft(
        &self,
        input: &MsLogin,
        force_restart: bool,
        abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<Credential> {
        let shown = if input.user_name.is_empty() {
            "not logged in"
        } else {
            input.user_name.as_str()
        };
        info!("Login method: Microsoft ({})", shown);
        progress(0.05);

        if !force_restart && !input.access_token.is_empty() && self.ms_cache_is_fresh() {
            info!("Reusing Microsoft login from the last 10 minutes");
            return Ok(microsoft::credential_from_cache(input));
        }

        let result = microsoft::run_flow(self.ms_api.as_ref(), input, abort, progress).await?;
        let credential = &result.credential;

        self.config
            .set(keys::CACHE_MS_OAUTH_REFRESH, json!(result.refresh_token))?;
        self.config
            .set(keys::CACHE_MS_ACCESS, json!(credential.access_token))?;
        self.config.set(keys::CACHE_MS_UUID, json!(credential.uuid))?;
        self.config
            .set(keys::CACHE_MS_NAME, json!(credential.display_name))?;
        self.config.set(
            keys::CACHE_MS_PROFILE_JSON,
            json!(credential.raw_profile.clone().unwrap_or_default()),
        )?;

        let mut accounts: Map<String, Value> =
            serde_json::from_str(&self.config.get_str(keys::LOGIN_MS_JSON, None)).unwrap_or_default();
        accounts.remove(&input.user_name);
        accounts.insert(
            credential.display_name.clone(),
            json!(result.refresh_token),
        );
        self.config
            .set(keys::LOGIN_MS_JSON, json!(Value::Object(accounts).to_string()))?;

        if let Ok(mut refreshed) = self.ms_refreshed_at.lock() {
            *refreshed = Some(Instant::now());
        }
        info!("Microsoft login complete");
        Ok(result.credential)
    }

    fn ms_cache_is_fresh(&self) -> bool {
        self.ms_refreshed_at
            .lock()
            .ok()
            .and_then(|guard| *guard)
            .is_some_and(|at| at.elapsed() < MS_CACHE_WINDOW)
    }

    async fn start_server(
        &self,
        session_type: SessionType,
        input: &ServerLogin,
        abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<Credential> {
        if input.server.is_empty() {
            return Err(LauncherError::user(
                "No authentication server is set for this version",
            ));
        }
        let kind = if session_type == SessionType::UnifiedPass {
            LoginType::UnifiedPass
        } else {
            LoginType::AuthInjector
        };
        let scheme = server_keys(kind);
        info!("Login method: {} ({})", session_type, input.server);

        let cached = CachedSession {
            access_token: self.config.get_str(scheme.access, None),
            client_token: self.config.get_str(scheme.client, None),
            uuid: self.config.get_str(scheme.uuid, None),
            name: self.config.get_str(scheme.name, None),
            user_name: self.config.get_str(scheme.user_name, None),
            password: self.config.get_str(scheme.password, None),
        };

        let result = server::run_flow(
            self.ygg_api.as_ref(),
            session_type,
            input,
            &cached,
            abort,
            progress,
        )
        .await?;

        let cache = &result.cache;
        self.config.set(scheme.access, json!(cache.access_token))?;
        self.config.set(scheme.client, json!(cache.client_token))?;
        self.config.set(scheme.uuid, json!(cache.uuid))?;
        self.config.set(scheme.name, json!(cache.name))?;
        self.config.set(scheme.user_name, json!(cache.user_name))?;
        self.config.set(scheme.password, json!(cache.password))?;
        Ok(result.credential)
    }
}
