// ─── Yggdrasil Login ───
// Unified Pass and Authlib-Injector both speak the Yggdrasil protocol:
// validate the cached token, else refresh it, else authenticate.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::core::abort::AbortFlag;
use crate::core::error::{LauncherError, LauncherResult};

use super::{AgentBinding, Credential, ServerLogin, SessionType};

pub const UNIFIED_PASS_ROOT: &str = "https://auth.mc-user.com:233/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProfile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YggdrasilSession {
    pub access_token: String,
    pub client_token: String,
    #[serde(default)]
    pub selected_profile: Option<GameProfile>,
    #[serde(default)]
    pub available_profiles: Vec<GameProfile>,
}

/// Tokens cached from the previous successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedSession {
    pub access_token: String,
    pub client_token: String,
    pub uuid: String,
    pub name: String,
    /// Account the tokens belong to; a different account skips validation.
    pub user_name: String,
    pub password: String,
}

#[async_trait]
pub trait YggdrasilApi: Send + Sync {
    async fn validate(&self, base_url: &str, access_token: &str, client_token: &str) -> LauncherResult<bool>;

    /// `Ok(None)` when the token can no longer be refreshed.
    async fn refresh(
        &self,
        base_url: &str,
        access_token: &str,
        client_token: &str,
        profile: Option<&GameProfile>,
    ) -> LauncherResult<Option<YggdrasilSession>>;

    async fn authenticate(
        &self,
        base_url: &str,
        user_name: &str,
        password: &str,
        client_token: &str,
    ) -> LauncherResult<YggdrasilSession>;

    /// Metadata of an Authlib-Injector server, base64 encoded.
    async fn prefetch(&self, server: &str) -> LauncherResult<String>;
}

pub fn unified_pass_base(server_id: &str) -> String {
    format!("{UNIFIED_PASS_ROOT}{}/", server_id.trim())
}

pub fn auth_injector_base(server: &str) -> String {
    let trimmed = server.trim().trim_end_matches('/');
    if trimmed.ends_with("/authserver") {
        format!("{}/", trimmed.trim_end_matches("/authserver"))
    } else {
        format!("{trimmed}/")
    }
}

/// Outcome of a server login, with the values to cache.
#[derive(Debug, Clone)]
pub struct ServerLoginResult {
    pub credential: Credential,
    pub cache: CachedSession,
}

#[instrument(skip(api, input, cached, abort, progress))]
pub async fn run_flow(
    api: &dyn YggdrasilApi,
    session_type: SessionType,
    input: &ServerLogin,
    cached: &CachedSession,
    abort: &AbortFlag,
    progress: &(dyn Fn(f64) + Send + Sync),
) -> LauncherResult<ServerLoginResult> {
    let agent = match session_type {
        SessionType::UnifiedPass => AgentBinding::UnifiedPass {
            server_id: input.server.trim().to_string(),
        },
        _ => {
            let prefetched = api.prefetch(&input.server).await.map_err(|err| {
                LauncherError::user(format!(
                    "Cannot reach the authentication server ({}): {err}",
                    input.server
                ))
            })?;
            AgentBinding::AuthlibInjector {
                server: input.server.trim().to_string(),
                prefetched,
            }
        }
    };
    abort.check()?;
    progress(0.1);

    let same_account = cached.user_name.is_empty() || cached.user_name == input.user_name;
    let reuse = same_account && !cached.access_token.is_empty() && !input.force_reselect_profile;
    let session = if reuse {
        reuse_or_authenticate(api, input, cached, abort, progress).await?
    } else {
        fresh_login(api, input, &cached.client_token, abort).await?
    };
    progress(0.95);

    let cache = CachedSession {
        access_token: session.access_token.clone(),
        client_token: session.client_token.clone(),
        uuid: session.profile.id.clone(),
        name: session.profile.name.clone(),
        user_name: input.user_name.clone(),
        password: input.password.clone(),
    };
    Ok(ServerLoginResult {
        credential: Credential {
            display_name: session.profile.name,
            uuid: session.profile.id,
            access_token: session.access_token,
            client_token: session.client_token,
            session_type,
            raw_profile: None,
            agent: Some(agent),
        },
        cache,
    })
}

struct BoundSession {
    access_token: String,
    client_token: String,
    profile: GameProfile,
}

async fn reuse_or_authenticate(
    api: &dyn YggdrasilApi,
    input: &ServerLogin,
    cached: &CachedSession,
    abort: &AbortFlag,
    progress: &(dyn Fn(f64) + Send + Sync),
) -> LauncherResult<BoundSession> {
    let cached_profile = GameProfile {
        id: cached.uuid.clone(),
        name: cached.name.clone(),
    };

    if api
        .validate(&input.base_url, &cached.access_token, &cached.client_token)
        .await?
    {
        info!("Cached session is still valid");
        return Ok(BoundSession {
            access_token: cached.access_token.clone(),
            client_token: cached.client_token.clone(),
            profile: cached_profile,
        });
    }
    abort.check()?;
    progress(0.4);

    match api
        .refresh(
            &input.base_url,
            &cached.access_token,
            &cached.client_token,
            None,
        )
        .await
    {
        Ok(Some(session)) => {
            info!("Session refreshed");
            let profile = session.selected_profile.clone().unwrap_or(cached_profile);
            return Ok(BoundSession {
                access_token: session.access_token,
                client_token: session.client_token,
                profile,
            });
        }
        Ok(None) => info!("Session can no longer be refreshed, logging in again"),
        Err(err) => warn!("Session refresh failed, logging in again: {}", err),
    }
    abort.check()?;
    progress(0.6);

    fresh_login(api, input, &cached.client_token, abort).await
}

async fn fresh_login(
    api: &dyn YggdrasilApi,
    input: &ServerLogin,
    client_token: &str,
    abort: &AbortFlag,
) -> LauncherResult<BoundSession> {
    let client_token = if client_token.is_empty() {
        uuid::Uuid::new_v4().simple().to_string()
    } else {
        client_token.to_string()
    };
    let session = api
        .authenticate(&input.base_url, &input.user_name, &input.password, &client_token)
        .await?;
    abort.check()?;

    if let Some(profile) = session.selected_profile.clone() {
        return Ok(BoundSession {
            access_token: session.access_token,
            client_token: session.client_token,
            profile,
        });
    }

    let Some(profile) = session.available_profiles.first().cloned() else {
        return Err(LauncherError::user("You have not created a character yet"));
    };
    if session.available_profiles.len() > 1 {
        warn!(
            "{} profiles available, selecting {}",
            session.available_profiles.len(),
            profile.name
        );
    }

    // Bind the token to the chosen profile.
    let bound = api
        .refresh(
            &input.base_url,
            &session.access_token,
            &session.client_token,
            Some(&profile),
        )
        .await?
        .ok_or_else(|| LauncherError::user("The authentication server refused the selected character"))?;
    Ok(BoundSession {
        access_token: bound.access_token,
        client_token: bound.client_token,
        profile: bound.selected_profile.unwrap_or(profile),
    })
}

// ── HTTP implementation ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YggdrasilError {
    #[serde(default)]
    error_message: String,
}

pub struct HttpYggdrasilApi {
    client: reqwest::Client,
}

impl HttpYggdrasilApi {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn post(&self, url: String, body: serde_json::Value) -> LauncherResult<reqwest::Response> {
        Ok(self.client.post(url).json(&body).send().await?)
    }
}

#[async_trait]
impl YggdrasilApi for HttpYggdrasilApi {
    async fn validate(&self, base_url: &str, access_token: &str, client_token: &str) -> LauncherResult<bool> {
        let response = self
            .post(
                format!("{base_url}authserver/validate"),
                json!({ "accessToken": access_token, "clientToken": client_token }),
            )
            .await?;
        Ok(response.status().is_success())
    }

    async fn refresh(
        &self,
        base_url: &str,
        access_token: &str,
        client_token: &str,
        profile: Option<&GameProfile>,
    ) -> LauncherResult<Option<YggdrasilSession>> {
        let mut body = json!({
            "accessToken": access_token,
            "clientToken": client_token,
            "requestUser": true,
        });
        if let Some(profile) = profile {
            body["selectedProfile"] = json!(profile);
        }
        let response = self
            .post(format!("{base_url}authserver/refresh"), body)
            .await?;
        let status = response.status();
        if status.as_u16() == 403 || status.as_u16() == 401 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LauncherError::Auth(format!("refresh answered HTTP {status}")));
        }
        Ok(Some(response.json().await?))
    }

    async fn authenticate(
        &self,
        base_url: &str,
        user_name: &str,
        password: &str,
        client_token: &str,
    ) -> LauncherResult<YggdrasilSession> {
        let response = self
            .post(
                format!("{base_url}authserver/authenticate"),
                json!({
                    "agent": { "name": "Minecraft", "version": 1 },
                    "username": user_name,
                    "password": password,
                    "clientToken": client_token,
                    "requestUser": true,
                }),
            )
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<YggdrasilError>()
                .await
                .map(|e| e.error_message)
                .unwrap_or_default();
            if message.is_empty() {
                return Err(LauncherError::Auth(format!("authenticate answered HTTP {status}")));
            }
            return Err(LauncherError::user(format!("Login failed: {message}")));
        }
        Ok(response.json().await?)
    }

    async fn prefetch(&self, server: &str) -> LauncherResult<String> {
        let response = self.client.get(server.trim()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: server.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        Ok(BASE64.encode(body))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeServer {
        valid: bool,
        refreshable: bool,
        profiles: Vec<GameProfile>,
        offline: bool,
        calls: Mutex<Vec<String>>,
    }

    fn steve() -> GameProfile {
        GameProfile {
            id: "11111111222233334444555566667777".into(),
            name: "Steve".into(),
        }
    }

    #[async_trait]
    impl YggdrasilApi for FakeServer {
        async fn validate(&self, _base: &str, _access: &str, _client: &str) -> LauncherResult<bool> {
            self.calls.lock().unwrap().push("validate".into());
            Ok(self.valid)
        }

        async fn refresh(
            &self,
            _base: &str,
            _access: &str,
            client: &str,
            profile: Option<&GameProfile>,
        ) -> LauncherResult<Option<YggdrasilSession>> {
            self.calls.lock().unwrap().push("refresh".into());
            if !self.refreshable && profile.is_none() {
                return Ok(None);
            }
            Ok(Some(YggdrasilSession {
                access_token: "refreshed".into(),
                client_token: client.into(),
                selected_profile: Some(profile.cloned().unwrap_or_else(steve)),
                available_profiles: Vec::new(),
            }))
        }

        async fn authenticate(
            &self,
            _base: &str,
            _user: &str,
            _password: &str,
            client: &str,
        ) -> LauncherResult<YggdrasilSession> {
            self.calls.lock().unwrap().push("authenticate".into());
            Ok(YggdrasilSession {
                access_token: "fresh".into(),
                client_token: client.into(),
                selected_profile: None,
                available_profiles: self.profiles.clone(),
            })
        }

        async fn prefetch(&self, _server: &str) -> LauncherResult<String> {
            self.calls.lock().unwrap().push("prefetch".into());
            if self.offline {
                return Err(LauncherError::Other("connection refused".into()));
            }
            Ok(BASE64.encode(br#"{"meta":{}}"#))
        }
    }

    fn input() -> ServerLogin {
        ServerLogin {
            user_name: "steve@example.com".into(),
            password: "hunter2".into(),
            base_url: "https://skins.example.com/api/yggdrasil/".into(),
            server: "https://skins.example.com/api/yggdrasil".into(),
            force_reselect_profile: false,
        }
    }

    fn cached() -> CachedSession {
        CachedSession {
            access_token: "cached".into(),
            client_token: "client".into(),
            uuid: steve().id,
            name: "Steve".into(),
            user_name: "steve@example.com".into(),
            password: "hunter2".into(),
        }
    }

    #[tokio::test]
    async fn valid_cache_skips_authentication() {
        let api = FakeServer {
            valid: true,
            ..Default::default()
        };
        let result = run_flow(&api, SessionType::AuthInjector, &input(), &cached(), &AbortFlag::new(), &|_| {})
            .await
            .unwrap();
        assert_eq!(result.credential.access_token, "cached");
        assert_eq!(*api.calls.lock().unwrap(), vec!["prefetch", "validate"]);
        assert!(matches!(
            result.credential.agent,
            Some(AgentBinding::AuthlibInjector { ref prefetched, .. }) if !prefetched.is_empty()
        ));
    }

    #[tokio::test]
    async fn invalid_cache_is_refreshed() {
        let api = FakeServer {
            refreshable: true,
            ..Default::default()
        };
        let result = run_flow(&api, SessionType::UnifiedPass, &input(), &cached(), &AbortFlag::new(), &|_| {})
            .await
            .unwrap();
        assert_eq!(result.credential.access_token, "refreshed");
        assert_eq!(result.cache.access_token, "refreshed");
        assert_eq!(*api.calls.lock().unwrap(), vec!["validate", "refresh"]);
    }

    #[tokio::test]
    async fn expired_cache_authenticates_and_binds_profile() {
        let api = FakeServer {
            profiles: vec![steve()],
            ..Default::default()
        };
        let result = run_flow(&api, SessionType::UnifiedPass, &input(), &cached(), &AbortFlag::new(), &|_| {})
            .await
            .unwrap();
        assert_eq!(result.credential.display_name, "Steve");
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["validate", "refresh", "authenticate", "refresh"]
        );
    }

    #[tokio::test]
    async fn account_without_profile_is_rejected() {
        let api = FakeServer::default();
        let err = run_flow(
            &api,
            SessionType::UnifiedPass,
            &input(),
            &CachedSession::default(),
            &AbortFlag::new(),
            &|_| {},
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "You have not created a character yet");
    }

    #[tokio::test]
    async fn unreachable_injector_server_is_fatal() {
        let api = FakeServer {
            offline: true,
            ..Default::default()
        };
        let err = run_flow(&api, SessionType::AuthInjector, &input(), &cached(), &AbortFlag::new(), &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::UserVisible(ref m) if m.contains("Cannot reach")));
    }

    #[test]
    fn base_urls() {
        assert_eq!(unified_pass_base("abc"), "https://auth.mc-user.com:233/abc/");
        assert_eq!(
            auth_injector_base("https://skins.example.com/api/yggdrasil/authserver/"),
            "https://skins.example.com/api/yggdrasil/"
        );
        assert_eq!(
            auth_injector_base("https://skins.example.com/api/yggdrasil"),
            "https://skins.example.com/api/yggdrasil/"
        );
    }
}
