// ─── Microsoft Login ───
// OAuth (device code or refresh) → Xbox Live → XSTS → Minecraft token →
// ownership check → profile. Each step checks the abort flag first.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::core::abort::AbortFlag;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::notify::{HintLevel, Notifier};

use super::{Credential, MsLogin, SessionType};

const MS_DEVICE_CODE_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/devicecode";
const MS_TOKEN_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/token";
const XBL_AUTH_URL: &str = "https://user.auth.xboxlive.com/user/authenticate";
const XSTS_AUTH_URL: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
const MC_AUTH_URL: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
const MC_ENTITLEMENTS_URL: &str = "https://api.minecraftservices.com/entitlements/mcstore";
const MC_PROFILE_URL: &str = "https://api.minecraftservices.com/minecraft/profile";
const MS_SCOPE: &str = "XboxLive.signin offline_access";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XboxToken {
    pub token: String,
    pub user_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsProfile {
    pub uuid: String,
    pub name: String,
    pub raw: String,
}

/// The remote calls of the Microsoft flow.
#[async_trait]
pub trait MsAuthApi: Send + Sync {
    /// Full interactive sign-in.
    async fn oauth_new(&self, abort: &AbortFlag) -> LauncherResult<OAuthTokens>;

    /// `Ok(None)` when the refresh token was rejected and a new sign-in is needed.
    async fn oauth_refresh(&self, refresh_token: &str) -> LauncherResult<Option<OAuthTokens>>;

    async fn xbox_live(&self, oauth_access_token: &str) -> LauncherResult<XboxToken>;

    async fn xsts(&self, xbl_token: &str) -> LauncherResult<XboxToken>;

    async fn minecraft_token(&self, xsts: &XboxToken) -> LauncherResult<String>;

    async fn check_ownership(&self, access_token: &str) -> LauncherResult<()>;

    async fn profile(&self, access_token: &str) -> LauncherResult<MsProfile>;
}

/// Result of a completed flow, including the refresh token to cache.
#[derive(Debug, Clone)]
pub struct MsLoginResult {
    pub credential: Credential,
    pub refresh_token: String,
}

pub fn credential_from_cache(input: &MsLogin) -> Credential {
    Credential {
        display_name: input.user_name.clone(),
        uuid: input.uuid.clone(),
        access_token: input.access_token.clone(),
        client_token: input.uuid.clone(),
        session_type: SessionType::Microsoft,
        raw_profile: Some(input.profile_json.clone()).filter(|p| !p.is_empty()),
        agent: None,
    }
}

/// Run the six steps, reporting 0.25 … 0.98 through `progress`.
#[instrument(skip_all)]
pub async fn run_flow(
    api: &dyn MsAuthApi,
    input: &MsLogin,
    abort: &AbortFlag,
    progress: &(dyn Fn(f64) + Send + Sync),
) -> LauncherResult<MsLoginResult> {
    let oauth = if input.oauth_refresh_token.is_empty() {
        api.oauth_new(abort).await?
    } else {
        match api.oauth_refresh(&input.oauth_refresh_token).await? {
            Some(tokens) => tokens,
            None => {
                info!("Microsoft refresh token rejected, signing in again");
                api.oauth_new(abort).await?
            }
        }
    };
    abort.check()?;
    progress(0.25);

    let xbl = api.xbox_live(&oauth.access_token).await?;
    abort.check()?;
    progress(0.40);

    let xsts = api.xsts(&xbl.token).await?;
    abort.check()?;
    progress(0.55);

    let access_token = api.minecraft_token(&xsts).await?;
    abort.check()?;
    progress(0.70);

    api.check_ownership(&access_token).await?;
    abort.check()?;
    progress(0.85);

    let profile = api.profile(&access_token).await?;
    progress(0.98);

    Ok(MsLoginResult {
        credential: Credential {
            display_name: profile.name,
            client_token: profile.uuid.clone(),
            uuid: profile.uuid,
            access_token,
            session_type: SessionType::Microsoft,
            raw_profile: Some(profile.raw),
            agent: None,
        },
        refresh_token: oauth.refresh_token,
    })
}

// ── HTTP implementation ──

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default = "default_interval")]
    interval: u64,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_interval() -> u64 {
    5
}

fn default_expiry() -> u64 {
    900
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
}

#[derive(Debug, Deserialize)]
struct XboxAuthResponse {
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "DisplayClaims")]
    display_claims: XboxDisplayClaims,
}

#[derive(Debug, Deserialize)]
struct XboxDisplayClaims {
    xui: Vec<XboxUserInfo>,
}

#[derive(Debug, Deserialize)]
struct XboxUserInfo {
    uhs: String,
}

#[derive(Debug, Deserialize)]
struct McAuthResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct McEntitlementsResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct McProfileResponse {
    id: String,
    name: String,
}

pub struct HttpMsAuthApi {
    client: reqwest::Client,
    client_id: String,
    notifier: Arc<dyn Notifier>,
}

impl HttpMsAuthApi {
    pub fn new(client: reqwest::Client, client_id: String, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            client_id,
            notifier,
        }
    }

    async fn post_xbox(&self, url: &str, body: serde_json::Value) -> LauncherResult<XboxToken> {
        let response = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .header("x-xbl-contract-version", "1")
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Some(message) = explain_xerr(&text) {
                return Err(LauncherError::user(message));
            }
            return Err(LauncherError::Auth(format!("{url} answered HTTP {status}")));
        }
        let data: XboxAuthResponse = response.json().await?;
        let user_hash = data
            .display_claims
            .xui
            .first()
            .map(|x| x.uhs.clone())
            .ok_or_else(|| LauncherError::Auth("Xbox response missing user hash".into()))?;
        Ok(XboxToken {
            token: data.token,
            user_hash,
        })
    }

    async fn get_with_bearer(&self, url: &str, access_token: &str) -> LauncherResult<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::Auth(format!("{url} answered HTTP {status}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl MsAuthApi for HttpMsAuthApi {
    async fn oauth_new(&self, abort: &AbortFlag) -> LauncherResult<OAuthTokens> {
        let params = [("client_id", self.client_id.as_str()), ("scope", MS_SCOPE)];
        let response = self
            .client
            .post(MS_DEVICE_CODE_URL)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LauncherError::Auth(format!(
                "device code request answered HTTP {}",
                response.status()
            )));
        }
        let flow: DeviceCodeResponse = response.json().await?;
        self.notifier.show_hint(
            &format!(
                "Open {} and enter the code {} to sign in",
                flow.verification_uri, flow.user_code
            ),
            HintLevel::Info,
        );
        info!("Waiting for Microsoft sign-in at {}", flow.verification_uri);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(flow.expires_in);
        let mut interval = Duration::from_secs(flow.interval.max(1));
        loop {
            tokio::select! {
                _ = abort.cancelled() => return Err(LauncherError::Aborted),
                _ = tokio::time::sleep(interval) => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LauncherError::user(
                    "Microsoft sign-in timed out, please try again.",
                ));
            }

            let params = [
                ("client_id", self.client_id.as_str()),
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                ("device_code", flow.device_code.as_str()),
            ];
            let response = self
                .client
                .post(MS_TOKEN_URL)
                .header("Accept", "application/json")
                .form(&params)
                .send()
                .await?;
            if response.status().is_success() {
                let token: TokenResponse = response.json().await?;
                return Ok(OAuthTokens {
                    access_token: token.access_token,
                    refresh_token: token.refresh_token.unwrap_or_default(),
                });
            }

            let error = response
                .json::<TokenError>()
                .await
                .map(|e| e.error)
                .unwrap_or_default();
            match error.as_str() {
                "authorization_pending" => {}
                "slow_down" => interval += Duration::from_secs(5),
                "authorization_declined" => {
                    return Err(LauncherError::Silent("Microsoft sign-in declined".into()))
                }
                "expired_token" => {
                    return Err(LauncherError::user(
                        "Microsoft sign-in timed out, please try again.",
                    ))
                }
                other => {
                    return Err(LauncherError::Auth(format!("device code polling failed: {other}")))
                }
            }
        }
    }

    async fn oauth_refresh(&self, refresh_token: &str) -> LauncherResult<Option<OAuthTokens>> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", MS_SCOPE),
        ];
        let response = self
            .client
            .post(MS_TOKEN_URL)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            let token: TokenResponse = response.json().await?;
            return Ok(Some(OAuthTokens {
                access_token: token.access_token,
                refresh_token: token
                    .refresh_token
                    .unwrap_or_else(|| refresh_token.to_string()),
            }));
        }

        let text = response.text().await.unwrap_or_default();
        if text.contains("invalid_grant") || text.contains("must sign in again") {
            warn!("Microsoft refresh token expired");
            return Ok(None);
        }
        Err(LauncherError::Auth(format!("token refresh answered HTTP {status}")))
    }

    async fn xbox_live(&self, oauth_access_token: &str) -> LauncherResult<XboxToken> {
        self.post_xbox(
            XBL_AUTH_URL,
            json!({
                "Properties": {
                    "AuthMethod": "RPS",
                    "SiteName": "user.auth.xboxlive.com",
                    "RpsTicket": format!("d={oauth_access_token}"),
                },
                "RelyingParty": "http://auth.xboxlive.com",
                "TokenType": "JWT"
            }),
        )
        .await
    }

    async fn xsts(&self, xbl_token: &str) -> LauncherResult<XboxToken> {
        self.post_xbox(
            XSTS_AUTH_URL,
            json!({
                "Properties": {
                    "SandboxId": "RETAIL",
                    "UserTokens": [xbl_token],
                },
                "RelyingParty": "rp://api.minecraftservices.com/",
                "TokenType": "JWT"
            }),
        )
        .await
    }

    async fn minecraft_token(&self, xsts: &XboxToken) -> LauncherResult<String> {
        let response = self
            .client
            .post(MC_AUTH_URL)
            .header("Accept", "application/json")
            .json(&json!({
                "identityToken": format!("XBL3.0 x={};{}", xsts.user_hash, xsts.token),
            }))
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LauncherError::user(
                "Too many login attempts, please wait a few minutes and try again.",
            ));
        }
        if !status.is_success() {
            return Err(LauncherError::Auth(format!("Minecraft login answered HTTP {status}")));
        }
        let data: McAuthResponse = response.json().await?;
        Ok(data.access_token)
    }

    async fn check_ownership(&self, access_token: &str) -> LauncherResult<()> {
        let response = self.get_with_bearer(MC_ENTITLEMENTS_URL, access_token).await?;
        let payload: McEntitlementsResponse = response.json().await?;
        if payload.items.is_empty() {
            return Err(LauncherError::user("This account does not own Minecraft"));
        }
        Ok(())
    }

    async fn profile(&self, access_token: &str) -> LauncherResult<MsProfile> {
        let response = self
            .client
            .get(MC_PROFILE_URL)
            .header("Accept", "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Err(LauncherError::user(
                "You have not created a Minecraft profile yet, please create one on the official website",
            ));
        }
        if !response.status().is_success() {
            return Err(LauncherError::Auth(format!(
                "profile request answered HTTP {}",
                response.status()
            )));
        }
        let raw = response.text().await?;
        let parsed: McProfileResponse = serde_json::from_str(&raw)?;
        debug!("Microsoft profile loaded for {}", parsed.name);
        Ok(MsProfile {
            uuid: parsed.id,
            name: parsed.name,
            raw,
        })
    }
}

/// User-facing text for XSTS `XErr` codes.
fn explain_xerr(body: &str) -> Option<&'static str> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let code = value.get("XErr")?.as_u64()?;
    let message = match code {
        2148916233 => "This Microsoft account has no Xbox profile yet, please create one first.",
        2148916235 => "Xbox Live is not available in your country or region.",
        2148916236 | 2148916237 => "This account needs adult verification on the Xbox website.",
        2148916238 => "This is a child account, it must be added to a Family by an adult first.",
        _ => return None,
    };
    Some(message)
}
