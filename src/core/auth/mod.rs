// ─── Authentication ───
// Every login scheme ends in the same `Credential`. Scheme inputs live in
// `LoginData`, one variant per scheme, each handled by its own module.

pub mod controller;
pub mod legacy;
pub mod microsoft;
pub mod server;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use controller::LoginController;
pub use microsoft::{HttpMsAuthApi, MsAuthApi};
pub use server::{HttpYggdrasilApi, YggdrasilApi};

/// Value of the `LoginType` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginType {
    Legacy,
    UnifiedPass,
    AuthInjector,
    Microsoft,
}

impl LoginType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LoginType::Legacy),
            2 => Some(LoginType::UnifiedPass),
            3 => Some(LoginType::AuthInjector),
            5 => Some(LoginType::Microsoft),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            LoginType::Legacy => 0,
            LoginType::UnifiedPass => 2,
            LoginType::AuthInjector => 3,
            LoginType::Microsoft => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    Legacy,
    Microsoft,
    UnifiedPass,
    AuthInjector,
}

impl SessionType {
    /// Value substituted for `${user_type}`.
    pub fn user_type(self) -> &'static str {
        match self {
            SessionType::Microsoft => "msa",
            SessionType::Legacy => "legacy",
            SessionType::UnifiedPass | SessionType::AuthInjector => "mojang",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionType::Legacy => "Legacy",
            SessionType::Microsoft => "Microsoft",
            SessionType::UnifiedPass => "Nide",
            SessionType::AuthInjector => "Auth",
        };
        f.write_str(name)
    }
}

/// Java agent the game must load for a third-party session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentBinding {
    UnifiedPass { server_id: String },
    AuthlibInjector { server: String, prefetched: String },
}

/// Validated session handed to the argument builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub display_name: String,
    pub uuid: String,
    pub access_token: String,
    pub client_token: String,
    pub session_type: SessionType,
    pub raw_profile: Option<String>,
    pub agent: Option<AgentBinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyLogin {
    pub user_name: String,
    pub skin_type: i64,
    pub skin_name: String,
}

/// Cached Microsoft session; empty strings mean "not cached".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsLogin {
    pub oauth_refresh_token: String,
    pub access_token: String,
    pub uuid: String,
    pub user_name: String,
    pub profile_json: String,
}

/// Input of a Yggdrasil-style login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerLogin {
    pub user_name: String,
    pub password: String,
    /// Root of the Yggdrasil API, ending with `/`.
    pub base_url: String,
    /// Unified Pass server id or Authlib-Injector server URL, as configured.
    pub server: String,
    pub force_reselect_profile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginData {
    Legacy(LegacyLogin),
    Microsoft(MsLogin),
    UnifiedPass(ServerLogin),
    AuthInjector(ServerLogin),
}

impl LoginData {
    pub fn login_type(&self) -> LoginType {
        match self {
            LoginData::Legacy(_) => LoginType::Legacy,
            LoginData::Microsoft(_) => LoginType::Microsoft,
            LoginData::UnifiedPass(_) => LoginType::UnifiedPass,
            LoginData::AuthInjector(_) => LoginType::AuthInjector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_type_codes_round_trip() {
        for code in [0, 2, 3, 5] {
            let kind = LoginType::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert_eq!(LoginType::from_code(1), None);
    }

    #[test]
    fn session_type_names() {
        assert_eq!(SessionType::Microsoft.to_string(), "Microsoft");
        assert_eq!(SessionType::Microsoft.user_type(), "msa");
        assert_eq!(SessionType::Legacy.user_type(), "legacy");
    }
}
