//! Offline login: no network, the UUID is derived from the player name.

use super::{Credential, LegacyLogin, SessionType};

/// 32-bit `h = h * 31 + unit` over the UTF-16 units of `name`.
fn name_hash(name: &str) -> i32 {
    name.encode_utf16()
        .fold(0_i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Stable offline UUID (32 hex chars, no dashes) for a player name.
pub fn legacy_uuid(name: &str) -> String {
    let length = name.encode_utf16().count() as u64;
    let hash = i64::from(name_hash(name)).unsigned_abs();
    let full = format!("{length:016x}{hash:016x}");
    format!(
        "{}3{}9{}",
        &full[0..12],
        &full[13..16],
        &full[17..32]
    )
}

pub fn login(data: &LegacyLogin) -> Credential {
    let name = data.user_name.trim().to_string();
    let uuid = legacy_uuid(&name);
    Credential {
        display_name: name,
        access_token: uuid.clone(),
        client_token: uuid.clone(),
        uuid,
        session_type: SessionType::Legacy,
        raw_profile: None,
        agent: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_matches_known_values() {
        assert_eq!(legacy_uuid("Steve"), "00000000000030059000000004c7e3b3");
        assert_eq!(legacy_uuid("Alex"), "000000000000300490000000001f2e3e");
        assert_eq!(legacy_uuid(""), "00000000000030009000000000000000");
    }

    #[test]
    fn uuid_is_stable_and_well_formed() {
        for name in ["Steve", "玩家", "a_very_long_player_name_1234"] {
            let first = legacy_uuid(name);
            assert_eq!(first, legacy_uuid(name));
            assert_eq!(first.len(), 32);
            assert_eq!(&first[12..13], "3");
            assert_eq!(&first[16..17], "9");
            assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        }
        assert_ne!(legacy_uuid("Steve"), legacy_uuid("steve"));
    }

    #[test]
    fn login_builds_legacy_credential() {
        let credential = login(&LegacyLogin {
            user_name: " Steve ".into(),
            ..Default::default()
        });
        assert_eq!(credential.display_name, "Steve");
        assert_eq!(credential.session_type, SessionType::Legacy);
        assert_eq!(credential.uuid, legacy_uuid("Steve"));
        assert!(credential.agent.is_none());
    }
}
