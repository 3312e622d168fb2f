// ─── Secret Filter ───
// Masks session tokens and prefetched auth metadata before text reaches a
// log line or an exported script.

use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

/// Placeholder used in log lines.
pub const LOG_MASK: char = '*';
/// Placeholder used in exported launch scripts.
pub const SCRIPT_MASK: char = 'F';

struct SecretRules {
    access_json: Regex,
    client_json: Regex,
    prefetched: Regex,
    access_flag: Regex,
    session_flag: Regex,
    summary: Regex,
}

fn rules() -> &'static SecretRules {
    static RULES: OnceLock<SecretRules> = OnceLock::new();
    RULES.get_or_init(|| SecretRules {
        access_json: Regex::new(r#"accessToken[":]+"([^"]+)""#).expect("valid access token pattern"),
        client_json: Regex::new(r#"clientToken[":]+"([^"]+)""#).expect("valid client token pattern"),
        prefetched: Regex::new(r"-Dauthlibinjector\.yggdrasil\.prefetched=([^\s]+)")
            .expect("valid prefetch pattern"),
        access_flag: Regex::new(r"(--accessToken\s+)[^\s]+").expect("valid flag pattern"),
        session_flag: Regex::new(r"(--session\s+)[^\s]+").expect("valid session pattern"),
        summary: Regex::new(r"((?:AccessToken|ClientToken): )[^\s]+").expect("valid summary pattern"),
    })
}

/// Replace every secret in `text` with a run of `mask`.
pub fn secret_filter(text: &str, mask: char) -> String {
    if text.is_empty() {
        return String::new();
    }
    let rules = rules();
    let ten = mask.to_string().repeat(10);
    let five = mask.to_string().repeat(5);

    let text = rules
        .access_json
        .replace_all(text, format!("accessToken\":\"{ten}\"").as_str());
    let text = rules
        .client_json
        .replace_all(&text, format!("clientToken\":\"{ten}\"").as_str());
    let text = rules.prefetched.replace_all(
        &text,
        format!("-Dauthlibinjector.yggdrasil.prefetched={five}").as_str(),
    );
    let text = rules
        .access_flag
        .replace_all(&text, format!("${{1}}{ten}").as_str());
    let text = rules
        .session_flag
        .replace_all(&text, format!("${{1}}{ten}").as_str());
    let text = rules
        .summary
        .replace_all(&text, format!("${{1}}{ten}").as_str());
    text.into_owned()
}

/// `secret_filter`, plus every occurrence of the given token values.
///
/// Old manifests pass the session as a bare positional argument, which no
/// pattern can tell apart from the player name.
pub fn mask_tokens(text: &str, tokens: &[&str], mask: char) -> String {
    let ten = mask.to_string().repeat(10);
    let mut text = secret_filter(text, mask);
    for token in tokens.iter().map(|token| token.trim()) {
        // Too short to be a session token.
        if token.len() < 8 {
            continue;
        }
        text = text.replace(token, &ten);
    }
    text
}

/// Emit one launch log line on the `launch` target, secrets masked.
pub fn launch_log(text: &str) {
    info!(target: "launch", "{}", secret_filter(text, LOG_MASK));
}
