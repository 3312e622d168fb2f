// ─── Launch Script Export ───
// Writes the assembled command to a `.bat` / `.sh` file instead of
// starting the game. Secrets are masked before anything hits the disk.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::safe_path_str;

use super::arguments::quote_argument;
use super::secrets::{mask_tokens, SCRIPT_MASK};

/// Everything a launch script contains.
#[derive(Debug, Clone)]
pub struct LaunchScript {
    pub version_name: String,
    pub indie_path: PathBuf,
    pub java_path: PathBuf,
    /// Feature release of the runtime; above 8 the console is switched to UTF-8.
    pub java_code: u32,
    pub arguments: Vec<String>,
    /// Already expanded global and version commands.
    pub custom_commands: Vec<String>,
    /// Session tokens masked wherever they appear.
    pub session_tokens: Vec<String>,
}

impl LaunchScript {
    pub fn render_batch(&self) -> String {
        let indie = safe_path_str(&self.indie_path);
        let mut lines = Vec::new();
        if self.java_code > 8 {
            lines.push("chcp 65001>nul".to_string());
        }
        lines.push("@echo off".to_string());
        lines.push(format!("title Launch - {}", self.version_name));
        lines.push("echo Game is launching, please wait...".to_string());
        lines.push(format!("set APPDATA=\"{indie}\""));
        lines.push(format!("cd /D \"{indie}\""));
        lines.extend(self.custom_commands.iter().cloned());
        let args = self
            .arguments
            .iter()
            .map(|arg| quote_argument(arg))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("\"{}\" {}", safe_path_str(&self.java_path), args));
        lines.push("echo Game has exited.".to_string());
        lines.push("pause".to_string());
        lines.join("\r\n") + "\r\n"
    }

    pub fn render_shell(&self) -> String {
        let indie = sh_quote(&safe_path_str(&self.indie_path));
        let mut lines = vec![
            "#!/bin/sh".to_string(),
            format!("# Launch - {}", self.version_name),
            "echo \"Game is launching, please wait...\"".to_string(),
            format!("export APPDATA={indie}"),
            format!("cd {indie} || exit 1"),
        ];
        lines.extend(self.custom_commands.iter().cloned());
        let args = self
            .arguments
            .iter()
            .map(|arg| sh_quote(arg))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("{} {}", sh_quote(&safe_path_str(&self.java_path)), args));
        lines.push("echo \"Game has exited.\"".to_string());
        lines.join("\n") + "\n"
    }

    /// Render for this platform with every secret masked.
    pub fn render(&self) -> String {
        let raw = if cfg!(target_os = "windows") {
            self.render_batch()
        } else {
            self.render_shell()
        };
        let tokens: Vec<&str> = self.session_tokens.iter().map(String::as_str).collect();
        mask_tokens(&raw, &tokens, SCRIPT_MASK)
    }
}

fn sh_quote(raw: &str) -> String {
    if !raw.is_empty()
        && raw
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '=' | ','))
    {
        return raw.to_string();
    }
    format!("'{}'", raw.replace('\'', "'\\''"))
}

/// Write the script to `path`, marking it executable on Unix.
pub async fn write_launch_script(script: &LaunchScript, path: &Path) -> LauncherResult<PathBuf> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, script.render())
        .await
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|source| LauncherError::Io {
                path: path.to_path_buf(),
                source,
            })?;
    }

    info!("Launch script saved to {:?}", path);
    Ok(path.to_path_buf())
}
