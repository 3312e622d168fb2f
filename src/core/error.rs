use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launch engine.
/// Every stage returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── Control flow ────────────────────────────────────
    #[error("Launch aborted")]
    Aborted,

    /// The cause was already reported to the user (or needs no report).
    #[error("Launch stopped: {0}")]
    Silent(String),

    /// Carries the exact text shown to the user.
    #[error("{0}")]
    UserVisible(String),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Java ────────────────────────────────────────────
    #[error("Java requirements conflict: minimum {min} is above maximum {max}")]
    RuntimeConflict { min: String, max: String },

    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    // ── Auth ────────────────────────────────────────────
    #[error("Authentication failed: {0}")]
    Auth(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// How a failure is surfaced once it reaches the top of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Silent,
    UserVisible(String),
    Unclassified,
}

impl LauncherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LauncherError::Aborted | LauncherError::Silent(_) => ErrorKind::Silent,
            LauncherError::UserVisible(message) => ErrorKind::UserVisible(message.clone()),
            LauncherError::RuntimeConflict { .. } => ErrorKind::UserVisible(self.to_string()),
            _ => ErrorKind::Unclassified,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, LauncherError::Aborted)
    }

    pub fn user(message: impl Into<String>) -> Self {
        LauncherError::UserVisible(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl From<tokio::task::JoinError> for LauncherError {
    fn from(e: tokio::task::JoinError) -> Self {
        LauncherError::Other(format!("Task join error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_and_silent_errors_are_not_shown() {
        assert_eq!(LauncherError::Aborted.kind(), ErrorKind::Silent);
        assert_eq!(
            LauncherError::Silent("crashed".into()).kind(),
            ErrorKind::Silent
        );
    }

    #[test]
    fn user_visible_error_keeps_message_verbatim() {
        let err = LauncherError::user("No mainClass item in version json!");
        assert_eq!(
            err.kind(),
            ErrorKind::UserVisible("No mainClass item in version json!".into())
        );
        assert_eq!(err.to_string(), "No mainClass item in version json!");
    }

    #[test]
    fn runtime_conflict_is_user_visible() {
        let err = LauncherError::RuntimeConflict {
            min: "1.17.0.0".into(),
            max: "1.8.999.999".into(),
        };
        assert!(matches!(err.kind(), ErrorKind::UserVisible(msg) if msg.contains("1.17.0.0")));
    }

    #[test]
    fn io_errors_are_unclassified() {
        let err = LauncherError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert_eq!(err.kind(), ErrorKind::Unclassified);
    }
}
