// ─── Library Tokens ───
// Turns the manifest's library list into concrete archive paths under
// `libraries/`. Natives archives are flagged so they can be extracted.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::version_file::{LibraryEntry, VersionJson};

/// One resolved library archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryToken {
    pub name: Option<String>,
    pub local_path: PathBuf,
    pub is_natives: bool,
    pub download_url: Option<String>,
    pub sha1: Option<String>,
}

/// A parsed Maven coordinate (`group:artifact:version[:classifier][@ext]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub packaging: String,
}

impl MavenCoordinate {
    pub fn parse(coord: &str) -> Option<Self> {
        let (coord_part, packaging) = match coord.rsplit_once('@') {
            Some((head, ext)) => (head, ext),
            None => (coord, "jar"),
        };

        let parts: Vec<&str> = coord_part.split(':').collect();
        let classifier = match parts.len() {
            3 => None,
            4 => Some(parts[3].to_string()),
            _ => return None,
        };

        Some(Self {
            group_id: parts[0].to_string(),
            artifact_id: parts[1].to_string(),
            version: parts[2].to_string(),
            classifier,
            packaging: packaging.to_string(),
        })
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifier = Some(classifier.to_string());
        self
    }

    /// `artifactId-version[-classifier].packaging`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact_id, self.version, c, self.packaging),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.packaging),
        }
    }

    /// Repository-relative path, always with `/` separators.
    pub fn local_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            self.filename()
        )
    }
}

/// Resolve the libraries allowed on this platform into archive tokens.
pub fn resolve_library_tokens(json: &VersionJson, libraries_dir: &Path) -> Vec<LibraryToken> {
    let mut tokens = Vec::new();

    for lib in &json.libraries {
        if !lib.is_allowed_for_current_os() {
            debug!("Skipping library (OS rule): {}", lib.name);
            continue;
        }

        if let Some(classifier) = lib.native_classifier_for_current_os() {
            if let Some(token) = natives_token(lib, &classifier, libraries_dir) {
                tokens.push(token);
            }
            // Old natives-only entries carry no main artifact.
            let has_artifact = lib
                .downloads
                .as_ref()
                .is_some_and(|downloads| downloads.artifact.is_some());
            if !has_artifact {
                continue;
            }
        }

        if let Some(token) = artifact_token(lib, libraries_dir) {
            tokens.push(token);
        }
    }

    tokens
}

fn artifact_token(lib: &LibraryEntry, libraries_dir: &Path) -> Option<LibraryToken> {
    let artifact = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref());

    let relative = match artifact.and_then(|a| a.path.clone()) {
        Some(path) => path,
        None => MavenCoordinate::parse(&lib.name)?.local_path(),
    };
    let download_url = match artifact.and_then(|a| a.url.clone()) {
        Some(url) if !url.is_empty() => Some(url),
        _ => lib
            .url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), relative)),
    };

    Some(LibraryToken {
        name: Some(lib.name.clone()),
        local_path: libraries_dir.join(relative),
        is_natives: false,
        download_url,
        sha1: artifact.and_then(|a| a.sha1.clone()),
    })
}

fn natives_token(lib: &LibraryEntry, classifier: &str, libraries_dir: &Path) -> Option<LibraryToken> {
    let declared = lib
        .downloads
        .as_ref()
        .and_then(|d| d.classifiers.as_ref())
        .and_then(|classifiers| classifiers.get(classifier));

    let relative = match declared.and_then(|info| info.get("path")).and_then(|p| p.as_str()) {
        Some(path) => path.to_string(),
        None => MavenCoordinate::parse(&lib.name)?
            .with_classifier(classifier)
            .local_path(),
    };

    Some(LibraryToken {
        name: Some(lib.name.clone()),
        local_path: libraries_dir.join(relative),
        is_natives: true,
        download_url: declared
            .and_then(|info| info.get("url"))
            .and_then(|u| u.as_str())
            .map(ToString::to_string),
        sha1: declared
            .and_then(|info| info.get("sha1"))
            .and_then(|h| h.as_str())
            .map(ToString::to_string),
    })
}
