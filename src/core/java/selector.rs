// ─── Java Selection ───
// Chooses the runtime for one launch: a pinned path when configured, else
// the best installed runtime inside the version's interval, else a download.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::core::abort::AbortFlag;
use crate::core::config::{keys, ConfigExt, ConfigStore};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::notify::{HintLevel, Notifier};
use crate::core::version::VersionDescriptor;

use super::entry::JavaEntry;
use super::install::RuntimeInstaller;
use super::interval::{RuntimeRequirements, VersionInterval};
use super::search::JavaLocator;

pub const NO_JAVA_HINT: &str = "No available Java, launch cancelled!";

pub struct JavaSelector {
    config: Arc<dyn ConfigStore>,
    notifier: Arc<dyn Notifier>,
    locator: Arc<dyn JavaLocator>,
    installer: Arc<dyn RuntimeInstaller>,
}

impl JavaSelector {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        notifier: Arc<dyn Notifier>,
        locator: Arc<dyn JavaLocator>,
        installer: Arc<dyn RuntimeInstaller>,
    ) -> Self {
        Self {
            config,
            notifier,
            locator,
            installer,
        }
    }

    pub async fn select(
        &self,
        version: &VersionDescriptor,
        unified_pass: bool,
        abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<JavaEntry> {
        let requirements = RuntimeRequirements::from_version(version, unified_pass);
        self.select_for(&version.name, &requirements, abort, progress)
            .await
    }

    #[instrument(skip(self, requirements, abort, progress))]
    pub async fn select_for(
        &self,
        version_name: &str,
        requirements: &RuntimeRequirements,
        abort: &AbortFlag,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> LauncherResult<JavaEntry> {
        let interval = requirements.interval()?;
        info!("Java requirement for {}: {}", version_name, interval);

        if let Some(pinned) = self.pinned(version_name, &interval).await? {
            progress(1.0);
            return Ok(pinned);
        }

        abort.check()?;
        if let Some(found) = self.best_installed(&interval).await? {
            progress(1.0);
            return Ok(found);
        }

        let target = interval.download_target();
        self.installer.ensure_available(target).await?;
        let question = format!(
            "No installed Java fits this version ({interval}).\nDownload Java {target} automatically?"
        );
        if !self.notifier.confirm("Download Java", &question) {
            self.notifier.show_hint(NO_JAVA_HINT, HintLevel::Critical);
            return Err(LauncherError::Silent("Java download declined".into()));
        }

        abort.check()?;
        let installed = self.installer.install(target, abort, progress).await?;
        info!("Java {} installed at {:?}", target, installed);

        abort.check()?;
        match self.best_installed(&interval).await? {
            Some(found) => {
                progress(1.0);
                Ok(found)
            }
            None => {
                self.notifier.show_hint(NO_JAVA_HINT, HintLevel::Critical);
                Err(LauncherError::Silent(format!(
                    "no Java inside {interval} after installing {target}"
                )))
            }
        }
    }

    async fn pinned(
        &self,
        version_name: &str,
        interval: &VersionInterval,
    ) -> LauncherResult<Option<JavaEntry>> {
        let raw = self.config.version_or_global(
            keys::VERSION_JAVA_PATH,
            version_name,
            keys::LAUNCH_JAVA_PATH,
        );
        let raw = raw.trim().trim_matches('"').to_string();
        if raw.is_empty() {
            return Ok(None);
        }

        let path = PathBuf::from(&raw);
        let probed = tokio::task::spawn_blocking(move || JavaEntry::probe(&path)).await?;
        match probed {
            Some(entry) => {
                if !interval.contains(&entry.version) {
                    warn!(
                        "Pinned Java {} is outside {}, using it anyway",
                        entry.version, interval
                    );
                }
                Ok(Some(entry))
            }
            None => {
                warn!("Pinned Java at {} is unusable, searching instead", raw);
                Ok(None)
            }
        }
    }

    async fn best_installed(&self, interval: &VersionInterval) -> LauncherResult<Option<JavaEntry>> {
        let mut fitting: Vec<JavaEntry> = self
            .locator
            .scan()
            .await?
            .into_iter()
            .filter(|entry| interval.contains(&entry.version))
            .collect();
        fitting.sort_by(JavaEntry::preference);
        Ok(fitting.into_iter().next())
    }
}
