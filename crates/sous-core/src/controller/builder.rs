//! Builder for creating and configuring [`SessionController`] instances.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{EngineConfig, InMemorySessionStore, SessionController, SessionStore};
use crate::{archive::SessionArchive, error::Result};

/// Where finished sessions are recorded.
#[derive(Debug, Clone)]
enum ArchiveLocation {
    Default,
    Path(PathBuf),
    Disabled,
}

/// Builder for [`SessionController`].
pub struct SessionControllerBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn SessionStore>>,
    archive: ArchiveLocation,
}

impl SessionControllerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            store: None,
            archive: ArchiveLocation::Default,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.config.idle_timeout = idle_timeout;
        self
    }

    pub fn with_reaper_interval(mut self, reaper_interval: Duration) -> Self {
        self.config.reaper_interval = reaper_interval;
        self
    }

    pub fn allow_force_complete(mut self, allow: bool) -> Self {
        self.config.allow_force_complete = allow;
        self
    }

    /// Uses a custom session registry instead of a fresh in-memory one.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets a custom archive database file.
    ///
    /// If not specified, uses the XDG Base Directory specification:
    /// `$XDG_DATA_HOME/sous/sessions.db` or `~/.local/share/sous/sessions.db`
    pub fn with_archive_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.archive = ArchiveLocation::Path(path.as_ref().to_path_buf());
        }
        self
    }

    /// Keeps finished sessions nowhere.
    pub fn without_archive(mut self) -> Self {
        self.archive = ArchiveLocation::Disabled;
        self
    }

    /// Builds the controller, opening the archive if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `CookError::XdgDirectory` if the default path cannot be
    /// resolved, `CookError::FileSystem` if its directory cannot be created,
    /// and `CookError::Database` if the archive cannot be initialized.
    pub async fn build(self) -> Result<SessionController> {
        let archive = match self.archive {
            ArchiveLocation::Disabled => None,
            ArchiveLocation::Path(path) => Some(SessionArchive::open(path).await?),
            ArchiveLocation::Default => {
                Some(SessionArchive::open(SessionArchive::default_path()?).await?)
            }
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));

        Ok(SessionController::new(store, self.config, archive))
    }
}

impl Default for SessionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
