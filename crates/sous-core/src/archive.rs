//! Asynchronous front of the finished-session archive.
//!
//! Each call opens the SQLite database on a blocking task, the same way every
//! database access in this crate is kept off the async runtime threads.

use std::path::{Path, PathBuf};

use tokio::task;

use crate::{
    db::Database,
    error::{CookError, Result},
    models::ArchivedSession,
};

/// Handle to the archive database file.
#[derive(Debug, Clone)]
pub struct SessionArchive {
    db_path: PathBuf,
}

impl SessionArchive {
    /// Opens the archive at `path`, creating parent directories and the
    /// schema as needed.
    ///
    /// # Errors
    ///
    /// Returns `CookError::FileSystem` if the parent directory cannot be
    /// created, and `CookError::Database` if initialization fails.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CookError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let init_path = db_path.clone();
        task::spawn_blocking(move || Database::new(&init_path).map(drop))
            .await
            .map_err(CookError::join)??;

        Ok(Self { db_path })
    }

    /// `$XDG_DATA_HOME/sous/sessions.db`, or `~/.local/share/sous/sessions.db`.
    pub fn default_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("sous")
            .place_data_file("sessions.db")
            .map_err(|e| CookError::XdgDirectory(e.to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub async fn record(&self, session: ArchivedSession) -> Result<()> {
        let db_path = self.db_path.clone();
        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.record_session(&session)
        })
        .await
        .map_err(CookError::join)?
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<ArchivedSession>> {
        let db_path = self.db_path.clone();
        let session_id = session_id.to_string();
        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.get_session(&session_id)
        })
        .await
        .map_err(CookError::join)?
    }

    /// Most recently archived first.
    pub async fn list(&self, limit: usize) -> Result<Vec<ArchivedSession>> {
        let db_path = self.db_path.clone();
        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.list_sessions(limit)
        })
        .await
        .map_err(CookError::join)?
    }
}
