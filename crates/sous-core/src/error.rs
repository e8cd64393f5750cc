//! Error types for the cooking session engine.
//!
//! Only structural problems surface as errors. State violations (starting a
//! step while another is active, confirming a step whose timer is still
//! running, ...) are not errors at all: they are answered with a
//! [`crate::response::ToolResponse`] so the calling agent can correct itself.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Comprehensive error type for all engine operations.
#[derive(Error, Debug)]
pub enum CookError {
    /// Recipe document failed structural validation at load time
    #[error("Malformed recipe: {reason}")]
    MalformedRecipe { reason: String },
    /// No live session exists for the given ID
    #[error("Session '{session_id}' not found")]
    UnknownSession { session_id: String },
    /// A countdown is already running for the step
    #[error("Timer for step '{step_id}' is already armed")]
    TimerAlreadyArmed { step_id: String },
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> CookError {
        CookError::Database {
            message: self.message,
            source,
        }
    }
}

impl CookError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a malformed-recipe error.
    pub fn malformed(reason: impl fmt::Display) -> Self {
        CookError::MalformedRecipe {
            reason: reason.to_string(),
        }
    }

    /// Creates an unknown-session error.
    pub fn unknown_session(session_id: impl Into<String>) -> Self {
        CookError::UnknownSession {
            session_id: session_id.into(),
        }
    }

    /// Maps a blocking-task join failure into a configuration error.
    pub(crate) fn join(error: tokio::task::JoinError) -> Self {
        CookError::Configuration {
            message: format!("Task join error: {error}"),
        }
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| CookError::database(message).with_source(e))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, CookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_recipe_message() {
        let error = CookError::malformed("duplicate step_id 'prep'");
        assert_eq!(
            error.to_string(),
            "Malformed recipe: duplicate step_id 'prep'"
        );
    }

    #[test]
    fn test_database_builder_keeps_source() {
        let error = CookError::database("Failed to open archive")
            .with_source(rusqlite::Error::InvalidQuery);
        match error {
            CookError::Database { message, .. } => assert_eq!(message, "Failed to open archive"),
            other => panic!("Expected Database error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_session_names_id() {
        let error = CookError::unknown_session("cook-7");
        assert!(error.to_string().contains("cook-7"));
    }
}
