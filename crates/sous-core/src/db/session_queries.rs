//! Archived session inserts and lookups.

use jiff::Timestamp;
use rusqlite::{params, types::Type, OptionalExtension, Row};

use crate::{
    error::{DatabaseResultExt, Result},
    models::{ArchivedSession, SessionOutcome},
};

const SESSION_COLUMNS: &str = "session_id, recipe_id, recipe_title, outcome, completed_steps, total_steps, created_at, finished_at";
const INSERT_SESSION_SQL: &str = "INSERT INTO sessions (session_id, recipe_id, recipe_title, outcome, completed_steps, total_steps, created_at, finished_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

fn conversion_error(column: usize, error: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
}

fn timestamp_at(row: &Row<'_>, column: usize) -> rusqlite::Result<Timestamp> {
    row.get::<_, String>(column)?
        .parse::<Timestamp>()
        .map_err(|e| conversion_error(column, e))
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ArchivedSession> {
    let outcome_str: String = row.get(3)?;
    let outcome = outcome_str.parse::<SessionOutcome>().map_err(|_| {
        conversion_error(
            3,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Invalid session outcome: {outcome_str}"),
            ),
        )
    })?;
    let completed_json: String = row.get(4)?;
    let completed_steps: Vec<String> =
        serde_json::from_str(&completed_json).map_err(|e| conversion_error(4, e))?;

    Ok(ArchivedSession {
        session_id: row.get(0)?,
        recipe_id: row.get(1)?,
        recipe_title: row.get(2)?,
        outcome,
        completed_steps,
        total_steps: usize::try_from(row.get::<_, i64>(5)?).unwrap_or_default(),
        created_at: timestamp_at(row, 6)?,
        finished_at: timestamp_at(row, 7)?,
    })
}

impl super::Database {
    /// Appends a finished session to the archive.
    pub fn record_session(&mut self, session: &ArchivedSession) -> Result<()> {
        let completed_steps = serde_json::to_string(&session.completed_steps)?;
        let total_steps = i64::try_from(session.total_steps).unwrap_or(i64::MAX);

        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;
        tx.execute(
            INSERT_SESSION_SQL,
            params![
                session.session_id,
                session.recipe_id,
                session.recipe_title,
                session.outcome.as_str(),
                completed_steps,
                total_steps,
                session.created_at.to_string(),
                session.finished_at.to_string(),
            ],
        )
        .db_context("Failed to insert session")?;
        tx.commit().db_context("Failed to commit transaction")
    }

    /// Retrieves one archived session.
    pub fn get_session(&self, session_id: &str) -> Result<Option<ArchivedSession>> {
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1"
            ))
            .db_context("Failed to prepare query")?;
        stmt.query_row(params![session_id], session_from_row)
            .optional()
            .db_context("Failed to query session")
    }

    /// Lists the most recently archived sessions first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<ArchivedSession>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY id DESC LIMIT ?1"
            ))
            .db_context("Failed to prepare query")?;
        let rows = stmt
            .query_map(params![limit], session_from_row)
            .db_context("Failed to query sessions")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to read session row")
    }
}
