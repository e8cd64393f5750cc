//! Archived session record.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::SessionOutcome;

/// A session that has left the controller, as kept in the archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchivedSession {
    pub session_id: String,
    pub recipe_id: String,
    pub recipe_title: String,
    pub outcome: SessionOutcome,
    /// Completion order as reported by the session
    pub completed_steps: Vec<String>,
    pub total_steps: usize,
    pub created_at: Timestamp,
    pub finished_at: Timestamp,
}

impl ArchivedSession {
    pub fn is_fully_cooked(&self) -> bool {
        self.completed_steps.len() == self.total_steps
    }
}
