//! Result wrappers for session lifecycle operations.

use std::fmt;

use serde::Serialize;

use crate::models::SessionOutcome;

/// The end of a session as reported to the caller of `finish_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinishedSession {
    pub session_id: String,
    pub outcome: SessionOutcome,
    /// Completion order
    pub completed_steps: Vec<String>,
    pub total_steps: usize,
}

impl FinishedSession {
    pub fn new(
        session_id: impl Into<String>,
        outcome: SessionOutcome,
        completed_steps: Vec<String>,
        total_steps: usize,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            outcome,
            completed_steps,
            total_steps,
        }
    }
}

impl fmt::Display for FinishedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Session {} {}: {}/{} steps completed",
            self.session_id,
            self.outcome,
            self.completed_steps.len(),
            self.total_steps
        )?;
        if !self.completed_steps.is_empty() {
            writeln!(f)?;
            for (position, step_id) in self.completed_steps.iter().enumerate() {
                writeln!(f, "{}. {step_id}", position + 1)?;
            }
        }
        Ok(())
    }
}
