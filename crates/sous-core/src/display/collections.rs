//! Collection wrappers.

use std::fmt;

use crate::models::ArchivedSession;

/// Archived sessions, newest first as returned by the archive.
pub struct ArchivedSessions(pub Vec<ArchivedSession>);

impl ArchivedSessions {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArchivedSession> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ArchivedSessions {
    type Item = &'a ArchivedSession;
    type IntoIter = std::slice::Iter<'a, ArchivedSession>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ArchivedSessions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No cooking sessions recorded.")
        } else {
            for session in &self.0 {
                write!(f, "{session}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::models::SessionOutcome;

    fn archived(session_id: &str, outcome: SessionOutcome) -> ArchivedSession {
        ArchivedSession {
            session_id: session_id.to_string(),
            recipe_id: "bread".to_string(),
            recipe_title: "Bread".to_string(),
            outcome,
            completed_steps: vec!["prep".to_string()],
            total_steps: 2,
            created_at: Timestamp::from_second(1_640_995_200).unwrap(),
            finished_at: Timestamp::from_second(1_640_998_800).unwrap(),
        }
    }

    #[test]
    fn test_empty_sessions() {
        assert_eq!(
            ArchivedSessions(vec![]).to_string(),
            "No cooking sessions recorded.\n"
        );
    }

    #[test]
    fn test_sessions_listed_with_outcome() {
        let sessions = ArchivedSessions(vec![
            archived("cook-1", SessionOutcome::Expired),
            archived("cook-2", SessionOutcome::Abandoned),
        ]);
        let output = sessions.to_string();

        assert_eq!(sessions.len(), 2);
        assert!(output.contains("## Bread (cook-1) - expired"));
        assert!(output.contains("## Bread (cook-2) - abandoned"));
        assert!(output.contains("- **Steps**: 1/2 completed"));
    }
}
