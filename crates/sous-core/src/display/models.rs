//! Display implementations for domain models.
//!
//! Kept apart from the model definitions so the models stay plain data.

use std::fmt;

use tokio::time::Instant;

use super::datetime::{HumanDuration, LocalDateTime};
use crate::models::{
    ArchivedSession, RecipeDocument, SessionOutcome, SessionSnapshot, StepKind, StepSpec,
    StepStatus, StepView, TimerState,
};

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comma-separated flags shown next to a step heading.
fn step_traits(spec_kind: StepKind, duration: Option<u64>, auto_start: bool, confirm: bool) -> String {
    let mut traits = vec![spec_kind.as_str().to_string()];
    if let Some(seconds) = duration {
        traits.push(HumanDuration(seconds).to_string());
    }
    if auto_start && spec_kind == StepKind::Timer {
        traits.push("auto-start".to_string());
    }
    if confirm {
        traits.push("needs confirmation".to_string());
    }
    traits.join(", ")
}

impl fmt::Display for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "### {} ({})",
            self.step_id,
            step_traits(
                self.kind,
                self.duration_seconds,
                self.auto_start,
                self.requires_confirm
            )
        )?;
        writeln!(f)?;
        if !self.narration.is_empty() {
            writeln!(f, "{}", self.narration)?;
            writeln!(f)?;
        }
        if let Some(predecessor) = &self.predecessor {
            writeln!(f, "- After: {predecessor}")?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for RecipeDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.title)?;
        writeln!(f)?;
        writeln!(f, "- ID: {}", self.id)?;
        if let Some(servings) = self.servings {
            writeln!(f, "- Servings: {servings}")?;
        }
        writeln!(f, "- Steps: {}", self.steps.len())?;
        let waiting = self.total_timer_seconds();
        if waiting > 0 {
            writeln!(f, "- Timers: {}", HumanDuration(waiting))?;
        }

        writeln!(f, "\n## Steps")?;
        writeln!(f)?;
        for step in &self.steps {
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl StepView {
    fn fmt_view(&self, f: &mut fmt::Formatter<'_>, now: Instant) -> fmt::Result {
        write!(f, "- **{}** ({})", self.step_id, self.status.with_icon())?;
        match self.timer {
            TimerState::Running => match self.remaining_seconds(now) {
                Some(seconds) => write!(f, ", timer running: {} left", HumanDuration(seconds))?,
                None => write!(f, ", timer running")?,
            },
            TimerState::Elapsed if self.status == StepStatus::Active => {
                write!(f, ", timer finished, awaiting confirmation")?;
            }
            TimerState::Skipped if self.status == StepStatus::Active => {
                write!(f, ", timer skipped")?;
            }
            _ => {}
        }
        writeln!(f)
    }
}

impl fmt::Display for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## {} ({})", self.recipe_title, self.session_id)?;
        writeln!(f)?;
        writeln!(
            f,
            "Progress: {}/{} steps completed",
            self.completed_count(),
            self.total_steps
        )?;
        writeln!(f)?;
        for step in &self.steps {
            step.fmt_view(f, self.taken_instant)?;
        }
        Ok(())
    }
}

impl fmt::Display for ArchivedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "## {} ({}) - {}",
            self.recipe_title, self.session_id, self.outcome
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "- **Steps**: {}/{} completed",
            self.completed_steps.len(),
            self.total_steps
        )?;
        writeln!(f, "- **Started**: {}", LocalDateTime(&self.created_at))?;
        writeln!(f, "- **Finished**: {}", LocalDateTime(&self.finished_at))?;
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{machine::StepMachine, models::StepSpec, timer::Moment};

    #[test]
    fn test_recipe_display_lists_steps() {
        let recipe = RecipeDocument::linear(
            "tea",
            "Tea",
            vec![
                StepSpec::immediate("boil", "Boil water."),
                StepSpec::timer("steep", 180, "Steep.").with_auto_start(),
            ],
        )
        .with_servings(2);
        let output = recipe.to_string();

        assert!(output.starts_with("# Tea\n"));
        assert!(output.contains("- Servings: 2"));
        assert!(output.contains("- Timers: 3m 0s"));
        assert!(output.contains("### steep (timer, 3m 0s, auto-start)"));
        assert!(output.contains("- After: boil"));
    }

    #[test]
    fn test_snapshot_display_shows_timer() {
        let recipe = RecipeDocument::new(
            "stock",
            "Stock",
            vec![StepSpec::timer("simmer", 600, "Simmer.").with_auto_start()],
        );
        let now = Moment::now();
        let (machine, _) = StepMachine::new(Arc::new(recipe), false, now);
        let output = machine.snapshot("cook-9", now).to_string();

        assert!(output.contains("## Stock (cook-9)"));
        assert!(output.contains("Progress: 0/1 steps completed"));
        assert!(output.contains("**simmer** (➤ Active), timer running: 10m 0s left"));
    }
}
