//! Read-only session snapshot returned by `get_state`.

use jiff::Timestamp;
use serde::Serialize;
use tokio::time::Instant;

use super::{StepKind, StepStatus, TimerState};

/// One step as seen from outside the state machine.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepView {
    pub step_id: String,
    pub kind: StepKind,
    pub status: StepStatus,
    pub timer: TimerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    pub auto_start: bool,
    pub requires_confirm: bool,
    pub narration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predecessor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_deadline: Option<Timestamp>,
    #[serde(skip)]
    pub timer_due: Option<Instant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entered_active_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl StepView {
    /// Whole seconds left on a running countdown, measured at `now`.
    pub fn remaining_seconds(&self, now: Instant) -> Option<u64> {
        if self.timer != TimerState::Running {
            return None;
        }
        self.timer_due
            .map(|due| due.saturating_duration_since(now).as_secs())
    }

    /// The countdown finished but the step still needs an explicit confirm.
    pub fn awaiting_confirmation(&self) -> bool {
        self.status == StepStatus::Active && self.timer == TimerState::Elapsed
    }
}

/// Full per-step status picture of one session at one instant.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub recipe_id: String,
    pub recipe_title: String,
    /// Steps in recipe order
    pub steps: Vec<StepView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_step: Option<String>,
    pub ready: Vec<String>,
    /// Completion order, not recipe order
    pub completed_steps: Vec<String>,
    pub total_steps: usize,
    pub is_complete: bool,
    pub taken_at: Timestamp,
    #[serde(skip)]
    pub taken_instant: Instant,
}

impl SessionSnapshot {
    pub fn step(&self, step_id: &str) -> Option<&StepView> {
        self.steps.iter().find(|step| step.step_id == step_id)
    }

    pub fn active(&self) -> Option<&StepView> {
        self.active_step
            .as_deref()
            .and_then(|step_id| self.step(step_id))
    }

    /// First ready step in recipe order.
    pub fn first_ready(&self) -> Option<&StepView> {
        self.ready.first().and_then(|step_id| self.step(step_id))
    }

    pub fn completed_count(&self) -> usize {
        self.completed_steps.len()
    }

    pub fn status_of(&self, step_id: &str) -> Option<StepStatus> {
        self.step(step_id).map(|step| step.status)
    }
}
