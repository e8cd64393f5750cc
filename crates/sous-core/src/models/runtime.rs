//! Mutable per-step state owned by the step state machine.

use jiff::Timestamp;
use serde::Serialize;
use tokio::time::Instant;

use super::{StepStatus, TimerState};
use crate::timer::TimerHandle;

/// Runtime state of one step in one session.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepRuntimeState {
    /// Foreign key into the recipe's step list
    pub step_id: String,

    pub status: StepStatus,

    pub timer: TimerState,

    /// Present only while the step's countdown is running
    #[serde(skip)]
    pub timer_handle: Option<TimerHandle>,

    /// Wall-clock time the running countdown reaches zero, for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_deadline: Option<Timestamp>,

    /// Same deadline on the countdown's own clock
    #[serde(skip)]
    pub timer_due: Option<Instant>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entered_active_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl StepRuntimeState {
    pub(crate) fn new(step_id: impl Into<String>, status: StepStatus) -> Self {
        Self {
            step_id: step_id.into(),
            status,
            timer: TimerState::Idle,
            timer_handle: None,
            timer_deadline: None,
            timer_due: None,
            entered_active_at: None,
            completed_at: None,
        }
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer == TimerState::Running
    }
}
