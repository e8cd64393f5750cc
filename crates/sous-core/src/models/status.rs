//! Status enumerations for steps, timers and finished sessions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single recipe step within a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Predecessor has not completed yet
    Pending,

    /// Reachable but not started
    Ready,

    /// In progress; at most one per session
    Active,

    /// Terminal
    Completed,
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StepStatus::Pending),
            "ready" => Ok(StepStatus::Ready),
            "active" => Ok(StepStatus::Active),
            "completed" | "done" => Ok(StepStatus::Completed),
            _ => Err(format!("Invalid step status: {s}")),
        }
    }
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Ready => "ready",
            StepStatus::Active => "active",
            StepStatus::Completed => "completed",
        }
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sous_core::models::StepStatus;
    ///
    /// assert_eq!(StepStatus::Completed.with_icon(), "✓ Completed");
    /// assert_eq!(StepStatus::Active.with_icon(), "➤ Active");
    /// assert_eq!(StepStatus::Pending.with_icon(), "○ Pending");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            StepStatus::Completed => "✓ Completed",
            StepStatus::Active => "➤ Active",
            StepStatus::Ready => "◇ Ready",
            StepStatus::Pending => "○ Pending",
        }
    }
}

/// Whether a step is active work or a wait-bound countdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Immediate,
    Timer,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Immediate => "immediate",
            StepKind::Timer => "timer",
        }
    }
}

/// State of a step's countdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    /// No countdown (immediate step, or timer step not yet active)
    #[default]
    Idle,

    /// Countdown in flight
    Running,

    /// Countdown reached zero
    Elapsed,

    /// Cancelled by the user before reaching zero
    Skipped,
}

impl TimerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Elapsed => "elapsed",
            TimerState::Skipped => "skipped",
        }
    }
}

/// How a session left the controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    /// Every step completed
    Completed,

    /// The agent ended the cook explicitly
    Ended,

    /// Discarded by the idle sweep
    Expired,

    /// The transport reported the user left
    Abandoned,
}

impl FromStr for SessionOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(SessionOutcome::Completed),
            "ended" => Ok(SessionOutcome::Ended),
            "expired" => Ok(SessionOutcome::Expired),
            "abandoned" => Ok(SessionOutcome::Abandoned),
            _ => Err(format!("Invalid session outcome: {s}")),
        }
    }
}

impl SessionOutcome {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::Ended => "ended",
            SessionOutcome::Expired => "expired",
            SessionOutcome::Abandoned => "abandoned",
        }
    }
}
