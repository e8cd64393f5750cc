//! State-aware tool responses for the calling agent.
//!
//! Every tool call answers with a [`ToolResponse`]: a status tag, a one-line
//! outcome and a [`StateContext`] naming the active step and the next legal
//! call. Responses are plain data until the agent-facing boundary, where they
//! are serialized to JSON or rendered as text through [`std::fmt::Display`]:
//!
//! ```text
//! [BLOCKED] Cannot start 'bake' while 'prep' is active.
//! Active step: prep (active)
//! Progress: 0/2 steps completed
//! Next: Call confirm_step_done('prep') first
//! ```

use std::fmt;

use serde::Serialize;

use crate::{
    display::HumanDuration,
    models::{StepKind, StepStatus, TimerState},
};

mod builder;

pub use builder::{notice_for, repeat_response, respond, state_response, suggest_next};

/// Status taxonomy of a tool response.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolStatus {
    Started,
    TimerRunning,
    Done,
    Blocked,
    Wait,
    Info,
    Error,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Started => "STARTED",
            ToolStatus::TimerRunning => "TIMER_RUNNING",
            ToolStatus::Done => "DONE",
            ToolStatus::Blocked => "BLOCKED",
            ToolStatus::Wait => "WAIT",
            ToolStatus::Info => "INFO",
            ToolStatus::Error => "ERROR",
        }
    }

    /// Whether the call was refused and the state is unchanged.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ToolStatus::Blocked | ToolStatus::Wait | ToolStatus::Error)
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool calls an agent can be pointed at.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    StartStep,
    ConfirmStepDone,
    GetState,
    RepeatStep,
    SkipTimer,
    FinishSession,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::StartStep => "start_step",
            ToolName::ConfirmStepDone => "confirm_step_done",
            ToolName::GetState => "get_state",
            ToolName::RepeatStep => "repeat_step",
            ToolName::SkipTimer => "skip_timer",
            ToolName::FinishSession => "finish_session",
        }
    }
}

/// The concrete call that moves the session forward.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NextCall {
    pub tool: ToolName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Extra condition on the call, e.g. "after the timer finishes"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NextCall {
    pub fn new(tool: ToolName) -> Self {
        Self {
            tool,
            step_id: None,
            note: None,
        }
    }

    pub fn for_step(tool: ToolName, step_id: impl Into<String>) -> Self {
        Self {
            tool,
            step_id: Some(step_id.into()),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl fmt::Display for NextCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step_id {
            Some(step_id) => write!(f, "{}('{step_id}')", self.tool.as_str()),
            None => write!(f, "{}()", self.tool.as_str()),
        }
    }
}

/// The active step as reported back to the agent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActiveStepContext {
    pub step_id: String,
    pub status: StepStatus,
    pub kind: StepKind,
    pub timer: TimerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
}

impl fmt::Display for ActiveStepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.step_id, self.status.as_str())?;
        match (self.timer, self.remaining_seconds) {
            (TimerState::Running, Some(seconds)) => {
                write!(f, ", timer running, {} left", HumanDuration(seconds))?;
            }
            (TimerState::Running, None) => write!(f, ", timer running")?,
            (TimerState::Elapsed, _) => write!(f, ", timer finished, awaiting confirmation")?,
            (TimerState::Skipped, _) => write!(f, ", timer skipped")?,
            (TimerState::Idle, _) => {}
        }
        write!(f, ")")
    }
}

/// Session state attached to every response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StateContext {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_step: Option<ActiveStepContext>,
    pub ready: Vec<String>,
    pub completed: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_call: Option<NextCall>,
    /// Text to speak for a step that just became current
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
}

/// A complete tool response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolResponse {
    pub status: ToolStatus,
    pub message: String,
    pub context: StateContext,
}

impl ToolResponse {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn next_call(&self) -> Option<&NextCall> {
        self.context.next_call.as_ref()
    }
}

impl fmt::Display for ToolResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", self.status, self.message)?;
        let context = &self.context;
        if let Some(narration) = &context.narration {
            writeln!(f, "Narration: {narration}")?;
        }
        match &context.active_step {
            Some(active) => writeln!(f, "Active step: {active}")?,
            None => writeln!(f, "Active step: none")?,
        }
        if !context.ready.is_empty() {
            writeln!(f, "Ready: {}", context.ready.join(", "))?;
        }
        writeln!(
            f,
            "Progress: {}/{} steps completed",
            context.completed, context.total
        )?;
        if let Some(next) = &context.next_call {
            if self.status.is_rejection() {
                write!(f, "Next: Call {next} first")?;
            } else {
                write!(f, "Next: {next}")?;
            }
            if let Some(note) = &next.note {
                write!(f, " ({note})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
