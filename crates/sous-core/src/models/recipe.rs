//! Recipe document model.
//!
//! A [`RecipeDocument`] is immutable once loaded. Its steps are kept in
//! document order, which is also the order steps are reported in snapshots.

use serde::Serialize;

use super::StepKind;

/// A validated recipe: metadata plus an ordered list of steps.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecipeDocument {
    /// Stable recipe identifier
    pub id: String,

    /// Display title
    pub title: String,

    /// Number of servings, when the source provides it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,

    /// Steps in document order
    pub steps: Vec<StepSpec>,
}

/// Immutable description of one step.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepSpec {
    /// Unique, semantically named identifier (e.g. `chop_onions`)
    pub step_id: String,

    /// Immediate work or a wait-bound countdown
    pub kind: StepKind,

    /// Countdown length; present iff `kind` is [`StepKind::Timer`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,

    /// Start the countdown the instant the step becomes active
    pub auto_start: bool,

    /// Completion needs an explicit confirmation even after the timer elapses
    pub requires_confirm: bool,

    /// Text surfaced to the user when the step becomes active
    pub narration: String,

    /// Step that must complete before this one is reachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predecessor: Option<String>,
}

impl StepSpec {
    /// An immediate (hands-on) step.
    pub fn immediate(step_id: impl Into<String>, narration: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            kind: StepKind::Immediate,
            duration_seconds: None,
            auto_start: false,
            requires_confirm: false,
            narration: narration.into(),
            predecessor: None,
        }
    }

    /// A countdown step of `duration_seconds`.
    pub fn timer(
        step_id: impl Into<String>,
        duration_seconds: u64,
        narration: impl Into<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            kind: StepKind::Timer,
            duration_seconds: Some(duration_seconds),
            auto_start: false,
            requires_confirm: false,
            narration: narration.into(),
            predecessor: None,
        }
    }

    pub fn with_auto_start(mut self) -> Self {
        self.auto_start = true;
        self
    }

    pub fn with_confirm(mut self) -> Self {
        self.requires_confirm = true;
        self
    }

    pub fn after(mut self, predecessor: impl Into<String>) -> Self {
        self.predecessor = Some(predecessor.into());
        self
    }

    pub fn is_timer(&self) -> bool {
        self.kind == StepKind::Timer
    }

    /// Timer steps flagged `auto_start`; the flag is ignored on immediate steps.
    pub fn starts_automatically(&self) -> bool {
        self.is_timer() && self.auto_start
    }
}

impl RecipeDocument {
    pub fn new(id: impl Into<String>, title: impl Into<String>, steps: Vec<StepSpec>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            servings: None,
            steps,
        }
    }

    /// Builds a strictly linear recipe: every step's predecessor is the step
    /// before it, overriding whatever the specs carried.
    pub fn linear(id: impl Into<String>, title: impl Into<String>, steps: Vec<StepSpec>) -> Self {
        let mut previous: Option<String> = None;
        let steps = steps
            .into_iter()
            .map(|mut step| {
                step.predecessor = previous.replace(step.step_id.clone());
                step
            })
            .collect();
        Self::new(id, title, steps)
    }

    pub fn with_servings(mut self, servings: u32) -> Self {
        self.servings = Some(servings);
        self
    }

    pub fn step(&self, step_id: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|step| step.step_id == step_id)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.step_id.as_str())
    }

    /// Sum of all timer durations, a rough lower bound on cook time.
    pub fn total_timer_seconds(&self) -> u64 {
        self.steps
            .iter()
            .filter_map(|step| step.duration_seconds)
            .fold(0, u64::saturating_add)
    }
}
