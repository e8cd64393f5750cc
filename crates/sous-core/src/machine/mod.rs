//! Step state machine of one cooking session.
//!
//! The machine owns every [`StepRuntimeState`] of a session and enforces the
//! step lifecycle:
//!
//! ```text
//! pending ──(predecessor completed)──▶ ready ──start_step──▶ active ──confirm──▶ completed
//!                                        │                     ▲
//!                                        └──(auto_start timer)─┘
//! ```
//!
//! Nothing here sleeps, spawns or locks: each
//! operation returns a [`Transition`] holding the outcome and the timer
//! [`Effect`]s the caller must carry out. Illegal calls are never errors;
//! they come back as a [`Rejection`] describing the blocking state so the
//! agent can correct itself.
//!
//! Auto-start policy: an `auto_start` timer step passes through `ready`
//! within the transition that unlocked it and is promoted to `active` as long
//! as no other step is active. When several unlock together only the first in
//! recipe order is promoted; the rest follow as the active slot frees up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jiff::SignedDuration;
use log::debug;

use crate::{
    models::{
        RecipeDocument, SessionSnapshot, StepRuntimeState, StepStatus, StepView, TimerState,
    },
    timer::{Moment, TimerHandle},
};

#[cfg(test)]
mod tests;

/// Timer work requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a countdown, then report the handle via [`StepMachine::attach_timer`]
    ArmTimer { step_id: String, duration: Duration },
    /// Stop a countdown; a no-op if it already elapsed
    CancelTimer { handle: TimerHandle },
}

/// The mutating tool call a rejection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAction {
    Start,
    Confirm,
    SkipTimer,
}

impl ToolAction {
    pub fn verb(&self) -> &'static str {
        match self {
            ToolAction::Start => "start",
            ToolAction::Confirm => "confirm",
            ToolAction::SkipTimer => "skip the timer of",
        }
    }
}

/// Knock-on changes of a transition beyond the requested step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cascade {
    /// Steps that moved from pending to ready
    pub unlocked: Vec<String>,
    /// `auto_start` steps promoted to active
    pub auto_started: Vec<String>,
    /// Zero-length timer steps that completed on activation
    pub auto_completed: Vec<String>,
}

impl Cascade {
    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty() && self.auto_started.is_empty() && self.auto_completed.is_empty()
    }
}

/// An accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started {
        step_id: String,
    },
    /// `start_step` on the step that is already active
    AlreadyActive {
        step_id: String,
        timer: TimerState,
    },
    Completed {
        step_id: String,
        forced: bool,
        cascade: Cascade,
        recipe_complete: bool,
    },
    AlreadyCompleted {
        step_id: String,
    },
    /// Countdown reached zero; the step waits for `confirm_step_done`
    TimerFinished {
        step_id: String,
    },
    TimerSkipped {
        step_id: String,
    },
    NothingToSkip {
        step_id: String,
        timer: TimerState,
    },
    /// Stale elapse for a step that moved on or a cancelled handle
    Ignored {
        step_id: String,
        handle: TimerHandle,
    },
}

/// A refused event. The machine state is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnknownStep {
        step_id: String,
        valid: Vec<String>,
    },
    AnotherStepActive {
        action: ToolAction,
        requested: String,
        active: String,
    },
    /// `blocking` is the step that has to be finished first
    NotReady {
        action: ToolAction,
        requested: String,
        blocking: String,
    },
    /// Confirming a ready step that was never started
    NotStarted {
        requested: String,
    },
    NotActive {
        requested: String,
        active: Option<String>,
    },
    TimerRunning {
        step_id: String,
        remaining_seconds: u64,
        force_refused: bool,
    },
}

/// Result of applying one event to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub result: Result<Outcome, Rejection>,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn accepted(outcome: Outcome, effects: Vec<Effect>) -> Self {
        Self {
            result: Ok(outcome),
            effects,
        }
    }

    fn rejected(rejection: Rejection) -> Self {
        Self {
            result: Err(rejection),
            effects: Vec::new(),
        }
    }
}

/// Per-session step state machine.
#[derive(Debug)]
pub struct StepMachine {
    recipe: Arc<RecipeDocument>,
    /// Recipe order
    steps: Vec<StepRuntimeState>,
    index: HashMap<String, usize>,
    /// Append-only completion order
    completed: Vec<String>,
    allow_force_complete: bool,
}

impl StepMachine {
    /// Builds the initial state for a validated recipe.
    ///
    /// Predecessor-less steps start `ready`, everything else `pending`. A
    /// root `auto_start` timer is promoted right away, so the returned effects
    /// may already contain an [`Effect::ArmTimer`].
    pub fn new(
        recipe: Arc<RecipeDocument>,
        allow_force_complete: bool,
        now: Moment,
    ) -> (Self, Vec<Effect>) {
        let steps = recipe
            .steps
            .iter()
            .map(|spec| {
                let status = if spec.predecessor.is_none() {
                    StepStatus::Ready
                } else {
                    StepStatus::Pending
                };
                StepRuntimeState::new(spec.step_id.clone(), status)
            })
            .collect();
        let index = recipe
            .steps
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.step_id.clone(), i))
            .collect();

        let mut machine = Self {
            recipe,
            steps,
            index,
            completed: Vec::new(),
            allow_force_complete,
        };
        let mut effects = Vec::new();
        let mut cascade = Cascade::default();
        machine.settle(now, &mut effects, &mut cascade);
        if !cascade.is_empty() {
            debug!("Initial cascade for '{}': {cascade:?}", machine.recipe.id);
        }
        (machine, effects)
    }

    pub fn recipe(&self) -> &Arc<RecipeDocument> {
        &self.recipe
    }

    pub fn completed_steps(&self) -> &[String] {
        &self.completed
    }

    pub fn is_complete(&self) -> bool {
        self.completed.len() == self.steps.len()
    }

    pub fn active_step(&self) -> Option<&str> {
        self.active_index()
            .map(|idx| self.steps[idx].step_id.as_str())
    }

    pub fn state(&self, step_id: &str) -> Option<&StepRuntimeState> {
        self.index.get(step_id).map(|&idx| &self.steps[idx])
    }

    /// Handles `start_step(step_id)`.
    pub fn start_step(&mut self, step_id: &str, now: Moment) -> Transition {
        let Some(idx) = self.lookup(step_id) else {
            return Transition::rejected(self.unknown_step(step_id));
        };

        match self.steps[idx].status {
            StepStatus::Completed => {
                return Transition::accepted(
                    Outcome::AlreadyCompleted {
                        step_id: step_id.to_string(),
                    },
                    Vec::new(),
                );
            }
            StepStatus::Active => {
                return Transition::accepted(
                    Outcome::AlreadyActive {
                        step_id: step_id.to_string(),
                        timer: self.steps[idx].timer,
                    },
                    Vec::new(),
                );
            }
            StepStatus::Pending | StepStatus::Ready => {}
        }

        if let Some(active) = self.active_step() {
            return Transition::rejected(Rejection::AnotherStepActive {
                action: ToolAction::Start,
                requested: step_id.to_string(),
                active: active.to_string(),
            });
        }
        if self.steps[idx].status == StepStatus::Pending {
            return Transition::rejected(Rejection::NotReady {
                action: ToolAction::Start,
                requested: step_id.to_string(),
                blocking: self.blocking_ancestor(idx),
            });
        }

        let mut effects = Vec::new();
        let mut cascade = Cascade::default();
        self.activate(idx, now, &mut effects);
        self.settle(now, &mut effects, &mut cascade);

        let outcome = if self.steps[idx].status == StepStatus::Completed {
            cascade.auto_completed.retain(|id| id != step_id);
            Outcome::Completed {
                step_id: step_id.to_string(),
                forced: false,
                cascade,
                recipe_complete: self.is_complete(),
            }
        } else {
            Outcome::Started {
                step_id: step_id.to_string(),
            }
        };
        Transition::accepted(outcome, effects)
    }

    /// Handles `confirm_step_done(step_id)`.
    ///
    /// `force` asks to complete a `requires_confirm` timer step whose
    /// countdown is still running; it is honored only when the machine was
    /// built with `allow_force_complete`.
    pub fn confirm_step_done(&mut self, step_id: &str, force: bool, now: Moment) -> Transition {
        let Some(idx) = self.lookup(step_id) else {
            return Transition::rejected(self.unknown_step(step_id));
        };

        match self.steps[idx].status {
            StepStatus::Completed => {
                return Transition::accepted(
                    Outcome::AlreadyCompleted {
                        step_id: step_id.to_string(),
                    },
                    Vec::new(),
                );
            }
            StepStatus::Active => {}
            status => {
                let rejection = match (self.active_step(), status) {
                    (Some(active), _) => Rejection::AnotherStepActive {
                        action: ToolAction::Confirm,
                        requested: step_id.to_string(),
                        active: active.to_string(),
                    },
                    (None, StepStatus::Ready) => Rejection::NotStarted {
                        requested: step_id.to_string(),
                    },
                    (None, _) => Rejection::NotReady {
                        action: ToolAction::Confirm,
                        requested: step_id.to_string(),
                        blocking: self.blocking_ancestor(idx),
                    },
                };
                return Transition::rejected(rejection);
            }
        }

        let mut forced = false;
        if self.steps[idx].timer == TimerState::Running && self.recipe.steps[idx].requires_confirm {
            if !(force && self.allow_force_complete) {
                return Transition::rejected(Rejection::TimerRunning {
                    step_id: step_id.to_string(),
                    remaining_seconds: self.remaining_seconds(idx, now),
                    force_refused: force,
                });
            }
            forced = true;
        }

        let mut effects = Vec::new();
        let mut cascade = Cascade::default();
        self.complete(idx, now, &mut effects, &mut cascade);
        self.settle(now, &mut effects, &mut cascade);

        Transition::accepted(
            Outcome::Completed {
                step_id: step_id.to_string(),
                forced,
                cascade,
                recipe_complete: self.is_complete(),
            },
            effects,
        )
    }

    /// Handles `skip_timer(step_id)`: stops the countdown of the active
    /// step, which then only needs a confirmation.
    pub fn skip_timer(&mut self, step_id: &str) -> Transition {
        let Some(idx) = self.lookup(step_id) else {
            return Transition::rejected(self.unknown_step(step_id));
        };
        if self.steps[idx].status != StepStatus::Active {
            return Transition::rejected(Rejection::NotActive {
                requested: step_id.to_string(),
                active: self.active_step().map(str::to_string),
            });
        }

        let state = &mut self.steps[idx];
        if state.timer != TimerState::Running {
            return Transition::accepted(
                Outcome::NothingToSkip {
                    step_id: step_id.to_string(),
                    timer: state.timer,
                },
                Vec::new(),
            );
        }

        let mut effects = Vec::new();
        if let Some(handle) = state.timer_handle.take() {
            effects.push(Effect::CancelTimer { handle });
        }
        state.timer = TimerState::Skipped;
        state.timer_deadline = None;
        state.timer_due = None;
        Transition::accepted(
            Outcome::TimerSkipped {
                step_id: step_id.to_string(),
            },
            effects,
        )
    }

    /// Applies a dequeued elapse event.
    ///
    /// Events for a step that is no longer active, or whose handle differs
    /// from the one currently recorded, are stale and leave no trace.
    pub fn timer_elapsed(&mut self, step_id: &str, handle: TimerHandle, now: Moment) -> Transition {
        let current = self.lookup(step_id).filter(|&idx| {
            let state = &self.steps[idx];
            state.status == StepStatus::Active
                && state.timer == TimerState::Running
                && state.timer_handle == Some(handle)
        });
        let Some(idx) = current else {
            debug!("Ignoring stale elapse of {handle} for '{step_id}'");
            return Transition::accepted(
                Outcome::Ignored {
                    step_id: step_id.to_string(),
                    handle,
                },
                Vec::new(),
            );
        };

        let state = &mut self.steps[idx];
        state.timer = TimerState::Elapsed;
        state.timer_handle = None;
        state.timer_deadline = None;
        state.timer_due = None;

        if self.recipe.steps[idx].requires_confirm {
            return Transition::accepted(
                Outcome::TimerFinished {
                    step_id: step_id.to_string(),
                },
                Vec::new(),
            );
        }

        let mut effects = Vec::new();
        let mut cascade = Cascade::default();
        self.complete(idx, now, &mut effects, &mut cascade);
        self.settle(now, &mut effects, &mut cascade);
        Transition::accepted(
            Outcome::Completed {
                step_id: step_id.to_string(),
                forced: false,
                cascade,
                recipe_complete: self.is_complete(),
            },
            effects,
        )
    }

    /// Records the handle of a countdown armed for an [`Effect::ArmTimer`].
    ///
    /// Returns `false` when the step is no longer waiting for one, in which
    /// case the caller should cancel the countdown it just armed.
    pub fn attach_timer(&mut self, step_id: &str, handle: TimerHandle) -> bool {
        let Some(idx) = self.lookup(step_id) else {
            return false;
        };
        let state = &mut self.steps[idx];
        if state.status != StepStatus::Active
            || state.timer != TimerState::Running
            || state.timer_handle.is_some()
        {
            return false;
        }
        state.timer_handle = Some(handle);
        true
    }

    /// Read-only view of the whole session; never mutates.
    pub fn snapshot(&self, session_id: &str, now: Moment) -> SessionSnapshot {
        let steps: Vec<StepView> = self
            .recipe
            .steps
            .iter()
            .zip(&self.steps)
            .map(|(spec, state)| StepView {
                step_id: spec.step_id.clone(),
                kind: spec.kind,
                status: state.status,
                timer: state.timer,
                duration_seconds: spec.duration_seconds,
                auto_start: spec.starts_automatically(),
                requires_confirm: spec.requires_confirm,
                narration: spec.narration.clone(),
                predecessor: spec.predecessor.clone(),
                timer_deadline: state.timer_deadline,
                timer_due: state.timer_due,
                entered_active_at: state.entered_active_at,
                completed_at: state.completed_at,
            })
            .collect();
        let ready = steps
            .iter()
            .filter(|step| step.status == StepStatus::Ready)
            .map(|step| step.step_id.clone())
            .collect();

        SessionSnapshot {
            session_id: session_id.to_string(),
            recipe_id: self.recipe.id.clone(),
            recipe_title: self.recipe.title.clone(),
            active_step: self.active_step().map(str::to_string),
            ready,
            completed_steps: self.completed.clone(),
            total_steps: self.steps.len(),
            is_complete: self.is_complete(),
            taken_at: now.wall,
            taken_instant: now.instant,
            steps,
        }
    }

    fn lookup(&self, step_id: &str) -> Option<usize> {
        self.index.get(step_id).copied()
    }

    fn unknown_step(&self, step_id: &str) -> Rejection {
        Rejection::UnknownStep {
            step_id: step_id.to_string(),
            valid: self.recipe.step_ids().map(str::to_string).collect(),
        }
    }

    fn active_index(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|state| state.status == StepStatus::Active)
    }

    /// Earliest unfinished ancestor of a pending step: the one to act on.
    fn blocking_ancestor(&self, idx: usize) -> String {
        let mut blocking = idx;
        let mut cursor = self.recipe.steps[idx].predecessor.as_deref();
        for _ in 0..self.steps.len() {
            let Some(parent) = cursor.and_then(|id| self.lookup(id)) else {
                break;
            };
            if self.steps[parent].status != StepStatus::Completed {
                blocking = parent;
            }
            cursor = self.recipe.steps[parent].predecessor.as_deref();
        }
        self.steps[blocking].step_id.clone()
    }

    fn remaining_seconds(&self, idx: usize, now: Moment) -> u64 {
        self.steps[idx]
            .timer_due
            .map_or(0, |due| due.saturating_duration_since(now.instant).as_secs())
    }

    fn activate(&mut self, idx: usize, now: Moment, effects: &mut Vec<Effect>) {
        let spec = &self.recipe.steps[idx];
        let state = &mut self.steps[idx];
        state.status = StepStatus::Active;
        state.entered_active_at = Some(now.wall);

        if let Some(seconds) = spec.duration_seconds {
            if seconds == 0 {
                state.timer = TimerState::Elapsed;
            } else {
                state.timer = TimerState::Running;
                let duration = Duration::from_secs(seconds);
                state.timer_deadline = i64::try_from(seconds)
                    .ok()
                    .and_then(|secs| now.wall.checked_add(SignedDuration::from_secs(secs)).ok());
                state.timer_due = now.instant.checked_add(duration);
                effects.push(Effect::ArmTimer {
                    step_id: spec.step_id.clone(),
                    duration,
                });
            }
        }
        debug!("Step '{}' is now active", spec.step_id);
    }

    fn complete(
        &mut self,
        idx: usize,
        now: Moment,
        effects: &mut Vec<Effect>,
        cascade: &mut Cascade,
    ) {
        let state = &mut self.steps[idx];
        if let Some(handle) = state.timer_handle.take() {
            effects.push(Effect::CancelTimer { handle });
        }
        if state.timer == TimerState::Running {
            state.timer = TimerState::Skipped;
        }
        state.timer_deadline = None;
        state.timer_due = None;
        state.status = StepStatus::Completed;
        state.completed_at = Some(now.wall);
        let step_id = state.step_id.clone();
        debug!("Step '{step_id}' completed");

        for (spec, successor) in self.recipe.steps.iter().zip(self.steps.iter_mut()) {
            if spec.predecessor.as_deref() == Some(step_id.as_str())
                && successor.status == StepStatus::Pending
            {
                successor.status = StepStatus::Ready;
                cascade.unlocked.push(successor.step_id.clone());
            }
        }
        self.completed.push(step_id);
    }

    /// Runs automatic transitions until the machine is quiescent: zero-length
    /// non-confirm timers complete, and the first ready `auto_start` step is
    /// promoted whenever nothing is active.
    fn settle(&mut self, now: Moment, effects: &mut Vec<Effect>, cascade: &mut Cascade) {
        loop {
            if let Some(idx) = self.active_index() {
                let finished = self.steps[idx].timer == TimerState::Elapsed
                    && !self.recipe.steps[idx].requires_confirm;
                if !finished {
                    return;
                }
                self.complete(idx, now, effects, cascade);
                cascade.auto_completed.push(self.steps[idx].step_id.clone());
                continue;
            }

            let next = self
                .recipe
                .steps
                .iter()
                .zip(&self.steps)
                .position(|(spec, state)| {
                    state.status == StepStatus::Ready && spec.starts_automatically()
                });
            let Some(idx) = next else {
                return;
            };
            self.activate(idx, now, effects);
            cascade.auto_started.push(self.steps[idx].step_id.clone());
        }
    }
}
