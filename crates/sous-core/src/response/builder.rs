//! Builds [`ToolResponse`]s from machine outcomes and snapshots.

use tokio::time::Instant;

use super::{ActiveStepContext, NextCall, StateContext, ToolName, ToolResponse, ToolStatus};
use crate::{
    display::HumanDuration,
    machine::{Outcome, Rejection},
    models::{SessionSnapshot, StepStatus, TimerState},
};

/// The call that moves the session forward from `snapshot`.
pub fn suggest_next(snapshot: &SessionSnapshot, now: Instant) -> NextCall {
    if snapshot.is_complete {
        return NextCall::new(ToolName::FinishSession);
    }
    if let Some(active) = snapshot.active() {
        if active.timer == TimerState::Running {
            let left = active
                .remaining_seconds(now)
                .map(|seconds| format!(" ({} left)", HumanDuration(seconds)))
                .unwrap_or_default();
            return if active.requires_confirm {
                NextCall::for_step(ToolName::ConfirmStepDone, &active.step_id)
                    .with_note(format!("after the timer finishes{left}"))
            } else {
                NextCall::new(ToolName::GetState)
                    .with_note(format!("'{}' completes automatically{left}", active.step_id))
            };
        }
        return NextCall::for_step(ToolName::ConfirmStepDone, &active.step_id);
    }
    match snapshot.first_ready() {
        Some(ready) => NextCall::for_step(ToolName::StartStep, &ready.step_id),
        None => NextCall::new(ToolName::GetState),
    }
}

fn context(snapshot: &SessionSnapshot, now: Instant) -> StateContext {
    StateContext {
        session_id: snapshot.session_id.clone(),
        active_step: snapshot.active().map(|step| ActiveStepContext {
            step_id: step.step_id.clone(),
            status: step.status,
            kind: step.kind,
            timer: step.timer,
            remaining_seconds: step.remaining_seconds(now),
        }),
        ready: snapshot.ready.clone(),
        completed: snapshot.completed_count(),
        total: snapshot.total_steps,
        next_call: Some(suggest_next(snapshot, now)),
        narration: None,
    }
}

fn response(
    status: ToolStatus,
    message: String,
    snapshot: &SessionSnapshot,
    now: Instant,
) -> ToolResponse {
    ToolResponse {
        status,
        message,
        context: context(snapshot, now),
    }
}

fn narration_of(snapshot: &SessionSnapshot, step_id: &str) -> Option<String> {
    snapshot
        .step(step_id)
        .map(|step| step.narration.clone())
        .filter(|narration| !narration.is_empty())
}

fn remaining_text(snapshot: &SessionSnapshot, step_id: &str, now: Instant) -> String {
    snapshot
        .step(step_id)
        .and_then(|step| step.remaining_seconds(now))
        .map(|seconds| HumanDuration(seconds).to_string())
        .unwrap_or_else(|| "some time".to_string())
}

/// Call that clears `blocking`, given whether it is active or just ready.
fn unblock_call(snapshot: &SessionSnapshot, blocking: &str, now: Instant) -> NextCall {
    match snapshot.status_of(blocking) {
        Some(StepStatus::Ready) => NextCall::for_step(ToolName::StartStep, blocking),
        _ => suggest_next(snapshot, now),
    }
}

/// Builds the response to an accepted or refused tool call.
///
/// `snapshot` must be taken after the transition was applied.
pub fn respond(
    result: &Result<Outcome, Rejection>,
    snapshot: &SessionSnapshot,
    now: Instant,
) -> ToolResponse {
    match result {
        Ok(outcome) => accepted(outcome, snapshot, now),
        Err(rejection) => rejected(rejection, snapshot, now),
    }
}

fn accepted(outcome: &Outcome, snapshot: &SessionSnapshot, now: Instant) -> ToolResponse {
    match outcome {
        Outcome::Started { step_id } => {
            let (status, message) = match snapshot.step(step_id).map(|step| step.timer) {
                Some(TimerState::Running) => (
                    ToolStatus::Started,
                    format!(
                        "Started '{step_id}'. Timer running: {} left.",
                        remaining_text(snapshot, step_id, now)
                    ),
                ),
                Some(TimerState::Elapsed) => (
                    ToolStatus::Started,
                    format!("Started '{step_id}'. No waiting needed; confirm when it is done."),
                ),
                _ => (ToolStatus::Started, format!("Started '{step_id}'.")),
            };
            let mut response = response(status, message, snapshot, now);
            response.context.narration = narration_of(snapshot, step_id);
            response
        }
        Outcome::AlreadyActive { step_id, timer } => match timer {
            TimerState::Running => response(
                ToolStatus::TimerRunning,
                format!(
                    "'{step_id}' is already active; its timer is running ({} left).",
                    remaining_text(snapshot, step_id, now)
                ),
                snapshot,
                now,
            ),
            TimerState::Elapsed => response(
                ToolStatus::Info,
                format!("'{step_id}' is already active; timer finished, awaiting confirmation."),
                snapshot,
                now,
            ),
            _ => response(
                ToolStatus::Info,
                format!("'{step_id}' is already active."),
                snapshot,
                now,
            ),
        },
        Outcome::Completed {
            step_id,
            forced,
            cascade,
            recipe_complete,
        } => {
            let mut message = format!("Completed '{step_id}'");
            if *forced {
                message.push_str(" before its timer finished");
            }
            message.push('.');
            if !cascade.auto_completed.is_empty() {
                message.push_str(&format!(
                    " Also completed: {}.",
                    cascade.auto_completed.join(", ")
                ));
            }
            for started in &cascade.auto_started {
                match snapshot.step(started) {
                    Some(step) if step.timer == TimerState::Running => {
                        message.push_str(&format!(
                            " Started '{started}' automatically; timer running ({} left).",
                            remaining_text(snapshot, started, now)
                        ));
                    }
                    Some(step) if step.status == StepStatus::Active => {
                        message.push_str(&format!(" Started '{started}' automatically."));
                    }
                    _ => {}
                }
            }
            if *recipe_complete {
                message.push_str(" All steps completed!");
            }
            let mut response = response(ToolStatus::Done, message, snapshot, now);
            response.context.narration = snapshot
                .active_step
                .as_deref()
                .filter(|active| cascade.auto_started.iter().any(|id| id.as_str() == *active))
                .and_then(|active| narration_of(snapshot, active));
            response
        }
        Outcome::AlreadyCompleted { step_id } => response(
            ToolStatus::Info,
            format!("'{step_id}' is already completed."),
            snapshot,
            now,
        ),
        Outcome::TimerFinished { step_id } => response(
            ToolStatus::Info,
            format!("Timer for '{step_id}' finished, awaiting confirmation."),
            snapshot,
            now,
        ),
        Outcome::TimerSkipped { step_id } => response(
            ToolStatus::Info,
            format!("Skipped the timer for '{step_id}'. Confirm the step when it is done."),
            snapshot,
            now,
        ),
        Outcome::NothingToSkip { step_id, timer } => response(
            ToolStatus::Info,
            format!(
                "'{step_id}' has no running timer to skip (timer {}).",
                timer.as_str()
            ),
            snapshot,
            now,
        ),
        Outcome::Ignored { step_id, .. } => response(
            ToolStatus::Info,
            format!("Nothing changed for '{step_id}'."),
            snapshot,
            now,
        ),
    }
}

fn rejected(rejection: &Rejection, snapshot: &SessionSnapshot, now: Instant) -> ToolResponse {
    match rejection {
        Rejection::UnknownStep { step_id, valid } => response(
            ToolStatus::Error,
            format!(
                "Unknown step '{step_id}'. Valid steps: {}.",
                valid.join(", ")
            ),
            snapshot,
            now,
        ),
        Rejection::AnotherStepActive {
            action,
            requested,
            active,
        } => response(
            ToolStatus::Blocked,
            format!(
                "Cannot {} '{requested}' while '{active}' is active.",
                action.verb()
            ),
            snapshot,
            now,
        ),
        Rejection::NotReady {
            action,
            requested,
            blocking,
        } => {
            let mut response = response(
                ToolStatus::Blocked,
                format!(
                    "Cannot {} '{requested}' yet; '{blocking}' has to be finished first.",
                    action.verb()
                ),
                snapshot,
                now,
            );
            response.context.next_call = Some(unblock_call(snapshot, blocking, now));
            response
        }
        Rejection::NotStarted { requested } => {
            let mut response = response(
                ToolStatus::Blocked,
                format!("'{requested}' has not been started."),
                snapshot,
                now,
            );
            response.context.next_call =
                Some(NextCall::for_step(ToolName::StartStep, requested.as_str()));
            response
        }
        Rejection::NotActive { requested, active } => {
            let message = match active {
                Some(active) => {
                    format!("Cannot skip the timer of '{requested}' while '{active}' is active.")
                }
                None => format!("Cannot skip the timer of '{requested}'; no step is active."),
            };
            response(ToolStatus::Blocked, message, snapshot, now)
        }
        Rejection::TimerRunning {
            step_id,
            remaining_seconds,
            force_refused,
        } => {
            let mut message = format!(
                "Timer for '{step_id}' is still running ({} left).",
                HumanDuration(*remaining_seconds)
            );
            if *force_refused {
                message.push_str(" Force-completing a running timer is not allowed.");
            }
            let mut response = response(ToolStatus::Wait, message, snapshot, now);
            response.context.next_call = Some(
                NextCall::for_step(ToolName::ConfirmStepDone, step_id.as_str())
                    .with_note("after the timer finishes, or skip_timer to stop it early"),
            );
            response
        }
    }
}

/// Response to `get_state`.
pub fn state_response(snapshot: &SessionSnapshot, now: Instant) -> ToolResponse {
    let mut message = format!(
        "Cooking '{}': {}/{} steps completed.",
        snapshot.recipe_title,
        snapshot.completed_count(),
        snapshot.total_steps
    );
    match snapshot.active() {
        Some(active) if active.awaiting_confirmation() => message.push_str(&format!(
            " '{}' is awaiting confirmation.",
            active.step_id
        )),
        Some(active) => message.push_str(&format!(" '{}' is in progress.", active.step_id)),
        None if snapshot.is_complete => message.push_str(" Everything is done."),
        None => {}
    }
    response(ToolStatus::Info, message, snapshot, now)
}

/// Response to `repeat_step`: the narration of the current step again.
pub fn repeat_response(snapshot: &SessionSnapshot, now: Instant) -> ToolResponse {
    let current = snapshot.active().or_else(|| snapshot.first_ready());
    let Some(step) = current else {
        return response(
            ToolStatus::Info,
            "No step to repeat; all steps are completed.".to_string(),
            snapshot,
            now,
        );
    };

    let which = if step.status == StepStatus::Active {
        "Current step"
    } else {
        "Next step"
    };
    let mut response = response(
        ToolStatus::Info,
        format!("{which} '{}'.", step.step_id),
        snapshot,
        now,
    );
    response.context.narration = Some(step.narration.clone());
    response
}

/// Proactive message for timer-driven changes nobody asked about.
///
/// Returns `None` for outcomes that do not concern the user.
pub fn notice_for(
    outcome: &Outcome,
    snapshot: &SessionSnapshot,
    now: Instant,
) -> Option<ToolResponse> {
    match outcome {
        Outcome::TimerFinished { .. } | Outcome::Completed { .. } => {
            Some(accepted(outcome, snapshot, now))
        }
        _ => None,
    }
}
