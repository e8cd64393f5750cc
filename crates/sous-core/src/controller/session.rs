//! One live cooking session: an actor task plus the handle callers hold.
//!
//! The actor is the single consumer of the session's event queue and the
//! only owner of its [`StepMachine`] and [`Timers`]. Tool calls and timer
//! elapse events are both just producers into that queue, so transitions
//! apply strictly in the order they were accepted.
//!
//! ```text
//!  tool call ──┐
//!              ├──▶ mpsc queue ──▶ actor ──▶ machine ──▶ effects ──▶ timers
//!  countdown ──┘                     │
//!                                    ├──▶ watch (snapshot for get_state)
//!                                    └──▶ broadcast (timer notices)
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use jiff::Timestamp;
use log::{debug, trace, warn};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    time::Instant,
};

use crate::{
    error::{CookError, Result},
    machine::{Effect, Outcome, StepMachine, Transition},
    models::{RecipeDocument, SessionSnapshot},
    response::{self, ToolResponse},
    timer::{Moment, TimerFired, Timers},
};

const NOTICE_CAPACITY: usize = 32;

/// A mutating tool call routed through the session queue.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    Start { step_id: String },
    Confirm { step_id: String, force: bool },
    SkipTimer { step_id: String },
}

pub(crate) enum SessionEvent {
    Command {
        command: Command,
        reply: oneshot::Sender<ToolResponse>,
    },
    TimerElapsed(TimerFired),
    Shutdown {
        reply: oneshot::Sender<SessionSummary>,
    },
}

impl From<TimerFired> for SessionEvent {
    fn from(fired: TimerFired) -> Self {
        SessionEvent::TimerElapsed(fired)
    }
}

/// Final state handed back when a session shuts down.
#[derive(Debug, Clone)]
pub(crate) struct SessionSummary {
    pub completed_steps: Vec<String>,
    pub total_steps: usize,
    pub is_complete: bool,
}

impl From<&SessionSnapshot> for SessionSummary {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            completed_steps: snapshot.completed_steps.clone(),
            total_steps: snapshot.total_steps,
            is_complete: snapshot.is_complete,
        }
    }
}

/// A timer-driven change pushed to subscribers without a tool call.
#[derive(Debug, Clone)]
pub struct SessionNotice {
    pub session_id: String,
    pub response: ToolResponse,
}

/// Caller-side handle of a live session.
pub struct SessionHandle {
    id: String,
    recipe: Arc<RecipeDocument>,
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
    notices: broadcast::Sender<SessionNotice>,
    created_at: Timestamp,
    last_activity: Mutex<Instant>,
}

impl SessionHandle {
    /// Builds the initial machine state and spawns the session actor.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(
        id: String,
        recipe: Arc<RecipeDocument>,
        allow_force_complete: bool,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notices_tx, _) = broadcast::channel(NOTICE_CAPACITY);
        let now = Moment::now();

        let (machine, effects) = StepMachine::new(Arc::clone(&recipe), allow_force_complete, now);
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot(&id, now));

        let mut actor = SessionActor {
            session_id: id.clone(),
            machine,
            timers: Timers::new(id.clone(), events_tx.downgrade()),
            snapshot: snapshot_tx,
            notices: notices_tx.clone(),
        };
        if !effects.is_empty() {
            actor.apply_effects(effects);
            actor.publish(now);
        }
        tokio::spawn(actor.run(events_rx));

        Self {
            id,
            recipe,
            events: events_tx,
            snapshot: snapshot_rx,
            notices: notices_tx,
            created_at: now.wall,
            last_activity: Mutex::new(now.instant),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn recipe(&self) -> &RecipeDocument {
        &self.recipe
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Latest published snapshot. Never observes a half-applied transition.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// Resets the idle clock.
    pub fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        let last = *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(last)
    }

    /// Enqueues a tool call and waits for the actor's response.
    pub(crate) async fn call(&self, command: Command) -> Result<ToolResponse> {
        let (reply, response) = oneshot::channel();
        self.events
            .send(SessionEvent::Command { command, reply })
            .map_err(|_| CookError::unknown_session(&self.id))?;
        response
            .await
            .map_err(|_| CookError::unknown_session(&self.id))
    }

    /// Stops the actor after every event queued before it, cancelling all
    /// countdowns. Falls back to the last snapshot if the actor is gone.
    pub(crate) async fn shutdown(&self) -> SessionSummary {
        let (reply, summary) = oneshot::channel();
        if self.events.send(SessionEvent::Shutdown { reply }).is_ok() {
            if let Ok(summary) = summary.await {
                return summary;
            }
        }
        debug!("Session {} actor already stopped", self.id);
        SessionSummary::from(&self.snapshot())
    }
}

struct SessionActor {
    session_id: String,
    machine: StepMachine,
    timers: Timers<SessionEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
    notices: broadcast::Sender<SessionNotice>,
}

impl SessionActor {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            let now = Moment::now();
            match event {
                SessionEvent::Command { command, reply } => {
                    let response = self.handle_command(command, now);
                    if reply.send(response).is_err() {
                        debug!("Caller of {} went away before the reply", self.session_id);
                    }
                }
                SessionEvent::TimerElapsed(fired) => self.handle_elapse(&fired, now),
                SessionEvent::Shutdown { reply } => {
                    let cancelled = self.timers.cancel_all();
                    debug!(
                        "Session {} shutting down, {cancelled} timer(s) cancelled",
                        self.session_id
                    );
                    let summary = SessionSummary {
                        completed_steps: self.machine.completed_steps().to_vec(),
                        total_steps: self.machine.recipe().steps.len(),
                        is_complete: self.machine.is_complete(),
                    };
                    let _ = reply.send(summary);
                    break;
                }
            }
        }
        debug!("Session {} actor stopped", self.session_id);
    }

    fn handle_command(&mut self, command: Command, now: Moment) -> ToolResponse {
        debug!("Session {} <- {command:?}", self.session_id);
        let Transition { result, effects } = match command {
            Command::Start { step_id } => self.machine.start_step(&step_id, now),
            Command::Confirm { step_id, force } => {
                self.machine.confirm_step_done(&step_id, force, now)
            }
            Command::SkipTimer { step_id } => self.machine.skip_timer(&step_id),
        };
        self.apply_effects(effects);

        let snapshot = self.publish(now);
        let response = response::respond(&result, &snapshot, now.instant);
        debug!("Session {} -> [{}] {}", self.session_id, response.status, response.message);
        response
    }

    fn handle_elapse(&mut self, fired: &TimerFired, now: Moment) {
        // The countdown task is done; drop its bookkeeping.
        self.timers.cancel(fired.handle);

        let Transition { result, effects } =
            self.machine.timer_elapsed(&fired.step_id, fired.handle, now);
        self.apply_effects(effects);

        let Ok(outcome) = result else {
            return;
        };
        if matches!(outcome, Outcome::Ignored { .. }) {
            return;
        }

        let snapshot = self.publish(now);
        if let Some(response) = response::notice_for(&outcome, &snapshot, now.instant) {
            debug!("Session {} notice: {}", self.session_id, response.message);
            let notice = SessionNotice {
                session_id: self.session_id.clone(),
                response,
            };
            if self.notices.send(notice).is_err() {
                trace!("No subscribers for {} notices", self.session_id);
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ArmTimer { step_id, duration } => {
                    match self.timers.arm(&step_id, duration) {
                        Ok(handle) => {
                            if !self.machine.attach_timer(&step_id, handle) {
                                self.timers.cancel(handle);
                            }
                        }
                        Err(e) => warn!("Session {}: {e}", self.session_id),
                    }
                }
                Effect::CancelTimer { handle } => {
                    self.timers.cancel(handle);
                }
            }
        }
    }

    fn publish(&self, now: Moment) -> SessionSnapshot {
        let snapshot = self.machine.snapshot(&self.session_id, now);
        self.snapshot.send_replace(snapshot.clone());
        snapshot
    }
}
