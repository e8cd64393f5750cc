//! Countdown timers for timer steps.
//!
//! Each armed countdown is a tokio task that sleeps for the step's duration
//! and then pushes a [`TimerFired`] event into the owning session's queue.
//! The task never touches step state: it holds a weak sender and the
//! `(session_id, step_id, handle)` target only, so a session can be dropped
//! while a countdown is in flight. When the session is gone the upgrade fails
//! and the event is discarded.
//!
//! ```text
//! arm(step) ──▶ tokio::spawn(sleep ─▶ queue.send(TimerFired))
//!                                          │
//!                 session actor ◀──────────┘  (serialized with tool calls)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use jiff::Timestamp;
use log::{debug, trace};
use tokio::{
    sync::mpsc::WeakUnboundedSender,
    task::JoinHandle,
    time::Instant,
};

use crate::error::{CookError, Result};

/// Opaque identifier of one armed countdown.
///
/// Handles are unique within a session and never reused, which lets the
/// state machine tell a stale elapse event from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub(crate) u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// One reading of both engine clocks.
///
/// `wall` stamps what users are shown. `instant` follows `tokio::time`, the
/// clock countdowns sleep on, and is the only one remaining time is measured
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub wall: Timestamp,
    pub instant: Instant,
}

impl Moment {
    pub fn now() -> Self {
        Self {
            wall: Timestamp::now(),
            instant: Instant::now(),
        }
    }
}

/// Elapse event delivered to the session queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired {
    pub step_id: String,
    pub handle: TimerHandle,
}

struct ArmedTimer {
    step_id: String,
    task: JoinHandle<()>,
}

/// The countdowns of one session.
///
/// `E` is the session queue's event type; anything a [`TimerFired`] converts
/// into can be used, which keeps this module independent of the controller.
pub struct Timers<E> {
    session_id: String,
    events: WeakUnboundedSender<E>,
    next_id: u64,
    armed: HashMap<TimerHandle, ArmedTimer>,
}

impl<E> Timers<E>
where
    E: From<TimerFired> + Send + 'static,
{
    pub fn new(session_id: impl Into<String>, events: WeakUnboundedSender<E>) -> Self {
        Self {
            session_id: session_id.into(),
            events,
            next_id: 1,
            armed: HashMap::new(),
        }
    }

    /// Starts a countdown for `step_id`. Non-blocking.
    ///
    /// # Errors
    ///
    /// Returns [`CookError::TimerAlreadyArmed`] if the step already has a
    /// countdown that has not been cancelled or released.
    pub fn arm(&mut self, step_id: &str, duration: Duration) -> Result<TimerHandle> {
        if self.armed.values().any(|timer| timer.step_id == step_id) {
            return Err(CookError::TimerAlreadyArmed {
                step_id: step_id.to_string(),
            });
        }

        let handle = TimerHandle(self.next_id);
        self.next_id += 1;

        let events = self.events.clone();
        let session_id = self.session_id.clone();
        let fired = TimerFired {
            step_id: step_id.to_string(),
            handle,
        };
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let Some(sender) = events.upgrade() else {
                debug!(
                    "Session {session_id} is gone; dropping elapse of {} for '{}'",
                    fired.handle, fired.step_id
                );
                return;
            };
            trace!("{} elapsed for '{}' in {session_id}", fired.handle, fired.step_id);
            if sender.send(E::from(fired)).is_err() {
                debug!("Session {session_id} queue closed before elapse was delivered");
            }
        });

        debug!(
            "Armed {handle} for '{step_id}' in {} ({}s)",
            self.session_id,
            duration.as_secs()
        );
        self.armed.insert(
            handle,
            ArmedTimer {
                step_id: step_id.to_string(),
                task,
            },
        );
        Ok(handle)
    }

    /// Cancels a countdown and forgets its handle.
    ///
    /// Idempotent: a handle that is unknown or was already cancelled returns
    /// `false`. After elapse this only forgets the handle; an event already
    /// queued is not retracted.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.armed.remove(&handle) {
            Some(timer) => {
                timer.task.abort();
                debug!("Cancelled {handle} for '{}' in {}", timer.step_id, self.session_id);
                true
            }
            None => false,
        }
    }

    /// Cancels every countdown of the session.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.armed.len();
        for (_, timer) in self.armed.drain() {
            timer.task.abort();
        }
        if count > 0 {
            debug!("Cancelled {count} timer(s) in {}", self.session_id);
        }
        count
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.armed.contains_key(&handle)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}

impl<E> Drop for Timers<E> {
    fn drop(&mut self) {
        for (_, timer) in self.armed.drain() {
            timer.task.abort();
        }
    }
}
