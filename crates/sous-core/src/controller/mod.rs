//! Session controller: lifecycle and serialized access for many sessions.
//!
//! The controller maps session ids to live sessions through an injected
//! [`SessionStore`]. Mutating tool calls are forwarded into the session's
//! event queue (see [`session`]) and answered by its actor; `get_state` and
//! `repeat_step` read the last published snapshot directly. Sessions leave
//! the controller when they are finished, abandoned, or idle past the
//! configured timeout, and are then recorded in the optional
//! [`SessionArchive`].
//!
//! # Examples
//!
//! ```rust
//! use sous_core::{
//!     controller::SessionController,
//!     models::{RecipeDocument, StepSpec},
//!     response::ToolStatus,
//! };
//!
//! # async fn example() -> sous_core::Result<()> {
//! let controller = SessionController::builder().without_archive().build().await?;
//! let recipe = RecipeDocument::linear(
//!     "toast",
//!     "Toast",
//!     vec![StepSpec::immediate("slice", "Slice the bread.")],
//! );
//!
//! let session_id = controller.create_session(recipe).await?;
//! let response = controller.start_step(&session_id, "slice").await?;
//! assert_eq!(response.status, ToolStatus::Started);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use jiff::Timestamp;
use log::{debug, info, warn};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    archive::SessionArchive,
    display::FinishedSession,
    error::{CookError, Result},
    loader,
    models::{ArchivedSession, RecipeDocument, SessionOutcome, SessionSnapshot},
    response::{self, ToolResponse, ToolStatus},
};

mod builder;
pub mod session;
pub mod store;

pub use builder::SessionControllerBuilder;
use session::{Command, SessionHandle, SessionSummary};
pub use session::SessionNotice;
pub use store::{InMemorySessionStore, SessionStore};

/// Engine-wide policy and timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Sessions without a tool call for this long are expired
    pub idle_timeout: Duration,
    /// Period of the background idle sweep
    pub reaper_interval: Duration,
    /// Honor `force` on `confirm_step_done` while a confirm timer is running
    pub allow_force_complete: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            reaper_interval: Duration::from_secs(60),
            allow_force_complete: false,
        }
    }
}

/// Owns every live cooking session.
pub struct SessionController {
    store: Arc<dyn SessionStore>,
    config: EngineConfig,
    archive: Option<SessionArchive>,
    next_id: AtomicU64,
}

impl SessionController {
    fn new(
        store: Arc<dyn SessionStore>,
        config: EngineConfig,
        archive: Option<SessionArchive>,
    ) -> Self {
        Self {
            store,
            config,
            archive,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn builder() -> SessionControllerBuilder {
        SessionControllerBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn archive(&self) -> Option<&SessionArchive> {
        self.archive.as_ref()
    }

    /// Validates `recipe` and starts a session for it.
    ///
    /// # Errors
    ///
    /// Returns `CookError::MalformedRecipe` if the recipe is structurally
    /// broken; no session is created in that case.
    pub async fn create_session(&self, recipe: RecipeDocument) -> Result<String> {
        loader::validate(&recipe)?;

        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session_id = format!("cook-{}-{sequence}", Timestamp::now().as_millisecond());
        let handle = SessionHandle::spawn(
            session_id.clone(),
            Arc::new(recipe),
            self.config.allow_force_complete,
        );
        info!(
            "Created session {session_id} for recipe '{}' ({} steps)",
            handle.recipe().id,
            handle.recipe().steps.len()
        );
        self.store.insert(Arc::new(handle));
        Ok(session_id)
    }

    fn session(&self, session_id: &str) -> Result<Arc<SessionHandle>> {
        self.store
            .get(session_id)
            .ok_or_else(|| CookError::unknown_session(session_id))
    }

    /// Resets the idle clock of a session.
    pub fn touch(&self, session_id: &str) -> Result<()> {
        self.session(session_id)?.touch();
        Ok(())
    }

    /// Routes a mutating call through the session queue. A call that
    /// completes the last step finishes the session right away.
    async fn dispatch(&self, session_id: &str, command: Command) -> Result<ToolResponse> {
        let session = self.session(session_id)?;
        session.touch();
        let mut response = session.call(command).await?;

        if response.status == ToolStatus::Done && session.snapshot().is_complete {
            match self.close(session_id, SessionOutcome::Completed).await {
                Ok(finished) => {
                    response.message.push_str(" Session finished.");
                    response.context.next_call = None;
                    debug!("{finished}");
                }
                Err(e) => debug!("Session {session_id} was closed concurrently: {e}"),
            }
        }
        Ok(response)
    }

    /// `start_step(step_id)`.
    pub async fn start_step(&self, session_id: &str, step_id: &str) -> Result<ToolResponse> {
        let command = Command::Start {
            step_id: step_id.to_string(),
        };
        self.dispatch(session_id, command).await
    }

    /// `confirm_step_done(step_id)`.
    pub async fn confirm_step_done(
        &self,
        session_id: &str,
        step_id: &str,
        force: bool,
    ) -> Result<ToolResponse> {
        let command = Command::Confirm {
            step_id: step_id.to_string(),
            force,
        };
        self.dispatch(session_id, command).await
    }

    /// `skip_timer(step_id)`.
    pub async fn skip_timer(&self, session_id: &str, step_id: &str) -> Result<ToolResponse> {
        let command = Command::SkipTimer {
            step_id: step_id.to_string(),
        };
        self.dispatch(session_id, command).await
    }

    /// `get_state()`: summary response over the latest snapshot.
    pub fn get_state(&self, session_id: &str) -> Result<ToolResponse> {
        let session = self.session(session_id)?;
        session.touch();
        Ok(response::state_response(&session.snapshot(), Instant::now()))
    }

    /// Full per-step snapshot. Does not count as activity.
    pub fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot> {
        Ok(self.session(session_id)?.snapshot())
    }

    /// `repeat_step()`: narration of the active step, or of the next ready one.
    pub fn repeat_step(&self, session_id: &str) -> Result<ToolResponse> {
        let session = self.session(session_id)?;
        session.touch();
        Ok(response::repeat_response(&session.snapshot(), Instant::now()))
    }

    /// Receives timer-driven notices (auto-completion, awaiting confirmation).
    pub fn subscribe(&self, session_id: &str) -> Result<broadcast::Receiver<SessionNotice>> {
        Ok(self.session(session_id)?.subscribe())
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.store
            .handles()
            .iter()
            .map(|session| session.id().to_string())
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Ends a session at the agent's request and returns what was cooked.
    ///
    /// The outcome is `completed` if every step was done, `ended` otherwise.
    pub async fn finish_session(&self, session_id: &str) -> Result<FinishedSession> {
        self.close(session_id, SessionOutcome::Ended).await
    }

    /// Transport notification that the user left.
    pub async fn abandon_session(&self, session_id: &str) -> Result<FinishedSession> {
        self.close(session_id, SessionOutcome::Abandoned).await
    }

    /// Expires every session idle for longer than the configured timeout.
    ///
    /// Safe to run alongside traffic: a session that is finished concurrently
    /// is simply skipped. Returns the ids that were expired.
    pub async fn expire_idle_sessions(&self) -> Vec<String> {
        let now = Instant::now();
        let idle: Vec<String> = self
            .store
            .handles()
            .iter()
            .filter(|session| session.idle_for(now) >= self.config.idle_timeout)
            .map(|session| session.id().to_string())
            .collect();
        self.close_all(idle, SessionOutcome::Expired).await
    }

    /// Finishes sessions whose last step completed through a timer, where no
    /// tool call was around to do it.
    pub async fn reap_completed_sessions(&self) -> Vec<String> {
        let complete: Vec<String> = self
            .store
            .handles()
            .iter()
            .filter(|session| session.snapshot().is_complete)
            .map(|session| session.id().to_string())
            .collect();
        self.close_all(complete, SessionOutcome::Completed).await
    }

    /// Ends every live session, e.g. when the server stops.
    pub async fn shutdown(&self) -> usize {
        let ids = self.session_ids();
        self.close_all(ids, SessionOutcome::Ended).await.len()
    }

    /// Runs the idle sweep and completed-session reap every
    /// `reaper_interval` until the controller is dropped.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let controller: Weak<Self> = Arc::downgrade(self);
        let period = self.config.reaper_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                let expired = controller.expire_idle_sessions().await;
                let reaped = controller.reap_completed_sessions().await;
                if !expired.is_empty() || !reaped.is_empty() {
                    debug!(
                        "Reaper expired {} and finished {} session(s)",
                        expired.len(),
                        reaped.len()
                    );
                }
            }
            debug!("Reaper stopped");
        })
    }

    async fn close_all(&self, session_ids: Vec<String>, outcome: SessionOutcome) -> Vec<String> {
        let mut closed = Vec::with_capacity(session_ids.len());
        for session_id in session_ids {
            match self.close(&session_id, outcome).await {
                Ok(_) => closed.push(session_id),
                Err(e) => debug!("Skipping {session_id}: {e}"),
            }
        }
        closed
    }

    /// Removes a session, stops its actor and timers, and archives it.
    async fn close(&self, session_id: &str, requested: SessionOutcome) -> Result<FinishedSession> {
        let session = self
            .store
            .remove(session_id)
            .ok_or_else(|| CookError::unknown_session(session_id))?;
        let summary = session.shutdown().await;

        let outcome = match requested {
            SessionOutcome::Ended if summary.is_complete => SessionOutcome::Completed,
            other => other,
        };
        info!(
            "Session {session_id} {outcome}: {}/{} steps completed",
            summary.completed_steps.len(),
            summary.total_steps
        );
        self.record(&session, outcome, &summary).await;

        Ok(FinishedSession::new(
            session_id,
            outcome,
            summary.completed_steps,
            summary.total_steps,
        ))
    }

    async fn record(&self, session: &SessionHandle, outcome: SessionOutcome, summary: &SessionSummary) {
        let Some(archive) = &self.archive else {
            return;
        };
        let recipe = session.recipe();
        let archived = ArchivedSession {
            session_id: session.id().to_string(),
            recipe_id: recipe.id.clone(),
            recipe_title: recipe.title.clone(),
            outcome,
            completed_steps: summary.completed_steps.clone(),
            total_steps: summary.total_steps,
            created_at: session.created_at(),
            finished_at: Timestamp::now(),
        };
        if let Err(e) = archive.record(archived).await {
            warn!("Failed to archive session {}: {e}", session.id());
        }
    }
}
