//! Core library of the `sous` guided cooking engine.
//!
//! An LLM-driven agent walks a user through a recipe step by step. This crate
//! holds everything below the agent: the recipe loader, the per-session step
//! state machine, countdown timers, the session controller that serializes
//! tool calls and timer events, and the state-aware responses handed back to
//! the agent.
//!
//! # Layout
//!
//! - [`loader`]: JSON recipe documents in, validated [`RecipeDocument`]s out
//! - [`machine`]: the pure step state machine
//! - [`timer`]: tokio countdowns that report back through the session queue
//! - [`controller`]: session lifecycle, one actor per session
//! - [`response`]: `STARTED` / `DONE` / `BLOCKED` / ... tool responses
//! - [`archive`] and [`db`]: SQLite log of sessions that ended
//! - [`display`]: markdown rendering of the above
//!
//! # Quick Start
//!
//! ```rust
//! use sous_core::{loader::parse_recipe, SessionController, ToolStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = SessionController::builder()
//!     .with_archive_path(Some("sessions.db"))
//!     .build()
//!     .await?;
//!
//! let recipe = parse_recipe(r#"{
//!     "id": "pasta", "title": "Pasta",
//!     "steps": [
//!         { "step_id": "boil_water", "kind": "immediate", "narration": "Bring salted water to a boil." },
//!         { "step_id": "cook_pasta", "kind": "timer", "duration_seconds": 540,
//!           "auto_start": true, "requires_confirm": true, "narration": "Cook for nine minutes." }
//!     ]
//! }"#)?;
//!
//! let session = controller.create_session(recipe).await?;
//! let response = controller.start_step(&session, "boil_water").await?;
//! assert_eq!(response.status, ToolStatus::Started);
//!
//! let response = controller.start_step(&session, "cook_pasta").await?;
//! assert_eq!(response.status, ToolStatus::Blocked);
//! println!("{response}");
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod controller;
pub mod db;
pub mod display;
pub mod error;
pub mod loader;
pub mod machine;
pub mod models;
pub mod params;
pub mod response;
pub mod timer;

// Re-export commonly used types
pub use archive::SessionArchive;
pub use controller::{
    EngineConfig, InMemorySessionStore, SessionController, SessionControllerBuilder,
    SessionNotice, SessionStore,
};
pub use display::{ArchivedSessions, FinishedSession, HumanDuration, LocalDateTime};
pub use error::{CookError, Result};
pub use models::{
    ArchivedSession, RecipeDocument, SessionOutcome, SessionSnapshot, StepKind, StepSpec,
    StepStatus, TimerState,
};
pub use params::{ConfirmStep, CreateSession, ListSessions, SessionRef, StepRef};
pub use response::{NextCall, StateContext, ToolName, ToolResponse, ToolStatus};
