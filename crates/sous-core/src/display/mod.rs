//! Markdown formatting for recipes, sessions and archive entries.
//!
//! Domain models implement [`std::fmt::Display`] directly (see [`models`]);
//! collections and operation results get small newtype wrappers so the same
//! data can be formatted differently per context. Everything produces
//! markdown, which the CLI renders for the terminal and the MCP server
//! returns as text.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Domain Models  │    │ Wrappers        │    │   Markdown      │
//! │ (Recipe, Snap.) │───▶│ (Sessions, ...) │───▶│ (Terminal/MCP)  │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust
//! use sous_core::{
//!     display::FinishedSession,
//!     models::SessionOutcome,
//! };
//!
//! let finished = FinishedSession::new(
//!     "cook-1",
//!     SessionOutcome::Completed,
//!     vec!["prep".to_string(), "bake".to_string()],
//!     2,
//! );
//! assert!(finished.to_string().contains("2/2 steps completed"));
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod results;

pub use collections::ArchivedSessions;
pub use datetime::{HumanDuration, LocalDateTime};
pub use results::FinishedSession;
