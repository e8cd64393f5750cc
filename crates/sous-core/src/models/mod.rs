//! Data models for recipes, step runtime state and sessions.
//!
//! This module contains the domain types of the cooking session engine.
//! Display implementations for these models live in
//! [`crate::display::models`], keeping presentation apart from the data.
//!
//! # Layers
//!
//! 1. **Recipe** ([`RecipeDocument`], [`StepSpec`]): immutable, produced by
//!    [`crate::loader`] and shared by every component of a session.
//! 2. **Runtime** ([`StepRuntimeState`]): mutable, owned exclusively by the
//!    [`crate::machine::StepMachine`] of one session.
//! 3. **Views** ([`SessionSnapshot`], [`ArchivedSession`]): read-only copies
//!    handed to callers; they never alias runtime state.
//!
//! # Examples
//!
//! ```rust
//! use sous_core::models::{RecipeDocument, StepSpec};
//!
//! let recipe = RecipeDocument::linear(
//!     "toast",
//!     "Toast",
//!     vec![
//!         StepSpec::immediate("slice", "Slice the bread.").with_confirm(),
//!         StepSpec::timer("toast", 120, "Toast for two minutes.").with_auto_start(),
//!     ],
//! );
//! assert_eq!(recipe.step("toast").and_then(|s| s.predecessor.as_deref()), Some("slice"));
//! ```

pub mod archive;
pub mod recipe;
pub mod runtime;
pub mod snapshot;
pub mod status;

#[cfg(test)]
mod tests;

pub use archive::ArchivedSession;
pub use recipe::{RecipeDocument, StepSpec};
pub use runtime::StepRuntimeState;
pub use snapshot::{SessionSnapshot, StepView};
pub use status::{SessionOutcome, StepKind, StepStatus, TimerState};
