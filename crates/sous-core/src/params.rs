//! Parameter structures shared by the CLI and the MCP server.
//!
//! These stay free of interface frameworks. Interfaces wrap them: the MCP
//! layer uses a `#[serde(transparent)]` newtype, and JSON schemas are derived
//! only when the `schema` feature is enabled.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   CLI Args      │    │   MCP Params    │    │  Core Params    │
//! │  (clap derives) │───▶│ (serde derives) │───▶│ (minimal deps)  │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{CookError, Result},
    loader,
    models::RecipeDocument,
};

/// Parameters for starting a cooking session.
///
/// Exactly one of `recipe_path` and `recipe` must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CreateSession {
    /// Path to a recipe JSON document
    pub recipe_path: Option<String>,
    /// Inline recipe document (`id`, `title`, `steps`)
    pub recipe: Option<serde_json::Value>,
}

impl CreateSession {
    /// Loads and validates the referenced recipe.
    pub fn load(&self) -> Result<RecipeDocument> {
        match (&self.recipe_path, &self.recipe) {
            (Some(path), None) => loader::load_recipe(path),
            (None, Some(value)) => loader::recipe_from_value(value.clone()),
            (Some(_), Some(_)) => Err(CookError::Configuration {
                message: "Provide either recipe_path or recipe, not both".to_string(),
            }),
            (None, None) => Err(CookError::Configuration {
                message: "Either recipe_path or recipe is required".to_string(),
            }),
        }
    }
}

/// Parameters for session-wide operations (get_state, repeat_step,
/// finish_session).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SessionRef {
    /// Session ID returned by create_session
    pub session_id: String,
}

/// Parameters for step operations (start_step, skip_timer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct StepRef {
    /// Session ID returned by create_session
    pub session_id: String,
    /// Semantic step identifier, e.g. `chop_onions`
    pub step_id: String,
}

/// Parameters for confirming a step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ConfirmStep {
    /// Session ID returned by create_session
    pub session_id: String,
    /// Step to mark as done; must be the active step
    pub step_id: String,
    /// Complete a confirm-required timer step before its timer finished
    #[serde(default)]
    pub force: bool,
}

/// Parameters for listing archived sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ListSessions {
    /// Maximum number of sessions to return, newest first
    #[serde(default = "ListSessions::default_limit")]
    pub limit: usize,
}

impl ListSessions {
    fn default_limit() -> usize {
        20
    }
}

impl Default for ListSessions {
    fn default() -> Self {
        Self {
            limit: Self::default_limit(),
        }
    }
}
