//! Command handlers and their clap argument wrappers
//!
//! Argument structs carry the clap derives and convert into the core
//! parameter types, so the core stays free of CLI concerns:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → Session Controller
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use sous_core::{
    params::{CreateSession, ListSessions},
    ArchivedSessions, RecipeDocument, SessionArchive, SessionController,
};

use crate::{cook::CookLoop, renderer::TerminalRenderer};

/// A recipe document on disk
#[derive(Args)]
pub struct RecipeArgs {
    /// Path to the recipe JSON document
    #[arg(help = "Path to a recipe JSON document (id, title, steps)")]
    pub recipe: PathBuf,
}

impl From<RecipeArgs> for CreateSession {
    fn from(val: RecipeArgs) -> Self {
        CreateSession {
            recipe_path: Some(val.recipe.to_string_lossy().into_owned()),
            recipe: None,
        }
    }
}

/// List archived sessions
#[derive(Args)]
pub struct HistoryArgs {
    /// Maximum number of sessions to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,
}

impl From<HistoryArgs> for ListSessions {
    fn from(val: HistoryArgs) -> Self {
        ListSessions { limit: val.limit }
    }
}

/// Runs CLI commands and renders their output.
pub struct Cli {
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(renderer: TerminalRenderer) -> Self {
        Self { renderer }
    }

    fn load(params: &CreateSession) -> Result<RecipeDocument> {
        let source = params.recipe_path.as_deref().unwrap_or("inline recipe");
        params
            .load()
            .with_context(|| format!("Failed to load recipe from {source}"))
    }

    pub fn validate(&self, params: &CreateSession) -> Result<()> {
        let recipe = Self::load(params)?;
        self.renderer.render(&format!(
            "Recipe '{}' is valid: {} steps.\n",
            recipe.id,
            recipe.steps.len()
        ))
    }

    pub fn show(&self, params: &CreateSession) -> Result<()> {
        let recipe = Self::load(params)?;
        self.renderer.render(&recipe.to_string())
    }

    pub async fn history(&self, archive: &SessionArchive, params: &ListSessions) -> Result<()> {
        let sessions = archive
            .list(params.limit)
            .await
            .context("Failed to read session history")?;
        self.renderer
            .render(&ArchivedSessions(sessions).to_string())
    }

    pub async fn cook(&self, controller: &SessionController, params: &CreateSession) -> Result<()> {
        let recipe = Self::load(params)?;
        info!("Cooking '{}' interactively", recipe.id);
        CookLoop::start(controller, &self.renderer, recipe)
            .await?
            .run()
            .await
    }
}
