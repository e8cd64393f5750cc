use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sous_core::{SessionArchive, SessionController};

use crate::cli::{HistoryArgs, RecipeArgs};

/// Guided cooking sessions for voice and chat agents
///
/// Sous walks a cook through a recipe one step at a time. It enforces step
/// order, runs timers, and tells the agent which call to make next. Use it
/// interactively from the terminal with `cook`, or expose the same tool calls
/// to an AI assistant over MCP with `serve`.
#[derive(Parser)]
#[command(version, about, name = "sous")]
pub struct Args {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every command that runs sessions.
#[derive(clap::Args)]
pub struct EngineArgs {
    /// Path to the session archive database. Defaults to
    /// $XDG_DATA_HOME/sous/sessions.db
    #[arg(long, global = true, env = "SOUS_DATABASE_FILE")]
    pub database_file: Option<PathBuf>,

    /// Do not record finished sessions
    #[arg(long, global = true)]
    pub no_archive: bool,

    /// Seconds without a tool call before a session expires
    #[arg(
        long,
        global = true,
        env = "SOUS_IDLE_TIMEOUT_SECS",
        default_value_t = 1800
    )]
    pub idle_timeout_secs: u64,

    /// Allow `done --force` on a timer step that requires confirmation
    #[arg(long, global = true, env = "SOUS_ALLOW_FORCE_COMPLETE")]
    pub allow_force_complete: bool,
}

impl EngineArgs {
    pub async fn build_controller(&self) -> Result<SessionController> {
        let builder = SessionController::builder()
            .with_idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .allow_force_complete(self.allow_force_complete);
        let builder = if self.no_archive {
            builder.without_archive()
        } else {
            builder.with_archive_path(self.database_file.as_ref())
        };

        builder
            .build()
            .await
            .context("Failed to initialize session controller")
    }

    pub async fn open_archive(&self) -> Result<SessionArchive> {
        if self.no_archive {
            anyhow::bail!("History is unavailable with --no-archive");
        }
        let path = match &self.database_file {
            Some(path) => path.clone(),
            None => SessionArchive::default_path()?,
        };
        SessionArchive::open(&path)
            .await
            .with_context(|| format!("Failed to open archive {}", path.display()))
    }
}

/// Available commands for the Sous CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Check that a recipe document is well formed
    #[command(alias = "v")]
    Validate(RecipeArgs),
    /// Print a recipe's steps as markdown
    #[command(alias = "s")]
    Show(RecipeArgs),
    /// Cook a recipe interactively, reading commands from stdin
    #[command(alias = "c")]
    Cook(RecipeArgs),
    /// List archived sessions, newest first
    #[command(aliases = ["h", "ls"])]
    History(HistoryArgs),
    /// Start the MCP server
    Serve,
}
