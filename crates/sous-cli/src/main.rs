//! Sous CLI Application
//!
//! Command-line interface and MCP server for guided cooking sessions.

mod args;
mod cli;
mod cook;
mod mcp;
mod renderer;

use std::sync::Arc;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::Cli;
use log::info;
use mcp::{run_stdio_server, SousMcpServer};
use renderer::TerminalRenderer;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        engine,
        no_color,
        command,
    } = Args::parse();

    let cli = Cli::new(TerminalRenderer::new(!no_color));

    match command {
        Validate(args) => cli.validate(&args.into()),
        Show(args) => cli.show(&args.into()),
        History(args) => {
            let archive = engine.open_archive().await?;
            cli.history(&archive, &args.into()).await
        }
        Cook(args) => {
            let controller = engine.build_controller().await?;
            let result = cli.cook(&controller, &args.into()).await;
            controller.shutdown().await;
            result
        }
        Serve => {
            let controller = Arc::new(engine.build_controller().await?);
            info!("Starting Sous MCP server");
            run_stdio_server(SousMcpServer::new(controller))
                .await
                .context("MCP server failed")
        }
    }
}
