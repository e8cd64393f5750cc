//! MCP server for Sous
//!
//! Exposes the cooking tool calls to an LLM agent over the Model Context
//! Protocol. Tool results are the JSON `{status, message, context}` responses
//! built by the core; state violations come back as `BLOCKED`/`WAIT`
//! results, while an unknown session is a protocol error.

use std::{future::Future, sync::Arc};

use anyhow::Result;
use log::{debug, error, info};
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{
        GetPromptRequestParam, GetPromptResult, Implementation, ListPromptsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler,
};
use sous_core::SessionController;
use tokio::signal::unix::{signal, SignalKind};

pub mod errors;
pub mod handlers;
pub mod prompts;

pub use handlers::{ConfirmStep, CreateSession, ListSessions, McpResult, SessionRef, StepRef};

/// MCP server for Sous
#[derive(Clone)]
pub struct SousMcpServer {
    controller: Arc<SessionController>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SousMcpServer {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self {
            controller,
            tool_router: Self::tool_router(),
        }
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    fn handlers(&self) -> handlers::McpHandlers {
        handlers::McpHandlers::new(Arc::clone(&self.controller))
    }

    #[tool(
        name = "create_session",
        description = "Start a cooking session for a recipe. Pass either recipe_path (a JSON file) or recipe (an inline document with id, title and steps). Returns the session_id required by every other tool, plus the first step's narration."
    )]
    async fn create_session(&self, params: Parameters<CreateSession>) -> McpResult {
        self.handlers().create_session(params).await
    }

    #[tool(
        name = "start_step",
        description = "Begin a step once the user starts working on it. Only one step can be active; a step is startable when its predecessor is completed. Timer steps start their countdown. Returns STARTED, or BLOCKED/ERROR with the call to make instead."
    )]
    async fn start_step(&self, params: Parameters<StepRef>) -> McpResult {
        self.handlers().start_step(params).await
    }

    #[tool(
        name = "confirm_step_done",
        description = "Mark the active step as done when the user says so. Completing a step unlocks its successors and may auto-start timer steps. A step whose timer must finish first returns WAIT with the time left. When the last step completes the session closes."
    )]
    async fn confirm_step_done(&self, params: Parameters<ConfirmStep>) -> McpResult {
        self.handlers().confirm_step_done(params).await
    }

    #[tool(
        name = "get_state",
        description = "Summarize the session: active step with timer status and time left, ready steps, progress, and the suggested next call. Use whenever unsure what to do next."
    )]
    async fn get_state(&self, params: Parameters<SessionRef>) -> McpResult {
        self.handlers().get_state(params)
    }

    #[tool(
        name = "repeat_step",
        description = "Return the narration of the active step again, or of the next ready step if none is active. Use when the user asks to hear the instruction again."
    )]
    async fn repeat_step(&self, params: Parameters<SessionRef>) -> McpResult {
        self.handlers().repeat_step(params)
    }

    #[tool(
        name = "skip_timer",
        description = "Stop the running timer of the active step early, at the user's explicit request. The step then only needs confirm_step_done."
    )]
    async fn skip_timer(&self, params: Parameters<StepRef>) -> McpResult {
        self.handlers().skip_timer(params).await
    }

    #[tool(
        name = "finish_session",
        description = "End the session, e.g. when the user stops cooking. Cancels any running timers and returns the completed steps in order. The session_id is invalid afterwards."
    )]
    async fn finish_session(&self, params: Parameters<SessionRef>) -> McpResult {
        self.handlers().finish_session(params).await
    }

    #[tool(
        name = "list_sessions",
        description = "List recently finished cooking sessions with their outcome (completed, ended, expired, abandoned) and progress, newest first."
    )]
    async fn list_sessions(&self, params: Parameters<ListSessions>) -> McpResult {
        self.handlers().list_sessions(params).await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for SousMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "sous".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(r#"Sous guides a user through a recipe one step at a time and keeps the kitchen state for you.

## Core Concepts
- **Session**: one cook working through one recipe. Create it with `create_session`; pass its `session_id` to every other tool.
- **Steps**: each step is pending, ready, active or completed. Only one step is active at a time.
- **Timers**: timer steps count down on their own. Some complete automatically, others wait for the user's confirmation after the timer.

## Workflow
1. `create_session` with the recipe
2. `start_step` when the user begins a step
3. `confirm_step_done` when the user says it is done
4. Repeat until the session reports all steps completed

## Reading Responses
Every response is JSON `{status, message, context}`:
- `STARTED`, `DONE`, `INFO`: the call was applied
- `BLOCKED`: another step must be handled first
- `WAIT`: a timer is still running
- `ERROR`: the step does not exist
`context.next_call` always names the call that moves the session forward. Follow it.

## Tool Categories
- **Session**: create_session, finish_session, list_sessions
- **Steps**: start_step, confirm_step_done, skip_timer
- **Reading**: get_state, repeat_step"#.to_string()),
        }
    }

    async fn list_prompts(
        &self,
        request: Option<PaginatedRequestParam>,
        context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        self.handlers().list_prompts(request, context)
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        self.handlers().get_prompt(request, context)
    }
}

/// Runs the MCP server on stdio until the client disconnects or a signal
/// arrives, then ends every live session.
pub async fn run_stdio_server(server: SousMcpServer) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting Sous MCP server on stdio");
    debug!(
        "Server created with {} tools",
        server.tool_router.list_all().len()
    );

    let controller = Arc::clone(server.controller());
    let reaper = controller.spawn_reaper();

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!("serving error: {e:?}");
    })?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("MCP server stopped normally"),
                Err(e) => error!("MCP server error: {e:?}"),
            }
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }

    reaper.abort();
    let ended = controller.shutdown().await;
    info!("MCP server shutdown complete, {ended} session(s) ended");
    Ok(())
}
