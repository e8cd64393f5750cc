//! MCP tool handlers implementation

use std::sync::Arc;

use log::debug;
use rmcp::{
    handler::server::tool::Parameters,
    model::{
        CallToolResult, Content, GetPromptRequestParam, GetPromptResult, ListPromptsResult,
        PaginatedRequestParam, Prompt, PromptArgument, PromptMessage, PromptMessageContent,
        PromptMessageRole,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sous_core::{params as core, ArchivedSessions, SessionController, ToolResponse};

use super::{errors::to_mcp_error, prompts::prompt_templates};

// ============================================================================
// Generic Parameter Wrapper
// ============================================================================
//
// Core parameter types stay free of MCP concerns. This transparent newtype
// passes (de)serialization straight through to the wrapped type and forwards
// its JSON schema, which is all rmcp needs from a tool parameter.

/// MCP wrapper for a core parameter type
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct McpParams<T>(T)
where
    T: JsonSchema;

impl<T> JsonSchema for McpParams<T>
where
    T: JsonSchema,
{
    fn schema_name() -> std::borrow::Cow<'static, str> {
        T::schema_name()
    }

    fn json_schema(g: &mut schemars::SchemaGenerator) -> schemars::Schema {
        T::json_schema(g)
    }
}

impl<T> AsRef<T> for McpParams<T>
where
    T: JsonSchema,
{
    fn as_ref(&self) -> &T {
        &self.0
    }
}

pub type CreateSession = McpParams<core::CreateSession>;
pub type SessionRef = McpParams<core::SessionRef>;
pub type StepRef = McpParams<core::StepRef>;
pub type ConfirmStep = McpParams<core::ConfirmStep>;
pub type ListSessions = McpParams<core::ListSessions>;

pub type McpResult = Result<CallToolResult, McpError>;

/// Serializes `value` as the single text content of a successful result.
fn json_result<T: Serialize>(value: &T) -> McpResult {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("Failed to serialize response: {e}"), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn respond(response: &ToolResponse) -> McpResult {
    json_result(response)
}

/// Handler implementations for the MCP server
pub struct McpHandlers {
    controller: Arc<SessionController>,
}

impl McpHandlers {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }

    pub async fn create_session(
        &self,
        Parameters(params): Parameters<CreateSession>,
    ) -> McpResult {
        debug!("create_session: {:?}", params.as_ref().recipe_path);

        let recipe = params
            .as_ref()
            .load()
            .map_err(|e| to_mcp_error("Failed to load recipe", &e))?;
        let title = recipe.title.clone();
        let session_id = self
            .controller
            .create_session(recipe)
            .await
            .map_err(|e| to_mcp_error("Failed to create session", &e))?;

        let mut response = self
            .controller
            .repeat_step(&session_id)
            .map_err(|e| to_mcp_error("Failed to read new session", &e))?;
        response.message = format!(
            "Session {session_id} created for '{title}'. {}",
            response.message
        );
        respond(&response)
    }

    pub async fn start_step(&self, Parameters(params): Parameters<StepRef>) -> McpResult {
        debug!("start_step: {:?}", params);
        let params = params.as_ref();

        let response = self
            .controller
            .start_step(&params.session_id, &params.step_id)
            .await
            .map_err(|e| to_mcp_error("Failed to start step", &e))?;
        respond(&response)
    }

    pub async fn confirm_step_done(
        &self,
        Parameters(params): Parameters<ConfirmStep>,
    ) -> McpResult {
        debug!("confirm_step_done: {:?}", params);
        let params = params.as_ref();

        let response = self
            .controller
            .confirm_step_done(&params.session_id, &params.step_id, params.force)
            .await
            .map_err(|e| to_mcp_error("Failed to confirm step", &e))?;
        respond(&response)
    }

    pub async fn skip_timer(&self, Parameters(params): Parameters<StepRef>) -> McpResult {
        debug!("skip_timer: {:?}", params);
        let params = params.as_ref();

        let response = self
            .controller
            .skip_timer(&params.session_id, &params.step_id)
            .await
            .map_err(|e| to_mcp_error("Failed to skip timer", &e))?;
        respond(&response)
    }

    pub fn get_state(&self, Parameters(params): Parameters<SessionRef>) -> McpResult {
        debug!("get_state: {:?}", params);

        let response = self
            .controller
            .get_state(&params.as_ref().session_id)
            .map_err(|e| to_mcp_error("Failed to get state", &e))?;
        respond(&response)
    }

    pub fn repeat_step(&self, Parameters(params): Parameters<SessionRef>) -> McpResult {
        debug!("repeat_step: {:?}", params);

        let response = self
            .controller
            .repeat_step(&params.as_ref().session_id)
            .map_err(|e| to_mcp_error("Failed to repeat step", &e))?;
        respond(&response)
    }

    pub async fn finish_session(&self, Parameters(params): Parameters<SessionRef>) -> McpResult {
        debug!("finish_session: {:?}", params);

        let finished = self
            .controller
            .finish_session(&params.as_ref().session_id)
            .await
            .map_err(|e| to_mcp_error("Failed to finish session", &e))?;
        json_result(&finished)
    }

    pub async fn list_sessions(&self, Parameters(params): Parameters<ListSessions>) -> McpResult {
        debug!("list_sessions: {:?}", params);

        let Some(archive) = self.controller.archive() else {
            return Ok(CallToolResult::success(vec![Content::text(
                "Session archive is disabled.",
            )]));
        };
        let sessions = archive
            .list(params.as_ref().limit)
            .await
            .map_err(|e| to_mcp_error("Failed to list sessions", &e))?;

        let result = format!("# Cooking History\n\n{}", ArchivedSessions(sessions));
        Ok(CallToolResult::success(vec![Content::text(result)]))
    }

    pub fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        debug!("list_prompts");

        let prompts = prompt_templates()
            .iter()
            .map(|template| {
                Prompt::new(
                    &template.name,
                    Some(&template.description),
                    Some(
                        template
                            .arguments
                            .iter()
                            .map(|arg| PromptArgument {
                                name: arg.name.clone(),
                                description: Some(arg.description.clone()),
                                required: Some(arg.required),
                            })
                            .collect(),
                    ),
                )
            })
            .collect();

        Ok(ListPromptsResult {
            next_cursor: None,
            prompts,
        })
    }

    pub fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        debug!("get_prompt: {}", request.name);

        let templates = prompt_templates();
        let template = templates
            .iter()
            .find(|t| t.name == request.name)
            .ok_or_else(|| McpError::invalid_params("Prompt not found", None))?;

        let prompt_text = template
            .apply(request.arguments.as_ref())
            .map_err(|message| McpError::invalid_params(message, None))?;

        Ok(GetPromptResult {
            description: Some(template.description.clone()),
            messages: vec![PromptMessage {
                role: PromptMessageRole::User,
                content: PromptMessageContent::text(prompt_text),
            }],
        })
    }
}
