//! Error mapping for the MCP server

use rmcp::ErrorData;
use sous_core::CookError;

/// Converts a core error into a protocol error.
///
/// Errors the agent caused (an unknown or closed session, a broken recipe)
/// become `invalid_params` so it knows to re-establish the session; the rest
/// are internal errors.
pub fn to_mcp_error(message: &str, error: &CookError) -> ErrorData {
    let text = format!("{message}: {error}");
    match error {
        CookError::UnknownSession { .. }
        | CookError::MalformedRecipe { .. }
        | CookError::Configuration { .. } => ErrorData::invalid_params(text, None),
        _ => ErrorData::internal_error(text, None),
    }
}
