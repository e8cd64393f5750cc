//! Prompt templates for MCP server

use rmcp::model::JsonObject;

/// Argument definition for a prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplateArg {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// Substituted when an optional argument is omitted
    pub fallback: &'static str,
}

/// Definition of a prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub name: String,
    pub description: String,
    pub template: String,
    pub arguments: Vec<PromptTemplateArg>,
}

impl PromptTemplate {
    /// Fills `{name}` placeholders from `arguments`.
    pub fn apply(&self, arguments: Option<&JsonObject>) -> Result<String, String> {
        let mut text = self.template.clone();
        for arg in &self.arguments {
            let value = match arguments.and_then(|args| args.get(&arg.name)) {
                Some(value) => value
                    .as_str()
                    .ok_or_else(|| format!("Argument '{}' must be a string", arg.name))?,
                None if arg.required => {
                    return Err(format!("Required argument '{}' is missing", arg.name));
                }
                None => arg.fallback,
            };
            text = text.replace(&format!("{{{}}}", arg.name), value);
        }
        Ok(text)
    }
}

/// Predefined prompt templates for guiding a cook
pub fn prompt_templates() -> Vec<PromptTemplate> {
    vec![PromptTemplate {
        name: "guide_recipe".to_string(),
        description: "Guide a user through a recipe, one step at a time, using Sous's MCP tools"
            .to_string(),
        template: r#"You are **Sous**, a calm kitchen assistant guiding someone through a recipe by voice.

# Recipe
{recipe_path}

# Setup
Call `create_session` with the recipe (`recipe_path` or an inline `recipe`). Keep the returned `session_id`; every other tool needs it.

# Guiding
- Read the `narration` of the current step aloud in your own words, briefly.
- When the user begins a step, call `start_step`. When they say it is done, call `confirm_step_done`.
- Every response carries `context.next_call`. Follow it; do not guess step order.
- `BLOCKED` means another step must be finished first. Tell the user which one, then make the suggested call.
- `WAIT` means a timer is still running. Tell the user how long is left and wait. Only call `skip_timer` if the user explicitly wants to stop the timer early.
- Timer steps may start and finish on their own. Call `get_state` whenever you are unsure where things stand.
- If the user asks "what was that again?", call `repeat_step`.

# Finishing
When all steps are completed the session closes by itself. If the user stops early, call `finish_session` and summarize what was cooked.

Never invent steps or timings that are not in the recipe."#
            .to_string(),
        arguments: vec![PromptTemplateArg {
            name: "recipe_path".to_string(),
            description: "Path to the recipe JSON document to cook".to_string(),
            required: false,
            fallback: "Ask the user which recipe they want to cook.",
        }],
    }]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn guide() -> PromptTemplate {
        prompt_templates()
            .into_iter()
            .find(|t| t.name == "guide_recipe")
            .unwrap()
    }

    #[test]
    fn test_apply_substitutes_argument() {
        let args = json!({"recipe_path": "recipes/bread.json"});
        let text = guide().apply(args.as_object()).unwrap();
        assert!(text.contains("recipes/bread.json"));
        assert!(!text.contains("{recipe_path}"));
    }

    #[test]
    fn test_apply_uses_fallback_for_missing_optional() {
        let text = guide().apply(None).unwrap();
        assert!(text.contains("Ask the user which recipe"));
    }

    #[test]
    fn test_apply_rejects_non_string() {
        let args = json!({"recipe_path": 3});
        let err = guide().apply(args.as_object()).unwrap_err();
        assert!(err.contains("must be a string"));
    }
}
