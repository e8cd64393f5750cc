//! Recipe document loader.
//!
//! Parses a JSON recipe document into a [`RecipeDocument`] and rejects
//! structurally broken documents before a session is ever created. The
//! loader is a set of pure functions; it keeps no state.
//!
//! # Document format
//!
//! ```json
//! {
//!   "id": "banana-bread",
//!   "title": "Banana Bread",
//!   "servings": 8,
//!   "steps": [
//!     { "step_id": "mash", "kind": "immediate", "narration": "Mash the bananas." },
//!     { "step_id": "bake", "kind": "timer", "duration_seconds": 3600,
//!       "auto_start": true, "requires_confirm": true, "narration": "Bake." }
//!   ]
//! }
//! ```
//!
//! A step without a `predecessor` key follows the step before it. An explicit
//! `"predecessor": null` makes the step a root that is reachable at once.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::{
    error::{CookError, Result},
    models::{RecipeDocument, StepKind, StepSpec},
};

#[derive(Debug, Deserialize)]
struct RawRecipe {
    id: String,
    title: String,
    #[serde(default)]
    servings: Option<u32>,
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(alias = "id")]
    step_id: String,
    kind: StepKind,
    #[serde(default)]
    duration_seconds: Option<u64>,
    #[serde(default)]
    auto_start: bool,
    #[serde(default)]
    requires_confirm: bool,
    #[serde(default)]
    narration: String,
    /// Absent: previous step. `null`: no predecessor.
    #[serde(default, deserialize_with = "present")]
    predecessor: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl RawRecipe {
    fn into_document(self) -> RecipeDocument {
        let mut previous: Option<String> = None;
        let steps = self
            .steps
            .into_iter()
            .map(|raw| {
                let predecessor = match raw.predecessor {
                    Some(explicit) => explicit,
                    None => previous.clone(),
                };
                previous = Some(raw.step_id.clone());
                StepSpec {
                    step_id: raw.step_id,
                    kind: raw.kind,
                    duration_seconds: raw.duration_seconds,
                    auto_start: raw.auto_start,
                    requires_confirm: raw.requires_confirm,
                    narration: raw.narration,
                    predecessor,
                }
            })
            .collect();

        RecipeDocument {
            id: self.id,
            title: self.title,
            servings: self.servings,
            steps,
        }
    }
}

/// Parses and validates a recipe from JSON text.
///
/// # Errors
///
/// Returns [`CookError::MalformedRecipe`] for unparseable JSON or any
/// structural defect reported by [`validate`].
///
/// # Examples
///
/// ```rust
/// use sous_core::loader::parse_recipe;
///
/// let recipe = parse_recipe(r#"{
///     "id": "tea", "title": "Tea",
///     "steps": [
///         { "step_id": "boil", "kind": "immediate", "narration": "Boil water." },
///         { "step_id": "steep", "kind": "timer", "duration_seconds": 180,
///           "auto_start": true, "narration": "Steep three minutes." }
///     ]
/// }"#)?;
/// assert_eq!(recipe.step("steep").unwrap().predecessor.as_deref(), Some("boil"));
/// # Ok::<(), sous_core::CookError>(())
/// ```
pub fn parse_recipe(json: &str) -> Result<RecipeDocument> {
    let raw: RawRecipe = serde_json::from_str(json)
        .map_err(|e| CookError::malformed(format!("invalid recipe JSON: {e}")))?;
    let document = raw.into_document();
    validate(&document)?;
    Ok(document)
}

/// Parses and validates a recipe from an already-decoded JSON value.
pub fn recipe_from_value(value: serde_json::Value) -> Result<RecipeDocument> {
    let raw: RawRecipe = serde_json::from_value(value)
        .map_err(|e| CookError::malformed(format!("invalid recipe JSON: {e}")))?;
    let document = raw.into_document();
    validate(&document)?;
    Ok(document)
}

/// Reads, parses and validates a recipe file.
pub fn load_recipe<P: AsRef<Path>>(path: P) -> Result<RecipeDocument> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| CookError::FileSystem {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_recipe(&json)
}

/// Checks the structural invariants the state machine relies on.
///
/// Rejected: no steps, blank ids, duplicate `step_id`, a timer step without
/// `duration_seconds`, an immediate step with one, a predecessor naming an
/// unknown step, and cyclic predecessor chains (self-reference included).
pub fn validate(recipe: &RecipeDocument) -> Result<()> {
    if recipe.id.trim().is_empty() {
        return Err(CookError::malformed("recipe id must not be empty"));
    }
    if recipe.steps.is_empty() {
        return Err(CookError::malformed(format!(
            "recipe '{}' has no steps",
            recipe.id
        )));
    }

    let mut seen = HashSet::new();
    for step in &recipe.steps {
        if step.step_id.trim().is_empty() {
            return Err(CookError::malformed("step_id must not be empty"));
        }
        if !seen.insert(step.step_id.as_str()) {
            return Err(CookError::malformed(format!(
                "duplicate step_id '{}'",
                step.step_id
            )));
        }
        match (step.kind, step.duration_seconds) {
            (StepKind::Timer, None) => {
                return Err(CookError::malformed(format!(
                    "timer step '{}' is missing duration_seconds",
                    step.step_id
                )));
            }
            (StepKind::Immediate, Some(_)) => {
                return Err(CookError::malformed(format!(
                    "immediate step '{}' must not have duration_seconds",
                    step.step_id
                )));
            }
            _ => {}
        }
    }

    let predecessors: HashMap<&str, Option<&str>> = recipe
        .steps
        .iter()
        .map(|step| (step.step_id.as_str(), step.predecessor.as_deref()))
        .collect();

    for step in &recipe.steps {
        if let Some(predecessor) = step.predecessor.as_deref() {
            if !predecessors.contains_key(predecessor) {
                return Err(CookError::malformed(format!(
                    "step '{}' names unknown predecessor '{}'",
                    step.step_id, predecessor
                )));
            }
        }
    }

    for step in &recipe.steps {
        let mut chain = HashSet::from([step.step_id.as_str()]);
        let mut cursor = step.predecessor.as_deref();
        while let Some(current) = cursor {
            if !chain.insert(current) {
                return Err(CookError::malformed(format!(
                    "cyclic predecessor chain through step '{}'",
                    step.step_id
                )));
            }
            cursor = predecessors.get(current).copied().flatten();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: Result<RecipeDocument>) -> String {
        match result {
            Err(CookError::MalformedRecipe { reason }) => reason,
            Err(other) => panic!("Expected MalformedRecipe, got {other:?}"),
            Ok(_) => panic!("Expected MalformedRecipe, got a valid recipe"),
        }
    }

    #[test]
    fn test_parse_linear_recipe_defaults() {
        let recipe = parse_recipe(
            r#"{
                "id": "omelette",
                "title": "Omelette",
                "servings": 1,
                "steps": [
                    { "step_id": "whisk", "kind": "immediate", "narration": "Whisk the eggs." },
                    { "step_id": "cook", "kind": "timer", "duration_seconds": 90, "narration": "Cook." },
                    { "id": "fold", "kind": "immediate", "requires_confirm": true }
                ]
            }"#,
        )
        .expect("valid recipe");

        assert_eq!(recipe.servings, Some(1));
        assert_eq!(recipe.steps.len(), 3);
        assert_eq!(recipe.steps[0].predecessor, None);
        assert_eq!(recipe.steps[1].predecessor.as_deref(), Some("whisk"));
        assert_eq!(recipe.steps[2].predecessor.as_deref(), Some("cook"));
        assert_eq!(recipe.steps[2].step_id, "fold");
        assert!(recipe.steps[2].requires_confirm);
        assert!(!recipe.steps[1].auto_start);
        assert_eq!(recipe.steps[2].narration, "");
    }

    #[test]
    fn test_explicit_null_predecessor_is_root() {
        let recipe = parse_recipe(
            r#"{
                "id": "salad", "title": "Salad",
                "steps": [
                    { "step_id": "wash", "kind": "immediate" },
                    { "step_id": "dressing", "kind": "immediate", "predecessor": null },
                    { "step_id": "toss", "kind": "immediate", "predecessor": "wash" }
                ]
            }"#,
        )
        .expect("valid recipe");

        assert_eq!(recipe.steps[1].predecessor, None);
        assert_eq!(recipe.steps[2].predecessor.as_deref(), Some("wash"));
    }

    #[test]
    fn test_rejects_timer_without_duration() {
        let reason = reason(parse_recipe(
            r#"{"id": "r", "title": "R", "steps": [{ "step_id": "bake", "kind": "timer" }]}"#,
        ));
        assert!(reason.contains("missing duration_seconds"), "{reason}");
    }

    #[test]
    fn test_rejects_immediate_with_duration() {
        let reason = reason(parse_recipe(
            r#"{"id": "r", "title": "R", "steps": [
                { "step_id": "chop", "kind": "immediate", "duration_seconds": 30 }
            ]}"#,
        ));
        assert!(reason.contains("must not have duration_seconds"), "{reason}");
    }

    #[test]
    fn test_rejects_duplicate_step_ids() {
        let reason = reason(parse_recipe(
            r#"{"id": "r", "title": "R", "steps": [
                { "step_id": "chop", "kind": "immediate" },
                { "step_id": "chop", "kind": "immediate" }
            ]}"#,
        ));
        assert!(reason.contains("duplicate step_id 'chop'"), "{reason}");
    }

    #[test]
    fn test_rejects_cycles() {
        let reason = reason(parse_recipe(
            r#"{"id": "r", "title": "R", "steps": [
                { "step_id": "a", "kind": "immediate", "predecessor": "c" },
                { "step_id": "b", "kind": "immediate", "predecessor": "a" },
                { "step_id": "c", "kind": "immediate", "predecessor": "b" }
            ]}"#,
        ));
        assert!(reason.contains("cyclic"), "{reason}");
    }

    #[test]
    fn test_rejects_self_predecessor() {
        let recipe = RecipeDocument::new(
            "r",
            "R",
            vec![StepSpec::immediate("stir", "Stir.").after("stir")],
        );
        assert!(matches!(
            validate(&recipe),
            Err(CookError::MalformedRecipe { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_predecessor() {
        let reason = reason(parse_recipe(
            r#"{"id": "r", "title": "R", "steps": [
                { "step_id": "plate", "kind": "immediate", "predecessor": "garnish" }
            ]}"#,
        ));
        assert!(reason.contains("unknown predecessor 'garnish'"), "{reason}");
    }

    #[test]
    fn test_rejects_empty_recipe() {
        let reason = reason(parse_recipe(r#"{"id": "r", "title": "R", "steps": []}"#));
        assert!(reason.contains("no steps"), "{reason}");
    }

    #[test]
    fn test_rejects_invalid_json() {
        let reason = reason(parse_recipe("{ not json"));
        assert!(reason.starts_with("invalid recipe JSON"), "{reason}");
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let reason = reason(parse_recipe(
            r#"{"id": "r", "title": "R", "steps": [{ "step_id": "x", "kind": "blend" }]}"#,
        ));
        assert!(reason.starts_with("invalid recipe JSON"), "{reason}");
    }

    #[test]
    fn test_zero_duration_timer_is_valid() {
        let recipe = parse_recipe(
            r#"{"id": "r", "title": "R", "steps": [
                { "step_id": "rest", "kind": "timer", "duration_seconds": 0 }
            ]}"#,
        )
        .expect("zero-length timers are legal");
        assert_eq!(recipe.steps[0].duration_seconds, Some(0));
    }

    #[test]
    fn test_load_recipe_missing_file() {
        let err = load_recipe("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CookError::FileSystem { .. }));
    }

    #[test]
    fn test_load_recipe_from_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("tea.json");
        std::fs::write(
            &path,
            r#"{"id": "tea", "title": "Tea", "steps": [{ "step_id": "boil", "kind": "immediate" }]}"#,
        )
        .expect("write recipe");

        let recipe = load_recipe(&path).expect("load recipe");
        assert_eq!(recipe.title, "Tea");
    }
}
