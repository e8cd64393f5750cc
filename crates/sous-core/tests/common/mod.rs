#![allow(dead_code)]

use std::time::Duration;

use sous_core::{RecipeDocument, SessionController, StepSpec};
use tempfile::TempDir;

/// Controller without an archive, for paused-clock tests.
pub async fn create_test_controller() -> SessionController {
    SessionController::builder()
        .without_archive()
        .with_idle_timeout(Duration::from_secs(30 * 60))
        .build()
        .await
        .expect("Failed to create controller")
}

/// Controller archiving into a temporary database.
pub async fn create_archived_controller() -> (TempDir, SessionController) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("sessions.db");
    let controller = SessionController::builder()
        .with_archive_path(Some(&db_path))
        .build()
        .await
        .expect("Failed to create controller");
    (temp_dir, controller)
}

/// `prep` (immediate, confirm) followed by a 5 s auto-start confirm timer.
pub fn prep_and_bake() -> RecipeDocument {
    RecipeDocument::linear(
        "bread",
        "Bread",
        vec![
            StepSpec::immediate("prep", "Mix the dough.").with_confirm(),
            StepSpec::timer("bake", 5, "Bake for five seconds.")
                .with_auto_start()
                .with_confirm(),
        ],
    )
}

pub fn immediate_recipe(id: &str, steps: &[&str]) -> RecipeDocument {
    RecipeDocument::linear(
        id,
        id,
        steps
            .iter()
            .map(|step| StepSpec::immediate(*step, format!("Do {step}.")))
            .collect(),
    )
}
