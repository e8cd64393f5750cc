use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// Command with --no-color and a private archive under `temp_dir`
fn sous_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sous").expect("Failed to find sous binary");
    cmd.arg("--no-color")
        .arg("--database-file")
        .arg(temp_dir.path().join("sessions.db"))
        .env_remove("SOUS_ALLOW_FORCE_COMPLETE")
        .env_remove("SOUS_IDLE_TIMEOUT_SECS");
    cmd
}

#[test]
fn test_validate_reports_step_count() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .args(["validate", &fixture("toast.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recipe 'toast' is valid: 2 steps."));
}

#[test]
fn test_validate_rejects_duplicate_steps() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .args(["validate", &fixture("duplicate.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed recipe"))
        .stderr(predicate::str::contains("mix"));
}

#[test]
fn test_validate_missing_file() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .args(["validate", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load recipe"));
}

#[test]
fn test_show_renders_steps() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .args(["show", &fixture("bread.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Bread"))
        .stdout(predicate::str::contains("- Servings: 8"))
        .stdout(predicate::str::contains("### bake"))
        .stdout(predicate::str::contains("- After: prep"));
}

#[test]
fn test_cook_walks_through_recipe() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .args(["cook", &fixture("toast.json")])
        .write_stdin("start\ndone\nstart\ndone\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[INFO] Next step 'slice'."))
        .stdout(predicate::str::contains("[STARTED] Started 'slice'."))
        .stdout(predicate::str::contains("Narration: Toast until golden."))
        .stdout(predicate::str::contains(
            "[DONE] Completed 'toast'. All steps completed! Session finished.",
        ));

    sous_cmd(&temp_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("Toast"))
        .stdout(predicate::str::contains("completed"))
        .stdout(predicate::str::contains("2/2 completed"));
}

#[test]
fn test_cook_blocks_and_waits() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .args(["cook", &fixture("bread.json")])
        .write_stdin("start bake\nstart prep\ndone\ndone\nskip\ndone\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[BLOCKED] Cannot start 'bake' yet; 'prep' has to be finished first.",
        ))
        .stdout(predicate::str::contains("Next: Call start_step('prep') first"))
        .stdout(predicate::str::contains("Started 'bake' automatically"))
        .stdout(predicate::str::contains("[WAIT] Timer for 'bake' is still running"))
        .stdout(predicate::str::contains("Skipped the timer for 'bake'"))
        .stdout(predicate::str::contains("[DONE] Completed 'bake'."));
}

#[test]
fn test_cook_force_needs_policy_flag() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .args(["--no-archive", "cook", &fixture("bread.json")])
        .write_stdin("start\ndone\ndone --force\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("not allowed"))
        .stdout(predicate::str::contains("abandoned: 1/2 steps completed"));

    sous_cmd(&temp_dir)
        .args(["--no-archive", "--allow-force-complete", "cook", &fixture("bread.json")])
        .write_stdin("start\ndone\ndone --force\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Completed 'bake' before its timer finished.",
        ));
}

#[test]
fn test_cook_quit_ends_session() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .args(["cook", &fixture("toast.json")])
        .write_stdin("fry\nstart slice\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown command 'fry'"))
        .stdout(predicate::str::contains("ended: 0/2 steps completed"));

    sous_cmd(&temp_dir)
        .args(["history", "--limit", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- ended"));
}

#[test]
fn test_history_empty() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No cooking sessions recorded."));
}

#[test]
fn test_history_requires_archive() {
    let temp_dir = TempDir::new().unwrap();

    sous_cmd(&temp_dir)
        .args(["--no-archive", "history"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--no-archive"));
}
