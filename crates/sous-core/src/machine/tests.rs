use std::sync::{Arc, OnceLock};
use std::time::Duration;

use jiff::Timestamp;
use tokio::time::Instant;

use super::*;
use crate::models::{RecipeDocument, StepSpec};

fn t0() -> Moment {
    static START: OnceLock<Instant> = OnceLock::new();
    Moment {
        wall: Timestamp::from_second(1_760_000_000).unwrap(),
        instant: *START.get_or_init(Instant::now),
    }
}

fn later(seconds: u64) -> Moment {
    let start = t0();
    Moment {
        wall: start
            .wall
            .checked_add(SignedDuration::from_secs(i64::try_from(seconds).unwrap()))
            .unwrap(),
        instant: start.instant + Duration::from_secs(seconds),
    }
}

fn prep_and_bake() -> Arc<RecipeDocument> {
    Arc::new(RecipeDocument::linear(
        "bread",
        "Bread",
        vec![
            StepSpec::immediate("prep", "Mix the dough.").with_confirm(),
            StepSpec::timer("bake", 5, "Bake for five seconds.")
                .with_auto_start()
                .with_confirm(),
        ],
    ))
}

fn machine(recipe: Arc<RecipeDocument>) -> StepMachine {
    let (machine, effects) = StepMachine::new(recipe, false, t0());
    assert!(effects.is_empty(), "unexpected initial effects: {effects:?}");
    machine
}

/// Simulates the controller arming a countdown for every `ArmTimer` effect.
fn arm_all(machine: &mut StepMachine, effects: &[Effect], next_handle: &mut u64) -> Vec<TimerHandle> {
    let mut handles = Vec::new();
    for effect in effects {
        if let Effect::ArmTimer { step_id, .. } = effect {
            let handle = TimerHandle(*next_handle);
            *next_handle += 1;
            assert!(machine.attach_timer(step_id, handle));
            handles.push(handle);
        }
    }
    handles
}

fn status(machine: &StepMachine, step_id: &str) -> StepStatus {
    machine.state(step_id).map(|state| state.status).unwrap()
}

#[test]
fn test_initial_statuses() {
    let machine = machine(prep_and_bake());
    assert_eq!(status(&machine, "prep"), StepStatus::Ready);
    assert_eq!(status(&machine, "bake"), StepStatus::Pending);
    assert_eq!(machine.active_step(), None);
    assert!(machine.completed_steps().is_empty());
}

#[test]
fn test_prep_then_bake_walkthrough() {
    let mut machine = machine(prep_and_bake());
    let mut next_handle = 1;

    let started = machine.start_step("prep", t0());
    assert_eq!(
        started.result,
        Ok(Outcome::Started {
            step_id: "prep".to_string()
        })
    );
    assert!(started.effects.is_empty());

    let done = machine.confirm_step_done("prep", false, later(10));
    match &done.result {
        Ok(Outcome::Completed {
            step_id,
            cascade,
            recipe_complete,
            ..
        }) => {
            assert_eq!(step_id, "prep");
            assert_eq!(cascade.unlocked, vec!["bake".to_string()]);
            assert_eq!(cascade.auto_started, vec!["bake".to_string()]);
            assert!(!recipe_complete);
        }
        other => panic!("Expected Completed, got {other:?}"),
    }
    assert_eq!(
        done.effects,
        vec![Effect::ArmTimer {
            step_id: "bake".to_string(),
            duration: Duration::from_secs(5),
        }]
    );
    let handles = arm_all(&mut machine, &done.effects, &mut next_handle);
    assert_eq!(machine.active_step(), Some("bake"));

    let early = machine.confirm_step_done("bake", false, later(12));
    assert_eq!(
        early.result,
        Err(Rejection::TimerRunning {
            step_id: "bake".to_string(),
            remaining_seconds: 3,
            force_refused: false,
        })
    );

    let elapsed = machine.timer_elapsed("bake", handles[0], later(15));
    assert_eq!(
        elapsed.result,
        Ok(Outcome::TimerFinished {
            step_id: "bake".to_string()
        })
    );
    assert_eq!(status(&machine, "bake"), StepStatus::Active);

    let finished = machine.confirm_step_done("bake", false, later(20));
    assert!(matches!(
        finished.result,
        Ok(Outcome::Completed {
            recipe_complete: true,
            ..
        })
    ));
    assert_eq!(machine.completed_steps(), ["prep", "bake"]);
    assert!(machine.is_complete());
}

#[test]
fn test_start_while_another_active_is_blocked() {
    let recipe = Arc::new(RecipeDocument::new(
        "salad",
        "Salad",
        vec![
            StepSpec::immediate("wash", "Wash the lettuce."),
            StepSpec::immediate("dressing", "Whisk the dressing."),
        ],
    ));
    let mut machine = machine(recipe);
    machine.start_step("wash", t0());

    let blocked = machine.start_step("dressing", t0());
    assert_eq!(
        blocked.result,
        Err(Rejection::AnotherStepActive {
            action: ToolAction::Start,
            requested: "dressing".to_string(),
            active: "wash".to_string(),
        })
    );
    assert_eq!(status(&machine, "dressing"), StepStatus::Ready);
}

#[test]
fn test_pending_step_names_blocking_ancestor() {
    let recipe = Arc::new(RecipeDocument::linear(
        "soup",
        "Soup",
        vec![
            StepSpec::immediate("chop", "Chop."),
            StepSpec::immediate("sweat", "Sweat the onions."),
            StepSpec::immediate("simmer", "Simmer."),
        ],
    ));
    let mut machine = machine(recipe);

    let blocked = machine.start_step("simmer", t0());
    assert_eq!(
        blocked.result,
        Err(Rejection::NotReady {
            action: ToolAction::Start,
            requested: "simmer".to_string(),
            blocking: "chop".to_string(),
        })
    );

    let not_started = machine.confirm_step_done("chop", false, t0());
    assert_eq!(
        not_started.result,
        Err(Rejection::NotStarted {
            requested: "chop".to_string()
        })
    );
}

#[test]
fn test_unknown_step_lists_valid_ids() {
    let mut machine = machine(prep_and_bake());
    match machine.start_step("fry", t0()).result {
        Err(Rejection::UnknownStep { step_id, valid }) => {
            assert_eq!(step_id, "fry");
            assert_eq!(valid, vec!["prep".to_string(), "bake".to_string()]);
        }
        other => panic!("Expected UnknownStep, got {other:?}"),
    }
}

#[test]
fn test_completed_never_regresses() {
    let mut machine = machine(prep_and_bake());
    machine.start_step("prep", t0());
    machine.confirm_step_done("prep", false, t0());

    let again = machine.confirm_step_done("prep", false, t0());
    assert_eq!(
        again.result,
        Ok(Outcome::AlreadyCompleted {
            step_id: "prep".to_string()
        })
    );
    let restart = machine.start_step("prep", t0());
    assert!(matches!(restart.result, Ok(Outcome::AlreadyCompleted { .. })));
    assert_eq!(machine.completed_steps(), ["prep"]);
}

#[test]
fn test_stale_elapse_is_ignored() {
    let mut machine = machine(prep_and_bake());
    let mut next_handle = 7;
    machine.start_step("prep", t0());
    let done = machine.confirm_step_done("prep", false, t0());
    let handles = arm_all(&mut machine, &done.effects, &mut next_handle);

    let stale = machine.timer_elapsed("bake", TimerHandle(1), later(5));
    assert!(matches!(stale.result, Ok(Outcome::Ignored { .. })));
    assert!(machine.state("bake").unwrap().is_timer_running());

    let wrong_step = machine.timer_elapsed("prep", handles[0], later(5));
    assert!(matches!(wrong_step.result, Ok(Outcome::Ignored { .. })));
}

#[test]
fn test_auto_complete_on_elapse_without_confirm() {
    let recipe = Arc::new(RecipeDocument::linear(
        "eggs",
        "Eggs",
        vec![
            StepSpec::timer("boil", 420, "Boil seven minutes."),
            StepSpec::immediate("peel", "Peel."),
        ],
    ));
    let mut machine = machine(recipe);
    let mut next_handle = 1;

    let started = machine.start_step("boil", t0());
    let handles = arm_all(&mut machine, &started.effects, &mut next_handle);

    let elapsed = machine.timer_elapsed("boil", handles[0], later(420));
    match elapsed.result {
        Ok(Outcome::Completed { step_id, cascade, .. }) => {
            assert_eq!(step_id, "boil");
            assert_eq!(cascade.unlocked, vec!["peel".to_string()]);
        }
        other => panic!("Expected Completed, got {other:?}"),
    }
    assert!(elapsed.effects.is_empty());
    assert_eq!(status(&machine, "peel"), StepStatus::Ready);
}

#[test]
fn test_early_confirm_cancels_non_confirm_timer() {
    let recipe = Arc::new(RecipeDocument::new(
        "rice",
        "Rice",
        vec![StepSpec::timer("steam", 900, "Steam the rice.")],
    ));
    let mut machine = machine(recipe);
    let mut next_handle = 1;
    let started = machine.start_step("steam", t0());
    let handles = arm_all(&mut machine, &started.effects, &mut next_handle);

    let done = machine.confirm_step_done("steam", false, later(60));
    assert!(matches!(done.result, Ok(Outcome::Completed { .. })));
    assert_eq!(done.effects, vec![Effect::CancelTimer { handle: handles[0] }]);
    assert_eq!(machine.state("steam").unwrap().timer, TimerState::Skipped);
}

#[test]
fn test_force_complete_respects_policy() {
    let recipe = prep_and_bake();

    let (mut strict, _) = StepMachine::new(Arc::clone(&recipe), false, t0());
    strict.start_step("prep", t0());
    let done = strict.confirm_step_done("prep", false, t0());
    arm_all(&mut strict, &done.effects, &mut 1);
    let refused = strict.confirm_step_done("bake", true, later(1));
    assert!(matches!(
        refused.result,
        Err(Rejection::TimerRunning {
            force_refused: true,
            ..
        })
    ));

    let (mut lenient, _) = StepMachine::new(recipe, true, t0());
    lenient.start_step("prep", t0());
    let done = lenient.confirm_step_done("prep", false, t0());
    let handles = arm_all(&mut lenient, &done.effects, &mut 1);
    let forced = lenient.confirm_step_done("bake", true, later(1));
    assert!(matches!(
        forced.result,
        Ok(Outcome::Completed { forced: true, .. })
    ));
    assert_eq!(forced.effects, vec![Effect::CancelTimer { handle: handles[0] }]);
}

#[test]
fn test_skip_timer_allows_confirm() {
    let mut machine = machine(prep_and_bake());
    machine.start_step("prep", t0());
    let done = machine.confirm_step_done("prep", false, t0());
    let handles = arm_all(&mut machine, &done.effects, &mut 1);

    let skipped = machine.skip_timer("bake");
    assert_eq!(
        skipped.result,
        Ok(Outcome::TimerSkipped {
            step_id: "bake".to_string()
        })
    );
    assert_eq!(skipped.effects, vec![Effect::CancelTimer { handle: handles[0] }]);
    assert_eq!(status(&machine, "bake"), StepStatus::Active);

    let again = machine.skip_timer("bake");
    assert!(matches!(again.result, Ok(Outcome::NothingToSkip { .. })));

    let late = machine.timer_elapsed("bake", handles[0], later(5));
    assert!(matches!(late.result, Ok(Outcome::Ignored { .. })));

    let finished = machine.confirm_step_done("bake", false, later(2));
    assert!(matches!(
        finished.result,
        Ok(Outcome::Completed {
            recipe_complete: true,
            ..
        })
    ));
}

#[test]
fn test_skip_timer_on_inactive_step() {
    let mut machine = machine(prep_and_bake());
    machine.start_step("prep", t0());
    assert_eq!(
        machine.skip_timer("bake").result,
        Err(Rejection::NotActive {
            requested: "bake".to_string(),
            active: Some("prep".to_string()),
        })
    );
}

#[test]
fn test_root_auto_start_promoted_at_creation() {
    let recipe = Arc::new(RecipeDocument::new(
        "stock",
        "Stock",
        vec![StepSpec::timer("simmer", 3600, "Simmer for an hour.").with_auto_start()],
    ));
    let (machine, effects) = StepMachine::new(recipe, false, t0());
    assert_eq!(machine.active_step(), Some("simmer"));
    assert_eq!(effects.len(), 1);

    let snapshot = machine.snapshot("cook-1", t0());
    let simmer = snapshot.step("simmer").unwrap();
    assert_eq!(simmer.timer, TimerState::Running);
    assert_eq!(simmer.remaining_seconds(later(600).instant), Some(3000));
}

#[test]
fn test_parallel_auto_start_promoted_in_recipe_order() {
    let recipe = Arc::new(RecipeDocument::new(
        "roast",
        "Roast",
        vec![
            StepSpec::immediate("season", "Season the chicken."),
            StepSpec::timer("roast", 60, "Roast.")
                .with_auto_start()
                .after("season"),
            StepSpec::timer("potatoes", 30, "Boil potatoes.")
                .with_auto_start()
                .after("season"),
        ],
    ));
    let mut machine = machine(recipe);
    machine.start_step("season", t0());

    let done = machine.confirm_step_done("season", false, t0());
    match &done.result {
        Ok(Outcome::Completed { cascade, .. }) => {
            assert_eq!(cascade.unlocked, vec!["roast".to_string(), "potatoes".to_string()]);
            assert_eq!(cascade.auto_started, vec!["roast".to_string()]);
        }
        other => panic!("Expected Completed, got {other:?}"),
    }
    assert_eq!(status(&machine, "potatoes"), StepStatus::Ready);
    let handles = arm_all(&mut machine, &done.effects, &mut 1);

    let roasted = machine.timer_elapsed("roast", handles[0], later(60));
    match roasted.result {
        Ok(Outcome::Completed { cascade, .. }) => {
            assert_eq!(cascade.auto_started, vec!["potatoes".to_string()]);
        }
        other => panic!("Expected Completed, got {other:?}"),
    }
    assert_eq!(machine.active_step(), Some("potatoes"));
}

#[test]
fn test_zero_duration_timer_completes_on_start() {
    let recipe = Arc::new(RecipeDocument::linear(
        "jam",
        "Jam",
        vec![
            StepSpec::timer("rest", 0, "No rest needed."),
            StepSpec::immediate("jar", "Jar it."),
        ],
    ));
    let mut machine = machine(recipe);

    let started = machine.start_step("rest", t0());
    match started.result {
        Ok(Outcome::Completed { step_id, cascade, .. }) => {
            assert_eq!(step_id, "rest");
            assert!(cascade.auto_completed.is_empty());
            assert_eq!(cascade.unlocked, vec!["jar".to_string()]);
        }
        other => panic!("Expected Completed, got {other:?}"),
    }
    assert!(started.effects.is_empty());
}

#[test]
fn test_zero_duration_confirm_timer_waits_for_confirm() {
    let recipe = Arc::new(RecipeDocument::new(
        "jam",
        "Jam",
        vec![StepSpec::timer("set", 0, "Check the set.").with_confirm()],
    ));
    let mut machine = machine(recipe);
    let started = machine.start_step("set", t0());
    assert!(matches!(started.result, Ok(Outcome::Started { .. })));
    assert_eq!(machine.state("set").unwrap().timer, TimerState::Elapsed);

    let done = machine.confirm_step_done("set", false, t0());
    assert!(matches!(done.result, Ok(Outcome::Completed { .. })));
}

#[test]
fn test_single_active_and_monotonic_completion() {
    let recipe = Arc::new(RecipeDocument::new(
        "tapas",
        "Tapas",
        vec![
            StepSpec::immediate("olives", "Plate olives."),
            StepSpec::immediate("bread", "Slice bread."),
            StepSpec::immediate("ham", "Slice ham.").after("bread"),
        ],
    ));
    let mut machine = machine(recipe);
    let calls = [
        ("start", "bread"),
        ("start", "olives"),
        ("done", "olives"),
        ("done", "bread"),
        ("start", "ham"),
        ("start", "olives"),
        ("done", "ham"),
        ("start", "olives"),
        ("done", "olives"),
    ];

    let mut seen = Vec::new();
    for (call, step_id) in calls {
        match call {
            "start" => machine.start_step(step_id, t0()),
            _ => machine.confirm_step_done(step_id, false, t0()),
        };
        let active = machine
            .snapshot("cook-1", t0())
            .steps
            .iter()
            .filter(|step| step.status == StepStatus::Active)
            .count();
        assert!(active <= 1);
        assert!(machine.completed_steps().starts_with(&seen));
        seen = machine.completed_steps().to_vec();
    }
    assert_eq!(machine.completed_steps(), ["bread", "ham", "olives"]);
}
