#[cfg(test)]
mod model_tests {
    use std::sync::OnceLock;
    use std::time::Duration;

    use jiff::{SignedDuration, Timestamp};
    use tokio::time::Instant;

    use crate::models::{
        RecipeDocument, SessionOutcome, StepKind, StepSpec, StepStatus, StepView, TimerState,
    };

    fn t0() -> Timestamp {
        Timestamp::from_second(1_640_995_200).unwrap() // 2022-01-01 00:00:00 UTC
    }

    fn start() -> Instant {
        static START: OnceLock<Instant> = OnceLock::new();
        *START.get_or_init(Instant::now)
    }

    fn running_view(deadline_secs: i64) -> StepView {
        StepView {
            step_id: "bake".to_string(),
            kind: StepKind::Timer,
            status: StepStatus::Active,
            timer: TimerState::Running,
            duration_seconds: Some(600),
            auto_start: true,
            requires_confirm: true,
            narration: "Bake.".to_string(),
            predecessor: Some("prep".to_string()),
            timer_deadline: Some(t0() + SignedDuration::from_secs(deadline_secs)),
            timer_due: Some(start() + Duration::from_secs(deadline_secs.unsigned_abs())),
            entered_active_at: Some(t0()),
            completed_at: None,
        }
    }

    #[test]
    fn test_step_status_parsing() {
        assert_eq!("ready".parse::<StepStatus>().unwrap(), StepStatus::Ready);
        assert_eq!("DONE".parse::<StepStatus>().unwrap(), StepStatus::Completed);
        assert!("cooking".parse::<StepStatus>().is_err());
    }

    #[test]
    fn test_session_outcome_round_trips_through_str() {
        for outcome in [
            SessionOutcome::Completed,
            SessionOutcome::Ended,
            SessionOutcome::Expired,
            SessionOutcome::Abandoned,
        ] {
            assert_eq!(outcome.as_str().parse::<SessionOutcome>().unwrap(), outcome);
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TimerState::Elapsed).unwrap();
        assert_eq!(json, "\"elapsed\"");
    }

    #[test]
    fn test_remaining_seconds_clamps_at_zero() {
        let view = running_view(600);
        assert_eq!(view.remaining_seconds(start()), Some(600));
        assert_eq!(
            view.remaining_seconds(start() + Duration::from_millis(1_500)),
            Some(598)
        );
        assert_eq!(
            view.remaining_seconds(start() + Duration::from_secs(900)),
            Some(0)
        );
    }

    #[test]
    fn test_remaining_seconds_only_while_running() {
        let mut view = running_view(600);
        view.timer = TimerState::Elapsed;
        assert_eq!(view.remaining_seconds(start()), None);
        assert!(view.awaiting_confirmation());
    }

    #[test]
    fn test_linear_recipe_chains_predecessors() {
        let recipe = RecipeDocument::linear(
            "curry",
            "Curry",
            vec![
                StepSpec::immediate("chop", "Chop.").after("ignored"),
                StepSpec::immediate("fry", "Fry."),
                StepSpec::timer("simmer", 1200, "Simmer."),
            ],
        );
        assert_eq!(recipe.steps[0].predecessor, None);
        assert_eq!(recipe.steps[2].predecessor.as_deref(), Some("fry"));
        assert_eq!(recipe.total_timer_seconds(), 1200);
    }

    #[test]
    fn test_total_timer_seconds_saturates() {
        let recipe = RecipeDocument::new(
            "cure",
            "Cure",
            vec![
                StepSpec::timer("salt", u64::MAX, "Salt."),
                StepSpec::timer("dry", 60, "Dry.").after("salt"),
            ],
        );
        assert_eq!(recipe.total_timer_seconds(), u64::MAX);
        assert!(recipe.to_string().contains("- Timers: "));
    }

    #[test]
    fn test_auto_start_ignored_on_immediate_steps() {
        let step = StepSpec::immediate("stir", "Stir.").with_auto_start();
        assert!(!step.starts_automatically());
        assert!(StepSpec::timer("rest", 60, "Rest.")
            .with_auto_start()
            .starts_automatically());
    }
}
