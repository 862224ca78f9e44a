use studio_core::{update, AppState, JobOutput, Msg, Panel};

fn init_logging() {
    studio_logging::initialize_for_tests();
}

#[test]
fn stale_job_messages_are_ignored() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::NewPrdLoaded("prd".to_string()));
    let (mut state, _) = update(
        state,
        Msg::GenerateSubmitted {
            config: Default::default(),
            now_ms: 0,
        },
    );
    state.consume_dirty();
    let before = state.clone();

    let (state, effects) = update(
        state,
        Msg::JobProgress {
            ticket: 99,
            progress: None,
            eta_seconds: Some(5),
        },
    );
    assert_eq!(state, before);
    assert!(effects.is_empty());

    let (state, effects) = update(
        state,
        Msg::JobDone {
            ticket: 99,
            result: Ok(JobOutput::new("late")),
            now_ms: 1,
        },
    );
    assert_eq!(state, before);
    assert!(effects.is_empty());
    assert!(state.is_busy(Panel::Generate));
}

#[test]
fn clearing_an_empty_selection_is_not_a_change() {
    let state = AppState::new();

    let (next, effects) = update(
        state.clone(),
        Msg::SelectionCleared(studio_core::SelectionTarget::OldPrd),
    );

    assert_eq!(next, state);
    assert!(effects.is_empty());
}
