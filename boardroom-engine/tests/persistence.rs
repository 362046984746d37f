use boardroom_engine::{
    GameState, Role, advance_round, apply_role_decision, create_initial_game_state,
    get_default_decision,
};

fn mid_run_state() -> GameState {
    let mut state = create_initial_game_state("persist", "team", None, Some(2_024)).unwrap();
    for _ in 0..4 {
        state.risk.regulatory = state.risk.regulatory.max(80.0);
        state = advance_round(&state).unwrap();
    }
    apply_role_decision(
        &state,
        Role::Operations,
        get_default_decision(Role::Operations).with("automation_investment", 35.5),
    )
    .unwrap()
}

#[test]
fn json_round_trip_preserves_fingerprint() {
    let state = mid_run_state();
    let json = serde_json::to_string(&state).unwrap();
    let restored: GameState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, state);
    assert_eq!(restored.fingerprint().unwrap(), state.fingerprint().unwrap());
}

#[test]
fn restored_state_continues_identically() {
    let state = mid_run_state();
    let restored: GameState = serde_json::from_str(&serde_json::to_string(&state).unwrap()).unwrap();
    assert_eq!(advance_round(&state).unwrap(), advance_round(&restored).unwrap());
}

#[test]
fn persisted_shape_uses_snake_case_names() {
    let state = mid_run_state();
    let value = serde_json::to_value(&state).unwrap();
    assert_eq!(value["phase"], "decisions_open");
    assert!(value["company"]["compliance_posture"].is_number());
    assert!(value["pending"]["operations"]["automation_investment"].is_number());
    assert!(value["decisions"].as_array().is_some_and(|rounds| rounds.len() == 4));
    assert!(value["scorecard"]["grade"].is_string());
}
