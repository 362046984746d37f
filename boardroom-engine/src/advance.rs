//! Run lifecycle: creation, decision submission, and round advancement.
//!
//! Every transition takes the current state by reference and returns a new
//! snapshot, so a failed call never leaves a half-applied state behind.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::constants::{DEFAULT_SCENARIO_ID, FINDINGS_RESOLVED_PER_AUDIT, MAX_EVENTS_PER_ROUND};
use crate::decision::{Decision, Role, validate_decision_for_role};
use crate::error::EngineError;
use crate::events::{GeneratedEvent, generate_round_events, resolve_findings, sync_open_findings};
use crate::impact::{
    AppliedImpact, accrue_profit, apply_impact, limit_market_drift, market_movement,
};
use crate::playbook::decision_playbook;
use crate::relationships::{Reactions, process_stakeholder_reactions, refresh_confidence};
use crate::rng::{RngStream, SeededRng, create_rng};
use crate::scenario::{ScenarioCatalog, ScenarioLookup, option_for_role};
use crate::scorecard::calculate_scorecard_with;
use crate::seed::seed_from_run_id;
use crate::state::{GameState, NarrativeEntry, Phase, Relationship, RoundDecisions, StateField};

/// Starting board confidence when a tracking domain's scenario omits one.
const DEFAULT_BOARD_CONFIDENCE: f64 = 50.0;

/// Create a run from the bundled catalog.
///
/// `scenario_id` defaults to the bundled flagship scenario; `seed` defaults to
/// a hash of `run_id`.
///
/// # Errors
///
/// Returns `EngineError::UnknownScenario` when the id is not bundled, or
/// `EngineError::Config` when the scenario's domain configuration is invalid.
pub fn create_initial_game_state(
    run_id: &str,
    team_id: &str,
    scenario_id: Option<&str>,
    seed: Option<u64>,
) -> Result<GameState, EngineError> {
    let id = scenario_id.unwrap_or(DEFAULT_SCENARIO_ID);
    let scenario = ScenarioCatalog::bundled()
        .get(id)
        .ok_or_else(|| EngineError::UnknownScenario(id.to_string()))?;
    create_initial_game_state_with(scenario, run_id, team_id, seed)
}

/// Create a run against an explicit scenario lookup.
///
/// # Errors
///
/// Returns `EngineError::Config` when the lookup's domain configuration is invalid.
pub fn create_initial_game_state_with(
    lookup: &dyn ScenarioLookup,
    run_id: &str,
    team_id: &str,
    seed: Option<u64>,
) -> Result<GameState, EngineError> {
    let config = lookup.domain_config();
    config.validate()?;
    let initial = lookup.initial_conditions();

    let mut company = initial.company.clone();
    company.open_findings = 0;
    company.board_confidence = if config.tracks_board_confidence {
        Some(
            company
                .board_confidence
                .unwrap_or(DEFAULT_BOARD_CONFIDENCE)
                .clamp(0.0, 100.0),
        )
    } else {
        None
    };

    let relationships = lookup
        .stakeholders()
        .iter()
        .map(|stakeholder| {
            let mut relation = Relationship {
                trust: stakeholder.trust,
                alignment: stakeholder.alignment,
                engagement: stakeholder.engagement,
                influence: stakeholder.influence.max(0.0),
                group: stakeholder.group.clone(),
            };
            relation.clamp();
            (stakeholder.id.clone(), relation)
        })
        .collect();

    let mut state = GameState {
        run_id: run_id.to_string(),
        team_id: team_id.to_string(),
        scenario_id: lookup.scenario_id().to_string(),
        seed: seed.unwrap_or_else(|| seed_from_run_id(run_id)),
        round: 1,
        max_rounds: lookup.max_rounds(),
        phase: Phase::DecisionsOpen,
        company,
        market: initial.market.clone(),
        risk: initial.risk.clone(),
        relationships,
        pending: RoundDecisions::new(),
        decisions: Vec::new(),
        events: Vec::new(),
        narrative: Vec::new(),
        scorecard: Default::default(),
    };
    for &field in StateField::ALL {
        state.set_field(field, state.field(field));
    }
    state.company.reconcile_profit();
    refresh_confidence(&mut state);
    state.scorecard = calculate_scorecard_with(
        &state.company,
        &state.market,
        &state.risk,
        0,
        &config.scoring,
    );
    log::debug!(
        "created run {} on {} with seed {}",
        state.run_id,
        state.scenario_id,
        state.seed
    );
    Ok(state)
}

/// Validate and stage one role's decision for the open round.
///
/// A later submission for the same role replaces the earlier one.
///
/// # Errors
///
/// Returns `EngineError::RunComplete` for a finished run and
/// `EngineError::Decision` when validation fails; the input state is untouched
/// either way.
pub fn apply_role_decision(
    state: &GameState,
    role: Role,
    decision: Decision,
) -> Result<GameState, EngineError> {
    if state.is_complete() {
        return Err(EngineError::RunComplete {
            run_id: state.run_id.clone(),
            role,
        });
    }
    validate_decision_for_role(role, &decision)?;
    let mut next = state.clone();
    next.pending.insert(role, decision);
    Ok(next)
}

/// Resolve the open round against the bundled catalog.
///
/// # Errors
///
/// Returns `EngineError::UnknownScenario` when the run's scenario is not bundled.
pub fn advance_round(state: &GameState) -> Result<GameState, EngineError> {
    let scenario = ScenarioCatalog::bundled()
        .get(&state.scenario_id)
        .ok_or_else(|| EngineError::UnknownScenario(state.scenario_id.clone()))?;
    Ok(advance_round_with(state, scenario))
}

/// Resolve the open round. A completed run is returned unchanged.
#[must_use]
pub fn advance_round_with(state: &GameState, lookup: &dyn ScenarioLookup) -> GameState {
    if state.is_complete() {
        return state.clone();
    }
    let config = lookup.domain_config();
    let round = state.round;
    let mut next = state.clone();
    next.phase = Phase::Resolving;
    let market_start = next.market.clone();

    let mut resolved = RoundDecisions::new();
    let mut choices: BTreeMap<Role, String> = BTreeMap::new();
    let mut audit_requested = false;
    for &role in Role::ALL {
        let decision = next.resolved_decision(role);
        let entry = decision_playbook(role, &decision);
        let mut impact = entry.impact;
        let mut reactions = entry.reactions;
        match option_for_role(lookup, round, role, &decision) {
            Some(option) => {
                impact.merge(&option.impact);
                reactions.extend_from(&Reactions::from(&option.reactions));
                choices.insert(role, option.label.clone());
            }
            None => {
                if let Some(id) = decision.option_id() {
                    log::warn!("round {round}: {role} option `{id}` is not offered; ignored");
                }
            }
        }
        let applied = apply_impact(&mut next, &impact);
        log_derived(round, &format!("{role} decision"), &applied);
        process_stakeholder_reactions(&mut next, &reactions, &config.reactions);
        audit_requested |=
            role == Role::Compliance && decision.text("audit_depth") == Some("thorough");
        resolved.insert(role, decision);
    }

    let accrual = accrue_profit(&next);
    let applied = apply_impact(&mut next, &accrual);
    log_derived(round, "profit accrual", &applied);
    let mut market_rng = SeededRng::for_stream(next.seed, round, RngStream::Market);
    let movement = market_movement(&mut market_rng, config.market_volatility);
    let applied = apply_impact(&mut next, &movement);
    log_derived(round, "market movement", &applied);
    let findings_closed = if audit_requested {
        resolve_findings(&mut next, FINDINGS_RESOLVED_PER_AUDIT)
    } else {
        0
    };

    let mut rng = create_rng(next.seed, round);
    let mut events = generate_round_events(&next, lookup, &mut rng);
    events.truncate(MAX_EVENTS_PER_ROUND);
    for event in &events {
        let applied = apply_impact(&mut next, &event.impact);
        log_derived(round, &format!("event {}", event.record.id), &applied);
        next.events.push(event.record.clone());
    }
    sync_open_findings(&mut next);
    limit_market_drift(&market_start, &mut next);

    next.scorecard = calculate_scorecard_with(
        &next.company,
        &next.market,
        &next.risk,
        round,
        &config.scoring,
    );
    let entry = narrate(&next, lookup, &choices, &events, findings_closed);
    next.narrative.push(entry);
    next.decisions.push(resolved);
    next.pending.clear();

    if round >= next.max_rounds {
        next.round = next.max_rounds;
        next.phase = Phase::Complete;
    } else {
        next.round = round + 1;
        next.phase = Phase::DecisionsOpen;
    }
    log::debug!(
        "run {} resolved round {round}: {} event(s), score {:.1} ({}), phase {}",
        next.run_id,
        events.len(),
        next.scorecard.total_score,
        next.scorecard.grade,
        next.phase
    );
    next
}

fn log_derived(round: u32, source: &str, applied: &AppliedImpact) {
    for (rule, effect) in &applied.derived {
        log::debug!("round {round}: {source} triggered {rule} ({effect:?})");
    }
}

fn narrate(
    state: &GameState,
    lookup: &dyn ScenarioLookup,
    choices: &BTreeMap<Role, String>,
    events: &[GeneratedEvent],
    findings_closed: usize,
) -> NarrativeEntry {
    let round = state.round;
    let headline = lookup
        .round_by_id(round)
        .map_or_else(|| format!("Round {round}"), |script| script.title.clone());

    let mut body = String::new();
    if choices.is_empty() {
        body.push_str("The leadership team held course.");
    } else {
        let picked: Vec<String> = choices
            .iter()
            .map(|(role, label)| format!("{role}: {label}"))
            .collect();
        let _ = write!(body, "Leadership chose {}.", picked.join("; "));
    }
    for event in events {
        let _ = write!(
            body,
            " {} ({} {}).",
            event.record.kind, event.record.severity, event.record.category
        );
    }
    if findings_closed > 0 {
        let _ = write!(body, " The audit closed {findings_closed} open finding(s).");
    }
    let card = &state.scorecard;
    let _ = write!(
        body,
        " Score {:.1}, {} {}.",
        card.total_score, card.grade, card.rating
    );

    NarrativeEntry {
        round,
        headline,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::get_default_decision;
    use crate::events::{EventCategory, EventId, EventRecord, RiskTier, TriggerSource};
    use crate::scenario::StaticScenario;

    fn scenario() -> &'static StaticScenario {
        ScenarioCatalog::bundled()
            .get(DEFAULT_SCENARIO_ID)
            .expect("bundled scenario")
    }

    fn fresh_state(seed: u64) -> GameState {
        create_initial_game_state("run-advance", "team", None, Some(seed)).expect("state")
    }

    #[test]
    fn creation_uses_scenario_and_seed() {
        let state = fresh_state(42);
        assert_eq!(state.scenario_id, DEFAULT_SCENARIO_ID);
        assert_eq!(state.seed, 42);
        assert_eq!(state.round, 1);
        assert_eq!(state.max_rounds, 8);
        assert_eq!(state.phase, Phase::DecisionsOpen);
        assert_eq!(state.relationships.len(), scenario().stakeholders().len());
        assert!(state.company.board_confidence.is_some());
        assert!(state.invariant_violations().is_empty());
    }

    #[test]
    fn missing_seed_is_derived_from_run_id() {
        let a = create_initial_game_state("alpha", "t", None, None).unwrap();
        let b = create_initial_game_state("alpha", "t", None, None).unwrap();
        assert_eq!(a.seed, b.seed);
        assert_eq!(a.seed, seed_from_run_id("alpha"));
    }

    #[test]
    fn unknown_scenario_is_an_error() {
        let err = create_initial_game_state("r", "t", Some("nope"), Some(1)).unwrap_err();
        assert_eq!(err, EngineError::UnknownScenario(String::from("nope")));
    }

    #[test]
    fn invalid_decision_leaves_state_untouched() {
        let state = fresh_state(1);
        let bad = get_default_decision(Role::Strategy).with("rnd_allocation", 50.0);
        let err = apply_role_decision(&state, Role::Strategy, bad).unwrap_err();
        assert!(matches!(err, EngineError::Decision(_)));
        assert!(state.pending.is_empty());
    }

    #[test]
    fn decisions_are_staged_and_replaced() {
        let state = fresh_state(1);
        let first = get_default_decision(Role::Marketing).with("channel", "digital");
        let second = get_default_decision(Role::Marketing).with("channel", "brand");
        let staged = apply_role_decision(&state, Role::Marketing, first).unwrap();
        let staged = apply_role_decision(&staged, Role::Marketing, second.clone()).unwrap();
        assert_eq!(staged.pending.len(), 1);
        assert_eq!(staged.pending[&Role::Marketing], second);
    }

    #[test]
    fn advance_records_history_and_moves_round() {
        let state = fresh_state(5);
        let next = advance_round(&state).unwrap();
        assert_eq!(next.round, 2);
        assert_eq!(next.phase, Phase::DecisionsOpen);
        assert_eq!(next.decisions.len(), 1);
        assert_eq!(next.decisions[0].len(), Role::ALL.len());
        assert!(next.pending.is_empty());
        assert_eq!(next.narrative.len(), 1);
        assert_eq!(next.narrative[0].headline, "Pilot Results");
        assert!(next.invariant_violations().is_empty());
    }

    #[test]
    fn submitted_decision_is_recorded_not_default() {
        let state = fresh_state(5);
        let growth = get_default_decision(Role::Strategy).with("focus", "growth");
        let staged = apply_role_decision(&state, Role::Strategy, growth.clone()).unwrap();
        let next = advance_round(&staged).unwrap();
        assert_eq!(next.decisions[0][&Role::Strategy], growth);
        assert_eq!(
            next.decisions[0][&Role::Compliance],
            get_default_decision(Role::Compliance)
        );
    }

    #[test]
    fn submission_order_does_not_matter() {
        let state = fresh_state(11);
        let strategy = get_default_decision(Role::Strategy).with("focus", "efficiency");
        let ops = get_default_decision(Role::Operations).with("hiring", "expand");

        let a = apply_role_decision(&state, Role::Strategy, strategy.clone()).unwrap();
        let a = apply_role_decision(&a, Role::Operations, ops.clone()).unwrap();
        let b = apply_role_decision(&state, Role::Operations, ops).unwrap();
        let b = apply_role_decision(&b, Role::Strategy, strategy).unwrap();

        assert_eq!(advance_round(&a).unwrap(), advance_round(&b).unwrap());
    }

    #[test]
    fn final_round_completes_without_overrunning() {
        let mut state = fresh_state(8);
        for _ in 0..8 {
            state = advance_round(&state).unwrap();
        }
        assert_eq!(state.phase, Phase::Complete);
        assert_eq!(state.round, 8);
        assert_eq!(state.decisions.len(), 8);
        let again = advance_round(&state).unwrap();
        assert_eq!(again, state);
        let err = apply_role_decision(&state, Role::Compliance, get_default_decision(Role::Compliance))
            .unwrap_err();
        assert!(matches!(err, EngineError::RunComplete { .. }));
    }

    #[test]
    fn events_are_capped_per_round() {
        for seed in 0..40 {
            let mut state = fresh_state(seed);
            state.risk.regulatory = 95.0;
            state.risk.reputational = 95.0;
            state.risk.financial = 95.0;
            state.risk.talent = 95.0;
            state.risk.operational = 95.0;
            let next = advance_round(&state).unwrap();
            assert!(next.events.len() <= MAX_EVENTS_PER_ROUND);
        }
    }

    #[test]
    fn unknown_option_is_ignored() {
        let state = fresh_state(3);
        let with_bogus = apply_role_decision(
            &state,
            Role::Strategy,
            get_default_decision(Role::Strategy).with("option", "does-not-exist"),
        )
        .unwrap();
        let plain = advance_round(&state).unwrap();
        let bogus = advance_round(&with_bogus).unwrap();
        assert_eq!(plain.company, bogus.company);
        assert_eq!(plain.relationships, bogus.relationships);
    }

    #[test]
    fn scenario_option_adds_its_impact() {
        let state = fresh_state(3);
        let staged = apply_role_decision(
            &state,
            Role::Compliance,
            get_default_decision(Role::Compliance).with("option", "r1-notify-customers"),
        )
        .unwrap();
        let next = advance_round(&staged).unwrap();
        assert!(next.relationships["customers"].trust > state.relationships["customers"].trust);
        assert!(next.narrative[0].body.contains("Notify affected customers"));
    }

    #[test]
    fn thorough_audit_resolves_oldest_findings() {
        let mut state = fresh_state(2);
        for seq in 1..=3 {
            state.events.push(EventRecord {
                id: EventId { round: 0, seq },
                round: 0,
                template_id: String::from("regulator-inquiry"),
                kind: String::from("Regulator Inquiry"),
                category: EventCategory::Regulatory,
                severity: RiskTier::Medium,
                description: String::new(),
                resolved: false,
                finding: true,
                trigger: TriggerSource::Decision {
                    role: Role::Compliance,
                },
            });
        }
        sync_open_findings(&mut state);
        let staged = apply_role_decision(
            &state,
            Role::Compliance,
            get_default_decision(Role::Compliance).with("audit_depth", "thorough"),
        )
        .unwrap();
        let next = advance_round(&staged).unwrap();
        assert!(next.events[0].resolved);
        assert!(next.events[1].resolved);
        assert!(!next.events[2].resolved);
        assert!(next.company.open_findings >= 1);
    }

    #[test]
    fn market_drift_stays_within_limit() {
        let state = fresh_state(17);
        let heavy = get_default_decision(Role::Marketing)
            .with("channel", "digital")
            .with("campaign_spend", 2_000_000.0)
            .with("pricing", "discount");
        let staged = apply_role_decision(&state, Role::Marketing, heavy).unwrap();
        let next = advance_round(&staged).unwrap();
        let drift = next.market.demand_index - state.market.demand_index;
        assert!(drift.abs() <= crate::constants::MARKET_DRIFT_LIMIT + 1e-9);
    }
}
