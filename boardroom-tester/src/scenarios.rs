use anyhow::{Result, ensure};
use boardroom_engine::{
    EngineError, EventCategory, GameState, Phase, Role, ScenarioCatalog, ScenarioLookup,
    advance_round_with, apply_role_decision, create_initial_game_state_with, create_rng,
    generate_round_events, get_default_decision,
};

use crate::logic::{CampaignRunner, CampaignSummary, LeadershipStrategy, SimulationPlan};

/// Named QA scenario: a campaign plan plus its expectations.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

const CATALOG: &[(&str, &str)] = &[
    ("smoke", "Passive team plays a full campaign with no violations"),
    ("default-campaign", "Unsubmitted roles fall back to defaults every round"),
    ("scripted-campaign", "Scenario options are accepted and recorded each round"),
    ("deterministic-replay", "Same seed and decisions replay to identical fingerprints"),
    ("bounds-sweep", "Aggressive play from a stressed start stays within bounds"),
    ("event-correlation", "Weak compliance raises more regulatory events"),
    ("terminal-idempotence", "A finished run ignores advances and rejects decisions"),
];

const CORRELATION_SAMPLES: u64 = 100;

/// Every scenario name with its description.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    CATALOG.to_vec()
}

/// Scenario names expanded by `all`.
#[must_use]
pub fn all_scenario_names() -> Vec<String> {
    CATALOG.iter().map(|(name, _)| (*name).to_string()).collect()
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let plan = match name {
        "smoke" => SimulationPlan::new(LeadershipStrategy::Passive)
            .with_expectation(completes_cleanly),
        "default-campaign" => SimulationPlan::new(LeadershipStrategy::Passive)
            .with_expectation(completes_cleanly)
            .with_expectation(records_defaults),
        "scripted-campaign" => SimulationPlan::new(LeadershipStrategy::Scripted)
            .with_expectation(completes_cleanly)
            .with_expectation(records_options),
        "deterministic-replay" => SimulationPlan::new(LeadershipStrategy::Random)
            .with_expectation(completes_cleanly)
            .with_expectation(replays_identically),
        "bounds-sweep" => SimulationPlan::new(LeadershipStrategy::Growth)
            .with_setup(stressed_start)
            .with_expectation(completes_cleanly)
            .with_expectation(replays_identically),
        "event-correlation" => SimulationPlan::new(LeadershipStrategy::Passive)
            .with_expectation(regulatory_events_track_compliance),
        "terminal-idempotence" => SimulationPlan::new(LeadershipStrategy::Cautious)
            .with_expectation(completes_cleanly)
            .with_expectation(terminal_is_idempotent),
        _ => return None,
    };
    Some(TestScenario::simulation(name, plan))
}

fn stressed_start(state: &mut GameState) {
    state.company.compliance_posture = 25.0;
    state.company.morale = 35.0;
    state.risk.regulatory = 85.0;
    state.risk.operational = 75.0;
}

fn completes_cleanly(summary: &CampaignSummary) -> Result<()> {
    let state = &summary.final_state;
    ensure!(state.phase == Phase::Complete, "run not complete");
    ensure!(
        state.round == state.max_rounds,
        "final round {} != max {}",
        state.round,
        state.max_rounds
    );
    ensure!(
        summary.rounds.len() == state.max_rounds as usize,
        "resolved {} rounds, expected {}",
        summary.rounds.len(),
        state.max_rounds
    );
    ensure!(
        state.decisions.len() == summary.rounds.len(),
        "decision history has {} rounds",
        state.decisions.len()
    );
    let violations = summary.violations();
    ensure!(violations.is_empty(), "invariants broken: {}", violations.join("; "));
    ensure!(
        summary.rejected_decisions.is_empty(),
        "policy decisions rejected: {}",
        summary.rejected_decisions.join("; ")
    );
    ensure!(
        (0.0..=100.0).contains(&state.scorecard.total_score),
        "total score {} out of range",
        state.scorecard.total_score
    );
    Ok(())
}

fn records_defaults(summary: &CampaignSummary) -> Result<()> {
    for (index, round) in summary.final_state.decisions.iter().enumerate() {
        for &role in Role::ALL {
            ensure!(
                round.get(&role) == Some(&get_default_decision(role)),
                "round {} {role:?} did not record the default decision",
                index + 1
            );
        }
    }
    ensure!(
        summary.final_state.narrative.len() == summary.rounds.len(),
        "expected one narrative entry per round"
    );
    Ok(())
}

fn records_options(summary: &CampaignSummary) -> Result<()> {
    let scenario = CampaignRunner::new(false)
        .catalog()
        .get(&summary.scenario_id)
        .ok_or_else(|| anyhow::anyhow!("scenario {} missing", summary.scenario_id))?;
    for (index, round) in summary.final_state.decisions.iter().enumerate() {
        let round_number = u32::try_from(index + 1)?;
        for (role, decision) in round {
            let Some(option_id) = decision.option_id() else {
                continue;
            };
            let option = scenario.option_by_id(round_number, option_id);
            ensure!(
                option.is_some_and(|option| option.role == *role),
                "round {round_number} recorded foreign option {option_id}"
            );
        }
    }
    ensure!(summary.submitted_decisions > 0, "no decisions were submitted");
    Ok(())
}

fn replays_identically(summary: &CampaignSummary) -> Result<()> {
    let mut plan =
        SimulationPlan::new(summary.strategy).with_scenario(summary.scenario_id.clone());
    if let Some(setup) = summary.setup {
        plan = plan.with_setup(setup);
    }
    let replay = CampaignRunner::new(false).run_plan(&plan, summary.seed)?;
    ensure!(
        replay.initial_state == summary.initial_state,
        "replay started from a different state for seed {}",
        summary.seed
    );
    ensure!(
        replay.fingerprints() == summary.fingerprints(),
        "replay diverged for seed {}",
        summary.seed
    );

    let json = serde_json::to_string(&summary.final_state)?;
    let restored: GameState = serde_json::from_str(&json)?;
    ensure!(restored == summary.final_state, "JSON round trip changed state");
    ensure!(
        restored.fingerprint()? == summary.final_state.fingerprint()?,
        "JSON round trip changed fingerprint"
    );
    Ok(())
}

fn regulatory_events_track_compliance(summary: &CampaignSummary) -> Result<()> {
    let catalog = ScenarioCatalog::bundled();
    let scenario = catalog
        .get(&summary.scenario_id)
        .ok_or_else(|| anyhow::anyhow!("scenario {} missing", summary.scenario_id))?;

    let count = |compliance: f64, regulatory: f64| -> Result<usize> {
        let mut hits = 0;
        for offset in 0..CORRELATION_SAMPLES {
            let seed = summary.seed.wrapping_add(offset);
            let mut state = create_initial_game_state_with(scenario, "corr", "qa", Some(seed))?;
            state.company.compliance_posture = compliance;
            state.risk.regulatory = regulatory;
            hits += generate_round_events(&state, scenario, &mut create_rng(seed, state.round))
                .iter()
                .filter(|event| event.record.category == EventCategory::Regulatory)
                .count();
        }
        Ok(hits)
    };

    let stressed = count(30.0, 80.0)?;
    let healthy = count(75.0, 20.0)?;
    log::info!("regulatory events: stressed {stressed}, healthy {healthy}");
    ensure!(
        stressed > healthy,
        "stressed compliance produced {stressed} regulatory events vs {healthy} when healthy"
    );
    Ok(())
}

fn terminal_is_idempotent(summary: &CampaignSummary) -> Result<()> {
    let catalog = ScenarioCatalog::bundled();
    let scenario = catalog
        .get(&summary.scenario_id)
        .ok_or_else(|| anyhow::anyhow!("scenario {} missing", summary.scenario_id))?;
    let done = &summary.final_state;
    let again = advance_round_with(done, scenario);
    ensure!(&again == done, "advancing a completed run changed it");
    for &role in Role::ALL {
        let result = apply_role_decision(done, role, get_default_decision(role));
        ensure!(
            matches!(result, Err(EngineError::RunComplete { .. })),
            "{role:?} decision accepted after completion"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for name in all_scenario_names() {
            assert!(get_scenario(&name).is_some(), "{name}");
        }
        assert!(get_scenario("unknown").is_none());
    }

    #[test]
    fn each_scenario_passes_for_one_seed() {
        let runner = CampaignRunner::new(false);
        for name in all_scenario_names() {
            let scenario = get_scenario(&name).unwrap();
            let summary = runner.run_plan(&scenario.plan, 2024).unwrap();
            for expectation in &scenario.plan.expectations {
                expectation.evaluate(&summary).unwrap_or_else(|err| panic!("{name}: {err:#}"));
            }
        }
    }

    #[test]
    fn replay_reapplies_setup_before_comparing() {
        let plan = SimulationPlan::new(LeadershipStrategy::Growth).with_setup(stressed_start);
        let summary = CampaignRunner::new(false).run_plan(&plan, 77).unwrap();
        assert!((summary.initial_state.risk.regulatory - 85.0).abs() < f64::EPSILON);
        replays_identically(&summary).unwrap();

        let mut unset = summary.clone();
        unset.setup = None;
        assert!(replays_identically(&unset).is_err());
    }
}
