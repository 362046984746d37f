use anyhow::{Context, Result};
use boardroom_engine::{
    GameState, Phase, Role, ScenarioCatalog, ScenarioLookup, StaticScenario, advance_round_with,
    apply_role_decision, create_initial_game_state_with,
};
use std::sync::Arc;

use crate::logic::LeadershipStrategy;

/// Scenario every plan uses unless told otherwise.
pub const DEFAULT_SCENARIO: &str = boardroom_engine::constants::DEFAULT_SCENARIO_ID;

/// One automated campaign: scenario, team behaviour, optional state tweak, and
/// the checks to run on the outcome.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub scenario_id: String,
    pub strategy: LeadershipStrategy,
    pub setup: Option<fn(&mut GameState)>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: LeadershipStrategy) -> Self {
        Self {
            scenario_id: DEFAULT_SCENARIO.to_string(),
            strategy,
            setup: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_scenario(mut self, scenario_id: impl Into<String>) -> Self {
        self.scenario_id = scenario_id.into();
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut GameState)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

type SimulationExpectationFn = Arc<dyn Fn(&CampaignSummary) -> Result<()> + Send + Sync + 'static>;

/// Assertion hook run after a campaign completes.
#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &CampaignSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&CampaignSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Snapshot taken after each resolved round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrace {
    pub round: u32,
    pub fingerprint: u64,
    pub total_score: f64,
    pub events: usize,
    pub violations: Vec<String>,
}

/// Complete record of an automated campaign.
#[derive(Debug, Clone)]
pub struct CampaignSummary {
    pub seed: u64,
    pub scenario_id: String,
    pub strategy: LeadershipStrategy,
    pub setup: Option<fn(&mut GameState)>,
    pub initial_state: GameState,
    pub final_state: GameState,
    pub rounds: Vec<RoundTrace>,
    pub submitted_decisions: usize,
    pub rejected_decisions: Vec<String>,
}

impl CampaignSummary {
    /// Every invariant violation seen at any checkpoint, prefixed by round.
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        let initial = self
            .initial_state
            .invariant_violations()
            .into_iter()
            .map(|v| format!("start: {v}"));
        let rounds = self.rounds.iter().flat_map(|trace| {
            trace
                .violations
                .iter()
                .map(move |v| format!("round {}: {v}", trace.round))
        });
        initial.chain(rounds).collect()
    }

    #[must_use]
    pub fn fingerprints(&self) -> Vec<u64> {
        self.rounds.iter().map(|trace| trace.fingerprint).collect()
    }
}

/// Headless runner that plays whole campaigns against the engine.
#[derive(Clone)]
pub struct CampaignRunner {
    catalog: &'static ScenarioCatalog,
    verbose: bool,
}

impl CampaignRunner {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self {
            catalog: ScenarioCatalog::bundled(),
            verbose,
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &'static ScenarioCatalog {
        self.catalog
    }

    fn scenario(&self, scenario_id: &str) -> Result<&'static StaticScenario> {
        self.catalog
            .get(scenario_id)
            .with_context(|| format!("unknown scenario `{scenario_id}`"))
    }

    /// Play `plan` to completion with `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is unknown, the run cannot be created,
    /// or the campaign fails to finish within its round budget.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<CampaignSummary> {
        let scenario = self.scenario(&plan.scenario_id)?;
        let run_id = format!("qa-{seed}");
        let mut state = create_initial_game_state_with(scenario, &run_id, "qa-team", Some(seed))
            .with_context(|| format!("creating run {run_id}"))?;
        if let Some(setup) = plan.setup {
            setup(&mut state);
        }
        let initial_state = state.clone();

        let mut policy = plan.strategy.create_policy(seed);
        let mut rounds = Vec::new();
        let mut submitted_decisions = 0;
        let mut rejected_decisions = Vec::new();
        let budget = scenario.max_rounds() + 1;

        for _ in 0..budget {
            if state.phase == Phase::Complete {
                break;
            }
            if plan.strategy.submits() {
                for &role in Role::ALL {
                    let decision = policy.decide(&state, scenario.round_by_id(state.round), role);
                    match apply_role_decision(&state, role, decision) {
                        Ok(next) => {
                            state = next;
                            submitted_decisions += 1;
                        }
                        Err(err) => {
                            log::warn!("{} rejected in round {}: {err}", policy.name(), state.round);
                            rejected_decisions.push(format!("round {}: {err}", state.round));
                        }
                    }
                }
            }

            let resolved_round = state.round;
            let events_before = state.events.len();
            state = advance_round_with(&state, scenario);
            let trace = RoundTrace {
                round: resolved_round,
                fingerprint: state.fingerprint().context("fingerprinting state")?,
                total_score: state.scorecard.total_score,
                events: state.events.len() - events_before,
                violations: state.invariant_violations(),
            };
            if self.verbose {
                println!(
                    "     round {} score {:.1} events {} fingerprint {:016x}",
                    trace.round, trace.total_score, trace.events, trace.fingerprint
                );
            }
            rounds.push(trace);
        }

        anyhow::ensure!(
            state.phase == Phase::Complete,
            "campaign did not finish within {budget} rounds (stuck at round {})",
            state.round
        );

        Ok(CampaignSummary {
            seed,
            scenario_id: plan.scenario_id.clone(),
            strategy: plan.strategy,
            setup: plan.setup,
            initial_state,
            final_state: state,
            rounds,
            submitted_decisions,
            rejected_decisions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passive_campaign_runs_every_round() {
        let runner = CampaignRunner::new(false);
        let summary = runner
            .run_plan(&SimulationPlan::new(LeadershipStrategy::Passive), 12_345)
            .unwrap();
        assert_eq!(summary.rounds.len(), 8);
        assert_eq!(summary.submitted_decisions, 0);
        assert!(summary.violations().is_empty(), "{:?}", summary.violations());
        assert_eq!(summary.final_state.phase, Phase::Complete);
    }

    #[test]
    fn setup_hook_shapes_initial_state() {
        fn stress(state: &mut GameState) {
            state.risk.regulatory = 90.0;
        }
        let runner = CampaignRunner::new(false);
        let plan = SimulationPlan::new(LeadershipStrategy::Scripted).with_setup(stress);
        let summary = runner.run_plan(&plan, 1).unwrap();
        assert!((summary.initial_state.risk.regulatory - 90.0).abs() < f64::EPSILON);
        assert!(summary.setup.is_some());
        assert_eq!(summary.submitted_decisions, 32);
    }

    #[test]
    fn unknown_scenario_is_an_error() {
        let runner = CampaignRunner::new(false);
        let plan = SimulationPlan::new(LeadershipStrategy::Passive).with_scenario("nope");
        assert!(runner.run_plan(&plan, 1).is_err());
    }
}
