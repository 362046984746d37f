//! Boardroom Simulation Engine
//!
//! Deterministic core for multi-round business-leadership simulations: seeded
//! randomness, per-role decision validation, impact and event application,
//! stakeholder tracking, and weighted scorecards. The crate performs no I/O;
//! persistence is reached through the [`RunStorage`] trait.

pub mod advance;
pub mod constants;
pub mod decision;
pub mod domain;
pub mod error;
pub mod events;
pub mod impact;
pub mod numbers;
pub mod playbook;
pub mod relationships;
pub mod rng;
pub mod scenario;
pub mod scorecard;
pub mod seed;
pub mod state;

use anyhow::Context;

// Re-export commonly used types
pub use advance::{
    advance_round, advance_round_with, apply_role_decision, create_initial_game_state,
    create_initial_game_state_with,
};
pub use decision::{
    Decision, DecisionError, DecisionValue, Role, get_default_decision, validate_decision_for_role,
};
pub use domain::{Domain, DomainConfig, DomainConfigError, DomainConfigOverlay, RoundPhase};
pub use error::EngineError;
pub use events::{
    EventCategory, EventId, EventRecord, EventTemplate, GeneratedEvent, RiskTier, TriggerSource,
    generate_round_events,
};
pub use impact::{AppliedImpact, Impact, apply_impact};
pub use relationships::{ReactionLabel, ReactionTable, Reactions, process_stakeholder_reactions};
pub use rng::{RngStream, SeededRng, create_rng};
pub use scenario::{ScenarioCatalog, ScenarioLookup, StaticScenario};
pub use scorecard::{
    Grade, Rating, Scorecard, ScoringConfig, calculate_scorecard, calculate_scorecard_with,
};
pub use state::{CompanyState, GameState, MarketState, Phase, RiskState, StateField};

/// Trait for abstracting run persistence.
/// Platform-specific implementations should provide this
pub trait RunStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a run snapshot, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save_run(&self, run_id: &str, state: &GameState) -> Result<(), Self::Error>;

    /// Load a run snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    fn load_run(&self, run_id: &str) -> Result<Option<GameState>, Self::Error>;

    /// Delete a run snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be deleted.
    fn delete_run(&self, run_id: &str) -> Result<(), Self::Error>;
}

/// Facade that loads a run, applies one transition, and saves the result.
pub struct SimulationEngine<'c, S>
where
    S: RunStorage,
{
    catalog: &'c ScenarioCatalog,
    storage: S,
}

impl<S> SimulationEngine<'static, S>
where
    S: RunStorage,
{
    /// Engine over the bundled scenario catalog.
    pub fn new(storage: S) -> Self {
        Self::with_catalog(ScenarioCatalog::bundled(), storage)
    }
}

impl<'c, S> SimulationEngine<'c, S>
where
    S: RunStorage,
{
    pub const fn with_catalog(catalog: &'c ScenarioCatalog, storage: S) -> Self {
        Self { catalog, storage }
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn scenario(&self, scenario_id: &str) -> Result<&'c StaticScenario, EngineError> {
        self.catalog
            .get(scenario_id)
            .ok_or_else(|| EngineError::UnknownScenario(scenario_id.to_string()))
    }

    /// Create and persist a new run.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is unknown or the run cannot be saved.
    pub fn start_run(
        &self,
        run_id: &str,
        team_id: &str,
        scenario_id: Option<&str>,
        seed: Option<u64>,
    ) -> anyhow::Result<GameState> {
        let scenario = self.scenario(scenario_id.unwrap_or(constants::DEFAULT_SCENARIO_ID))?;
        let state = create_initial_game_state_with(scenario, run_id, team_id, seed)?;
        self.storage
            .save_run(run_id, &state)
            .with_context(|| format!("saving new run {run_id}"))?;
        Ok(state)
    }

    /// Load a persisted run.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn load_run(&self, run_id: &str) -> anyhow::Result<Option<GameState>> {
        self.storage
            .load_run(run_id)
            .with_context(|| format!("loading run {run_id}"))
    }

    /// Delete a persisted run.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn delete_run(&self, run_id: &str) -> anyhow::Result<()> {
        self.storage
            .delete_run(run_id)
            .with_context(|| format!("deleting run {run_id}"))
    }

    /// Stage a decision on a persisted run.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is missing, the decision is rejected, or
    /// the new snapshot cannot be saved. Nothing is saved on rejection.
    pub fn submit_decision(
        &self,
        run_id: &str,
        role: Role,
        decision: Decision,
    ) -> anyhow::Result<GameState> {
        let state = self.require_run(run_id)?;
        let next = apply_role_decision(&state, role, decision)?;
        self.storage
            .save_run(run_id, &next)
            .with_context(|| format!("saving run {run_id}"))?;
        Ok(next)
    }

    /// Resolve the open round of a persisted run.
    ///
    /// # Errors
    ///
    /// Returns an error if the run or its scenario is missing or the new
    /// snapshot cannot be saved.
    pub fn advance(&self, run_id: &str) -> anyhow::Result<GameState> {
        let state = self.require_run(run_id)?;
        let scenario = self.scenario(&state.scenario_id)?;
        let next = advance_round_with(&state, scenario);
        if next != state {
            self.storage
                .save_run(run_id, &next)
                .with_context(|| format!("saving run {run_id}"))?;
        }
        Ok(next)
    }

    fn require_run(&self, run_id: &str) -> anyhow::Result<GameState> {
        self.load_run(run_id)?
            .with_context(|| format!("run {run_id} not found"))
    }
}
