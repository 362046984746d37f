//! Scenario content: the lookup seam and the bundled data-driven catalog.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use thiserror::Error;

use crate::decision::{Decision, Role};
use crate::domain::{Domain, DomainConfig, DomainConfigError, DomainConfigOverlay};
use crate::events::{EventCategory, EventTemplate, RiskTier};
use crate::impact::Impact;
use crate::relationships::ReactionLabel;
use crate::state::{CompanyState, MarketState, RiskState};

const BUNDLED_SCENARIOS: &[(&str, &str)] = &[(
    "lumina_assist.json",
    include_str!("../data/scenarios/lumina_assist.json"),
)];

/// Read-only access to one scenario's content tables.
pub trait ScenarioLookup {
    fn scenario_id(&self) -> &str;
    fn domain_config(&self) -> &DomainConfig;
    fn round_by_id(&self, round: u32) -> Option<&RoundScript>;
    fn option_by_id(&self, round: u32, option_id: &str) -> Option<&ScenarioOption>;
    fn stakeholders(&self) -> &[Stakeholder];
    fn event_templates(&self) -> &[EventTemplate];
    fn initial_conditions(&self) -> &InitialConditions;

    fn max_rounds(&self) -> u32 {
        self.domain_config().max_rounds
    }
}

/// Scenario option a decision refers to, provided it belongs to `role`.
#[must_use]
pub fn option_for_role<'a>(
    lookup: &'a dyn ScenarioLookup,
    round: u32,
    role: Role,
    decision: &Decision,
) -> Option<&'a ScenarioOption> {
    decision
        .option_id()
        .and_then(|id| lookup.option_by_id(round, id))
        .filter(|option| option.role == role)
}

/// Named stakeholder and its starting relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default = "Stakeholder::default_influence")]
    pub influence: f64,
    #[serde(default = "Stakeholder::default_gauge")]
    pub trust: f64,
    #[serde(default = "Stakeholder::default_gauge")]
    pub alignment: f64,
    #[serde(default = "Stakeholder::default_gauge")]
    pub engagement: f64,
}

impl Stakeholder {
    const fn default_influence() -> f64 {
        1.0
    }

    const fn default_gauge() -> f64 {
        0.5
    }
}

/// Scenario-authored choice for one role in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOption {
    pub id: String,
    pub role: Role,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub risk_tier: RiskTier,
    #[serde(default)]
    pub event_category: Option<EventCategory>,
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub reactions: BTreeMap<String, ReactionLabel>,
}

/// Briefing and options for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundScript {
    pub round: u32,
    pub title: String,
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub options: Vec<ScenarioOption>,
}

/// Starting ledger for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InitialConditions {
    #[serde(default)]
    pub company: CompanyState,
    #[serde(default)]
    pub market: MarketState,
    #[serde(default)]
    pub risk: RiskState,
}

/// Errors raised while loading scenario data.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] DomainConfigError),
    #[error("round {round} outside 1..={max}")]
    RoundOutOfRange { round: u32, max: u32 },
    #[error("round {round} lists option `{id}` more than once")]
    DuplicateOption { round: u32, id: String },
}

/// Scenario backed by static JSON data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticScenario {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub domain: Domain,
    #[serde(default)]
    pub overlay: DomainConfigOverlay,
    #[serde(default)]
    pub initial: InitialConditions,
    #[serde(default)]
    pub stakeholders: Vec<Stakeholder>,
    #[serde(default)]
    pub rounds: Vec<RoundScript>,
    #[serde(default)]
    pub events: Vec<EventTemplate>,
    #[serde(skip)]
    config: DomainConfig,
}

impl StaticScenario {
    /// Parse and validate a scenario.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON, an invalid resolved domain
    /// configuration, rounds beyond `max_rounds`, or duplicate option ids.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.resolve()
    }

    /// Resolve the domain preset plus overlay and check the round tables.
    ///
    /// # Errors
    ///
    /// See [`StaticScenario::from_json`].
    pub fn resolve(mut self) -> Result<Self, ScenarioError> {
        let config = DomainConfig::preset(self.domain).with_overlay(&self.overlay);
        config.validate()?;
        for script in &self.rounds {
            if script.round == 0 || script.round > config.max_rounds {
                return Err(ScenarioError::RoundOutOfRange {
                    round: script.round,
                    max: config.max_rounds,
                });
            }
            let mut seen = BTreeSet::new();
            for option in &script.options {
                if !seen.insert(option.id.as_str()) {
                    return Err(ScenarioError::DuplicateOption {
                        round: script.round,
                        id: option.id.clone(),
                    });
                }
            }
        }
        self.config = config;
        Ok(self)
    }
}

impl ScenarioLookup for StaticScenario {
    fn scenario_id(&self) -> &str {
        &self.id
    }

    fn domain_config(&self) -> &DomainConfig {
        &self.config
    }

    fn round_by_id(&self, round: u32) -> Option<&RoundScript> {
        self.rounds.iter().find(|script| script.round == round)
    }

    fn option_by_id(&self, round: u32, option_id: &str) -> Option<&ScenarioOption> {
        self.round_by_id(round)?
            .options
            .iter()
            .find(|option| option.id == option_id)
    }

    fn stakeholders(&self) -> &[Stakeholder] {
        &self.stakeholders
    }

    fn event_templates(&self) -> &[EventTemplate] {
        &self.events
    }

    fn initial_conditions(&self) -> &InitialConditions {
        &self.initial
    }
}

/// Immutable set of scenarios keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: BTreeMap<String, StaticScenario>,
}

impl ScenarioCatalog {
    /// Catalog of the scenarios compiled into the crate, parsed on first use.
    ///
    /// # Panics
    ///
    /// Panics if a bundled scenario file fails to parse or validate.
    #[must_use]
    pub fn bundled() -> &'static Self {
        static CATALOG: OnceLock<ScenarioCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| Self::load_catalog(BUNDLED_SCENARIOS))
    }

    fn load_catalog(assets: &[(&str, &str)]) -> Self {
        Self::from_scenarios(assets.iter().map(|(name, json)| {
            StaticScenario::from_json(json)
                .unwrap_or_else(|err| panic!("bundled scenario {name} is invalid: {err}"))
        }))
    }

    pub fn from_scenarios(scenarios: impl IntoIterator<Item = StaticScenario>) -> Self {
        Self {
            scenarios: scenarios
                .into_iter()
                .map(|scenario| (scenario.id.clone(), scenario))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StaticScenario> {
        self.scenarios.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StaticScenario> {
        self.scenarios.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
