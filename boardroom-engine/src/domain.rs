//! Per-domain tuning: scoring weights, round phases, and event modifiers.
//!
//! A single engine serves every domain. Each domain contributes a preset
//! [`DomainConfig`]; scenarios may layer a [`DomainConfigOverlay`] on top.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{DEFAULT_MAX_ROUNDS, MAX_ROUNDS_CEILING};
use crate::events::EventCategory;
use crate::relationships::ReactionTable;
use crate::scorecard::{ScoreWeights, ScoringConfig};

/// Business domain a scenario belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Finance,
    #[default]
    Governance,
    MarketStrategy,
    Risk,
    Leadership,
    Talent,
}

impl Domain {
    pub const ALL: &'static [Self] = &[
        Self::Finance,
        Self::Governance,
        Self::MarketStrategy,
        Self::Risk,
        Self::Leadership,
        Self::Talent,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Finance => "finance",
            Self::Governance => "governance",
            Self::MarketStrategy => "market_strategy",
            Self::Risk => "risk",
            Self::Leadership => "leadership",
            Self::Talent => "talent",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = DomainConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|domain| domain.as_str() == wanted)
            .ok_or_else(|| DomainConfigError::UnknownDomain(s.to_string()))
    }
}

/// Coarse stage of a run, used to pick which event templates are live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Early,
    Mid,
    Late,
}

impl RoundPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Mid => "mid",
            Self::Late => "late",
        }
    }
}

/// Last round of the early and mid phases; later rounds are late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBoundaries {
    pub early_end: u32,
    pub mid_end: u32,
}

impl PhaseBoundaries {
    #[must_use]
    pub const fn phase_for(&self, round: u32) -> RoundPhase {
        if round <= self.early_end {
            RoundPhase::Early
        } else if round <= self.mid_end {
            RoundPhase::Mid
        } else {
            RoundPhase::Late
        }
    }
}

impl Default for PhaseBoundaries {
    fn default() -> Self {
        Self {
            early_end: 3,
            mid_end: 6,
        }
    }
}

/// Errors raised when a domain configuration violates its bounds.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainConfigError {
    #[error("unknown domain `{0}`")]
    UnknownDomain(String),
    #[error("score weights must sum to 1.0 (got {sum:.4})")]
    WeightSum { sum: f64 },
    #[error("{field} must be non-negative (got {value})")]
    NegativeValue { field: &'static str, value: f64 },
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("phase boundaries out of order: early_end {early_end}, mid_end {mid_end}")]
    PhaseOrder { early_end: u32, mid_end: u32 },
    #[error("max_rounds {value} outside 1..={max}")]
    MaxRounds { value: u32, max: u32 },
    #[error("failed to parse domain configuration: {0}")]
    Parse(String),
}

/// Resolved tuning for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub domain: Domain,
    #[serde(default = "DomainConfig::default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub phases: PhaseBoundaries,
    #[serde(default = "DomainConfig::default_modifier")]
    pub market_volatility: f64,
    #[serde(default = "DomainConfig::default_modifier")]
    pub regulatory_intensity: f64,
    #[serde(default)]
    pub tracks_board_confidence: bool,
    #[serde(default)]
    pub reactions: ReactionTable,
}

impl DomainConfig {
    const fn default_max_rounds() -> u32 {
        DEFAULT_MAX_ROUNDS
    }

    const fn default_modifier() -> f64 {
        1.0
    }

    /// Built-in tuning for a domain.
    #[must_use]
    pub fn preset(domain: Domain) -> Self {
        let base = Self {
            domain,
            max_rounds: Self::default_max_rounds(),
            scoring: ScoringConfig::default(),
            phases: PhaseBoundaries::default(),
            market_volatility: Self::default_modifier(),
            regulatory_intensity: Self::default_modifier(),
            tracks_board_confidence: false,
            reactions: ReactionTable::default(),
        };
        let weights = |financial_health, growth, trust, resilience, execution| ScoringConfig {
            weights: ScoreWeights::new(financial_health, growth, trust, resilience, execution),
            ..ScoringConfig::default()
        };
        match domain {
            Domain::Finance => Self {
                scoring: weights(0.35, 0.2, 0.15, 0.15, 0.15),
                market_volatility: 1.2,
                ..base
            },
            Domain::Governance => Self {
                scoring: weights(0.2, 0.1, 0.3, 0.25, 0.15),
                regulatory_intensity: 1.3,
                tracks_board_confidence: true,
                ..base
            },
            Domain::MarketStrategy => Self {
                scoring: weights(0.2, 0.35, 0.15, 0.1, 0.2),
                market_volatility: 1.4,
                regulatory_intensity: 0.8,
                ..base
            },
            Domain::Risk => Self {
                scoring: ScoringConfig {
                    finding_penalty: 3.5,
                    ..weights(0.2, 0.1, 0.15, 0.4, 0.15)
                },
                market_volatility: 1.1,
                regulatory_intensity: 1.2,
                ..base
            },
            Domain::Leadership => Self {
                scoring: weights(0.15, 0.15, 0.3, 0.1, 0.3),
                ..base
            },
            Domain::Talent => Self {
                scoring: weights(0.15, 0.15, 0.2, 0.15, 0.35),
                regulatory_intensity: 0.9,
                ..base
            },
        }
    }

    /// Event probability modifier for a category.
    #[must_use]
    pub const fn category_modifier(&self, category: EventCategory) -> f64 {
        match category {
            EventCategory::Market => self.market_volatility,
            EventCategory::Regulatory => self.regulatory_intensity,
            EventCategory::Operational
            | EventCategory::Reputational
            | EventCategory::Financial
            | EventCategory::Talent => 1.0,
        }
    }

    /// Merge an overlay on top of this configuration.
    #[must_use]
    pub fn with_overlay(&self, overlay: &DomainConfigOverlay) -> Self {
        let mut merged = self.clone();
        if let Some(max_rounds) = overlay.max_rounds {
            merged.max_rounds = max_rounds;
        }
        if let Some(weights) = overlay.weights {
            merged.scoring.weights = weights;
        }
        if let Some(penalty) = overlay.finding_penalty {
            merged.scoring.finding_penalty = penalty;
        }
        if let Some(ceiling) = overlay.score_ceiling {
            merged.scoring.score_ceiling = ceiling;
        }
        if let Some(phases) = overlay.phases {
            merged.phases = phases;
        }
        if let Some(volatility) = overlay.market_volatility {
            merged.market_volatility = volatility;
        }
        if let Some(intensity) = overlay.regulatory_intensity {
            merged.regulatory_intensity = intensity;
        }
        if let Some(tracks) = overlay.tracks_board_confidence {
            merged.tracks_board_confidence = tracks;
        }
        if let Some(reactions) = overlay.reactions.as_ref() {
            merged.reactions = reactions.clone();
        }
        merged
    }

    /// Parse a full configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns `DomainConfigError::Parse` for malformed JSON, or the first
    /// bound the parsed configuration violates.
    pub fn from_json(json: &str) -> Result<Self, DomainConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| DomainConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `DomainConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), DomainConfigError> {
        if self.max_rounds == 0 || self.max_rounds > MAX_ROUNDS_CEILING {
            return Err(DomainConfigError::MaxRounds {
                value: self.max_rounds,
                max: MAX_ROUNDS_CEILING,
            });
        }
        self.scoring.validate()?;
        if self.phases.early_end == 0 || self.phases.early_end > self.phases.mid_end {
            return Err(DomainConfigError::PhaseOrder {
                early_end: self.phases.early_end,
                mid_end: self.phases.mid_end,
            });
        }
        for (field, value) in [
            ("market_volatility", self.market_volatility),
            ("regulatory_intensity", self.regulatory_intensity),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DomainConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self::preset(Domain::default())
    }
}

/// Partial override of a domain preset, as carried by scenario data.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DomainConfigOverlay {
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub weights: Option<ScoreWeights>,
    pub finding_penalty: Option<f64>,
    pub score_ceiling: Option<f64>,
    #[serde(default)]
    pub phases: Option<PhaseBoundaries>,
    pub market_volatility: Option<f64>,
    pub regulatory_intensity: Option<f64>,
    pub tracks_board_confidence: Option<bool>,
    #[serde(default)]
    pub reactions: Option<ReactionTable>,
}
