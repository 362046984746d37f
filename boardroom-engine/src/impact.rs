//! Impact application: additive deltas, clamping, and named derived rules.
//!
//! Primary deltas are applied first and clamped per field. Derived rules then
//! look only at the clamped primary deltas, and their own output is applied
//! without re-running the rules, so each rule can be tested on its own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{
    BRAND_DAMAGE_FACTOR, CASH_STRESS_RISK, COMPLIANCE_SHOCK_FACTOR, MARKET_DRIFT_LIMIT,
    MARKET_MOVEMENT_SPAN, MORALE_ATTRITION_FACTOR, SHOCK_THRESHOLD,
};
use crate::rng::SeededRng;
use crate::state::{GameState, MarketState, StateField};

/// Partial map of state-field deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Impact(BTreeMap<StateField, f64>);

impl Impact {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style accumulate.
    #[must_use]
    pub fn with(mut self, field: StateField, delta: f64) -> Self {
        self.add(field, delta);
        self
    }

    /// Accumulate a delta; zero deltas are not recorded.
    pub fn add(&mut self, field: StateField, delta: f64) {
        if delta == 0.0 || !delta.is_finite() {
            return;
        }
        *self.0.entry(field).or_insert(0.0) += delta;
    }

    /// Fold another impact into this one.
    pub fn merge(&mut self, other: &Self) {
        for (&field, &delta) in &other.0 {
            self.add(field, delta);
        }
    }

    #[must_use]
    pub fn get(&self, field: StateField) -> f64 {
        self.0.get(&field).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateField, f64)> + '_ {
        self.0.iter().map(|(&field, &delta)| (field, delta))
    }
}

impl FromIterator<(StateField, f64)> for Impact {
    fn from_iter<T: IntoIterator<Item = (StateField, f64)>>(iter: T) -> Self {
        let mut impact = Self::new();
        for (field, delta) in iter {
            impact.add(field, delta);
        }
        impact
    }
}

/// Secondary effect evaluated on the clamped primary deltas.
#[derive(Debug, Clone, Copy)]
pub struct DerivedRule {
    pub name: &'static str,
    pub evaluate: fn(&Impact, &GameState) -> Impact,
}

/// Derived rules in evaluation order.
pub const DERIVED_RULES: &[DerivedRule] = &[
    DerivedRule {
        name: "compliance_shock",
        evaluate: compliance_shock,
    },
    DerivedRule {
        name: "brand_damage",
        evaluate: brand_damage,
    },
    DerivedRule {
        name: "morale_attrition",
        evaluate: morale_attrition,
    },
    DerivedRule {
        name: "cash_stress",
        evaluate: cash_stress,
    },
];

/// A large compliance-posture drop also raises regulatory risk.
#[must_use]
pub fn compliance_shock(primary: &Impact, _state: &GameState) -> Impact {
    shock(
        primary.get(StateField::CompliancePosture),
        StateField::RegulatoryRisk,
        COMPLIANCE_SHOCK_FACTOR,
    )
}

/// A large brand-trust drop also raises reputational risk.
#[must_use]
pub fn brand_damage(primary: &Impact, _state: &GameState) -> Impact {
    shock(
        primary.get(StateField::BrandTrust),
        StateField::ReputationalRisk,
        BRAND_DAMAGE_FACTOR,
    )
}

/// A large morale drop also raises talent risk.
#[must_use]
pub fn morale_attrition(primary: &Impact, _state: &GameState) -> Impact {
    shock(
        primary.get(StateField::Morale),
        StateField::TalentRisk,
        MORALE_ATTRITION_FACTOR,
    )
}

/// Cash crossing below zero raises financial risk by a flat amount.
#[must_use]
pub fn cash_stress(primary: &Impact, state: &GameState) -> Impact {
    let delta = primary.get(StateField::Cash);
    let after = state.company.cash;
    let before = after - delta;
    if delta < 0.0 && after < 0.0 && before >= 0.0 {
        return Impact::new().with(StateField::FinancialRisk, CASH_STRESS_RISK);
    }
    Impact::new()
}

fn shock(delta: f64, target: StateField, factor: f64) -> Impact {
    if delta <= -SHOCK_THRESHOLD {
        Impact::new().with(target, -delta * factor)
    } else {
        Impact::new()
    }
}

/// Record of what an impact actually changed after clamping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppliedImpact {
    pub primary: Impact,
    pub derived: Vec<(&'static str, Impact)>,
}

impl AppliedImpact {
    /// Net change per field across primary and derived deltas.
    #[must_use]
    pub fn net(&self) -> Impact {
        let mut net = self.primary.clone();
        for (_, impact) in &self.derived {
            net.merge(impact);
        }
        net
    }
}

/// Apply deltas additively, clamp each touched field, then reconcile profit.
///
/// Returns the deltas that actually landed.
pub fn apply_clamped(state: &mut GameState, impact: &Impact) -> Impact {
    let mut landed = Impact::new();
    for (field, delta) in impact.iter() {
        let before = state.field(field);
        state.set_field(field, before + delta);
        landed.add(field, state.field(field) - before);
    }
    state.company.reconcile_profit();
    landed
}

/// Apply an impact and evaluate every derived rule on the primary deltas.
pub fn apply_impact(state: &mut GameState, impact: &Impact) -> AppliedImpact {
    let primary = apply_clamped(state, impact);
    let mut derived = Vec::new();
    for rule in DERIVED_RULES {
        let secondary = (rule.evaluate)(&primary, state);
        if secondary.is_empty() {
            continue;
        }
        let landed = apply_clamped(state, &secondary);
        log::debug!("derived rule {} applied {:?}", rule.name, landed);
        derived.push((rule.name, landed));
    }
    AppliedImpact { primary, derived }
}

/// Profit for the round accrues to cash.
#[must_use]
pub fn accrue_profit(state: &GameState) -> Impact {
    Impact::new().with(StateField::Cash, state.company.profit)
}

/// Seeded drift of every market index, scaled by volatility.
pub fn market_movement(rng: &mut SeededRng, volatility: f64) -> Impact {
    let span = MARKET_MOVEMENT_SPAN * volatility.max(0.0);
    StateField::MARKET
        .iter()
        .map(|&field| (field, (rng.next() - 0.5) * span))
        .collect()
}

/// Hold each market index within the per-round drift band around `start`.
pub fn limit_market_drift(start: &MarketState, state: &mut GameState) {
    let pairs = [
        (start.demand_index, &mut state.market.demand_index),
        (start.price_index, &mut state.market.price_index),
        (start.competition_intensity, &mut state.market.competition_intensity),
        (start.investor_sentiment, &mut state.market.investor_sentiment),
    ];
    for (origin, value) in pairs {
        let low = (origin - MARKET_DRIFT_LIMIT).max(0.0);
        let high = (origin + MARKET_DRIFT_LIMIT).max(low);
        *value = value.clamp(low, high);
    }
}
