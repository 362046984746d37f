//! Game state ledger: company, market, risk, relationships and history.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::constants::MARKET_BASELINE;
use crate::decision::{Decision, Role, get_default_decision};
use crate::events::EventRecord;
use crate::scorecard::Scorecard;

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    DecisionsOpen,
    Resolving,
    Complete,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DecisionsOpen => "decisions_open",
            Self::Resolving => "resolving",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valid interval for a numeric state field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRange {
    /// Percent-like scale, `[0, 100]`.
    Percent,
    /// Counts and accumulated totals, `[0, inf)`.
    NonNegative,
    /// Market index centred on 100; non-negative and drift-limited per round.
    Index,
    /// Financial flows with no bound.
    Unbounded,
}

impl FieldRange {
    /// Clamp a value into this range.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        match self {
            Self::Percent => value.clamp(0.0, 100.0),
            Self::NonNegative | Self::Index => value.max(0.0),
            Self::Unbounded => value,
        }
    }

    /// Whether a value is inside this range.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        match self {
            Self::Percent => (0.0..=100.0).contains(&value),
            Self::NonNegative | Self::Index => value >= 0.0,
            Self::Unbounded => value.is_finite(),
        }
    }
}

/// Every numeric field an impact may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Cash,
    Revenue,
    Costs,
    Headcount,
    Morale,
    BrandTrust,
    CompliancePosture,
    ProductQuality,
    OperationalEfficiency,
    MarketShare,
    StakeholderConfidence,
    RegulatoryPenalties,
    DemandIndex,
    PriceIndex,
    CompetitionIntensity,
    InvestorSentiment,
    OperationalRisk,
    RegulatoryRisk,
    ReputationalRisk,
    FinancialRisk,
    TalentRisk,
}

impl StateField {
    pub const ALL: &'static [Self] = &[
        Self::Cash,
        Self::Revenue,
        Self::Costs,
        Self::Headcount,
        Self::Morale,
        Self::BrandTrust,
        Self::CompliancePosture,
        Self::ProductQuality,
        Self::OperationalEfficiency,
        Self::MarketShare,
        Self::StakeholderConfidence,
        Self::RegulatoryPenalties,
        Self::DemandIndex,
        Self::PriceIndex,
        Self::CompetitionIntensity,
        Self::InvestorSentiment,
        Self::OperationalRisk,
        Self::RegulatoryRisk,
        Self::ReputationalRisk,
        Self::FinancialRisk,
        Self::TalentRisk,
    ];

    pub const MARKET: &'static [Self] = &[
        Self::DemandIndex,
        Self::PriceIndex,
        Self::CompetitionIntensity,
        Self::InvestorSentiment,
    ];

    pub const RISK: &'static [Self] = &[
        Self::OperationalRisk,
        Self::RegulatoryRisk,
        Self::ReputationalRisk,
        Self::FinancialRisk,
        Self::TalentRisk,
    ];

    #[must_use]
    pub const fn range(self) -> FieldRange {
        match self {
            Self::Cash | Self::Revenue | Self::Costs => FieldRange::Unbounded,
            Self::Headcount | Self::RegulatoryPenalties => FieldRange::NonNegative,
            Self::DemandIndex
            | Self::PriceIndex
            | Self::CompetitionIntensity
            | Self::InvestorSentiment => FieldRange::Index,
            Self::Morale
            | Self::BrandTrust
            | Self::CompliancePosture
            | Self::ProductQuality
            | Self::OperationalEfficiency
            | Self::MarketShare
            | Self::StakeholderConfidence
            | Self::OperationalRisk
            | Self::RegulatoryRisk
            | Self::ReputationalRisk
            | Self::FinancialRisk
            | Self::TalentRisk => FieldRange::Percent,
        }
    }

    /// Smallest magnitude used when an event scales its impact by this field.
    #[must_use]
    pub const fn reference_floor(self) -> f64 {
        match self {
            Self::Cash | Self::Revenue | Self::Costs | Self::RegulatoryPenalties => 1_000_000.0,
            Self::Headcount => 50.0,
            Self::DemandIndex
            | Self::PriceIndex
            | Self::CompetitionIntensity
            | Self::InvestorSentiment => MARKET_BASELINE,
            _ => 50.0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Revenue => "revenue",
            Self::Costs => "costs",
            Self::Headcount => "headcount",
            Self::Morale => "morale",
            Self::BrandTrust => "brand_trust",
            Self::CompliancePosture => "compliance_posture",
            Self::ProductQuality => "product_quality",
            Self::OperationalEfficiency => "operational_efficiency",
            Self::MarketShare => "market_share",
            Self::StakeholderConfidence => "stakeholder_confidence",
            Self::RegulatoryPenalties => "regulatory_penalties",
            Self::DemandIndex => "demand_index",
            Self::PriceIndex => "price_index",
            Self::CompetitionIntensity => "competition_intensity",
            Self::InvestorSentiment => "investor_sentiment",
            Self::OperationalRisk => "operational_risk",
            Self::RegulatoryRisk => "regulatory_risk",
            Self::ReputationalRisk => "reputational_risk",
            Self::FinancialRisk => "financial_risk",
            Self::TalentRisk => "talent_risk",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Company ledger. `profit` is always `revenue - costs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyState {
    pub cash: f64,
    pub revenue: f64,
    pub costs: f64,
    pub profit: f64,
    pub headcount: f64,
    pub morale: f64,
    pub brand_trust: f64,
    pub compliance_posture: f64,
    pub product_quality: f64,
    pub operational_efficiency: f64,
    pub market_share: f64,
    pub stakeholder_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_confidence: Option<f64>,
    #[serde(default)]
    pub regulatory_penalties: f64,
    #[serde(default)]
    pub open_findings: u32,
}

impl Default for CompanyState {
    fn default() -> Self {
        let mut company = Self {
            cash: 20_000_000.0,
            revenue: 12_000_000.0,
            costs: 10_500_000.0,
            profit: 0.0,
            headcount: 240.0,
            morale: 65.0,
            brand_trust: 60.0,
            compliance_posture: 65.0,
            product_quality: 60.0,
            operational_efficiency: 60.0,
            market_share: 18.0,
            stakeholder_confidence: 50.0,
            board_confidence: None,
            regulatory_penalties: 0.0,
            open_findings: 0,
        };
        company.reconcile_profit();
        company
    }
}

impl CompanyState {
    pub fn reconcile_profit(&mut self) {
        self.profit = self.revenue - self.costs;
    }
}

/// Market indices, centred on 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub demand_index: f64,
    pub price_index: f64,
    pub competition_intensity: f64,
    pub investor_sentiment: f64,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            demand_index: MARKET_BASELINE,
            price_index: MARKET_BASELINE,
            competition_intensity: MARKET_BASELINE,
            investor_sentiment: MARKET_BASELINE,
        }
    }
}

/// Named risk pressures, each in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub operational: f64,
    pub regulatory: f64,
    pub reputational: f64,
    pub financial: f64,
    pub talent: f64,
}

impl Default for RiskState {
    fn default() -> Self {
        Self {
            operational: 30.0,
            regulatory: 30.0,
            reputational: 25.0,
            financial: 25.0,
            talent: 30.0,
        }
    }
}

impl RiskState {
    #[must_use]
    pub fn mean(&self) -> f64 {
        (self.operational + self.regulatory + self.reputational + self.financial + self.talent)
            / 5.0
    }
}

/// Per-stakeholder relationship gauges; the first three are in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub trust: f64,
    pub alignment: f64,
    pub engagement: f64,
    #[serde(default = "Relationship::default_influence")]
    pub influence: f64,
    #[serde(default)]
    pub group: String,
}

impl Relationship {
    const fn default_influence() -> f64 {
        1.0
    }

    pub fn clamp(&mut self) {
        self.trust = self.trust.clamp(0.0, 1.0);
        self.alignment = self.alignment.clamp(0.0, 1.0);
        self.engagement = self.engagement.clamp(0.0, 1.0);
    }
}

/// Human-readable summary of a resolved round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeEntry {
    pub round: u32,
    pub headline: String,
    pub body: String,
}

/// Validated decisions for one round, keyed by role.
pub type RoundDecisions = BTreeMap<Role, Decision>;

/// Complete snapshot of one run; the unit of persistence and replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub run_id: String,
    pub team_id: String,
    pub scenario_id: String,
    pub seed: u64,
    pub round: u32,
    pub max_rounds: u32,
    pub phase: Phase,
    pub company: CompanyState,
    pub market: MarketState,
    pub risk: RiskState,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default)]
    pub pending: RoundDecisions,
    #[serde(default)]
    pub decisions: Vec<RoundDecisions>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
    #[serde(default)]
    pub narrative: Vec<NarrativeEntry>,
    pub scorecard: Scorecard,
}

impl GameState {
    /// Read a numeric field.
    #[must_use]
    pub const fn field(&self, field: StateField) -> f64 {
        match field {
            StateField::Cash => self.company.cash,
            StateField::Revenue => self.company.revenue,
            StateField::Costs => self.company.costs,
            StateField::Headcount => self.company.headcount,
            StateField::Morale => self.company.morale,
            StateField::BrandTrust => self.company.brand_trust,
            StateField::CompliancePosture => self.company.compliance_posture,
            StateField::ProductQuality => self.company.product_quality,
            StateField::OperationalEfficiency => self.company.operational_efficiency,
            StateField::MarketShare => self.company.market_share,
            StateField::StakeholderConfidence => self.company.stakeholder_confidence,
            StateField::RegulatoryPenalties => self.company.regulatory_penalties,
            StateField::DemandIndex => self.market.demand_index,
            StateField::PriceIndex => self.market.price_index,
            StateField::CompetitionIntensity => self.market.competition_intensity,
            StateField::InvestorSentiment => self.market.investor_sentiment,
            StateField::OperationalRisk => self.risk.operational,
            StateField::RegulatoryRisk => self.risk.regulatory,
            StateField::ReputationalRisk => self.risk.reputational,
            StateField::FinancialRisk => self.risk.financial,
            StateField::TalentRisk => self.risk.talent,
        }
    }

    /// Mutable access to a numeric field. Callers clamp afterwards.
    pub const fn field_mut(&mut self, field: StateField) -> &mut f64 {
        match field {
            StateField::Cash => &mut self.company.cash,
            StateField::Revenue => &mut self.company.revenue,
            StateField::Costs => &mut self.company.costs,
            StateField::Headcount => &mut self.company.headcount,
            StateField::Morale => &mut self.company.morale,
            StateField::BrandTrust => &mut self.company.brand_trust,
            StateField::CompliancePosture => &mut self.company.compliance_posture,
            StateField::ProductQuality => &mut self.company.product_quality,
            StateField::OperationalEfficiency => &mut self.company.operational_efficiency,
            StateField::MarketShare => &mut self.company.market_share,
            StateField::StakeholderConfidence => &mut self.company.stakeholder_confidence,
            StateField::RegulatoryPenalties => &mut self.company.regulatory_penalties,
            StateField::DemandIndex => &mut self.market.demand_index,
            StateField::PriceIndex => &mut self.market.price_index,
            StateField::CompetitionIntensity => &mut self.market.competition_intensity,
            StateField::InvestorSentiment => &mut self.market.investor_sentiment,
            StateField::OperationalRisk => &mut self.risk.operational,
            StateField::RegulatoryRisk => &mut self.risk.regulatory,
            StateField::ReputationalRisk => &mut self.risk.reputational,
            StateField::FinancialRisk => &mut self.risk.financial,
            StateField::TalentRisk => &mut self.risk.talent,
        }
    }

    /// Set a field, clamping it into its documented range.
    pub fn set_field(&mut self, field: StateField, value: f64) {
        *self.field_mut(field) = field.range().clamp(value);
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::Complete) || self.round > self.max_rounds
    }

    /// Pending decision for a role, or its default when nothing was submitted.
    #[must_use]
    pub fn resolved_decision(&self, role: Role) -> Decision {
        self.pending
            .get(&role)
            .cloned()
            .unwrap_or_else(|| get_default_decision(role))
    }

    /// Unresolved events that count as open findings.
    pub fn open_finding_events(&self) -> impl Iterator<Item = &EventRecord> {
        self.events.iter().filter(|event| event.finding && !event.resolved)
    }

    /// Every bound or structural invariant the state currently violates.
    #[must_use]
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.round == 0 || self.round > self.max_rounds {
            violations.push(format!(
                "round {} outside 1..={}",
                self.round, self.max_rounds
            ));
        }
        let expected_history = match self.phase {
            Phase::Complete => self.round as usize,
            Phase::DecisionsOpen | Phase::Resolving => self.round.saturating_sub(1) as usize,
        };
        if self.decisions.len() != expected_history {
            violations.push(format!(
                "decision history length {} (expected {expected_history})",
                self.decisions.len()
            ));
        }
        for &field in StateField::ALL {
            let value = self.field(field);
            if !field.range().contains(value) {
                violations.push(format!("{field} = {value} outside range"));
            }
        }
        if (self.company.profit - (self.company.revenue - self.company.costs)).abs() > 1e-6 {
            violations.push(String::from("profit != revenue - costs"));
        }
        if let Some(board) = self.company.board_confidence
            && !(0.0..=100.0).contains(&board)
        {
            violations.push(format!("board_confidence = {board} outside range"));
        }
        for (id, relation) in &self.relationships {
            for (label, value) in [
                ("trust", relation.trust),
                ("alignment", relation.alignment),
                ("engagement", relation.engagement),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    violations.push(format!("{id}.{label} = {value} outside [0,1]"));
                }
            }
        }
        let card = &self.scorecard;
        for (label, value) in [
            ("financial_health", card.financial_health),
            ("growth", card.growth),
            ("trust", card.trust),
            ("resilience", card.resilience),
            ("execution", card.execution),
        ] {
            if !(0.0..=100.0).contains(&value) {
                violations.push(format!("scorecard.{label} = {value} outside [0,100]"));
            }
        }
        if card.total_score < 0.0 {
            violations.push(format!("scorecard.total_score = {} < 0", card.total_score));
        }
        violations
    }

    /// Stable 64-bit fingerprint of the canonical JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn fingerprint(&self) -> Result<u64, serde_json::Error> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&canonical);
        Ok(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioCatalog;
    use crate::create_initial_game_state_with;

    fn fresh_state() -> GameState {
        let scenario = ScenarioCatalog::bundled()
            .get("lumina-assist")
            .expect("bundled scenario");
        create_initial_game_state_with(scenario, "run-1", "team-1", Some(7)).expect("state")
    }

    #[test]
    fn field_accessors_cover_every_variant() {
        let mut state = fresh_state();
        for (index, &field) in StateField::ALL.iter().enumerate() {
            let value = f64::from(u32::try_from(index).unwrap_or(0)) + 1.0;
            *state.field_mut(field) = value;
            assert!((state.field(field) - value).abs() < f64::EPSILON, "{field}");
        }
    }

    #[test]
    fn set_field_clamps_to_range() {
        let mut state = fresh_state();
        state.set_field(StateField::Morale, 140.0);
        assert!((state.company.morale - 100.0).abs() < f64::EPSILON);
        state.set_field(StateField::Headcount, -3.0);
        assert!(state.company.headcount.abs() < f64::EPSILON);
        state.set_field(StateField::Cash, -5_000.0);
        assert!((state.company.cash + 5_000.0).abs() < f64::EPSILON);
        state.set_field(StateField::DemandIndex, -1.0);
        assert!(state.market.demand_index.abs() < f64::EPSILON);
    }

    #[test]
    fn fresh_state_has_no_violations() {
        let state = fresh_state();
        assert!(state.invariant_violations().is_empty());
    }

    #[test]
    fn violations_report_out_of_range_fields() {
        let mut state = fresh_state();
        state.company.morale = 120.0;
        state.decisions.push(RoundDecisions::from([(
            Role::Strategy,
            get_default_decision(Role::Strategy),
        )]));
        let violations = state.invariant_violations();
        assert!(violations.iter().any(|v| v.contains("morale")));
        assert!(violations.iter().any(|v| v.contains("decision history")));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let state = fresh_state();
        let same = state.clone();
        assert_eq!(state.fingerprint().unwrap(), same.fingerprint().unwrap());
        let mut changed = state.clone();
        changed.company.cash += 1.0;
        assert_ne!(state.fingerprint().unwrap(), changed.fingerprint().unwrap());
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&Phase::DecisionsOpen).unwrap();
        assert_eq!(json, "\"decisions_open\"");
        assert_eq!(Phase::Complete.to_string(), "complete");
    }

    #[test]
    fn game_state_is_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GameState>();
    }
}
