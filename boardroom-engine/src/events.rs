//! Probabilistic event injection.
//!
//! Every round collects triggers in a fixed discovery order: one per role
//! decision, then one per pressured risk dimension. Each trigger makes exactly
//! one Bernoulli draw and, on a hit, one index draw into the template pool,
//! so a given `(seed, round)` always consumes the stream identically.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::constants::{
    COMPLIANCE_PRESSURE_CEILING, EVENT_DAMPENING, PRESSURE_HIGH_THRESHOLD,
    PRESSURE_TRIGGER_THRESHOLD, PRESSURE_VERY_HIGH_THRESHOLD,
};
use crate::decision::Role;
use crate::domain::{DomainConfig, RoundPhase};
use crate::impact::Impact;
use crate::numbers::{index_from_i64, last_index_i64};
use crate::playbook::{decision_playbook, default_category};
use crate::rng::SeededRng;
use crate::scenario::{ScenarioLookup, option_for_role};
use crate::state::{GameState, StateField};

/// Severity tier shared by decisions, options, and events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    #[default]
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }

    /// Chance a trigger of this tier fires before modifiers.
    #[must_use]
    pub const fn base_probability(self) -> f64 {
        match self {
            Self::Low => 0.05,
            Self::Medium => 0.15,
            Self::High => 0.30,
            Self::VeryHigh => 0.50,
        }
    }

    /// Fraction of a target field's reference magnitude an event moves.
    #[must_use]
    pub const fn severity_scalar(self) -> f64 {
        match self {
            Self::Low => 0.02,
            Self::Medium => 0.05,
            Self::High => 0.08,
            Self::VeryHigh => 0.12,
        }
    }

    /// Multiplier applied to a template's base fine.
    #[must_use]
    pub const fn fine_multiplier(self) -> f64 {
        match self {
            Self::Low => 0.5,
            Self::Medium => 1.0,
            Self::High => 1.5,
            Self::VeryHigh => 2.0,
        }
    }

    /// Tier of a pressure trigger for a risk value, if it is high enough to fire.
    #[must_use]
    pub fn from_pressure(value: f64) -> Option<Self> {
        if value >= PRESSURE_VERY_HIGH_THRESHOLD {
            Some(Self::VeryHigh)
        } else if value >= PRESSURE_HIGH_THRESHOLD {
            Some(Self::High)
        } else if value >= PRESSURE_TRIGGER_THRESHOLD {
            Some(Self::Medium)
        } else {
            None
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event category; also selects the domain modifier and template pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Market,
    Regulatory,
    Operational,
    Reputational,
    Financial,
    Talent,
}

impl EventCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Regulatory => "regulatory",
            Self::Operational => "operational",
            Self::Reputational => "reputational",
            Self::Financial => "financial",
            Self::Talent => "talent",
        }
    }

    /// Category raised by pressure on a risk dimension.
    #[must_use]
    pub const fn for_risk_field(field: StateField) -> Option<Self> {
        match field {
            StateField::OperationalRisk => Some(Self::Operational),
            StateField::RegulatoryRisk => Some(Self::Regulatory),
            StateField::ReputationalRisk => Some(Self::Reputational),
            StateField::FinancialRisk => Some(Self::Financial),
            StateField::TalentRisk => Some(Self::Talent),
            _ => None,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field an event moves; `direction` is the signed multiple of the
/// severity-scaled reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventTarget {
    pub field: StateField,
    pub direction: f64,
}

/// Scenario-authored event definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: String,
    pub kind: String,
    pub description: String,
    pub category: EventCategory,
    /// Phases in which the template is live; empty means every phase.
    #[serde(default)]
    pub phases: Vec<RoundPhase>,
    #[serde(default)]
    pub targets: Vec<EventTarget>,
    #[serde(default)]
    pub finding: bool,
    #[serde(default)]
    pub fine: f64,
}

impl EventTemplate {
    #[must_use]
    pub fn available_in(&self, phase: RoundPhase) -> bool {
        self.phases.is_empty() || self.phases.contains(&phase)
    }
}

/// Event identity: round plus 1-based sequence within the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId {
    pub round: u32,
    pub seq: u32,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}-e{}", self.round, self.seq)
    }
}

/// What raised a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TriggerSource {
    Decision { role: Role },
    Pressure { field: StateField },
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decision { role } => write!(f, "{role} decision"),
            Self::Pressure { field } => write!(f, "{field} pressure"),
        }
    }
}

/// Entry in the append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub round: u32,
    pub template_id: String,
    pub kind: String,
    pub category: EventCategory,
    pub severity: RiskTier,
    pub description: String,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub finding: bool,
    pub trigger: TriggerSource,
}

/// Candidate event raised during a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    pub source: TriggerSource,
    pub tier: RiskTier,
    pub category: EventCategory,
}

impl Trigger {
    /// Hit probability after the domain modifier and dampening, in `[0, 1]`.
    #[must_use]
    pub fn probability(&self, config: &DomainConfig) -> f64 {
        let p = self.tier.base_probability()
            * config.category_modifier(self.category)
            * EVENT_DAMPENING;
        if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
    }
}

/// Event drawn this round, with the impact it will inject.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEvent {
    pub record: EventRecord,
    pub impact: Impact,
    /// Regulatory fine included in `impact`, zero when none.
    pub fine: f64,
}

/// Triggers for the open round, in discovery order.
#[must_use]
pub fn round_triggers(state: &GameState, lookup: &dyn ScenarioLookup) -> SmallVec<[Trigger; 8]> {
    let mut triggers = SmallVec::new();
    for &role in Role::ALL {
        let decision = state.resolved_decision(role);
        let (tier, category) = match option_for_role(lookup, state.round, role, &decision) {
            Some(option) => (
                option.risk_tier,
                option.event_category.unwrap_or_else(|| default_category(role)),
            ),
            None => (decision_playbook(role, &decision).tier, default_category(role)),
        };
        triggers.push(Trigger {
            source: TriggerSource::Decision { role },
            tier,
            category,
        });
    }

    for &field in StateField::RISK {
        let Some(category) = EventCategory::for_risk_field(field) else {
            continue;
        };
        let mut tier = RiskTier::from_pressure(state.field(field));
        if tier.is_none()
            && field == StateField::RegulatoryRisk
            && state.company.compliance_posture <= COMPLIANCE_PRESSURE_CEILING
        {
            tier = Some(RiskTier::Medium);
        }
        if let Some(tier) = tier {
            triggers.push(Trigger {
                source: TriggerSource::Pressure { field },
                tier,
                category,
            });
        }
    }
    triggers
}

/// Impact of a template at a given severity against the current state.
#[must_use]
pub fn event_impact(template: &EventTemplate, tier: RiskTier, state: &GameState) -> Impact {
    template
        .targets
        .iter()
        .map(|target| {
            let reference = state
                .field(target.field)
                .abs()
                .max(target.field.reference_floor());
            (
                target.field,
                target.direction * tier.severity_scalar() * reference,
            )
        })
        .collect()
}

/// Draw this round's events. May return more than the per-round cap; the
/// caller truncates by discovery order.
pub fn generate_round_events(
    state: &GameState,
    lookup: &dyn ScenarioLookup,
    rng: &mut SeededRng,
) -> SmallVec<[GeneratedEvent; 4]> {
    let config = lookup.domain_config();
    let phase = config.phases.phase_for(state.round);
    let phase_pool: Vec<&EventTemplate> = lookup
        .event_templates()
        .iter()
        .filter(|template| template.available_in(phase))
        .collect();

    let mut generated: SmallVec<[GeneratedEvent; 4]> = SmallVec::new();
    for trigger in round_triggers(state, lookup) {
        if !rng.chance(trigger.probability(config)) {
            continue;
        }
        let matching: Vec<&EventTemplate> = phase_pool
            .iter()
            .copied()
            .filter(|template| template.category == trigger.category)
            .collect();
        let pool = if matching.is_empty() {
            &phase_pool
        } else {
            &matching
        };
        if pool.is_empty() {
            continue;
        }
        let pick = index_from_i64(rng.next_int(0, last_index_i64(pool.len())));
        let Some(template) = pool.get(pick) else {
            continue;
        };

        let seq = u32::try_from(generated.len() + 1).unwrap_or(u32::MAX);
        let mut impact = event_impact(template, trigger.tier, state);
        let fine = (template.fine * trigger.tier.fine_multiplier()).max(0.0);
        if fine > 0.0 {
            impact.add(StateField::RegulatoryPenalties, fine);
            impact.add(StateField::Cash, -fine);
        }
        log::debug!(
            "round {} event hit: {} ({}, {}) via {}",
            state.round,
            template.id,
            trigger.category,
            trigger.tier,
            trigger.source
        );
        generated.push(GeneratedEvent {
            record: EventRecord {
                id: EventId {
                    round: state.round,
                    seq,
                },
                round: state.round,
                template_id: template.id.clone(),
                kind: template.kind.clone(),
                category: template.category,
                severity: trigger.tier,
                description: template.description.clone(),
                resolved: false,
                finding: template.finding,
                trigger: trigger.source,
            },
            impact,
            fine,
        });
    }
    generated
}

/// Mark up to `limit` of the oldest open findings resolved.
///
/// Returns how many were resolved.
pub fn resolve_findings(state: &mut GameState, limit: usize) -> usize {
    let mut resolved = 0;
    for event in state
        .events
        .iter_mut()
        .filter(|event| event.finding && !event.resolved)
        .take(limit)
    {
        event.resolved = true;
        resolved += 1;
    }
    sync_open_findings(state);
    resolved
}

/// Recount `company.open_findings` from the event log.
pub fn sync_open_findings(state: &mut GameState) {
    let open = state.open_finding_events().count();
    state.company.open_findings = u32::try_from(open).unwrap_or(u32::MAX);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_initial_game_state_with;
    use crate::decision::get_default_decision;
    use crate::rng::create_rng;
    use crate::scenario::{ScenarioCatalog, StaticScenario};

    fn scenario() -> &'static StaticScenario {
        ScenarioCatalog::bundled()
            .get("lumina-assist")
            .expect("bundled scenario")
    }

    fn fresh_state(seed: u64) -> GameState {
        create_initial_game_state_with(scenario(), "run-events", "team", Some(seed))
            .expect("state")
    }

    #[test]
    fn pressure_tiers_follow_thresholds() {
        assert_eq!(RiskTier::from_pressure(59.9), None);
        assert_eq!(RiskTier::from_pressure(60.0), Some(RiskTier::Medium));
        assert_eq!(RiskTier::from_pressure(75.0), Some(RiskTier::High));
        assert_eq!(RiskTier::from_pressure(90.0), Some(RiskTier::VeryHigh));
    }

    #[test]
    fn default_round_has_one_trigger_per_role() {
        let state = fresh_state(1);
        let triggers = round_triggers(&state, scenario());
        assert_eq!(triggers.len(), Role::ALL.len());
        for (trigger, &role) in triggers.iter().zip(Role::ALL) {
            assert_eq!(trigger.source, TriggerSource::Decision { role });
            assert_eq!(trigger.tier, RiskTier::Low);
            assert_eq!(trigger.category, default_category(role));
        }
    }

    #[test]
    fn pressure_and_weak_compliance_add_triggers() {
        let mut state = fresh_state(1);
        state.risk.operational = 92.0;
        state.risk.regulatory = 10.0;
        state.company.compliance_posture = 35.0;
        let triggers = round_triggers(&state, scenario());
        let pressure: Vec<_> = triggers
            .iter()
            .filter(|trigger| matches!(trigger.source, TriggerSource::Pressure { .. }))
            .collect();
        assert_eq!(pressure.len(), 2);
        assert_eq!(pressure[0].category, EventCategory::Operational);
        assert_eq!(pressure[0].tier, RiskTier::VeryHigh);
        assert_eq!(pressure[1].category, EventCategory::Regulatory);
        assert_eq!(pressure[1].tier, RiskTier::Medium);
    }

    #[test]
    fn chosen_option_overrides_tier_and_category() {
        let mut state = fresh_state(1);
        let round = scenario().round_by_id(1).expect("round one");
        let option = round
            .options
            .iter()
            .find(|option| option.role == Role::Strategy)
            .expect("strategy option in round one");
        state.pending.insert(
            Role::Strategy,
            get_default_decision(Role::Strategy).with("option", option.id.as_str()),
        );
        let triggers = round_triggers(&state, scenario());
        assert_eq!(triggers[0].tier, option.risk_tier);
        assert_eq!(
            triggers[0].category,
            option
                .event_category
                .unwrap_or_else(|| default_category(Role::Strategy))
        );
    }

    #[test]
    fn probability_applies_modifier_and_dampening() {
        let config = scenario().domain_config();
        let trigger = Trigger {
            source: TriggerSource::Pressure {
                field: StateField::RegulatoryRisk,
            },
            tier: RiskTier::High,
            category: EventCategory::Regulatory,
        };
        let expected = 0.30 * config.regulatory_intensity * 0.8;
        assert!((trigger.probability(config) - expected).abs() < 1e-12);
    }

    #[test]
    fn generation_is_deterministic() {
        for seed in 0..50 {
            let mut state = fresh_state(seed);
            state.risk.regulatory = 95.0;
            state.risk.reputational = 80.0;
            let first = generate_round_events(&state, scenario(), &mut create_rng(seed, 1));
            let second = generate_round_events(&state, scenario(), &mut create_rng(seed, 1));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn generated_records_are_well_formed() {
        let mut seen = 0;
        for seed in 0..200 {
            let mut state = fresh_state(seed);
            state.risk.regulatory = 95.0;
            state.risk.financial = 95.0;
            let events = generate_round_events(&state, scenario(), &mut create_rng(seed, 1));
            for (index, event) in events.iter().enumerate() {
                seen += 1;
                assert_eq!(event.record.round, 1);
                assert_eq!(event.record.id.seq as usize, index + 1);
                assert!(!event.record.resolved);
                assert!(event.fine >= 0.0);
            }
        }
        assert!(seen > 0, "high pressure should produce events");
    }

    #[test]
    fn empty_template_pool_yields_nothing() {
        let mut bare = scenario().clone();
        bare.events.clear();
        let mut state = fresh_state(9);
        state.risk.regulatory = 99.0;
        for round in 1..=8 {
            state.round = round;
            let events = generate_round_events(&state, &bare, &mut create_rng(9, round));
            assert!(events.is_empty());
        }
    }

    #[test]
    fn event_impact_scales_with_severity_and_reference() {
        let state = fresh_state(1);
        let template = EventTemplate {
            id: String::from("t"),
            kind: String::from("Test"),
            description: String::new(),
            category: EventCategory::Reputational,
            phases: Vec::new(),
            targets: vec![
                EventTarget {
                    field: StateField::BrandTrust,
                    direction: -1.0,
                },
                EventTarget {
                    field: StateField::Headcount,
                    direction: -1.0,
                },
            ],
            finding: false,
            fine: 0.0,
        };
        let impact = event_impact(&template, RiskTier::High, &state);
        let brand_reference = state.company.brand_trust.max(50.0);
        assert!((impact.get(StateField::BrandTrust) + 0.08 * brand_reference).abs() < 1e-9);
        assert!((impact.get(StateField::Headcount) + 0.08 * state.company.headcount).abs() < 1e-9);
        let low = event_impact(&template, RiskTier::Low, &state);
        assert!(low.get(StateField::BrandTrust).abs() < impact.get(StateField::BrandTrust).abs());
    }

    #[test]
    fn resolve_findings_takes_oldest_first() {
        let mut state = fresh_state(1);
        for seq in 1..=3 {
            state.events.push(EventRecord {
                id: EventId { round: 1, seq },
                round: 1,
                template_id: String::from("finding"),
                kind: String::from("Finding"),
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
        assert_eq!(state.company.open_findings, 3);
        assert_eq!(resolve_findings(&mut state, 2), 2);
        assert!(state.events[0].resolved && state.events[1].resolved);
        assert!(!state.events[2].resolved);
        assert_eq!(state.company.open_findings, 1);
        assert_eq!(resolve_findings(&mut state, 2), 1);
        assert_eq!(resolve_findings(&mut state, 2), 0);
    }

    #[test]
    fn event_ids_render_compactly() {
        assert_eq!(EventId { round: 3, seq: 2 }.to_string(), "r3-e2");
    }
}
