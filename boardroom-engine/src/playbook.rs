//! Per-role playbook: the fixed mapping from a validated decision to its
//! impact, stakeholder reactions, and event risk tier.

use crate::decision::{BASELINE_TRAINING_HOURS, Decision, Role};
use crate::events::{EventCategory, RiskTier};
use crate::impact::Impact;
use crate::relationships::{ReactionLabel, Reactions};
use crate::state::StateField;

/// Allocation share each capital bucket gets under the status quo.
const ALLOCATION_BASELINE: f64 = 25.0;
/// Cost per hired or released head.
const COST_PER_HEAD: f64 = 12_000.0;
const CAMPAIGN_SPEND_PER_DEMAND_POINT: f64 = 250_000.0;
const CAMPAIGN_SPEND_PER_SHARE_POINT: f64 = 1_000_000.0;
const LARGE_CAMPAIGN_SPEND: f64 = 1_000_000.0;
const LARGE_HEADCOUNT_SWING: f64 = 50.0;
const HEAVY_AUTOMATION: f64 = 60.0;
const LIGHT_TRAINING_HOURS: f64 = 4.0;

/// Consequences of one role decision.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybookEntry {
    pub impact: Impact,
    pub reactions: Reactions,
    pub tier: RiskTier,
}

impl PlaybookEntry {
    fn raise_tier(&mut self, tier: RiskTier) {
        self.tier = self.tier.max(tier);
    }
}

/// Event category a role's decision triggers when no option overrides it.
#[must_use]
pub const fn default_category(role: Role) -> EventCategory {
    match role {
        Role::Strategy => EventCategory::Market,
        Role::Marketing => EventCategory::Reputational,
        Role::Operations => EventCategory::Operational,
        Role::Compliance => EventCategory::Regulatory,
    }
}

/// Evaluate a validated decision. Missing fields count as the default value,
/// so a default decision maps to an empty impact, no reactions, and a low tier.
#[must_use]
pub fn decision_playbook(role: Role, decision: &Decision) -> PlaybookEntry {
    let mut entry = PlaybookEntry::default();
    match role {
        Role::Strategy => strategy(decision, &mut entry),
        Role::Marketing => marketing(decision, &mut entry),
        Role::Operations => operations(decision, &mut entry),
        Role::Compliance => compliance(decision, &mut entry),
    }
    entry
}

fn strategy(decision: &Decision, entry: &mut PlaybookEntry) {
    let impact = &mut entry.impact;
    match decision.text("focus") {
        Some("growth") => {
            impact.add(StateField::DemandIndex, 3.0);
            impact.add(StateField::Revenue, 400_000.0);
            impact.add(StateField::Costs, 250_000.0);
            impact.add(StateField::OperationalRisk, 4.0);
            entry.reactions.push("investors", ReactionLabel::Positive);
            entry.reactions.push("employees", ReactionLabel::SlightlyNegative);
            entry.raise_tier(RiskTier::Medium);
        }
        Some("efficiency") => {
            impact.add(StateField::Costs, -300_000.0);
            impact.add(StateField::Morale, -3.0);
            impact.add(StateField::OperationalEfficiency, 5.0);
            entry.reactions.push("board", ReactionLabel::SlightlyPositive);
            entry.reactions.push("employees", ReactionLabel::Negative);
        }
        Some("innovation") => {
            impact.add(StateField::ProductQuality, 5.0);
            impact.add(StateField::Costs, 200_000.0);
            impact.add(StateField::OperationalRisk, 3.0);
            entry.reactions.push("customers", ReactionLabel::SlightlyPositive);
            entry.reactions.push("employees", ReactionLabel::SlightlyPositive);
            entry.raise_tier(RiskTier::Medium);
        }
        _ => {}
    }

    let impact = &mut entry.impact;
    match decision.text("risk_posture") {
        Some("conservative") => {
            for &field in StateField::RISK {
                impact.add(field, -2.0);
            }
            impact.add(StateField::DemandIndex, -1.0);
            entry.reactions.push("board", ReactionLabel::SlightlyPositive);
        }
        Some("aggressive") => {
            impact.add(StateField::Revenue, 300_000.0);
            impact.add(StateField::FinancialRisk, 6.0);
            impact.add(StateField::RegulatoryRisk, 2.0);
            entry.reactions.push("investors", ReactionLabel::SlightlyPositive);
            entry.reactions.push("board", ReactionLabel::SlightlyNegative);
            entry.raise_tier(RiskTier::High);
        }
        _ => {}
    }

    let share = |field: &str| {
        decision.number(field).unwrap_or(ALLOCATION_BASELINE) - ALLOCATION_BASELINE
    };
    let impact = &mut entry.impact;
    impact.add(StateField::ProductQuality, share("rnd_allocation") * 0.2);
    impact.add(StateField::DemandIndex, share("marketing_allocation") * 0.1);
    impact.add(StateField::OperationalEfficiency, share("operations_allocation") * 0.2);
    impact.add(StateField::FinancialRisk, -share("reserve_allocation") * 0.2);
}

fn marketing(decision: &Decision, entry: &mut PlaybookEntry) {
    let impact = &mut entry.impact;
    match decision.text("channel") {
        Some("digital") => {
            impact.add(StateField::DemandIndex, 2.0);
            impact.add(StateField::Costs, 100_000.0);
            entry.reactions.push("customers", ReactionLabel::SlightlyPositive);
        }
        Some("brand") => {
            impact.add(StateField::BrandTrust, 3.0);
            impact.add(StateField::Costs, 150_000.0);
            entry.reactions.push("customers", ReactionLabel::Positive);
        }
        Some("partnerships") => {
            impact.add(StateField::MarketShare, 1.0);
            entry.reactions.push("investors", ReactionLabel::SlightlyPositive);
        }
        _ => {}
    }

    let spend = decision.number("campaign_spend").unwrap_or(0.0).max(0.0);
    let impact = &mut entry.impact;
    impact.add(StateField::Costs, spend);
    impact.add(StateField::DemandIndex, spend / CAMPAIGN_SPEND_PER_DEMAND_POINT);
    impact.add(StateField::MarketShare, spend / CAMPAIGN_SPEND_PER_SHARE_POINT);
    if spend >= LARGE_CAMPAIGN_SPEND {
        entry.raise_tier(RiskTier::Medium);
    }

    let impact = &mut entry.impact;
    match decision.text("pricing") {
        Some("discount") => {
            impact.add(StateField::PriceIndex, -3.0);
            impact.add(StateField::DemandIndex, 3.0);
            impact.add(StateField::Revenue, -200_000.0);
            entry.reactions.push("customers", ReactionLabel::Positive);
            entry.reactions.push("investors", ReactionLabel::SlightlyNegative);
            entry.raise_tier(RiskTier::Medium);
        }
        Some("premium") => {
            impact.add(StateField::PriceIndex, 3.0);
            impact.add(StateField::DemandIndex, -2.0);
            impact.add(StateField::Revenue, 250_000.0);
            impact.add(StateField::BrandTrust, -1.0);
            entry.reactions.push("customers", ReactionLabel::SlightlyNegative);
            entry.reactions.push("investors", ReactionLabel::SlightlyPositive);
        }
        _ => {}
    }
}

fn operations(decision: &Decision, entry: &mut PlaybookEntry) {
    let impact = &mut entry.impact;
    match decision.text("hiring") {
        Some("freeze") => {
            impact.add(StateField::Morale, -4.0);
            impact.add(StateField::Costs, -150_000.0);
            impact.add(StateField::TalentRisk, 3.0);
            entry.reactions.push("employees", ReactionLabel::Negative);
        }
        Some("expand") => {
            impact.add(StateField::Headcount, 15.0);
            impact.add(StateField::Costs, 300_000.0);
            impact.add(StateField::Morale, 2.0);
            impact.add(StateField::OperationalEfficiency, -1.0);
            entry.reactions.push("employees", ReactionLabel::Positive);
            entry.raise_tier(RiskTier::Medium);
        }
        _ => {}
    }

    let change = decision.number("headcount_change").unwrap_or(0.0);
    let impact = &mut entry.impact;
    impact.add(StateField::Headcount, change);
    impact.add(StateField::Costs, change * COST_PER_HEAD);
    if change < 0.0 {
        impact.add(StateField::Morale, change * 0.1);
        entry.reactions.push("employees", ReactionLabel::Negative);
    }
    if change.abs() >= LARGE_HEADCOUNT_SWING {
        entry.raise_tier(RiskTier::Medium);
    }

    let automation = decision.number("automation_investment").unwrap_or(0.0);
    let impact = &mut entry.impact;
    impact.add(StateField::OperationalEfficiency, automation * 0.08);
    impact.add(StateField::Costs, automation * 5_000.0);
    impact.add(StateField::Morale, -automation * 0.03);
    impact.add(StateField::OperationalRisk, -automation * 0.03);
    if automation >= HEAVY_AUTOMATION {
        entry.reactions.push("employees", ReactionLabel::SlightlyNegative);
        entry.raise_tier(RiskTier::Medium);
    }
}

fn compliance(decision: &Decision, entry: &mut PlaybookEntry) {
    let impact = &mut entry.impact;
    match decision.text("audit_depth") {
        Some("minimal") => {
            impact.add(StateField::CompliancePosture, -6.0);
            impact.add(StateField::RegulatoryRisk, 5.0);
            impact.add(StateField::Costs, -80_000.0);
            entry.reactions.push("regulator", ReactionLabel::Negative);
            entry.raise_tier(RiskTier::High);
        }
        Some("thorough") => {
            impact.add(StateField::CompliancePosture, 5.0);
            impact.add(StateField::RegulatoryRisk, -4.0);
            impact.add(StateField::Costs, 120_000.0);
            entry.reactions.push("regulator", ReactionLabel::Positive);
        }
        _ => {}
    }

    let hours = decision.number("training_hours").unwrap_or(BASELINE_TRAINING_HOURS);
    let delta = hours - BASELINE_TRAINING_HOURS;
    let impact = &mut entry.impact;
    impact.add(StateField::CompliancePosture, delta * 0.1);
    impact.add(StateField::Costs, delta * 5_000.0);
    if hours < LIGHT_TRAINING_HOURS {
        entry.raise_tier(RiskTier::Medium);
    }

    let impact = &mut entry.impact;
    match decision.text("disclosure") {
        Some("withhold") => {
            impact.add(StateField::BrandTrust, -2.0);
            impact.add(StateField::RegulatoryRisk, 4.0);
            impact.add(StateField::ReputationalRisk, 3.0);
            entry.reactions.push("regulator", ReactionLabel::VeryNegative);
            entry.reactions.push("customers", ReactionLabel::SlightlyNegative);
            entry.raise_tier(RiskTier::High);
        }
        Some("full") => {
            impact.add(StateField::BrandTrust, 3.0);
            impact.add(StateField::ReputationalRisk, -3.0);
            impact.add(StateField::CompliancePosture, 2.0);
            entry.reactions.push("regulator", ReactionLabel::Positive);
            entry.reactions.push("board", ReactionLabel::SlightlyNegative);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::get_default_decision;

    #[test]
    fn defaults_are_neutral() {
        for &role in Role::ALL {
            let entry = decision_playbook(role, &get_default_decision(role));
            assert!(entry.impact.is_empty(), "{role} default has impact");
            assert!(entry.reactions.is_empty(), "{role} default has reactions");
            assert_eq!(entry.tier, RiskTier::Low);
        }
    }

    #[test]
    fn growth_focus_trades_cost_for_demand() {
        let decision = get_default_decision(Role::Strategy).with("focus", "growth");
        let entry = decision_playbook(Role::Strategy, &decision);
        assert!((entry.impact.get(StateField::DemandIndex) - 3.0).abs() < 1e-9);
        assert!((entry.impact.get(StateField::Costs) - 250_000.0).abs() < 1e-9);
        assert_eq!(entry.tier, RiskTier::Medium);
    }

    #[test]
    fn allocation_shifts_are_relative_to_even_split() {
        let decision = get_default_decision(Role::Strategy)
            .with("rnd_allocation", 40.0)
            .with("marketing_allocation", 20.0)
            .with("operations_allocation", 20.0)
            .with("reserve_allocation", 20.0);
        let entry = decision_playbook(Role::Strategy, &decision);
        assert!((entry.impact.get(StateField::ProductQuality) - 3.0).abs() < 1e-9);
        assert!((entry.impact.get(StateField::DemandIndex) + 0.5).abs() < 1e-9);
        assert!((entry.impact.get(StateField::OperationalEfficiency) + 1.0).abs() < 1e-9);
        assert!((entry.impact.get(StateField::FinancialRisk) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn aggressive_posture_is_high_tier() {
        let decision = get_default_decision(Role::Strategy).with("risk_posture", "aggressive");
        assert_eq!(decision_playbook(Role::Strategy, &decision).tier, RiskTier::High);
    }

    #[test]
    fn campaign_spend_scales_demand_and_share() {
        let decision = get_default_decision(Role::Marketing)
            .with("channel", "digital")
            .with("campaign_spend", 1_000_000.0);
        let entry = decision_playbook(Role::Marketing, &decision);
        assert!((entry.impact.get(StateField::DemandIndex) - 6.0).abs() < 1e-9);
        assert!((entry.impact.get(StateField::MarketShare) - 1.0).abs() < 1e-9);
        assert!((entry.impact.get(StateField::Costs) - 1_100_000.0).abs() < 1e-9);
        assert_eq!(entry.tier, RiskTier::Medium);
    }

    #[test]
    fn layoffs_cost_morale_and_employee_trust() {
        let decision = get_default_decision(Role::Operations).with("headcount_change", -20.0);
        let entry = decision_playbook(Role::Operations, &decision);
        assert!((entry.impact.get(StateField::Headcount) + 20.0).abs() < 1e-9);
        assert!((entry.impact.get(StateField::Costs) + 240_000.0).abs() < 1e-9);
        assert!(entry.impact.get(StateField::Morale) < 0.0);
        assert!(
            entry
                .reactions
                .iter()
                .any(|(id, label)| id == "employees" && label == ReactionLabel::Negative)
        );
    }

    #[test]
    fn minimal_audit_and_withholding_raise_regulatory_risk() {
        let decision = get_default_decision(Role::Compliance)
            .with("audit_depth", "minimal")
            .with("disclosure", "withhold");
        let entry = decision_playbook(Role::Compliance, &decision);
        assert!((entry.impact.get(StateField::RegulatoryRisk) - 9.0).abs() < 1e-9);
        assert!((entry.impact.get(StateField::CompliancePosture) + 6.0).abs() < 1e-9);
        assert_eq!(entry.tier, RiskTier::High);
    }

    #[test]
    fn training_is_relative_to_baseline_hours() {
        let decision = get_default_decision(Role::Compliance).with("training_hours", 18.0);
        let entry = decision_playbook(Role::Compliance, &decision);
        assert!((entry.impact.get(StateField::CompliancePosture) - 1.0).abs() < 1e-9);
        assert!((entry.impact.get(StateField::Costs) - 50_000.0).abs() < 1e-9);
    }

    #[test]
    fn roles_map_to_default_categories() {
        assert_eq!(default_category(Role::Strategy), EventCategory::Market);
        assert_eq!(default_category(Role::Marketing), EventCategory::Reputational);
        assert_eq!(default_category(Role::Operations), EventCategory::Operational);
        assert_eq!(default_category(Role::Compliance), EventCategory::Regulatory);
    }
}
