//! Weighted round scorecard.
//!
//! Five component scores in `[0, 100]` are combined with domain weights, then
//! reduced by open-finding deductions before grading.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    DEFAULT_FINDING_PENALTY, DEFAULT_SCORE_CEILING, EXPERIENCE_RAMP_ROUNDS,
    PENALTY_DOLLARS_PER_POINT, RUNWAY_POINTS_PER_ROUND, SCORE_MAX, SCORE_MIN,
    WEIGHT_SUM_TOLERANCE,
};
use crate::domain::DomainConfigError;
use crate::state::{CompanyState, MarketState, RiskState};

/// Letter grade for a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    #[default]
    F,
}

impl Grade {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive rating paired with a grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Exceptional,
    Strong,
    Solid,
    Developing,
    Struggling,
    #[default]
    Critical,
}

impl Rating {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exceptional => "Exceptional",
            Self::Strong => "Strong",
            Self::Solid => "Solid",
            Self::Developing => "Developing",
            Self::Struggling => "Struggling",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const RATING_BANDS: &[(f64, Grade, Rating)] = &[
    (85.0, Grade::APlus, Rating::Exceptional),
    (75.0, Grade::A, Rating::Strong),
    (65.0, Grade::B, Rating::Solid),
    (55.0, Grade::C, Rating::Developing),
    (40.0, Grade::D, Rating::Struggling),
];

/// Map a total score onto the rating table.
#[must_use]
pub fn rating_for(total_score: f64) -> (Grade, Rating) {
    RATING_BANDS
        .iter()
        .find(|(floor, _, _)| total_score >= *floor)
        .map_or((Grade::F, Rating::Critical), |&(_, grade, rating)| {
            (grade, rating)
        })
}

/// Relative weight of each scorecard dimension; must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub financial_health: f64,
    pub growth: f64,
    pub trust: f64,
    pub resilience: f64,
    pub execution: f64,
}

impl ScoreWeights {
    #[must_use]
    pub const fn new(
        financial_health: f64,
        growth: f64,
        trust: f64,
        resilience: f64,
        execution: f64,
    ) -> Self {
        Self {
            financial_health,
            growth,
            trust,
            resilience,
            execution,
        }
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.financial_health + self.growth + self.trust + self.resilience + self.execution
    }

    /// # Errors
    ///
    /// Returns an error when a weight is negative or the weights do not sum to 1.
    pub fn validate(&self) -> Result<(), DomainConfigError> {
        for (field, value) in [
            ("weights.financial_health", self.financial_health),
            ("weights.growth", self.growth),
            ("weights.trust", self.trust),
            ("weights.resilience", self.resilience),
            ("weights.execution", self.execution),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainConfigError::NegativeValue { field, value });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(DomainConfigError::WeightSum { sum });
        }
        Ok(())
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::new(0.25, 0.2, 0.2, 0.2, 0.15)
    }
}

/// Weights and deduction parameters used to total a scorecard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default = "ScoringConfig::default_finding_penalty")]
    pub finding_penalty: f64,
    #[serde(default = "ScoringConfig::default_score_ceiling")]
    pub score_ceiling: f64,
}

impl ScoringConfig {
    const fn default_finding_penalty() -> f64 {
        DEFAULT_FINDING_PENALTY
    }

    const fn default_score_ceiling() -> f64 {
        DEFAULT_SCORE_CEILING
    }

    /// # Errors
    ///
    /// Returns an error when weights, penalty, or ceiling are out of bounds.
    pub fn validate(&self) -> Result<(), DomainConfigError> {
        self.weights.validate()?;
        if !self.finding_penalty.is_finite() || self.finding_penalty < 0.0 {
            return Err(DomainConfigError::NegativeValue {
                field: "finding_penalty",
                value: self.finding_penalty,
            });
        }
        if !self.score_ceiling.is_finite() || self.score_ceiling <= 0.0 {
            return Err(DomainConfigError::NonPositive {
                field: "score_ceiling",
                value: self.score_ceiling,
            });
        }
        Ok(())
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            finding_penalty: Self::default_finding_penalty(),
            score_ceiling: Self::default_score_ceiling(),
        }
    }
}

/// Multi-dimensional performance summary recomputed after every round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Scorecard {
    pub financial_health: f64,
    pub growth: f64,
    pub trust: f64,
    pub resilience: f64,
    pub execution: f64,
    #[serde(default)]
    pub deductions: f64,
    pub total_score: f64,
    pub rating: Rating,
    pub grade: Grade,
}

fn bounded(value: f64) -> f64 {
    if value.is_nan() {
        return SCORE_MIN;
    }
    value.clamp(SCORE_MIN, SCORE_MAX)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() <= f64::EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

/// Financial health from margin, runway, and financial risk.
#[must_use]
pub fn financial_health(company: &CompanyState, risk: &RiskState) -> f64 {
    let margin = bounded(200.0f64.mul_add(ratio(company.profit, company.revenue), 50.0));
    let runway = bounded(RUNWAY_POINTS_PER_ROUND * ratio(company.cash, company.costs));
    bounded(0.4 * margin + 0.35 * runway + 0.25 * (100.0 - risk.financial))
}

#[must_use]
pub fn growth(company: &CompanyState, market: &MarketState) -> f64 {
    bounded(
        0.35 * bounded(market.demand_index - 50.0)
            + 0.35 * bounded(2.5 * company.market_share)
            + 0.3 * company.product_quality,
    )
}

#[must_use]
pub fn trust(company: &CompanyState, risk: &RiskState) -> f64 {
    bounded(
        0.4 * company.brand_trust
            + 0.35 * company.stakeholder_confidence
            + 0.25 * (100.0 - risk.reputational),
    )
}

#[must_use]
pub fn resilience(company: &CompanyState, risk: &RiskState) -> f64 {
    bounded(0.6 * (100.0 - risk.mean()) + 0.4 * company.compliance_posture)
}

/// Execution blends efficiency, morale, and experience gained over rounds.
#[must_use]
pub fn execution(company: &CompanyState, round: u32) -> f64 {
    let rounds = f64::from(round);
    let experience = 100.0 * rounds / (rounds + EXPERIENCE_RAMP_ROUNDS);
    bounded(0.45 * company.operational_efficiency + 0.35 * company.morale + 0.2 * experience)
}

/// Scorecard under the default scoring configuration.
#[must_use]
pub fn calculate_scorecard(
    company: &CompanyState,
    market: &MarketState,
    risk: &RiskState,
    round: u32,
) -> Scorecard {
    calculate_scorecard_with(company, market, risk, round, &ScoringConfig::default())
}

/// Scorecard under an explicit scoring configuration.
#[must_use]
pub fn calculate_scorecard_with(
    company: &CompanyState,
    market: &MarketState,
    risk: &RiskState,
    round: u32,
    config: &ScoringConfig,
) -> Scorecard {
    let financial_health = financial_health(company, risk);
    let growth = growth(company, market);
    let trust = trust(company, risk);
    let resilience = resilience(company, risk);
    let execution = execution(company, round);

    let weights = &config.weights;
    let weighted = weights.financial_health * financial_health
        + weights.growth * growth
        + weights.trust * trust
        + weights.resilience * resilience
        + weights.execution * execution;
    let deductions = f64::from(company.open_findings) * config.finding_penalty
        + company.regulatory_penalties / PENALTY_DOLLARS_PER_POINT;
    let raw_total = weighted - deductions;
    let total_score = if raw_total.is_nan() {
        0.0
    } else {
        raw_total.clamp(0.0, config.score_ceiling.max(0.0))
    };
    let (grade, rating) = rating_for(total_score);

    Scorecard {
        financial_health,
        growth,
        trust,
        resilience,
        execution,
        deductions,
        total_score,
        rating,
        grade,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> (CompanyState, MarketState, RiskState) {
        (
            CompanyState::default(),
            MarketState::default(),
            RiskState::default(),
        )
    }

    #[test]
    fn rating_bands_follow_thresholds() {
        assert_eq!(rating_for(92.0), (Grade::APlus, Rating::Exceptional));
        assert_eq!(rating_for(85.0), (Grade::APlus, Rating::Exceptional));
        assert_eq!(rating_for(84.99), (Grade::A, Rating::Strong));
        assert_eq!(rating_for(65.0), (Grade::B, Rating::Solid));
        assert_eq!(rating_for(55.0), (Grade::C, Rating::Developing));
        assert_eq!(rating_for(40.0), (Grade::D, Rating::Struggling));
        assert_eq!(rating_for(39.9), (Grade::F, Rating::Critical));
        assert_eq!(rating_for(0.0), (Grade::F, Rating::Critical));
    }

    #[test]
    fn baseline_scores_land_in_range() {
        let (company, market, risk) = baseline();
        let card = calculate_scorecard(&company, &market, &risk, 1);
        for value in [
            card.financial_health,
            card.growth,
            card.trust,
            card.resilience,
            card.execution,
            card.total_score,
        ] {
            assert!((0.0..=100.0).contains(&value), "{value}");
        }
        assert_eq!(rating_for(card.total_score), (card.grade, card.rating));
    }

    #[test]
    fn growth_formula_matches_components() {
        let (company, market, _) = baseline();
        let expected = 0.35 * 50.0 + 0.35 * 45.0 + 0.3 * 60.0;
        assert!((growth(&company, &market) - expected).abs() < 1e-9);
    }

    #[test]
    fn execution_ramps_with_rounds() {
        let (company, _, _) = baseline();
        assert!(execution(&company, 8) > execution(&company, 1));
        let expected = 0.45 * 60.0 + 0.35 * 65.0 + 0.2 * (100.0 / 3.0);
        assert!((execution(&company, 1) - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_revenue_and_costs_do_not_produce_nan() {
        let (mut company, market, risk) = baseline();
        company.revenue = 0.0;
        company.costs = 0.0;
        company.reconcile_profit();
        let card = calculate_scorecard(&company, &market, &risk, 3);
        assert!(card.financial_health.is_finite());
        assert!(card.total_score.is_finite());
    }

    #[test]
    fn findings_and_penalties_deduct_from_total() {
        let (mut company, market, risk) = baseline();
        let clean = calculate_scorecard(&company, &market, &risk, 2);
        company.open_findings = 2;
        company.regulatory_penalties = 3_000_000.0;
        let penalised = calculate_scorecard(&company, &market, &risk, 2);
        assert!((penalised.deductions - 8.0).abs() < 1e-9);
        assert!((clean.total_score - penalised.total_score - 8.0).abs() < 1e-9);
    }

    #[test]
    fn total_never_drops_below_zero() {
        let (mut company, market, mut risk) = baseline();
        company.open_findings = 100;
        company.regulatory_penalties = 1e12;
        company.cash = -1e9;
        risk.financial = 100.0;
        let card = calculate_scorecard(&company, &market, &risk, 1);
        assert!(card.total_score.abs() < f64::EPSILON);
        assert_eq!(card.grade, Grade::F);
    }

    #[test]
    fn ceiling_caps_total() {
        let (company, market, risk) = baseline();
        let config = ScoringConfig {
            score_ceiling: 10.0,
            ..ScoringConfig::default()
        };
        let card = calculate_scorecard_with(&company, &market, &risk, 4, &config);
        assert!((card.total_score - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn weights_must_sum_to_one() {
        assert!(ScoreWeights::default().validate().is_ok());
        let skewed = ScoreWeights::new(0.5, 0.5, 0.5, 0.0, 0.0);
        assert!(matches!(
            skewed.validate(),
            Err(DomainConfigError::WeightSum { .. })
        ));
        let negative = ScoreWeights::new(1.2, -0.2, 0.0, 0.0, 0.0);
        assert!(matches!(
            negative.validate(),
            Err(DomainConfigError::NegativeValue { .. })
        ));
    }

    #[test]
    fn grade_serializes_with_plus() {
        assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
        assert_eq!(serde_json::to_string(&Rating::Strong).unwrap(), "\"strong\"");
    }
}
