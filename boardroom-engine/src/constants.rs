//! Centralized balance and tuning constants for the simulation core.
//!
//! These values define the deterministic math of every round. Domain presets
//! can scale some of them, but the base numbers only change through reviewed
//! code edits rather than scenario data.

// Scenario defaults ----------------------------------------------------------
pub const DEFAULT_SCENARIO_ID: &str = "lumina-assist";
pub const DEFAULT_MAX_ROUNDS: u32 = 8;
pub const MAX_ROUNDS_CEILING: u32 = 24;

// RNG domain tags ------------------------------------------------------------
pub(crate) const RNG_TAG_EVENTS: &[u8] = b"boardroom.events";
pub(crate) const RNG_TAG_MARKET: &[u8] = b"boardroom.market";

// Event tuning ---------------------------------------------------------------
pub const MAX_EVENTS_PER_ROUND: usize = 2;
pub(crate) const EVENT_DAMPENING: f64 = 0.8;
pub(crate) const PRESSURE_TRIGGER_THRESHOLD: f64 = 60.0;
pub(crate) const PRESSURE_HIGH_THRESHOLD: f64 = 75.0;
pub(crate) const PRESSURE_VERY_HIGH_THRESHOLD: f64 = 90.0;
pub(crate) const COMPLIANCE_PRESSURE_CEILING: f64 = 40.0;
pub(crate) const FINDINGS_RESOLVED_PER_AUDIT: usize = 2;

// Derived-rule tuning --------------------------------------------------------
pub(crate) const SHOCK_THRESHOLD: f64 = 10.0;
pub(crate) const COMPLIANCE_SHOCK_FACTOR: f64 = 0.5;
pub(crate) const BRAND_DAMAGE_FACTOR: f64 = 0.5;
pub(crate) const MORALE_ATTRITION_FACTOR: f64 = 0.4;
pub(crate) const CASH_STRESS_RISK: f64 = 10.0;

// Market tuning --------------------------------------------------------------
pub const MARKET_BASELINE: f64 = 100.0;
pub const MARKET_DRIFT_LIMIT: f64 = 12.0;
pub(crate) const MARKET_MOVEMENT_SPAN: f64 = 4.0;

// Scorecard tuning -----------------------------------------------------------
pub(crate) const SCORE_MIN: f64 = 0.0;
pub(crate) const SCORE_MAX: f64 = 100.0;
pub(crate) const DEFAULT_SCORE_CEILING: f64 = 100.0;
pub(crate) const DEFAULT_FINDING_PENALTY: f64 = 2.5;
pub(crate) const PENALTY_DOLLARS_PER_POINT: f64 = 1_000_000.0;
pub(crate) const RUNWAY_POINTS_PER_ROUND: f64 = 12.5;
pub(crate) const EXPERIENCE_RAMP_ROUNDS: f64 = 2.0;

// Validation -----------------------------------------------------------------
pub const ALLOCATION_TOTAL: f64 = 100.0;
pub(crate) const ALLOCATION_TOLERANCE: f64 = 1e-9;
pub(crate) const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
