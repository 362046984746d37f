//! Role decisions: schemas, validation, and neutral defaults.
//!
//! A decision is an ordered map of field name to value. Each role has a fixed
//! schema; validation walks the schema fields in declaration order, then the
//! composite groups, then any unexpected keys in lexicographic order, and
//! reports the first violation it meets. Because the decision map is ordered,
//! the caller's insertion order never changes the outcome.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{ALLOCATION_TOLERANCE, ALLOCATION_TOTAL};
use crate::error::EngineError;

/// Decision-making seat. Declaration order is the fixed application order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Strategy,
    Marketing,
    Operations,
    Compliance,
}

impl Role {
    /// Every role in application order.
    pub const ALL: &'static [Self] = &[
        Self::Strategy,
        Self::Marketing,
        Self::Operations,
        Self::Compliance,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Marketing => "marketing",
            Self::Operations => "operations",
            Self::Compliance => "compliance",
        }
    }

    #[must_use]
    pub fn schema(self) -> &'static RoleSchema {
        match self {
            Self::Strategy => &STRATEGY_SCHEMA,
            Self::Marketing => &MARKETING_SCHEMA,
            Self::Operations => &OPERATIONS_SCHEMA,
            Self::Compliance => &COMPLIANCE_SCHEMA,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strategy" => Ok(Self::Strategy),
            "marketing" => Ok(Self::Marketing),
            "operations" => Ok(Self::Operations),
            "compliance" => Ok(Self::Compliance),
            other => Err(EngineError::UnknownRole(other.to_string())),
        }
    }
}

/// A single decision value: a closed-set choice or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecisionValue {
    Number(f64),
    Text(String),
}

impl From<f64> for DecisionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for DecisionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DecisionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Field map submitted for one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Decision(BTreeMap<String, DecisionValue>);

impl Decision {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: &str, value: impl Into<DecisionValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<DecisionValue>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<DecisionValue> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&DecisionValue> {
        self.0.get(field)
    }

    /// Text value of a field, if present and textual.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.0.get(field) {
            Some(DecisionValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Numeric value of a field, if present and numeric.
    #[must_use]
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.0.get(field) {
            Some(DecisionValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    /// Scenario option chosen alongside the schema fields.
    #[must_use]
    pub fn option_id(&self) -> Option<&str> {
        self.text(OPTION_FIELD)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &DecisionValue)> {
        self.0.iter()
    }
}

/// Name of the optional field referencing a scenario option.
pub const OPTION_FIELD: &str = "option";

/// Value shape accepted by a schema field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Closed set of string values.
    Choice(&'static [&'static str]),
    /// Inclusive numeric range.
    Number { min: f64, max: f64 },
    /// Free-form identifier.
    Reference,
}

/// One field of a role schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    const fn choice(name: &'static str, values: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::Choice(values),
            required: true,
        }
    }

    const fn number(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            kind: FieldKind::Number { min, max },
            required: true,
        }
    }

    const fn option() -> Self {
        Self {
            name: OPTION_FIELD,
            kind: FieldKind::Reference,
            required: false,
        }
    }
}

/// Named numeric fields that must sum to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationGroup {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

/// Fixed schema for one role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleSchema {
    pub fields: &'static [FieldSpec],
    pub allocations: &'static [AllocationGroup],
}

impl RoleSchema {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }
}

pub const STRATEGY_FOCUS: &[&str] = &["steady", "growth", "efficiency", "innovation"];
pub const RISK_POSTURES: &[&str] = &["conservative", "balanced", "aggressive"];
pub const MARKETING_CHANNELS: &[&str] = &["none", "digital", "brand", "partnerships"];
pub const PRICING_MOVES: &[&str] = &["discount", "hold", "premium"];
pub const HIRING_PLANS: &[&str] = &["freeze", "steady", "expand"];
pub const AUDIT_DEPTHS: &[&str] = &["minimal", "standard", "thorough"];
pub const DISCLOSURE_LEVELS: &[&str] = &["withhold", "partial", "full"];

pub const CAPITAL_ALLOCATION_FIELDS: &[&str] = &[
    "rnd_allocation",
    "marketing_allocation",
    "operations_allocation",
    "reserve_allocation",
];

pub const MAX_CAMPAIGN_SPEND: f64 = 2_000_000.0;
pub const BASELINE_TRAINING_HOURS: f64 = 8.0;

static STRATEGY_SCHEMA: RoleSchema = RoleSchema {
    fields: &[
        FieldSpec::choice("focus", STRATEGY_FOCUS),
        FieldSpec::choice("risk_posture", RISK_POSTURES),
        FieldSpec::number("rnd_allocation", 0.0, 100.0),
        FieldSpec::number("marketing_allocation", 0.0, 100.0),
        FieldSpec::number("operations_allocation", 0.0, 100.0),
        FieldSpec::number("reserve_allocation", 0.0, 100.0),
        FieldSpec::option(),
    ],
    allocations: &[AllocationGroup {
        name: "capital_allocation",
        fields: CAPITAL_ALLOCATION_FIELDS,
    }],
};

static MARKETING_SCHEMA: RoleSchema = RoleSchema {
    fields: &[
        FieldSpec::choice("channel", MARKETING_CHANNELS),
        FieldSpec::number("campaign_spend", 0.0, MAX_CAMPAIGN_SPEND),
        FieldSpec::choice("pricing", PRICING_MOVES),
        FieldSpec::option(),
    ],
    allocations: &[],
};

static OPERATIONS_SCHEMA: RoleSchema = RoleSchema {
    fields: &[
        FieldSpec::choice("hiring", HIRING_PLANS),
        FieldSpec::number("headcount_change", -100.0, 100.0),
        FieldSpec::number("automation_investment", 0.0, 100.0),
        FieldSpec::option(),
    ],
    allocations: &[],
};

static COMPLIANCE_SCHEMA: RoleSchema = RoleSchema {
    fields: &[
        FieldSpec::choice("audit_depth", AUDIT_DEPTHS),
        FieldSpec::number("training_hours", 0.0, 40.0),
        FieldSpec::choice("disclosure", DISCLOSURE_LEVELS),
        FieldSpec::option(),
    ],
    allocations: &[],
};

/// First schema violation found in a decision.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecisionError {
    #[error("{role}: missing required field `{field}`")]
    MissingField { role: Role, field: &'static str },
    #[error("{role}: field `{field}` expects {expected}")]
    TypeMismatch {
        role: Role,
        field: &'static str,
        expected: &'static str,
    },
    #[error("{role}: `{value}` is not a valid `{field}` (allowed: {allowed})")]
    InvalidChoice {
        role: Role,
        field: &'static str,
        value: String,
        allowed: String,
    },
    #[error("{role}: `{field}` must be between {min} and {max} (got {value})")]
    OutOfRange {
        role: Role,
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{role}: `{group}` must sum to {expected} (got {actual})")]
    AllocationSum {
        role: Role,
        group: &'static str,
        expected: f64,
        actual: f64,
    },
    #[error("{role}: unknown field `{field}`")]
    UnknownField { role: Role, field: String },
}

/// Validate a decision against the role's schema.
///
/// # Errors
///
/// Returns the first `DecisionError` in documented field order.
pub fn validate_decision_for_role(role: Role, decision: &Decision) -> Result<(), DecisionError> {
    let schema = role.schema();
    for spec in schema.fields {
        validate_field(role, spec, decision.get(spec.name))?;
    }
    for group in schema.allocations {
        validate_allocation(role, group, decision)?;
    }
    if let Some((field, _)) = decision
        .fields()
        .find(|(name, _)| schema.field(name).is_none())
    {
        return Err(DecisionError::UnknownField {
            role,
            field: field.clone(),
        });
    }
    Ok(())
}

fn validate_field(
    role: Role,
    spec: &FieldSpec,
    value: Option<&DecisionValue>,
) -> Result<(), DecisionError> {
    let Some(value) = value else {
        if spec.required {
            return Err(DecisionError::MissingField {
                role,
                field: spec.name,
            });
        }
        return Ok(());
    };
    match (spec.kind, value) {
        (FieldKind::Choice(allowed), DecisionValue::Text(text)) => {
            if allowed.contains(&text.as_str()) {
                Ok(())
            } else {
                Err(DecisionError::InvalidChoice {
                    role,
                    field: spec.name,
                    value: text.clone(),
                    allowed: allowed.join(", "),
                })
            }
        }
        (FieldKind::Number { min, max }, DecisionValue::Number(number)) => {
            if number.is_finite() && (min..=max).contains(number) {
                Ok(())
            } else {
                Err(DecisionError::OutOfRange {
                    role,
                    field: spec.name,
                    min,
                    max,
                    value: *number,
                })
            }
        }
        (FieldKind::Reference, DecisionValue::Text(_)) => Ok(()),
        (FieldKind::Number { .. }, DecisionValue::Text(_)) => Err(DecisionError::TypeMismatch {
            role,
            field: spec.name,
            expected: "a number",
        }),
        (FieldKind::Choice(_) | FieldKind::Reference, DecisionValue::Number(_)) => {
            Err(DecisionError::TypeMismatch {
                role,
                field: spec.name,
                expected: "a string",
            })
        }
    }
}

fn validate_allocation(
    role: Role,
    group: &AllocationGroup,
    decision: &Decision,
) -> Result<(), DecisionError> {
    let actual: f64 = group
        .fields
        .iter()
        .filter_map(|field| decision.number(field))
        .sum();
    if (actual - ALLOCATION_TOTAL).abs() > ALLOCATION_TOLERANCE {
        return Err(DecisionError::AllocationSum {
            role,
            group: group.name,
            expected: ALLOCATION_TOTAL,
            actual,
        });
    }
    Ok(())
}

/// Neutral, status-quo decision used when a role submits nothing.
#[must_use]
pub fn get_default_decision(role: Role) -> Decision {
    match role {
        Role::Strategy => Decision::new()
            .with("focus", "steady")
            .with("risk_posture", "balanced")
            .with("rnd_allocation", 25.0)
            .with("marketing_allocation", 25.0)
            .with("operations_allocation", 25.0)
            .with("reserve_allocation", 25.0),
        Role::Marketing => Decision::new()
            .with("channel", "none")
            .with("campaign_spend", 0.0)
            .with("pricing", "hold"),
        Role::Operations => Decision::new()
            .with("hiring", "steady")
            .with("headcount_change", 0.0)
            .with("automation_investment", 0.0),
        Role::Compliance => Decision::new()
            .with("audit_depth", "standard")
            .with("training_hours", BASELINE_TRAINING_HOURS)
            .with("disclosure", "partial"),
    }
}
