//! Engine-level error taxonomy.

use thiserror::Error;

use crate::decision::{DecisionError, Role};
use crate::domain::DomainConfigError;

/// Errors raised by the public state-transition API.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// A role name that no schema exists for.
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    /// A scenario id the lookup cannot resolve.
    #[error("unknown scenario `{0}`")]
    UnknownScenario(String),
    /// The decision failed schema validation; state is untouched.
    #[error(transparent)]
    Decision(#[from] DecisionError),
    /// The scenario's domain configuration is invalid.
    #[error("invalid domain configuration: {0}")]
    Config(#[from] DomainConfigError),
    /// The run already completed and is immutable.
    #[error("run `{run_id}` is complete; {role} decision rejected")]
    RunComplete { run_id: String, role: Role },
}
