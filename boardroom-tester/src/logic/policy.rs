use std::fmt;

use boardroom_engine::decision::{
    AUDIT_DEPTHS, DISCLOSURE_LEVELS, HIRING_PLANS, MARKETING_CHANNELS, OPTION_FIELD,
    PRICING_MOVES, RISK_POSTURES, STRATEGY_FOCUS,
};
use boardroom_engine::scenario::{RoundScript, ScenarioOption};
use boardroom_engine::{Decision, GameState, Role, get_default_decision};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Policy interface for automated leadership teams.
pub trait LeadershipPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Decision for `role` in the state's open round.
    fn decide(&mut self, state: &GameState, script: Option<&RoundScript>, role: Role) -> Decision;
}

/// Built-in team behaviours for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeadershipStrategy {
    /// Submit nothing; every role falls back to its default.
    Passive,
    Cautious,
    Growth,
    Scripted,
    Random,
}

impl LeadershipStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passive => "Passive",
            Self::Cautious => "Cautious",
            Self::Growth => "Growth",
            Self::Scripted => "Scripted",
            Self::Random => "Random",
        }
    }

    /// Passive teams never stage decisions.
    #[must_use]
    pub const fn submits(self) -> bool {
        !matches!(self, Self::Passive)
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn LeadershipPolicy + Send> {
        match self {
            Self::Passive => Box::new(PassivePolicy),
            Self::Cautious => Box::new(CautiousPolicy),
            Self::Growth => Box::new(GrowthPolicy),
            Self::Scripted => Box::new(ScriptedPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for LeadershipStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn role_options<'a>(
    script: Option<&'a RoundScript>,
    role: Role,
) -> impl Iterator<Item = &'a ScenarioOption> {
    script
        .into_iter()
        .flat_map(|script| script.options.iter())
        .filter(move |option| option.role == role)
}

fn with_option(decision: Decision, option: Option<&ScenarioOption>) -> Decision {
    match option {
        Some(option) => decision.with(OPTION_FIELD, option.id.as_str()),
        None => decision,
    }
}

struct PassivePolicy;
struct CautiousPolicy;
struct GrowthPolicy;
struct ScriptedPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, values: &[&'static str]) -> &'static str {
        values.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

impl LeadershipPolicy for PassivePolicy {
    fn name(&self) -> &'static str {
        "Passive"
    }

    fn decide(&mut self, _state: &GameState, _script: Option<&RoundScript>, role: Role) -> Decision {
        get_default_decision(role)
    }
}

impl LeadershipPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn decide(&mut self, state: &GameState, script: Option<&RoundScript>, role: Role) -> Decision {
        let base = match role {
            Role::Strategy => get_default_decision(role)
                .with("risk_posture", "conservative")
                .with("rnd_allocation", 20.0)
                .with("marketing_allocation", 20.0)
                .with("operations_allocation", 25.0)
                .with("reserve_allocation", 35.0),
            Role::Marketing => get_default_decision(role)
                .with("channel", "brand")
                .with("campaign_spend", 250_000.0),
            Role::Operations => get_default_decision(role).with("automation_investment", 20.0),
            Role::Compliance => {
                let depth = if state.company.open_findings > 0 {
                    "thorough"
                } else {
                    "standard"
                };
                get_default_decision(role)
                    .with("audit_depth", depth)
                    .with("training_hours", 16.0)
                    .with("disclosure", "full")
            }
        };
        let safest = role_options(script, role).min_by_key(|option| option.risk_tier);
        with_option(base, safest)
    }
}

impl LeadershipPolicy for GrowthPolicy {
    fn name(&self) -> &'static str {
        "Growth"
    }

    fn decide(&mut self, _state: &GameState, script: Option<&RoundScript>, role: Role) -> Decision {
        let base = match role {
            Role::Strategy => get_default_decision(role)
                .with("focus", "growth")
                .with("risk_posture", "aggressive")
                .with("rnd_allocation", 35.0)
                .with("marketing_allocation", 35.0)
                .with("operations_allocation", 20.0)
                .with("reserve_allocation", 10.0),
            Role::Marketing => get_default_decision(role)
                .with("channel", "digital")
                .with("campaign_spend", 1_500_000.0)
                .with("pricing", "discount"),
            Role::Operations => get_default_decision(role)
                .with("hiring", "expand")
                .with("headcount_change", 60.0)
                .with("automation_investment", 40.0),
            Role::Compliance => get_default_decision(role)
                .with("audit_depth", "minimal")
                .with("training_hours", 2.0),
        };
        let boldest = role_options(script, role).max_by_key(|option| option.risk_tier);
        with_option(base, boldest)
    }
}

impl LeadershipPolicy for ScriptedPolicy {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    fn decide(&mut self, _state: &GameState, script: Option<&RoundScript>, role: Role) -> Decision {
        with_option(get_default_decision(role), role_options(script, role).next())
    }
}

impl LeadershipPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn decide(&mut self, _state: &GameState, script: Option<&RoundScript>, role: Role) -> Decision {
        let base = match role {
            Role::Strategy => {
                let rnd = f64::from(self.rng.gen_range(0_u8..=100));
                let marketing = f64::from(self.rng.gen_range(0_u8..=100)).min(100.0 - rnd);
                let operations = (100.0 - rnd - marketing) / 2.0;
                Decision::new()
                    .with("focus", self.pick(STRATEGY_FOCUS))
                    .with("risk_posture", self.pick(RISK_POSTURES))
                    .with("rnd_allocation", rnd)
                    .with("marketing_allocation", marketing)
                    .with("operations_allocation", operations)
                    .with("reserve_allocation", 100.0 - rnd - marketing - operations)
            }
            Role::Marketing => Decision::new()
                .with("channel", self.pick(MARKETING_CHANNELS))
                .with(
                    "campaign_spend",
                    f64::from(self.rng.gen_range(0_u32..=2_000)) * 1_000.0,
                )
                .with("pricing", self.pick(PRICING_MOVES)),
            Role::Operations => Decision::new()
                .with("hiring", self.pick(HIRING_PLANS))
                .with(
                    "headcount_change",
                    f64::from(self.rng.gen_range(-100_i32..=100)),
                )
                .with(
                    "automation_investment",
                    f64::from(self.rng.gen_range(0_u8..=100)),
                ),
            Role::Compliance => Decision::new()
                .with("audit_depth", self.pick(AUDIT_DEPTHS))
                .with("training_hours", f64::from(self.rng.gen_range(0_u8..=40)))
                .with("disclosure", self.pick(DISCLOSURE_LEVELS)),
        };
        let options: Vec<&ScenarioOption> = role_options(script, role).collect();
        let choice = if self.rng.gen_bool(0.75) {
            options.choose(&mut self.rng).copied()
        } else {
            None
        };
        with_option(base, choice)
    }
}
