pub mod campaign;
pub mod policy;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use campaign::{CampaignRunner, CampaignSummary, SimulationPlan};
pub use policy::LeadershipStrategy;
pub use seeds::{SeedInfo, resolve_seed_inputs};
pub use tester::{LogicTester, ScenarioResult};
