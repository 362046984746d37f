use anyhow::{Result, bail};
use boardroom_engine::seed::{parse_seed, seed_from_run_id, seed_label};
use std::collections::HashSet;

/// Seeds expanded by the `sweep` (or `all`) keyword.
pub const SWEEP_SIZE: u64 = 100;

const FALLBACK_SEED: u64 = 12_345;

/// Resolved seed plus the token it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    pub run_id: Option<String>,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self { seed, run_id: None }
    }

    #[must_use]
    pub fn from_run_id(run_id: &str) -> Self {
        Self {
            seed: seed_from_run_id(run_id),
            run_id: Some(run_id.to_string()),
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        match &self.run_id {
            Some(run_id) => format!("{} ({run_id})", seed_label(self.seed)),
            None => self.seed.to_string(),
        }
    }
}

/// Resolve CLI seed tokens into concrete seeds.
///
/// Accepts decimal or `0x` hex literals, `run:<id>` to derive the seed a run
/// id would get, and the keywords `sweep` / `all` for seeds `1..=100`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if token.eq_ignore_ascii_case("sweep") || token.eq_ignore_ascii_case("all") {
            pending.extend((1..=SWEEP_SIZE).map(SeedInfo::from_numeric));
            continue;
        }

        if let Some(run_id) = token.strip_prefix("run:") {
            if run_id.is_empty() {
                bail!("Empty run id in seed token: {token}");
            }
            pending.push(SeedInfo::from_run_id(run_id));
            continue;
        }

        if let Some(seed) = parse_seed(token) {
            pending.push(SeedInfo::from_numeric(seed));
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    let mut seen = HashSet::new();
    let mut deduped: Vec<SeedInfo> = pending
        .into_iter()
        .filter(|info| seen.insert(info.seed))
        .collect();

    if deduped.is_empty() {
        deduped.push(SeedInfo::from_numeric(FALLBACK_SEED));
    }

    Ok(deduped)
}
