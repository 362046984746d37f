//! Seed derivation and parsing.

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash = (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Seed used when a run is created without one.
#[must_use]
pub fn seed_from_run_id(run_id: &str) -> u64 {
    let mut buf = Vec::with_capacity(run_id.len() + 10);
    buf.extend_from_slice(b"BOARDROOM-");
    buf.extend_from_slice(run_id.as_bytes());
    fnv1a64(&buf)
}

/// Parse a seed written as decimal or `0x`-prefixed hex. Underscores are ignored.
#[must_use]
pub fn parse_seed(token: &str) -> Option<u64> {
    let cleaned: String = token.trim().chars().filter(|c| *c != '_').collect();
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok();
    }
    cleaned.parse().ok()
}

/// Short display form of a seed.
#[must_use]
pub fn seed_label(seed: u64) -> String {
    format!("{seed:#018x}")
}
