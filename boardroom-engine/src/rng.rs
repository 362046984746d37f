//! Seeded random streams keyed by `(seed, round)`.
//!
//! Each stream key is HMAC-SHA256 over a domain tag and the round number, keyed
//! by the run seed. The 32-byte digest seeds a ChaCha20 generator, so the draws
//! for round N never depend on how many values earlier rounds consumed.

use hmac::{Hmac, Mac};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

use crate::constants::{RNG_TAG_EVENTS, RNG_TAG_MARKET};

/// Independent stream families derived from the same `(seed, round)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RngStream {
    /// Event triggers and event selection.
    Events,
    /// Natural market movement between rounds.
    Market,
}

impl RngStream {
    const fn domain_tag(self) -> &'static [u8] {
        match self {
            Self::Events => RNG_TAG_EVENTS,
            Self::Market => RNG_TAG_MARKET,
        }
    }
}

/// Deterministic random stream with draw accounting.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: ChaCha20Rng,
    seed: u64,
    round: u32,
    draws: u64,
}

impl SeededRng {
    /// Build the stream for one stream family of a round.
    #[must_use]
    pub fn for_stream(seed: u64, round: u32, stream: RngStream) -> Self {
        let key = derive_stream_key(seed, round, stream.domain_tag());
        log::trace!("rng stream {stream:?} derived for seed {seed} round {round}");
        Self {
            rng: ChaCha20Rng::from_seed(key),
            seed,
            round,
            draws: 0,
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.r#gen::<f64>()
    }

    /// Uniform integer draw in `[min, max]`.
    ///
    /// # Panics
    ///
    /// Panics when `min > max`; out-of-order bounds are a caller bug.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        assert!(min <= max, "next_int bounds out of order: {min} > {max}");
        self.draws = self.draws.saturating_add(1);
        self.rng.gen_range(min..=max)
    }

    /// Bernoulli draw. `chance(0.0)` is always false and `chance(1.0)` always true.
    pub fn chance(&mut self, probability: f64) -> bool {
        if !probability.is_finite() {
            return false;
        }
        let p = probability.clamp(0.0, 1.0);
        self.next() < p
    }

    /// Seed this stream was derived from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Round this stream was derived for.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

/// Event stream for `(seed, round)`.
#[must_use]
pub fn create_rng(seed: u64, round: u32) -> SeededRng {
    SeededRng::for_stream(seed, round, RngStream::Events)
}

fn derive_stream_key(seed: u64, round: u32, domain_tag: &[u8]) -> [u8; 32] {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    mac.update(&round.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_seeds_produce_identical_sequences() {
        let mut a = create_rng(12_345, 3);
        let mut b = create_rng(12_345, 3);
        for _ in 0..64 {
            assert_eq!(a.next().to_bits(), b.next().to_bits());
            assert_eq!(a.next_int(-5, 5), b.next_int(-5, 5));
        }
        assert_eq!(a.draws(), 128);
    }

    #[test]
    fn rounds_and_streams_are_independent() {
        let mut round_one = create_rng(7, 1);
        let mut round_two = create_rng(7, 2);
        let mut market = SeededRng::for_stream(7, 1, RngStream::Market);
        let first = round_one.next();
        assert_ne!(first.to_bits(), round_two.next().to_bits());
        assert_ne!(first.to_bits(), market.next().to_bits());
        assert_ne!(
            derive_stream_key(7, 1, RNG_TAG_EVENTS),
            derive_stream_key(7, 1, RNG_TAG_MARKET),
            "domain tags must derive distinct keys"
        );
    }

    #[test]
    fn round_stream_ignores_prior_consumption() {
        let mut consumed = create_rng(99, 4);
        for _ in 0..10 {
            let _ = consumed.next();
        }
        let mut fresh = create_rng(99, 5);
        let mut again = create_rng(99, 5);
        assert_eq!(fresh.next().to_bits(), again.next().to_bits());
    }

    #[test]
    fn next_stays_in_unit_interval() {
        let mut rng = create_rng(1, 1);
        for _ in 0..1_000 {
            let value = rng.next();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn next_int_is_inclusive() {
        let mut rng = create_rng(2, 1);
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..500 {
            let value = rng.next_int(0, 3);
            assert!((0..=3).contains(&value));
            seen_min |= value == 0;
            seen_max |= value == 3;
        }
        assert!(seen_min && seen_max);
        assert_eq!(rng.next_int(4, 4), 4);
    }

    #[test]
    fn chance_edges_are_exact() {
        let mut rng = create_rng(3, 1);
        for _ in 0..1_000 {
            assert!(!rng.chance(0.0));
            assert!(rng.chance(1.0));
        }
        assert!(!rng.chance(f64::NAN));
        assert!(rng.chance(5.0));
        assert!(!rng.chance(-1.0));
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn next_int_rejects_inverted_bounds() {
        let mut rng = create_rng(4, 1);
        let _ = rng.next_int(5, 1);
    }

    #[test]
    fn accessors_report_origin() {
        let rng = create_rng(42, 6);
        assert_eq!(rng.seed(), 42);
        assert_eq!(rng.round(), 6);
        assert_eq!(rng.draws(), 0);
    }
}
