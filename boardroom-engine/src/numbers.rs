//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a pool length into the inclusive upper bound used for index draws.
#[must_use]
pub fn last_index_i64(len: usize) -> i64 {
    cast::<usize, i64>(len.saturating_sub(1)).unwrap_or(i64::MAX)
}

/// Convert a drawn index back into a slice position.
#[must_use]
pub fn index_from_i64(value: i64) -> usize {
    cast::<i64, usize>(value).unwrap_or(0)
}
