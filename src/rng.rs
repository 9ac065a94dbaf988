//! Bounded pseudo-random sampling for synthetic proof metrics, based on PCG32.
//!
//! Fallback-mode proofs report cycle counts, constraint counts, and trace sizes
//! that no real proving backend produced. Those values are drawn from the fixed
//! ranges documented on [`SyntheticRanges`], using this minimal PCG32 generator
//! rather than the `rand` crate: the sampling needs are two methods, and the
//! generator must be cheaply seedable from timing entropy without pulling in
//! transitive dependencies.
//!
//! PCG32 (the PCG-XSH-RR variant, 64-bit state, 32-bit output) is statistically
//! solid for this purpose but NOT cryptographically secure.
//!
//! Reference: <https://www.pcg-random.org/>
//!
//! [`SyntheticRanges`]: crate::profile::SyntheticRanges

use std::ops::Range;

/// Default increment for single-stream PCG32, from the PCG reference paper.
const PCG_DEFAULT_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// Standard multiplier for the 64-bit-state LCG step.
const PCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// PCG32 generator used to fill synthetic metric fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsRng {
    state: u64,
    inc: u64,
}

impl MetricsRng {
    /// Creates a generator from a 64-bit seed.
    ///
    /// Identical seeds produce identical sequences, which the tests rely on.
    #[must_use]
    pub const fn seed_from_u64(seed: u64) -> Self {
        // Standard PCG seeding: zero state, advance, add seed, advance.
        let inc = (PCG_DEFAULT_INCREMENT << 1) | 1;
        let mut state: u64 = 0;
        state = state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(inc);
        state = state.wrapping_add(seed);
        state = state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(inc);
        Self { state, inc }
    }

    /// Creates a generator seeded from system timing.
    ///
    /// Sufficient entropy for non-deterministic-looking metrics; not suitable
    /// for anything security-sensitive.
    #[must_use]
    pub fn from_entropy() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self::seed_from_u64((now.as_millis() as u64) ^ (u64::from(now.subsec_nanos()) << 32))
    }

    /// Generates the next 32-bit value (PCG-XSH-RR output permutation).
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state
            .wrapping_mul(PCG_MULTIPLIER)
            .wrapping_add(self.inc);
        let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Generates a value in `[range.start, range.end)` without modulo bias.
    ///
    /// An empty range is a configuration bug; it is reported at `warn` and
    /// `range.start` is returned.
    pub fn sample(&mut self, range: Range<u32>) -> u32 {
        let span = range.end.wrapping_sub(range.start);
        if span == 0 {
            tracing::warn!(
                start = range.start,
                end = range.end,
                "sample called with empty range"
            );
            return range.start;
        }

        // Rejection sampling to avoid bias
        let threshold = span.wrapping_neg() % span;
        loop {
            let value = self.next_u32();
            if value >= threshold {
                return range.start.wrapping_add(value % span);
            }
        }
    }

    /// Generates a value in `[range.start, range.end)` for 64-bit ranges.
    ///
    /// Same empty-range behavior as [`sample`](Self::sample).
    pub fn sample_u64(&mut self, range: Range<u64>) -> u64 {
        let span = range.end.wrapping_sub(range.start);
        if span == 0 {
            tracing::warn!(
                start = range.start,
                end = range.end,
                "sample_u64 called with empty range"
            );
            return range.start;
        }

        let threshold = span.wrapping_neg() % span;
        loop {
            let high = u64::from(self.next_u32());
            let low = u64::from(self.next_u32());
            let value = (high << 32) | low;
            if value >= threshold {
                return range.start.wrapping_add(value % span);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = MetricsRng::seed_from_u64(12345);
        let mut b = MetricsRng::seed_from_u64(12345);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = MetricsRng::seed_from_u64(1);
        let mut b = MetricsRng::seed_from_u64(2);
        let same = (0..16).filter(|_| a.next_u32() == b.next_u32()).count();
        assert!(same < 16);
    }

    #[test]
    fn sample_stays_in_range() {
        let mut rng = MetricsRng::seed_from_u64(99);
        for _ in 0..1000 {
            let v = rng.sample(10..20);
            assert!((10..20).contains(&v));
        }
    }

    #[test]
    fn sample_u64_stays_in_range() {
        let mut rng = MetricsRng::seed_from_u64(99);
        for _ in 0..1000 {
            let v = rng.sample_u64(1_000_000..2_000_000);
            assert!((1_000_000..2_000_000).contains(&v));
        }
    }

    #[test]
    fn empty_range_returns_start() {
        let mut rng = MetricsRng::seed_from_u64(0);
        assert_eq!(rng.sample(5..5), 5);
        assert_eq!(rng.sample_u64(7..7), 7);
    }

    #[test]
    fn single_element_range() {
        let mut rng = MetricsRng::seed_from_u64(0);
        assert_eq!(rng.sample(3..4), 3);
    }
}
