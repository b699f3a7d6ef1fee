//! RNG module - injectable randomness for shuffling
//!
//! The exercise never reaches for an ambient random source. Callers hand it anything that
//! implements [`RandomSource`]; [`SimpleRng`] is the seedable default, so the same seed
//! always produces the same shuffles.

/// Source of uniformly distributed `u32` values
pub trait RandomSource {
    /// Generate next random u32
    fn next_u32(&mut self) -> u32;

    /// Generate a value in `[0, bound)` without modulo bias
    fn next_below(&mut self, bound: u32) -> u32 {
        debug_assert!(bound > 0);
        // Reject the low slice that would over-represent small values.
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let v = self.next_u32();
            if v >= threshold {
                return v % bound;
            }
        }
    }
}

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Current internal state (usable as a seed to replay from here)
    pub fn state(&self) -> u32 {
        self.state
    }
}

impl Default for SimpleRng {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RandomSource for SimpleRng {
    fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        // The low bits of a power-of-two LCG cycle quickly; fold the high half in.
        self.state ^ (self.state >> 16)
    }
}

/// Shuffle a slice in place using Fisher-Yates
pub fn shuffle_in_place<T, R: RandomSource + ?Sized>(rng: &mut R, slice: &mut [T]) {
    for i in (1..slice.len()).rev() {
        let j = rng.next_below((i + 1) as u32) as usize;
        slice.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(12345);

        // Same seed should produce same sequence
        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(54321);

        assert_ne!(rng1.next_u32(), rng2.next_u32());
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = SimpleRng::new(0);
        let first = rng.next_u32();
        let second = rng.next_u32();
        assert_ne!(first, second);
    }

    #[test]
    fn test_next_below_in_range() {
        let mut rng = SimpleRng::new(7);
        for bound in 1..50u32 {
            for _ in 0..20 {
                assert!(rng.next_below(bound) < bound);
            }
        }
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = SimpleRng::new(99);
        let mut values: Vec<u32> = (0..20).collect();
        shuffle_in_place(&mut rng, &mut values);

        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_reaches_every_permutation_of_three() {
        let mut rng = SimpleRng::new(2024);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..600 {
            let mut values = [0u8, 1, 2];
            shuffle_in_place(&mut rng, &mut values);
            seen.insert(values);
        }
        assert_eq!(seen.len(), 6);
    }
}
