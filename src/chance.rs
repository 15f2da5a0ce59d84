//! Injectable randomness for side flourishes
//!
//! Catchphrase and banter gating go through this port so tests can pin the
//! outcome with a fixed seed or a stub instead of living with coin flips.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of chance decisions
pub trait ChanceSource: Send {
    /// Return true with the given probability
    fn roll(&mut self, probability: f64) -> bool;

    /// Pick an index in `0..len` (len must be non-zero)
    fn pick(&mut self, len: usize) -> usize;
}

/// Seedable chance source backed by [`StdRng`]
pub struct SeededChance {
    rng: StdRng,
}

impl SeededChance {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl ChanceSource for SeededChance {
    fn roll(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Chance source with a fixed answer, for wiring flourishes on or off
pub struct AlwaysChance(pub bool);

impl ChanceSource for AlwaysChance {
    fn roll(&mut self, _probability: f64) -> bool {
        self.0
    }

    fn pick(&mut self, _len: usize) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_chance_is_reproducible() {
        let mut a = SeededChance::from_seed(7);
        let mut b = SeededChance::from_seed(7);
        for _ in 0..20 {
            assert_eq!(a.roll(0.5), b.roll(0.5));
            assert_eq!(a.pick(4), b.pick(4));
        }
    }

    #[test]
    fn test_roll_extremes() {
        let mut chance = SeededChance::from_seed(1);
        assert!(!chance.roll(0.0));
        assert!(chance.roll(1.0));
    }

    #[test]
    fn test_always_chance() {
        let mut yes = AlwaysChance(true);
        let mut no = AlwaysChance(false);
        assert!(yes.roll(0.0));
        assert!(!no.roll(1.0));
        assert_eq!(yes.pick(10), 0);
    }
}
