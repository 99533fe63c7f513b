//! Resource cost shapes
//!
//! Two shapes cover every cost in the catalog: a base value plus an averaged
//! random jitter (piety and similar) and a signed scaling value (HP) that is
//! either a flat amount or a per-mille fraction of a ceiling.

use serde::{Deserialize, Serialize};

use crate::rng::GameRng;

/// Base cost plus an averaged random addition.
///
/// `cost = base + random2avg(add, rolls)`; the addition is skipped when
/// `add` is zero, so every sample lies in `base..=base + add - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenericCost {
    pub base: i32,
    pub add: i32,
    pub rolls: i32,
}

impl GenericCost {
    /// Jittered cost from a single nominal value.
    ///
    /// The addition covers `(num + 1) / 2 + 1` values, or nothing for a
    /// zero cost.
    pub const fn new(num: i32) -> Self {
        Self {
            base: num,
            add: if num == 0 { 0 } else { (num + 1) / 2 + 1 },
            rolls: 1,
        }
    }

    /// Deterministic cost.
    pub const fn fixed(num: i32) -> Self {
        Self {
            base: num,
            add: 0,
            rolls: 1,
        }
    }

    /// Uniform cost over `low..=high`.
    pub const fn range(low: i32, high: i32) -> Self {
        Self::range_rolls(low, high, 1)
    }

    /// Cost over `low..=high`, averaged over `rolls` draws.
    pub const fn range_rolls(low: i32, high: i32, rolls: i32) -> Self {
        Self {
            base: low,
            add: high - low + 1,
            rolls,
        }
    }

    /// Raw constructor from the three stored fields.
    pub const fn with_parts(base: i32, add: i32, rolls: i32) -> Self {
        Self { base, add, rolls }
    }

    /// Roll the cost.
    pub fn cost(&self, rng: &mut GameRng) -> i32 {
        let extra = if self.add > 0 {
            rng.random2avg(self.add as u32, self.rolls.max(1) as u32) as i32
        } else {
            0
        };
        self.base + extra
    }

    /// Whether the cost can ever be nonzero.
    pub const fn is_nonzero(&self) -> bool {
        self.base > 0 || self.add > 0
    }

    /// Nominal midpoint, used for the piety band shown to the player.
    pub const fn average(&self) -> i32 {
        self.base + self.add / 2
    }
}

/// Signed HP cost: negative is a flat amount, non-negative is per-mille of a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScalingCost {
    pub value: i32,
}

impl ScalingCost {
    /// Per-mille of the ceiling passed to [`ScalingCost::cost`].
    pub const fn per_mille(permille: i32) -> Self {
        Self { value: permille }
    }

    /// Flat amount, independent of the ceiling.
    pub const fn fixed(amount: i32) -> Self {
        Self { value: -amount }
    }

    pub const fn cost(&self, ceiling: i32) -> i32 {
        if self.value < 0 {
            -self.value
        } else {
            (self.value * ceiling + 500) / 1000
        }
    }

    pub const fn is_nonzero(&self) -> bool {
        self.value != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generic_constructors() {
        assert_eq!(GenericCost::new(0), GenericCost::with_parts(0, 0, 1));
        assert_eq!(GenericCost::new(4), GenericCost::with_parts(4, 3, 1));
        assert_eq!(GenericCost::fixed(35), GenericCost::with_parts(35, 0, 1));
        assert_eq!(GenericCost::range(10, 14), GenericCost::with_parts(10, 5, 1));
    }

    #[test]
    fn test_fixed_cost_is_deterministic() {
        let mut rng = GameRng::new(1);
        let cost = GenericCost::fixed(3);
        for _ in 0..50 {
            assert_eq!(cost.cost(&mut rng), 3);
        }
    }

    #[test]
    fn test_generic_mean_converges() {
        let mut rng = GameRng::new(99);
        let cost = GenericCost::with_parts(30, 20, 1);
        let n = 20_000;
        let total: i64 = (0..n).map(|_| cost.cost(&mut rng) as i64).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 39.5).abs() < 0.3, "mean was {mean}");
    }

    #[test]
    fn test_is_nonzero() {
        assert!(!GenericCost::default().is_nonzero());
        assert!(GenericCost::range(0, 1).is_nonzero());
        assert!(!ScalingCost::default().is_nonzero());
        assert!(ScalingCost::fixed(5).is_nonzero());
    }

    #[test]
    fn test_scaling_fixed_ignores_ceiling() {
        let cost = ScalingCost::fixed(6);
        assert_eq!(cost.cost(1), 6);
        assert_eq!(cost.cost(500), 6);
    }

    #[test]
    fn test_scaling_rounds_half_up() {
        // 150 per-mille of 13 is 1.95
        assert_eq!(ScalingCost::per_mille(150).cost(13), 2);
        // 50 per-mille of 10 is exactly 0.5
        assert_eq!(ScalingCost::per_mille(50).cost(10), 1);
        assert_eq!(ScalingCost::per_mille(50).cost(9), 0);
    }

    proptest! {
        #[test]
        fn prop_jitter_within_bounds(
            base in 0i32..100,
            add in 1i32..60,
            rolls in 1i32..5,
            seed in any::<u64>(),
        ) {
            let mut rng = GameRng::new(seed);
            let cost = GenericCost::with_parts(base, add, rolls);
            for _ in 0..32 {
                let c = cost.cost(&mut rng);
                prop_assert!(c >= base && c <= base + add - 1);
            }
        }

        #[test]
        fn prop_scaling_matches_formula(value in 0i32..1000, ceiling in 0i32..2000) {
            let cost = ScalingCost::per_mille(value);
            prop_assert_eq!(cost.cost(ceiling), (value * ceiling + 500) / 1000);
        }

        #[test]
        fn prop_scaling_fixed_is_flat(amount in 1i32..500, ceiling in 0i32..2000) {
            prop_assert_eq!(ScalingCost::fixed(amount).cost(ceiling), amount);
        }
    }
}
