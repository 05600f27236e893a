//! Distribution strategies: how a card's offset is picked inside a range.
//!
//! The assignor chooses a strategy per card. Cards with a usable stability
//! signal go through [`StabilityRank`] when the selection has a spread of
//! stabilities; everything else uses [`UniformRandom`].

use rand::{Rng, RngCore};

use crate::spec::DurationSpec;

/// Picks an offset in days within `spec`'s bounds.
pub trait DistributionStrategy {
    /// Short label used in logs and reports.
    fn name(&self) -> &'static str;

    /// Offset in days; always within `[spec.low(), spec.high()]`.
    fn offset_days(&self, stability: Option<f64>, spec: DurationSpec, rng: &mut dyn RngCore)
        -> u32;
}

/// Independent uniform draw over the whole range.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRandom;

impl DistributionStrategy for UniformRandom {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn offset_days(&self, _stability: Option<f64>, spec: DurationSpec, rng: &mut dyn RngCore) -> u32 {
        if spec.is_fixed() {
            return spec.low();
        }
        rng.random_range(spec.low()..=spec.high())
    }
}

/// Linear map of stability, normalized over the selection, onto the range.
///
/// Equal stabilities always land on the same offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityRank {
    min: f64,
    max: f64,
}

impl StabilityRank {
    /// Build from the stabilities present in the selection.
    ///
    /// Returns `None` when there is nothing to rank: no values, or every value
    /// equal (the normalization denominator would be zero).
    pub fn from_signals<I>(stabilities: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut bounds: Option<(f64, f64)> = None;
        for s in stabilities.into_iter().filter(|s| s.is_finite()) {
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(s), max.max(s)),
                None => (s, s),
            });
        }

        match bounds {
            Some((min, max)) if max > min => Some(Self { min, max }),
            _ => None,
        }
    }

    /// Position of `stability` within the selection, in `[0, 1]`.
    pub fn normalize(&self, stability: f64) -> f64 {
        ((stability - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

impl DistributionStrategy for StabilityRank {
    fn name(&self) -> &'static str {
        "stability"
    }

    fn offset_days(&self, stability: Option<f64>, spec: DurationSpec, rng: &mut dyn RngCore) -> u32 {
        match stability.filter(|s| s.is_finite()) {
            Some(s) => {
                let scaled = (self.normalize(s) * f64::from(spec.span())).round() as u32;
                spec.low() + scaled.min(spec.span())
            }
            None => UniformRandom.offset_days(None, spec, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn range(low: u32, high: u32) -> DurationSpec {
        DurationSpec::range(low, high).unwrap()
    }

    #[test]
    fn test_uniform_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let spec = range(3, 9);
        for _ in 0..1_000 {
            let days = UniformRandom.offset_days(None, spec, &mut rng);
            assert!((3..=9).contains(&days), "{} out of range", days);
        }
    }

    #[test]
    fn test_uniform_covers_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let spec = range(1, 4);
        let mut seen = [false; 5];
        for _ in 0..500 {
            seen[UniformRandom.offset_days(None, spec, &mut rng) as usize] = true;
        }
        assert_eq!(&seen[1..], &[true, true, true, true]);
    }

    #[test]
    fn test_uniform_fixed_spec() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            UniformRandom.offset_days(Some(5.0), DurationSpec::fixed(10), &mut rng),
            10
        );
    }

    #[test]
    fn test_rank_requires_spread() {
        assert!(StabilityRank::from_signals(Vec::<f64>::new()).is_none());
        assert!(StabilityRank::from_signals(vec![4.0]).is_none());
        assert!(StabilityRank::from_signals(vec![4.0, 4.0, 4.0]).is_none());
        assert!(StabilityRank::from_signals(vec![4.0, 5.0]).is_some());
    }

    #[test]
    fn test_rank_keeps_tiny_spreads() {
        let mut rng = StdRng::seed_from_u64(0);
        let rank = StabilityRank::from_signals(vec![1e-12, 2e-12]).unwrap();
        let spec = range(1, 10);
        assert_eq!(rank.offset_days(Some(1e-12), spec, &mut rng), 1);
        assert_eq!(rank.offset_days(Some(2e-12), spec, &mut rng), 10);
    }

    #[test]
    fn test_rank_ignores_non_finite() {
        let rank = StabilityRank::from_signals(vec![f64::NAN, 1.0, f64::INFINITY, 3.0]).unwrap();
        assert_eq!(rank, StabilityRank { min: 1.0, max: 3.0 });
    }

    #[test]
    fn test_rank_maps_endpoints() {
        let mut rng = StdRng::seed_from_u64(0);
        let rank = StabilityRank::from_signals(vec![1.0, 10.0, 100.0]).unwrap();
        let spec = range(1, 100);
        assert_eq!(rank.offset_days(Some(1.0), spec, &mut rng), 1);
        assert_eq!(rank.offset_days(Some(100.0), spec, &mut rng), 100);
        // 1 + round(9/99 * 99)
        assert_eq!(rank.offset_days(Some(10.0), spec, &mut rng), 10);
    }

    #[test]
    fn test_rank_is_monotonic() {
        let mut rng = StdRng::seed_from_u64(0);
        let values: Vec<f64> = (0..50).map(|i| (i as f64).powf(1.7) + 0.3).collect();
        let rank = StabilityRank::from_signals(values.clone()).unwrap();
        let spec = range(2, 30);
        let offsets: Vec<u32> = values
            .iter()
            .map(|s| rank.offset_days(Some(*s), spec, &mut rng))
            .collect();
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]), "{:?}", offsets);
        assert_eq!(offsets.first(), Some(&2));
        assert_eq!(offsets.last(), Some(&30));
    }

    #[test]
    fn test_rank_ties_share_offset() {
        let mut rng = StdRng::seed_from_u64(0);
        let rank = StabilityRank::from_signals(vec![2.0, 2.0, 8.0]).unwrap();
        let spec = range(1, 10);
        let a = rank.offset_days(Some(2.0), spec, &mut rng);
        let b = rank.offset_days(Some(2.0), spec, &mut rng);
        assert_eq!(a, b);
        assert_eq!(a, 1);
    }

    #[test]
    fn test_rank_without_signal_falls_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(3);
        let rank = StabilityRank::from_signals(vec![1.0, 2.0]).unwrap();
        let spec = range(5, 6);
        for _ in 0..100 {
            let days = rank.offset_days(None, spec, &mut rng);
            assert!((5..=6).contains(&days));
        }
    }

    #[test]
    fn test_rank_clamps_values_outside_selection() {
        let mut rng = StdRng::seed_from_u64(0);
        let rank = StabilityRank::from_signals(vec![10.0, 20.0]).unwrap();
        let spec = range(1, 5);
        assert_eq!(rank.offset_days(Some(0.0), spec, &mut rng), 1);
        assert_eq!(rank.offset_days(Some(1e9), spec, &mut rng), 5);
    }
}
