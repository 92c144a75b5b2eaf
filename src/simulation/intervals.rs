//! Activity duration draws
//!
//! One seeded generator per run. Every stochastic duration in the run comes
//! from it in scheduling order, so a fixed seed reproduces the whole run.

use super::{SimulationError, SimulationResult};
use crate::types::{ActivityTiming, DurationDistribution};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

/// Seeded source of activity durations
#[derive(Debug, Clone)]
pub struct IntervalGenerator {
    rng: StdRng,
    seed: u64,
    draws: u64,
}

impl IntervalGenerator {
    /// Create a generator from a seed
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), seed, draws: 0 }
    }

    /// Seed this generator was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Random draws taken so far
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Duration of one activity instance
    pub fn duration(&mut self, timing: &ActivityTiming) -> SimulationResult<f64> {
        if !timing.stochastic {
            return Ok(timing.fixed_value());
        }

        let value = match timing.distribution {
            DurationDistribution::Exponential { mean } => {
                if !(mean > 0.0) || !mean.is_finite() {
                    return Err(SimulationError::invariant_violation(format!(
                        "exponential mean must be positive, got {}",
                        mean
                    )));
                }
                let exp = Exp::new(1.0 / mean).map_err(|e| {
                    SimulationError::invariant_violation(format!(
                        "exponential mean {} is unusable: {}",
                        mean, e
                    ))
                })?;
                self.draws += 1;
                exp.sample(&mut self.rng)
            }
            DurationDistribution::Uniform { min, max } => self.uniform(min, max)?,
        };
        Ok(value)
    }

    /// Pile-pairs an arriving order requires
    pub fn order_size(&mut self, min_pairs: u32, max_pairs: u32) -> SimulationResult<u32> {
        if min_pairs > max_pairs {
            return Err(SimulationError::invariant_violation(format!(
                "order size range [{}, {}] is empty",
                min_pairs, max_pairs
            )));
        }
        self.draws += 1;
        Ok(self.rng.gen_range(min_pairs..=max_pairs))
    }

    fn uniform(&mut self, min: f64, max: f64) -> SimulationResult<f64> {
        if !(min <= max) {
            return Err(SimulationError::invariant_violation(format!(
                "uniform range [{}, {}] is empty",
                min, max
            )));
        }
        if min == max {
            return Ok(min);
        }
        self.draws += 1;
        Ok(self.rng.gen_range(min..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_timing_skips_the_rng() {
        let mut generator = IntervalGenerator::new(1);
        let value = generator.duration(&ActivityTiming::fixed(5.0)).unwrap();
        assert_eq!(value, 5.0);
        assert_eq!(generator.draws(), 0);

        let value = generator.duration(&ActivityTiming::exponential(3.0).deterministic()).unwrap();
        assert_eq!(value, 3.0);
    }

    #[test]
    fn test_uniform_draws_stay_in_range() {
        let mut generator = IntervalGenerator::new(42);
        let timing = ActivityTiming::uniform(2.0, 7.0);
        for _ in 0..1000 {
            let value = generator.duration(&timing).unwrap();
            assert!((2.0..=7.0).contains(&value));
        }
        assert_eq!(generator.draws(), 1000);
    }

    #[test]
    fn test_exponential_draws_are_positive_with_plausible_mean() {
        let mut generator = IntervalGenerator::new(7);
        let timing = ActivityTiming::exponential(4.0);
        let n = 20_000;
        let total: f64 = (0..n).map(|_| generator.duration(&timing).unwrap()).sum();
        let mean = total / n as f64;
        assert!(mean > 3.6 && mean < 4.4, "sample mean {} too far from 4.0", mean);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let timing = ActivityTiming::uniform(1.0, 3.0);
        let mut a = IntervalGenerator::new(99);
        let mut b = IntervalGenerator::new(99);
        for _ in 0..50 {
            assert_eq!(a.duration(&timing).unwrap(), b.duration(&timing).unwrap());
        }
        assert_eq!(a.seed(), 99);
    }

    #[test]
    fn test_order_size_bounds() {
        let mut generator = IntervalGenerator::new(3);
        for _ in 0..200 {
            let size = generator.order_size(2, 4).unwrap();
            assert!((2..=4).contains(&size));
        }
        assert!(generator.order_size(5, 1).is_err());
    }

    #[test]
    fn test_invalid_parameters_are_errors() {
        let mut generator = IntervalGenerator::new(3);
        assert!(generator.duration(&ActivityTiming::uniform(3.0, 1.0)).is_err());
        assert!(generator.duration(&ActivityTiming::exponential(0.0)).is_err());
    }
}
