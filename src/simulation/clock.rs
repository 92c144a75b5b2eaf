//! Simulation clock
//!
//! Holds the single `now` value of a run. The clock only moves forward, and
//! every advance reports the elapsed interval so callers can integrate busy
//! time over it before the new time takes effect.

use super::{SimulationError, SimulationResult};
use serde::{Deserialize, Serialize};

/// Monotonic simulated time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationClock {
    now: f64,
}

impl SimulationClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Time remaining from `now` until `time`, without moving the clock
    pub fn elapsed_until(&self, time: f64) -> SimulationResult<f64> {
        if !(time >= self.now) {
            return Err(SimulationError::invariant_violation(format!(
                "clock cannot move from {} back to {}",
                self.now, time
            )));
        }
        Ok(time - self.now)
    }

    /// Move the clock to `time` and return the elapsed interval
    pub fn advance_to(&mut self, time: f64) -> SimulationResult<f64> {
        let elapsed = self.elapsed_until(time)?;
        self.now = time;
        Ok(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        assert_eq!(SimulationClock::new().now(), 0.0);
    }

    #[test]
    fn test_advance_reports_elapsed() {
        let mut clock = SimulationClock::new();
        assert_eq!(clock.advance_to(2.5).unwrap(), 2.5);
        assert_eq!(clock.advance_to(2.5).unwrap(), 0.0);
        assert_eq!(clock.advance_to(4.0).unwrap(), 1.5);
        assert_eq!(clock.now(), 4.0);
    }

    #[test]
    fn test_clock_never_moves_backward() {
        let mut clock = SimulationClock::new();
        clock.advance_to(10.0).unwrap();
        assert!(matches!(clock.advance_to(9.0), Err(SimulationError::InvariantViolation(_))));
        assert!(clock.advance_to(f64::NAN).is_err());
        assert_eq!(clock.now(), 10.0);
    }
}
