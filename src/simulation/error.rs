//! Error types and handling
//!
//! This module contains error types and error handling for the simulation.

use crate::types::{ConfigError, ConfigValidationError};
use thiserror::Error;

/// Errors that can occur during simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// An event was scheduled before the current clock
    #[error("Cannot schedule event at {time} before current time {now}")]
    InvalidSchedule {
        /// Requested event time
        time: f64,
        /// Clock value when the push was attempted
        now: f64,
    },

    /// An action name or action/payload pairing the engine does not handle
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// The event queue has nothing left to pop
    #[error("Event queue is empty")]
    EmptyQueue,

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Configuration(#[from] ConfigValidationError),

    /// Configuration could not be loaded
    #[error("Configuration loading failed: {0}")]
    ConfigLoad(#[from] ConfigError),

    /// A resource counter would leave its legal range
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimulationError {
    /// Create an unknown event error
    pub fn unknown_event(msg: impl Into<String>) -> Self {
        Self::UnknownEvent(msg.into())
    }

    /// Create an invariant violation error
    pub fn invariant_violation(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Whether the run must abort
    ///
    /// Only queue exhaustion is a normal outcome; it ends a run without failing it.
    pub fn is_fatal(&self) -> bool {
        !self.is_termination_signal()
    }

    /// Whether this error only signals that the run has nothing left to do
    pub fn is_termination_signal(&self) -> bool {
        matches!(self, SimulationError::EmptyQueue)
    }

    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            SimulationError::InvalidSchedule { .. } => "Scheduling",
            SimulationError::UnknownEvent(_) => "Dispatch",
            SimulationError::EmptyQueue => "Termination",
            SimulationError::Configuration(_) => "Configuration",
            SimulationError::ConfigLoad(_) => "Configuration",
            SimulationError::InvariantViolation(_) => "Invariant",
            SimulationError::Io(_) => "IO",
            SimulationError::Serialization(_) => "Serialization",
        }
    }
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let error = SimulationError::unknown_event("teleport");
        assert!(matches!(error, SimulationError::UnknownEvent(_)));
        assert_eq!(error.to_string(), "Unknown event: teleport");

        let error = SimulationError::InvalidSchedule { time: 1.0, now: 4.5 };
        assert_eq!(error.to_string(), "Cannot schedule event at 1 before current time 4.5");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let sim_error: SimulationError = io_error.into();
        assert!(matches!(sim_error, SimulationError::Io(_)));
    }

    #[test]
    fn test_error_from_validation_error() {
        let sim_error: SimulationError = ConfigValidationError::InvalidCycleTarget.into();
        assert!(matches!(sim_error, SimulationError::Configuration(_)));
        assert_eq!(sim_error.category(), "Configuration");
    }

    #[test]
    fn test_only_empty_queue_is_a_termination_signal() {
        assert!(SimulationError::EmptyQueue.is_termination_signal());
        assert!(!SimulationError::EmptyQueue.is_fatal());

        let fatal = [
            SimulationError::InvalidSchedule { time: 0.0, now: 1.0 },
            SimulationError::unknown_event("x"),
            SimulationError::invariant_violation("crews above capacity"),
        ];
        for error in &fatal {
            assert!(error.is_fatal(), "{} should be fatal", error);
            assert!(!error.is_termination_signal());
        }
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(SimulationError::EmptyQueue.category(), "Termination");
        assert_eq!(SimulationError::unknown_event("x").category(), "Dispatch");
        assert_eq!(
            SimulationError::InvalidSchedule { time: 0.0, now: 1.0 }.category(),
            "Scheduling"
        );
        assert_eq!(SimulationError::invariant_violation("x").category(), "Invariant");
    }

    #[test]
    fn test_simulation_result_type() {
        let success: SimulationResult<i32> = Ok(42);
        assert!(success.is_ok());

        let failure: SimulationResult<i32> = Err(SimulationError::EmptyQueue);
        assert!(failure.is_err());
    }
}
