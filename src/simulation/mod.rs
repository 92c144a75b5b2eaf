//! Simulation engine and supporting machinery
//!
//! This module contains the event queue and clock, the contended resources,
//! the interval generators, the engine that drives them, and the statistics
//! and logging that surround a run.
//!
//! # Overview
//!
//! - **EventQueue**: time-ordered pending events with insertion-order tie-breaking
//! - **Simulation**: handlers, admission policy and run loop
//! - **IntervalGenerator**: seeded activity duration draws
//! - **SimulationReport**: utilization, cycle times and periodic samples
//! - **SimulationError**: error handling for simulation operations
//!
//! # Usage Example
//!
//! ```rust
//! use earthworks_sim::simulation::*;
//! use earthworks_sim::types::*;
//!
//! let config = SimulationConfig {
//!     horizon: 100.0,
//!     seed: Some(7),
//!     ..Default::default()
//! };
//!
//! let mut simulation = Simulation::new(config).unwrap();
//! let report = simulation.run().unwrap();
//! assert_eq!(report.stop_reason, Some(StopReason::Horizon));
//! assert!(report.utilization.crews.unwrap() <= 1.0);
//! ```

pub mod clock;
pub mod engine;
pub mod error;
pub mod event;
pub mod intervals;
pub mod logging;
pub mod orders;
pub mod resources;
pub mod statistics;

// Re-export all public types for convenience
pub use clock::*;
pub use engine::*;
pub use error::*;
pub use event::*;
pub use intervals::*;
pub use logging::*;
pub use orders::*;
pub use resources::*;
pub use statistics::*;
