//! Earthworks Haulage Simulator
//!
//! A discrete-event simulation of an earth-moving operation: pile-forming
//! machines build piles, a pool of loading crews loads them two at a time onto
//! haul vehicles, and the vehicles cycle through travel, unloading and return.
//!
//! # Overview
//!
//! The library answers "what throughput and resource utilization does this
//! operation reach under stochastic service times and finite resources?"
//!
//! ## Key Features
//!
//! - **Deterministic Event Ordering**: events fire by time, ties by scheduling order
//! - **Resource Contention**: crews and piles gate loading through an id-ordered admission policy
//! - **Reproducible Randomness**: one seeded source per run, fixed-duration mode for regression tests
//! - **Order Tracking**: optional customer orders that bind loadings to demand
//! - **Reporting**: utilization, cycle times, periodic samples and a transition trace
//!
//! ## Quick Start
//!
//! ```rust
//! use earthworks_sim::*;
//!
//! let config = SimulationConfig {
//!     forming: ActivityTiming::fixed(5.0),
//!     loading: ActivityTiming::fixed(2.0),
//!     travel: ActivityTiming::fixed(3.0),
//!     unloading: ActivityTiming::fixed(2.0),
//!     returning: ActivityTiming::fixed(3.0),
//!     ..Default::default()
//! };
//!
//! let mut simulation = Simulation::new(config)?;
//! let report = simulation.run()?;
//! println!("{} cycles completed", report.completed_cycles);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: Core types, identifiers, and configuration
//! - [`simulation`]: Event queue, engine, statistics and logging
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

// Module declarations
pub mod simulation;
pub mod types;

// Core types and identifiers
pub use types::{
    // Configuration
    ActivityTiming,
    // Enums
    Activity,
    AdmissionMode,
    CliArgs,
    ConfigError,
    ConfigValidationError,
    DurationDistribution,
    // Identifiers
    MachineId,
    OrderConfig,
    OrderId,
    ResourceKind,
    SimulationConfig,
    StopReason,
    VehicleId,
    VehiclePhase,
};

// Simulation types and functionality
pub use simulation::{
    Event, EventAction, EventPayload, EventQueue, LoggingConfig, ReportEnvelope, Simulation,
    SimulationError, SimulationReport, SimulationResult, StepOutcome, TraceLog,
};
