//! Core types and identifiers for the haulage simulator
//!
//! This module contains fundamental types, identifiers, and configuration structures
//! used throughout the simulation system.
//!
//! # Overview
//!
//! - **Identifiers**: dense integer identifiers for vehicles, orders and machines
//! - **Enums**: vehicle phases, activities, resources, admission modes, stop reasons
//! - **Configuration**: simulation configuration with validation and CLI support
//!
//! # Usage Example
//!
//! ```rust
//! use earthworks_sim::types::*;
//!
//! let vehicle = VehicleId::new(2);
//! assert_eq!(vehicle.to_string(), "VEH_2");
//!
//! let config = SimulationConfig {
//!     fleet_size: 6,
//!     crew_capacity: 3,
//!     loading: ActivityTiming::fixed(2.0),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod enums;
pub mod identifiers;

// Re-export all public types for convenience
pub use config::*;
pub use enums::*;
pub use identifiers::*;
