//! Enumeration types for the haulage simulator
//!
//! This module contains the closed sets of values used throughout the engine:
//! vehicle lifecycle phases, timed activities, contended resources, admission
//! modes, and the reasons a run can stop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle phase of a haul vehicle
///
/// The cycle is `Waiting -> Loading -> Traveling -> Unloading -> Returning -> Waiting`.
/// There is no terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehiclePhase {
    /// Parked at the loading area, eligible for admission
    Waiting,
    /// Being loaded by a crew
    Loading,
    /// Driving loaded to the dump site
    Traveling,
    /// Dumping its load
    Unloading,
    /// Driving empty back to the loading area
    Returning,
}

impl VehiclePhase {
    /// Phase entered when the current phase's activity completes
    pub fn next(self) -> Self {
        match self {
            VehiclePhase::Waiting => VehiclePhase::Loading,
            VehiclePhase::Loading => VehiclePhase::Traveling,
            VehiclePhase::Traveling => VehiclePhase::Unloading,
            VehiclePhase::Unloading => VehiclePhase::Returning,
            VehiclePhase::Returning => VehiclePhase::Waiting,
        }
    }

    /// Whether the vehicle counts as busy for fleet utilization
    pub fn is_busy(self) -> bool {
        self != VehiclePhase::Waiting
    }
}

impl fmt::Display for VehiclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehiclePhase::Waiting => write!(f, "waiting"),
            VehiclePhase::Loading => write!(f, "loading"),
            VehiclePhase::Traveling => write!(f, "traveling"),
            VehiclePhase::Unloading => write!(f, "unloading"),
            VehiclePhase::Returning => write!(f, "returning"),
        }
    }
}

/// A timed process phase with its own duration distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Forming one pile
    Forming,
    /// Loading two piles onto a vehicle
    Loading,
    /// Loaded trip to the dump site
    Travel,
    /// Dumping the load
    Unloading,
    /// Empty trip back
    Returning,
}

impl Activity {
    /// All activities in declaration order
    pub const ALL: [Activity; 5] = [
        Activity::Forming,
        Activity::Loading,
        Activity::Travel,
        Activity::Unloading,
        Activity::Returning,
    ];
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Forming => write!(f, "forming"),
            Activity::Loading => write!(f, "loading"),
            Activity::Travel => write!(f, "travel"),
            Activity::Unloading => write!(f, "unloading"),
            Activity::Returning => write!(f, "returning"),
        }
    }
}

/// Resources whose occupancy is integrated over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Pile-forming machines
    Forming,
    /// Loading crews
    Crews,
    /// Haul vehicles not waiting
    Fleet,
}

impl ResourceKind {
    /// All resources in reporting order
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Forming, ResourceKind::Crews, ResourceKind::Fleet];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Forming => write!(f, "forming"),
            ResourceKind::Crews => write!(f, "crews"),
            ResourceKind::Fleet => write!(f, "fleet"),
        }
    }
}

/// How many vehicles one admission-policy invocation may start loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Keep admitting waiting vehicles in id order until nothing more fits
    #[default]
    Greedy,
    /// Admit at most one vehicle per invocation
    Single,
}

impl fmt::Display for AdmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionMode::Greedy => write!(f, "greedy"),
            AdmissionMode::Single => write!(f, "single"),
        }
    }
}

impl FromStr for AdmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "greedy" => Ok(AdmissionMode::Greedy),
            "single" => Ok(AdmissionMode::Single),
            _ => Err(format!("Unknown admission mode: {}", s)),
        }
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The next event lay beyond the configured horizon
    Horizon,
    /// The configured number of completed cycles was reached
    CycleTarget,
    /// The configured number of completed orders was reached
    OrderTarget,
    /// No events were left to process
    QueueExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Horizon => write!(f, "time horizon reached"),
            StopReason::CycleTarget => write!(f, "cycle target reached"),
            StopReason::OrderTarget => write!(f, "order target reached"),
            StopReason::QueueExhausted => write!(f, "event queue exhausted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_phase_cycle() {
        let mut phase = VehiclePhase::Waiting;
        let mut seen = vec![phase];
        for _ in 0..5 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                VehiclePhase::Waiting,
                VehiclePhase::Loading,
                VehiclePhase::Traveling,
                VehiclePhase::Unloading,
                VehiclePhase::Returning,
                VehiclePhase::Waiting,
            ]
        );
    }

    #[test]
    fn test_only_waiting_is_idle() {
        assert!(!VehiclePhase::Waiting.is_busy());
        assert!(VehiclePhase::Loading.is_busy());
        assert!(VehiclePhase::Returning.is_busy());
    }

    #[test]
    fn test_admission_mode_parsing() {
        assert_eq!("greedy".parse::<AdmissionMode>().unwrap(), AdmissionMode::Greedy);
        assert_eq!("SINGLE".parse::<AdmissionMode>().unwrap(), AdmissionMode::Single);
        assert!("fair".parse::<AdmissionMode>().is_err());
        assert_eq!(AdmissionMode::default(), AdmissionMode::Greedy);
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(serde_json::to_string(&VehiclePhase::Unloading).unwrap(), "\"unloading\"");
        assert_eq!(serde_json::to_string(&StopReason::CycleTarget).unwrap(), "\"cycle_target\"");
        let phase: VehiclePhase = serde_json::from_str("\"returning\"").unwrap();
        assert_eq!(phase, VehiclePhase::Returning);
    }

    #[test]
    fn test_display_is_not_empty() {
        for activity in Activity::ALL {
            assert!(!activity.to_string().is_empty());
        }
        assert_eq!(ResourceKind::Crews.to_string(), "crews");
    }
}
