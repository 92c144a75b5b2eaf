//! Statistics collection and reporting
//!
//! This module contains the run accumulators, the bounded periodic sample log,
//! and the report assembled once a run has stopped.

use super::{OrderSummary, SimulationResult};
use crate::types::{ResourceKind, SimulationConfig, StopReason, VehicleId, VehiclePhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Accumulated occupancy times elapsed time, per resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BusyTime {
    /// Machine-time spent forming
    pub forming: f64,
    /// Crew-time spent loading
    pub crews: f64,
    /// Vehicle-time spent outside the waiting phase
    pub fleet: f64,
}

impl BusyTime {
    /// Add `elapsed` time at the given occupancies
    pub fn integrate(&mut self, elapsed: f64, forming_busy: u32, crews_busy: u32, fleet_busy: u32) {
        self.forming += elapsed * f64::from(forming_busy);
        self.crews += elapsed * f64::from(crews_busy);
        self.fleet += elapsed * f64::from(fleet_busy);
    }
}

/// Counters accumulated while the run loop executes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Haul cycles completed
    pub completed_cycles: u64,
    /// Sum of completed cycle durations
    pub cycle_time_sum: f64,
    /// Loadings started
    pub loads_started: u64,
    /// Events popped and dispatched
    pub events_processed: u64,
    /// Busy-time integrals
    pub busy: BusyTime,
}

impl RunStatistics {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed haul cycle
    pub fn record_cycle(&mut self, duration: f64) {
        self.completed_cycles += 1;
        self.cycle_time_sum += duration;
    }

    /// Mean cycle duration, absent until a cycle completes
    pub fn average_cycle_time(&self) -> Option<f64> {
        if self.completed_cycles == 0 {
            None
        } else {
            Some(self.cycle_time_sum / self.completed_cycles as f64)
        }
    }
}

/// Snapshot of the system at a sampling boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Boundary time
    pub time: f64,
    /// Pile inventory
    pub piles: u64,
    /// Crews loading
    pub crews_busy: u32,
    /// Phase of every vehicle in id order
    pub vehicle_phases: Vec<VehiclePhase>,
    /// Cycles completed so far
    pub completed_cycles: u64,
}

/// Ring buffer of periodic samples
///
/// Once full, each new sample evicts the oldest one and bumps the dropped count.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    dropped: u64,
}

impl SampleBuffer {
    /// Buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity.min(1024)), capacity, dropped: 0 }
    }

    /// Store a sample, evicting the oldest when full
    pub fn push(&mut self, sample: Sample) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
            self.dropped += 1;
        }
        self.samples.push_back(sample);
    }

    /// Retained samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are retained
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples evicted so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Utilization of a resource over a run
///
/// Absent when no simulated time elapsed. A resource with zero capacity reports
/// zero utilization. Values are not clamped: only rounding drift just above
/// one is absorbed, so an overshoot from bad integration stays visible.
pub fn utilization(busy: f64, capacity: u32, total_time: f64) -> Option<f64> {
    if !(total_time > 0.0) {
        return None;
    }
    if capacity == 0 {
        return Some(0.0);
    }
    let ratio = busy / (f64::from(capacity) * total_time);
    if ratio > 1.0 && ratio < 1.0 + UTILIZATION_TOLERANCE {
        return Some(1.0);
    }
    Some(ratio)
}

/// Rounding slack allowed above full utilization
const UTILIZATION_TOLERANCE: f64 = 1e-9;

/// Utilization fraction of each resource
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceUtilization {
    /// Forming machines
    pub forming: Option<f64>,
    /// Loading crews
    pub crews: Option<f64>,
    /// Haul vehicles
    pub fleet: Option<f64>,
}

impl ResourceUtilization {
    /// Utilization of one resource
    pub fn get(&self, kind: ResourceKind) -> Option<f64> {
        match kind {
            ResourceKind::Forming => self.forming,
            ResourceKind::Crews => self.crews,
            ResourceKind::Fleet => self.fleet,
        }
    }
}

/// Final state of one vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    /// Vehicle identifier
    pub id: VehicleId,
    /// Phase at the end of the run
    pub phase: VehiclePhase,
    /// Cycles completed by this vehicle
    pub total_cycles: u64,
}

/// Everything a finished run reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Why the run stopped, `None` if it is still running
    pub stop_reason: Option<StopReason>,
    /// Simulated time at stop
    pub final_time: f64,
    /// Seed of the run's random source
    pub seed: u64,
    /// Events popped and dispatched
    pub events_processed: u64,
    /// Haul cycles completed
    pub completed_cycles: u64,
    /// Mean cycle duration
    pub average_cycle_time: Option<f64>,
    /// Utilization per resource
    pub utilization: ResourceUtilization,
    /// Raw busy-time integrals
    pub busy_time: BusyTime,
    /// Piles left on the ground
    pub final_piles: u64,
    /// Piles produced during the run
    pub piles_formed: u64,
    /// Loadings started
    pub loads_started: u64,
    /// Retained periodic samples, oldest first
    pub samples: Vec<Sample>,
    /// Periodic samples evicted from the ring buffer
    pub samples_dropped: u64,
    /// Final phase of every vehicle
    pub vehicles: Vec<VehicleSnapshot>,
    /// Order activity, when order tracking is enabled
    pub orders: Option<OrderSummary>,
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "n/a".to_string(),
    }
}

fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

impl SimulationReport {
    /// Throughput in completed cycles per unit of simulated time
    pub fn throughput(&self) -> Option<f64> {
        if self.final_time > 0.0 {
            Some(self.completed_cycles as f64 / self.final_time)
        } else {
            None
        }
    }

    /// Human-readable multi-line summary
    pub fn summary_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Haulage Simulation Summary ===\n\n");
        match self.stop_reason {
            Some(reason) => {
                report.push_str(&format!("Stopped: {} at t = {:.2}\n", reason, self.final_time))
            }
            None => report.push_str(&format!("Running: t = {:.2}\n", self.final_time)),
        }
        report.push_str(&format!("Seed: {}\n", self.seed));
        report.push_str(&format!("Events processed: {}\n\n", self.events_processed));

        report.push_str("Production:\n");
        report.push_str(&format!("  - Piles formed: {}\n", self.piles_formed));
        report.push_str(&format!("  - Piles remaining: {}\n", self.final_piles));
        report.push_str(&format!("  - Loadings started: {}\n", self.loads_started));
        report.push_str(&format!("  - Cycles completed: {}\n", self.completed_cycles));
        report.push_str(&format!(
            "  - Average cycle time: {}\n",
            format_optional(self.average_cycle_time, 2)
        ));
        report.push_str(&format!(
            "  - Throughput: {} cycles/time unit\n\n",
            format_optional(self.throughput(), 4)
        ));

        report.push_str("Utilization:\n");
        for kind in ResourceKind::ALL {
            report.push_str(&format!(
                "  - {}: {}\n",
                kind,
                format_percentage(self.utilization.get(kind))
            ));
        }

        report.push_str("\nVehicles:\n");
        for vehicle in &self.vehicles {
            report.push_str(&format!(
                "  - {}: {} ({} cycles)\n",
                vehicle.id, vehicle.phase, vehicle.total_cycles
            ));
        }

        if let Some(orders) = &self.orders {
            report.push_str("\nOrders:\n");
            report.push_str(&format!("  - Arrived: {}\n", orders.arrived));
            report.push_str(&format!("  - Completed: {}\n", orders.completed));
            report.push_str(&format!("  - Open: {}\n", orders.open));
            report.push_str(&format!(
                "  - Average lead time: {}\n",
                format_optional(orders.average_lead_time, 2)
            ));
        }

        report.push_str(&format!(
            "\nSamples: {} retained, {} dropped\n",
            self.samples.len(),
            self.samples_dropped
        ));

        report
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary_text())
    }
}

/// A report together with the configuration that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEnvelope {
    /// Unique identifier of this run
    pub run_id: Uuid,
    /// Wall-clock time the report was written
    pub generated_at: DateTime<Utc>,
    /// Configuration of the run
    pub config: SimulationConfig,
    /// The run's results
    pub report: SimulationReport,
}

impl ReportEnvelope {
    /// Wrap a report with a fresh run id and timestamp
    pub fn new(config: SimulationConfig, report: SimulationReport) -> Self {
        Self { run_id: Uuid::new_v4(), generated_at: Utc::now(), config, report }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> SimulationResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write pretty-printed JSON to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> SimulationResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
