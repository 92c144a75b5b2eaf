//! Contended resources and vehicle state
//!
//! Each resource is a small struct that owns its counters and refuses any
//! mutation that would leave its legal range. Violations come back as
//! [`SimulationError::InvariantViolation`] instead of being clamped.

use super::{SimulationError, SimulationResult};
use crate::types::{MachineId, OrderId, VehicleId, VehiclePhase};
use serde::{Deserialize, Serialize};

/// Piles formed but not yet loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PileInventory {
    count: u64,
    formed: u64,
}

impl PileInventory {
    /// Piles consumed by one loading
    pub const PILES_PER_LOAD: u64 = 2;

    /// Inventory seeded with `initial` piles
    pub fn new(initial: u64) -> Self {
        Self { count: initial, formed: 0 }
    }

    /// Piles currently on the ground
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Piles produced by forming machines during the run
    pub fn formed(&self) -> u64 {
        self.formed
    }

    /// Whether a loading could start
    pub fn has_load(&self) -> bool {
        self.count >= Self::PILES_PER_LOAD
    }

    /// Record a completed pile
    pub fn add_pile(&mut self) {
        self.count += 1;
        self.formed += 1;
    }

    /// Remove the piles for one loading
    pub fn take_load(&mut self) -> SimulationResult<()> {
        if !self.has_load() {
            return Err(SimulationError::invariant_violation(format!(
                "loading needs {} piles but only {} available",
                Self::PILES_PER_LOAD,
                self.count
            )));
        }
        self.count -= Self::PILES_PER_LOAD;
        Ok(())
    }
}

/// Loading crews with a fixed capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewPool {
    capacity: u32,
    busy: u32,
}

impl CrewPool {
    /// Pool with every crew idle
    pub fn new(capacity: u32) -> Self {
        Self { capacity, busy: 0 }
    }

    /// Total crews
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Crews currently loading
    pub fn busy(&self) -> u32 {
        self.busy
    }

    /// Whether a crew is free
    pub fn has_free(&self) -> bool {
        self.busy < self.capacity
    }

    /// Occupy one crew
    pub fn acquire(&mut self) -> SimulationResult<()> {
        if !self.has_free() {
            return Err(SimulationError::invariant_violation(format!(
                "all {} crews are busy",
                self.capacity
            )));
        }
        self.busy += 1;
        Ok(())
    }

    /// Free one crew
    pub fn release(&mut self) -> SimulationResult<()> {
        if self.busy == 0 {
            return Err(SimulationError::invariant_violation("released a crew while none were busy"));
        }
        self.busy -= 1;
        Ok(())
    }
}

/// Independent single-capacity forming machines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormingMachines {
    busy: Vec<bool>,
}

impl FormingMachines {
    /// `count` idle machines
    pub fn new(count: u32) -> Self {
        Self { busy: vec![false; count as usize] }
    }

    /// Number of machines
    pub fn capacity(&self) -> u32 {
        self.busy.len() as u32
    }

    /// Machines currently forming a pile
    pub fn busy_count(&self) -> u32 {
        self.busy.iter().filter(|busy| **busy).count() as u32
    }

    /// Identifiers of all machines in order
    pub fn ids(&self) -> impl Iterator<Item = MachineId> {
        (0..self.capacity()).map(MachineId::new)
    }

    /// Mark a machine as forming
    pub fn start(&mut self, id: MachineId) -> SimulationResult<()> {
        let slot = self.slot(id)?;
        if *slot {
            return Err(SimulationError::invariant_violation(format!("{} is already forming", id)));
        }
        *slot = true;
        Ok(())
    }

    /// Mark a machine as idle
    pub fn finish(&mut self, id: MachineId) -> SimulationResult<()> {
        let slot = self.slot(id)?;
        if !*slot {
            return Err(SimulationError::invariant_violation(format!("{} was not forming", id)));
        }
        *slot = false;
        Ok(())
    }

    fn slot(&mut self, id: MachineId) -> SimulationResult<&mut bool> {
        self.busy
            .get_mut(id.index())
            .ok_or_else(|| SimulationError::unknown_event(format!("no forming machine {}", id)))
    }
}

/// A haul vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Stable identifier
    pub id: VehicleId,
    /// Current lifecycle phase
    pub phase: VehiclePhase,
    /// Haul cycles completed so far
    pub total_cycles: u64,
    /// When the current cycle's loading started
    pub cycle_start: Option<f64>,
    /// Order the current load is bound to
    pub order: Option<OrderId>,
}

impl Vehicle {
    /// A waiting vehicle with no history
    pub fn new(id: VehicleId) -> Self {
        Self { id, phase: VehiclePhase::Waiting, total_cycles: 0, cycle_start: None, order: None }
    }

    /// Move to the next phase, provided the vehicle is in `expected`
    pub fn advance_from(&mut self, expected: VehiclePhase) -> SimulationResult<VehiclePhase> {
        if self.phase != expected {
            return Err(SimulationError::invariant_violation(format!(
                "{} expected in phase {} but is {}",
                self.id, expected, self.phase
            )));
        }
        self.phase = self.phase.next();
        Ok(self.phase)
    }
}

/// The fixed set of vehicles for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    vehicles: Vec<Vehicle>,
}

impl Fleet {
    /// `size` waiting vehicles numbered from zero
    pub fn new(size: u32) -> Self {
        Self { vehicles: (0..size).map(|raw| Vehicle::new(VehicleId::new(raw))).collect() }
    }

    /// Number of vehicles
    pub fn size(&self) -> u32 {
        self.vehicles.len() as u32
    }

    /// Look up a vehicle
    pub fn get(&self, id: VehicleId) -> SimulationResult<&Vehicle> {
        self.vehicles
            .get(id.index())
            .ok_or_else(|| SimulationError::unknown_event(format!("no vehicle {}", id)))
    }

    /// Look up a vehicle for mutation
    pub fn get_mut(&mut self, id: VehicleId) -> SimulationResult<&mut Vehicle> {
        self.vehicles
            .get_mut(id.index())
            .ok_or_else(|| SimulationError::unknown_event(format!("no vehicle {}", id)))
    }

    /// Vehicles in id order
    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }

    /// Vehicles that are not waiting
    pub fn busy_count(&self) -> u32 {
        self.vehicles.iter().filter(|v| v.phase.is_busy()).count() as u32
    }

    /// Vehicles currently being loaded
    pub fn loading_count(&self) -> u32 {
        self.vehicles.iter().filter(|v| v.phase == VehiclePhase::Loading).count() as u32
    }

    /// Phase of every vehicle in id order
    pub fn phases(&self) -> Vec<VehiclePhase> {
        self.vehicles.iter().map(|v| v.phase).collect()
    }

    /// Sum of every vehicle's completed cycles
    pub fn total_cycles(&self) -> u64 {
        self.vehicles.iter().map(|v| v.total_cycles).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pile_inventory_loads_take_two() {
        let mut piles = PileInventory::new(1);
        assert!(!piles.has_load());
        assert!(piles.take_load().is_err());
        assert_eq!(piles.count(), 1);

        piles.add_pile();
        assert!(piles.has_load());
        piles.take_load().unwrap();
        assert_eq!(piles.count(), 0);
        assert_eq!(piles.formed(), 1);
    }

    #[test]
    fn test_crew_pool_bounds() {
        let mut crews = CrewPool::new(2);
        crews.acquire().unwrap();
        crews.acquire().unwrap();
        assert!(!crews.has_free());
        assert!(matches!(crews.acquire(), Err(SimulationError::InvariantViolation(_))));
        assert_eq!(crews.busy(), 2);

        crews.release().unwrap();
        crews.release().unwrap();
        assert!(crews.release().is_err());
        assert_eq!(crews.busy(), 0);
    }

    #[test]
    fn test_zero_capacity_crew_pool_never_admits() {
        let mut crews = CrewPool::new(0);
        assert!(!crews.has_free());
        assert!(crews.acquire().is_err());
    }

    #[test]
    fn test_forming_machines_track_busy_state() {
        let mut machines = FormingMachines::new(2);
        let ids: Vec<MachineId> = machines.ids().collect();
        assert_eq!(ids, vec![MachineId::new(0), MachineId::new(1)]);

        machines.start(MachineId::new(1)).unwrap();
        assert_eq!(machines.busy_count(), 1);
        assert!(machines.start(MachineId::new(1)).is_err());
        machines.finish(MachineId::new(1)).unwrap();
        assert!(machines.finish(MachineId::new(1)).is_err());
        assert!(matches!(machines.start(MachineId::new(5)), Err(SimulationError::UnknownEvent(_))));
    }

    #[test]
    fn test_vehicle_rejects_out_of_phase_transition() {
        let mut vehicle = Vehicle::new(VehicleId::new(0));
        assert!(vehicle.advance_from(VehiclePhase::Traveling).is_err());
        assert_eq!(vehicle.advance_from(VehiclePhase::Waiting).unwrap(), VehiclePhase::Loading);
    }

    #[test]
    fn test_fleet_counts() {
        let mut fleet = Fleet::new(3);
        assert_eq!(fleet.busy_count(), 0);
        fleet.get_mut(VehicleId::new(1)).unwrap().phase = VehiclePhase::Loading;
        fleet.get_mut(VehicleId::new(2)).unwrap().phase = VehiclePhase::Returning;
        assert_eq!(fleet.busy_count(), 2);
        assert_eq!(fleet.loading_count(), 1);
        assert_eq!(
            fleet.phases(),
            vec![VehiclePhase::Waiting, VehiclePhase::Loading, VehiclePhase::Returning]
        );
        assert!(fleet.get(VehicleId::new(3)).is_err());
    }
}
