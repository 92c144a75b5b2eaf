//! Discrete-event haulage engine
//!
//! The engine owns every piece of run state. Each [`Simulation::step`] integrates
//! busy time up to the next event, pops it, and hands it to the handler for its
//! action. Handlers mutate state, schedule follow-on events, and re-run the
//! admission policy whenever a crew or a pair of piles may have become available.

use super::{
    utilization, CrewPool, Delivery, Event, EventAction, EventPayload, EventQueue, Fleet,
    FormingMachines, IntervalGenerator, OrderBook, PileInventory, ResourceUtilization,
    RunStatistics, Sample, SampleBuffer, SimulationError, SimulationReport, SimulationResult,
    TraceLog, Vehicle, VehicleSnapshot,
};
use crate::types::{
    AdmissionMode, MachineId, OrderId, SimulationConfig, StopReason, VehicleId, VehiclePhase,
};
use crate::{perf_span, sim_event};
use tracing::{debug, info, instrument};

/// What a single call to [`Simulation::step`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// An event was popped and handled
    Processed(Event),
    /// The run is over; no event was handled
    Stopped(StopReason),
}

/// A single haulage simulation run
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    queue: EventQueue,
    intervals: IntervalGenerator,
    piles: PileInventory,
    crews: CrewPool,
    machines: FormingMachines,
    fleet: Fleet,
    orders: Option<OrderBook>,
    statistics: RunStatistics,
    samples: SampleBuffer,
    next_sample: u64,
    trace: TraceLog,
    stopped: Option<StopReason>,
}

impl Simulation {
    /// Validate the configuration and set up a run at time zero
    ///
    /// Every forming machine starts its first pile, the first order arrival is
    /// scheduled when order tracking is on, and the admission policy runs once
    /// so initial pile stock can be loaded immediately.
    #[instrument(skip(config), fields(fleet_size = config.fleet_size, crew_capacity = config.crew_capacity))]
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;

        let seed = match config.seed {
            Some(seed) => {
                info!("Using deterministic seed: {}", seed);
                seed
            }
            None => {
                let seed = rand::random::<u64>();
                debug!("Drew entropy-based seed: {}", seed);
                seed
            }
        };

        let mut simulation = Self {
            queue: EventQueue::new(),
            intervals: IntervalGenerator::new(seed),
            piles: PileInventory::new(config.initial_piles),
            crews: CrewPool::new(config.crew_capacity),
            machines: FormingMachines::new(config.forming_machines),
            fleet: Fleet::new(config.fleet_size),
            orders: config.orders.map(|orders| OrderBook::new(orders.max_orders)),
            statistics: RunStatistics::new(),
            samples: SampleBuffer::new(config.max_samples),
            next_sample: 0,
            trace: TraceLog::new(config.trace),
            stopped: None,
            config,
        };

        let machine_ids: Vec<MachineId> = simulation.machines.ids().collect();
        for id in machine_ids {
            simulation.start_forming(id)?;
        }

        if let Some(book) = &simulation.orders {
            let first = book.next_id();
            simulation.queue.push(0.0, EventAction::OrderArrival, EventPayload::Order(first))?;
        }

        simulation.admit()?;

        sim_event!(
            info,
            "Simulation initialized",
            machines = simulation.config.forming_machines,
            crews = simulation.config.crew_capacity,
            vehicles = simulation.config.fleet_size,
            seed = seed,
        );
        Ok(simulation)
    }

    /// Run until a stop condition holds and return the report
    #[instrument(skip(self), fields(horizon = self.config.horizon))]
    pub fn run(&mut self) -> SimulationResult<SimulationReport> {
        let span = perf_span!("simulation_run", horizon = self.config.horizon);
        let _enter = span.enter();

        let reason = loop {
            if let StepOutcome::Stopped(reason) = self.step()? {
                break reason;
            }
        };

        info!(
            "Simulation stopped ({}) at t = {:.3} after {} events, {} cycles completed",
            reason,
            self.now(),
            self.statistics.events_processed,
            self.statistics.completed_cycles
        );
        Ok(self.report())
    }

    /// Process the next event, or detect that the run is over
    pub fn step(&mut self) -> SimulationResult<StepOutcome> {
        if let Some(reason) = self.stopped {
            return Ok(StepOutcome::Stopped(reason));
        }

        let Some(next) = self.queue.peek_time() else {
            return Ok(self.stop(StopReason::QueueExhausted));
        };

        let horizon = self.config.horizon;
        if next > horizon {
            // The overrunning event is left unexecuted
            self.advance_idle(horizon)?;
            self.queue.advance_to(horizon)?;
            return Ok(self.stop(StopReason::Horizon));
        }

        self.advance_idle(next)?;
        let event = match self.queue.pop() {
            Ok(event) => event,
            Err(err) if err.is_termination_signal() => {
                return Ok(self.stop(StopReason::QueueExhausted));
            }
            Err(err) => return Err(err),
        };

        self.dispatch(event)?;
        self.statistics.events_processed += 1;
        self.check_invariants()?;

        if let Some(target) = self.config.cycle_target {
            if self.statistics.completed_cycles >= target {
                self.stop(StopReason::CycleTarget);
            }
        }
        if let (Some(book), Some(target)) =
            (&self.orders, self.config.orders.and_then(|orders| orders.order_target))
        {
            if book.completed() >= target {
                self.stop(StopReason::OrderTarget);
            }
        }

        Ok(StepOutcome::Processed(event))
    }

    /// Schedule an arbitrary event, for drivers that inject their own events
    pub fn schedule(
        &mut self,
        time: f64,
        action: EventAction,
        payload: EventPayload,
    ) -> SimulationResult<u64> {
        self.queue.push(time, action, payload)
    }

    /// Schedule an event by action name
    pub fn schedule_named(
        &mut self,
        time: f64,
        action: &str,
        payload: EventPayload,
    ) -> SimulationResult<u64> {
        let action = action.parse::<EventAction>()?;
        self.queue.push(time, action, payload)
    }

    /// Assemble the report for the current state
    ///
    /// Pure with respect to the simulation, so repeated calls give identical output.
    pub fn report(&self) -> SimulationReport {
        let total_time = self.now();
        let busy = self.statistics.busy;

        SimulationReport {
            stop_reason: self.stopped,
            final_time: total_time,
            seed: self.intervals.seed(),
            events_processed: self.statistics.events_processed,
            completed_cycles: self.statistics.completed_cycles,
            average_cycle_time: self.statistics.average_cycle_time(),
            utilization: ResourceUtilization {
                forming: utilization(busy.forming, self.machines.capacity(), total_time),
                crews: utilization(busy.crews, self.crews.capacity(), total_time),
                fleet: utilization(busy.fleet, self.fleet.size(), total_time),
            },
            busy_time: busy,
            final_piles: self.piles.count(),
            piles_formed: self.piles.formed(),
            loads_started: self.statistics.loads_started,
            samples: self.samples.iter().cloned().collect(),
            samples_dropped: self.samples.dropped(),
            vehicles: self
                .fleet
                .iter()
                .map(|vehicle| VehicleSnapshot {
                    id: vehicle.id,
                    phase: vehicle.phase,
                    total_cycles: vehicle.total_cycles,
                })
                .collect(),
            orders: self.orders.as_ref().map(OrderBook::summary),
        }
    }

    /// Current simulated time
    pub fn now(&self) -> f64 {
        self.queue.now()
    }

    /// Configuration of this run
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Seed of the run's random source
    pub fn seed(&self) -> u64 {
        self.intervals.seed()
    }

    /// Piles on the ground
    pub fn piles(&self) -> u64 {
        self.piles.count()
    }

    /// Crews currently loading
    pub fn crews_busy(&self) -> u32 {
        self.crews.busy()
    }

    /// Vehicle state by id
    pub fn vehicle(&self, id: VehicleId) -> SimulationResult<&Vehicle> {
        self.fleet.get(id)
    }

    /// All vehicles
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Order book, when order tracking is enabled
    pub fn orders(&self) -> Option<&OrderBook> {
        self.orders.as_ref()
    }

    /// Run accumulators
    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    /// Transition trace
    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    /// Events still queued
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Why the run stopped, if it has
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Whether the run has stopped
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    fn stop(&mut self, reason: StopReason) -> StepOutcome {
        if self.stopped.is_none() {
            debug!("Stopping at t = {:.3}: {}", self.now(), reason);
            self.stopped = Some(reason);
        }
        StepOutcome::Stopped(reason)
    }

    /// Integrate busy time and take samples over `[now, to]` without moving the clock
    fn advance_idle(&mut self, to: f64) -> SimulationResult<()> {
        let elapsed = self.queue.elapsed_until(to)?;

        loop {
            let boundary = self.next_sample as f64 * self.config.report_interval;
            if boundary > to {
                break;
            }
            self.record_sample(boundary);
            self.next_sample += 1;
        }

        self.statistics.busy.integrate(
            elapsed,
            self.machines.busy_count(),
            self.crews.busy(),
            self.fleet.busy_count(),
        );
        Ok(())
    }

    fn record_sample(&mut self, time: f64) {
        self.samples.push(Sample {
            time,
            piles: self.piles.count(),
            crews_busy: self.crews.busy(),
            vehicle_phases: self.fleet.phases(),
            completed_cycles: self.statistics.completed_cycles,
        });
    }

    fn dispatch(&mut self, event: Event) -> SimulationResult<()> {
        match (event.action(), event.payload()) {
            (EventAction::FormingComplete, EventPayload::Machine(id)) => self.on_forming_complete(id),
            (EventAction::LoadingComplete, EventPayload::Vehicle(id)) => self.on_loading_complete(id),
            (EventAction::TravelComplete, EventPayload::Vehicle(id)) => self.on_travel_complete(id),
            (EventAction::UnloadingComplete, EventPayload::Vehicle(id)) => {
                self.on_unloading_complete(id)
            }
            (EventAction::ReturnComplete, EventPayload::Vehicle(id)) => self.on_return_complete(id),
            (EventAction::OrderArrival, EventPayload::Order(id)) => self.on_order_arrival(id),
            (action, payload) => Err(SimulationError::unknown_event(format!(
                "{} cannot be dispatched with payload {}",
                action, payload
            ))),
        }
    }

    fn start_forming(&mut self, id: MachineId) -> SimulationResult<()> {
        self.machines.start(id)?;
        let duration = self.intervals.duration(&self.config.forming)?;
        self.queue.schedule_in(duration, EventAction::FormingComplete, EventPayload::Machine(id))?;
        Ok(())
    }

    fn on_forming_complete(&mut self, id: MachineId) -> SimulationResult<()> {
        self.machines.finish(id)?;
        self.piles.add_pile();
        let now = self.now();
        self.trace.record(now, format!("{} formed a pile, {} on the ground", id, self.piles.count()));

        self.start_forming(id)?;
        self.admit()?;
        Ok(())
    }

    /// Whether one more vehicle could start loading right now
    fn can_start_loading(&self) -> bool {
        self.crews.has_free()
            && self.piles.has_load()
            && self.orders.as_ref().map_or(true, |book| book.assignable().is_some())
    }

    /// Admit waiting vehicles in id order while crews, piles and demand allow
    fn admit(&mut self) -> SimulationResult<u32> {
        let mut admitted = 0;

        loop {
            let mut admitted_this_pass = false;

            for raw in 0..self.fleet.size() {
                let id = VehicleId::new(raw);
                if self.fleet.get(id)?.phase != VehiclePhase::Waiting {
                    continue;
                }
                if !self.can_start_loading() {
                    return Ok(admitted);
                }

                self.start_loading(id)?;
                admitted += 1;
                admitted_this_pass = true;

                if self.config.admission == AdmissionMode::Single {
                    return Ok(admitted);
                }
            }

            if !admitted_this_pass {
                return Ok(admitted);
            }
        }
    }

    fn start_loading(&mut self, id: VehicleId) -> SimulationResult<()> {
        let now = self.now();

        self.crews.acquire()?;
        self.piles.take_load()?;

        let order = match self.orders.as_mut() {
            Some(book) => {
                let order_id = book.assignable().ok_or_else(|| {
                    SimulationError::invariant_violation("loading started without open demand")
                })?;
                book.assign(order_id)?;
                Some(order_id)
            }
            None => None,
        };

        let vehicle = self.fleet.get_mut(id)?;
        vehicle.advance_from(VehiclePhase::Waiting)?;
        vehicle.cycle_start = Some(now);
        vehicle.order = order;
        self.statistics.loads_started += 1;

        let message = match order {
            Some(order_id) => format!(
                "{} waiting -> loading for {} (crews {}/{}, piles {})",
                id,
                order_id,
                self.crews.busy(),
                self.crews.capacity(),
                self.piles.count()
            ),
            None => format!(
                "{} waiting -> loading (crews {}/{}, piles {})",
                id,
                self.crews.busy(),
                self.crews.capacity(),
                self.piles.count()
            ),
        };
        self.trace.record(now, message);
        debug!(vehicle = id.0, time = now, "Loading started");

        let duration = self.intervals.duration(&self.config.loading)?;
        self.queue.schedule_in(duration, EventAction::LoadingComplete, EventPayload::Vehicle(id))?;
        Ok(())
    }

    fn on_loading_complete(&mut self, id: VehicleId) -> SimulationResult<()> {
        self.fleet.get_mut(id)?.advance_from(VehiclePhase::Loading)?;
        self.crews.release()?;
        let now = self.now();
        self.trace.record(now, format!("{} loading -> traveling", id));

        let duration = self.intervals.duration(&self.config.travel)?;
        self.queue.schedule_in(duration, EventAction::TravelComplete, EventPayload::Vehicle(id))?;

        self.admit()?;
        Ok(())
    }

    fn on_travel_complete(&mut self, id: VehicleId) -> SimulationResult<()> {
        self.fleet.get_mut(id)?.advance_from(VehiclePhase::Traveling)?;
        let now = self.now();
        self.trace.record(now, format!("{} traveling -> unloading", id));

        let duration = self.intervals.duration(&self.config.unloading)?;
        self.queue.schedule_in(duration, EventAction::UnloadingComplete, EventPayload::Vehicle(id))?;
        Ok(())
    }

    fn on_unloading_complete(&mut self, id: VehicleId) -> SimulationResult<()> {
        let now = self.now();

        let vehicle = self.fleet.get_mut(id)?;
        vehicle.advance_from(VehiclePhase::Unloading)?;
        let started = vehicle.cycle_start.ok_or_else(|| {
            SimulationError::invariant_violation(format!("{} finished unloading without a cycle start", id))
        })?;
        let cycle_time = now - started;
        vehicle.total_cycles += 1;
        let order = vehicle.order.take();

        self.statistics.record_cycle(cycle_time);
        self.trace.record(
            now,
            format!(
                "{} unloading -> returning, cycle {:.3} (total {})",
                id, cycle_time, self.statistics.completed_cycles
            ),
        );

        if let (Some(book), Some(order_id)) = (self.orders.as_mut(), order) {
            match book.deliver(order_id, now) {
                Delivery::Partial { delivered, required } => {
                    self.trace.record(now, format!("{} received {}/{} pairs", order_id, delivered, required));
                }
                Delivery::Completed { lead_time } => {
                    self.trace.record(now, format!("{} completed, lead time {:.3}", order_id, lead_time));
                    sim_event!(debug, "Order completed", order = order_id.0, lead_time = lead_time);
                }
                Delivery::Stale => {
                    debug!(order = order_id.0, "Ignoring delivery for untracked order");
                }
            }
        }

        let duration = self.intervals.duration(&self.config.returning)?;
        self.queue.schedule_in(duration, EventAction::ReturnComplete, EventPayload::Vehicle(id))?;
        Ok(())
    }

    fn on_return_complete(&mut self, id: VehicleId) -> SimulationResult<()> {
        let vehicle = self.fleet.get_mut(id)?;
        vehicle.advance_from(VehiclePhase::Returning)?;
        vehicle.cycle_start = None;
        let now = self.now();
        self.trace.record(now, format!("{} returning -> waiting", id));

        self.admit()?;
        Ok(())
    }

    fn on_order_arrival(&mut self, id: OrderId) -> SimulationResult<()> {
        let (Some(book), Some(params)) = (self.orders.as_mut(), self.config.orders) else {
            return Err(SimulationError::unknown_event(format!(
                "order arrival for {} but order tracking is disabled",
                id
            )));
        };

        let now = self.queue.now();
        let required = self.intervals.order_size(params.min_pairs, params.max_pairs)?;
        book.open_order(id, required, now)?;
        let next = book.accepts_arrivals().then(|| book.next_id());
        self.trace.record(now, format!("{} arrived needing {} pairs", id, required));

        if let Some(next_id) = next {
            let delay = self.intervals.duration(&params.interarrival)?;
            self.queue.schedule_in(delay, EventAction::OrderArrival, EventPayload::Order(next_id))?;
        }

        self.admit()?;
        Ok(())
    }

    fn check_invariants(&self) -> SimulationResult<()> {
        let loading = self.fleet.loading_count();
        if loading != self.crews.busy() {
            return Err(SimulationError::invariant_violation(format!(
                "{} vehicles loading but {} crews busy",
                loading,
                self.crews.busy()
            )));
        }
        if self.fleet.total_cycles() != self.statistics.completed_cycles {
            return Err(SimulationError::invariant_violation(format!(
                "vehicles report {} cycles but {} were recorded",
                self.fleet.total_cycles(),
                self.statistics.completed_cycles
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityTiming, OrderConfig};

    fn fixed_config() -> SimulationConfig {
        SimulationConfig {
            forming: ActivityTiming::fixed(5.0),
            loading: ActivityTiming::fixed(2.0),
            travel: ActivityTiming::fixed(3.0),
            unloading: ActivityTiming::fixed(2.0),
            returning: ActivityTiming::fixed(3.0),
            seed: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SimulationConfig { fleet_size: 0, ..fixed_config() };
        assert!(matches!(Simulation::new(config), Err(SimulationError::Configuration(_))));
    }

    #[test]
    fn test_construction_schedules_one_forming_per_machine() {
        let config = SimulationConfig { forming_machines: 3, ..fixed_config() };
        let sim = Simulation::new(config).unwrap();
        assert_eq!(sim.pending_events(), 3);
        assert_eq!(sim.now(), 0.0);
        assert!(!sim.is_stopped());
    }

    #[test]
    fn test_initial_piles_are_loaded_at_time_zero() {
        let config = SimulationConfig { initial_piles: 4, ..fixed_config() };
        let sim = Simulation::new(config).unwrap();
        assert_eq!(sim.crews_busy(), 2);
        assert_eq!(sim.piles(), 0);
        assert_eq!(sim.vehicle(VehicleId::new(0)).unwrap().phase, VehiclePhase::Loading);
        assert_eq!(sim.vehicle(VehicleId::new(1)).unwrap().phase, VehiclePhase::Loading);
        assert_eq!(sim.vehicle(VehicleId::new(2)).unwrap().phase, VehiclePhase::Waiting);
    }

    #[test]
    fn test_single_admission_starts_one_vehicle_per_invocation() {
        let config = SimulationConfig {
            initial_piles: 4,
            admission: AdmissionMode::Single,
            ..fixed_config()
        };
        let sim = Simulation::new(config).unwrap();
        assert_eq!(sim.crews_busy(), 1);
        assert_eq!(sim.piles(), 2);
    }

    #[test]
    fn test_first_loading_waits_for_two_piles() {
        let mut sim = Simulation::new(fixed_config()).unwrap();

        // First pile at t=5 is not enough
        sim.step().unwrap();
        assert_eq!(sim.now(), 5.0);
        assert_eq!(sim.piles(), 1);
        assert_eq!(sim.crews_busy(), 0);

        sim.step().unwrap();
        assert_eq!(sim.now(), 10.0);
        assert_eq!(sim.piles(), 0);
        assert_eq!(sim.crews_busy(), 1);
        assert_eq!(sim.vehicle(VehicleId::new(0)).unwrap().cycle_start, Some(10.0));
    }

    #[test]
    fn test_wrong_payload_is_unknown_event() {
        let mut sim = Simulation::new(fixed_config()).unwrap();
        sim.schedule(1.0, EventAction::LoadingComplete, EventPayload::Machine(MachineId::new(0)))
            .unwrap();
        assert!(matches!(sim.step(), Err(SimulationError::UnknownEvent(_))));
    }

    #[test]
    fn test_order_arrival_without_order_book_is_unknown_event() {
        let mut sim = Simulation::new(fixed_config()).unwrap();
        sim.schedule(1.0, EventAction::OrderArrival, EventPayload::Order(OrderId::new(0))).unwrap();
        assert!(matches!(sim.step(), Err(SimulationError::UnknownEvent(_))));
    }

    #[test]
    fn test_unknown_action_name_is_rejected() {
        let mut sim = Simulation::new(fixed_config()).unwrap();
        let err = sim.schedule_named(1.0, "refuel", EventPayload::None).unwrap_err();
        assert!(matches!(err, SimulationError::UnknownEvent(_)));
        assert!(sim
            .schedule_named(1.0, "travel_complete", EventPayload::Vehicle(VehicleId::new(9)))
            .is_ok());
        // VEH_9 does not exist
        assert!(matches!(sim.step(), Err(SimulationError::UnknownEvent(_))));
    }

    #[test]
    fn test_out_of_phase_event_is_invariant_violation() {
        let mut sim = Simulation::new(fixed_config()).unwrap();
        sim.schedule(1.0, EventAction::ReturnComplete, EventPayload::Vehicle(VehicleId::new(0)))
            .unwrap();
        assert!(matches!(sim.step(), Err(SimulationError::InvariantViolation(_))));
    }

    #[test]
    fn test_scheduling_into_the_past_fails() {
        let mut sim = Simulation::new(fixed_config()).unwrap();
        sim.step().unwrap();
        let err = sim.schedule(1.0, EventAction::FormingComplete, EventPayload::None).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidSchedule { .. }));
    }

    #[test]
    fn test_step_after_stop_is_stable() {
        let config = SimulationConfig { horizon: 7.0, ..fixed_config() };
        let mut sim = Simulation::new(config).unwrap();
        sim.run().unwrap();
        assert_eq!(sim.step().unwrap(), StepOutcome::Stopped(StopReason::Horizon));
        assert_eq!(sim.now(), 7.0);
    }

    #[test]
    fn test_orders_gate_admission() {
        let config = SimulationConfig {
            initial_piles: 10,
            orders: Some(OrderConfig {
                interarrival: ActivityTiming::fixed(100.0),
                min_pairs: 1,
                max_pairs: 1,
                max_orders: 2,
                order_target: None,
            }),
            ..fixed_config()
        };
        let mut sim = Simulation::new(config).unwrap();
        // Piles are available but no order has arrived yet
        assert_eq!(sim.crews_busy(), 0);

        let outcome = sim.step().unwrap();
        assert!(matches!(outcome, StepOutcome::Processed(event) if event.action() == EventAction::OrderArrival));
        // A one-pair order admits exactly one vehicle
        assert_eq!(sim.crews_busy(), 1);
        assert_eq!(sim.vehicle(VehicleId::new(0)).unwrap().order, Some(OrderId::new(0)));
        assert_eq!(sim.piles(), 8);
    }
}
