//! Event records and the time-ordered event queue
//!
//! Events are ordered by `(time, sequence)`. The sequence is a monotonic counter
//! assigned on push, so events scheduled for the same instant are processed in
//! the order they were scheduled and no two events ever compare equal.

use super::{SimulationClock, SimulationError, SimulationResult};
use crate::types::{MachineId, OrderId, VehicleId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;

/// What happens when an event fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A forming machine finished a pile
    FormingComplete,
    /// A vehicle finished loading and leaves its crew
    LoadingComplete,
    /// A loaded vehicle reached the dump site
    TravelComplete,
    /// A vehicle finished dumping; completes its haul cycle
    UnloadingComplete,
    /// An empty vehicle is back at the loading area
    ReturnComplete,
    /// A new customer order arrives
    OrderArrival,
}

impl EventAction {
    /// Every action, in declaration order
    pub const ALL: [EventAction; 6] = [
        EventAction::FormingComplete,
        EventAction::LoadingComplete,
        EventAction::TravelComplete,
        EventAction::UnloadingComplete,
        EventAction::ReturnComplete,
        EventAction::OrderArrival,
    ];

    /// Stable snake_case name of the action
    pub fn name(self) -> &'static str {
        match self {
            EventAction::FormingComplete => "forming_complete",
            EventAction::LoadingComplete => "loading_complete",
            EventAction::TravelComplete => "travel_complete",
            EventAction::UnloadingComplete => "unloading_complete",
            EventAction::ReturnComplete => "return_complete",
            EventAction::OrderArrival => "order_arrival",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventAction {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventAction::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| SimulationError::unknown_event(format!("unrecognized action '{}'", s)))
    }
}

/// Entity an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EventPayload {
    /// No entity
    None,
    /// A haul vehicle
    Vehicle(VehicleId),
    /// A forming machine
    Machine(MachineId),
    /// A customer order
    Order(OrderId),
}

impl fmt::Display for EventPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventPayload::None => write!(f, "-"),
            EventPayload::Vehicle(id) => write!(f, "{}", id),
            EventPayload::Machine(id) => write!(f, "{}", id),
            EventPayload::Order(id) => write!(f, "{}", id),
        }
    }
}

/// An immutable scheduled event
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Event {
    time: f64,
    sequence: u64,
    action: EventAction,
    payload: EventPayload,
}

impl Event {
    /// Simulated time at which the event fires
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Insertion-order tie-break key
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// What the event does
    pub fn action(&self) -> EventAction {
        self.action
    }

    /// Which entity the event refers to
    pub fn payload(&self) -> EventPayload {
        self.payload
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {} @ {:.3}", self.sequence, self.action, self.payload, self.time)
    }
}

// Sequences are unique within a queue, so `(time, sequence)` identifies an event
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap yields the smallest (time, sequence) first
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Pending events plus the clock they drive
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_sequence: u64,
    clock: SimulationClock,
}

impl EventQueue {
    /// Create an empty queue with the clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Time between now and `time`, failing if `time` lies in the past
    pub fn elapsed_until(&self, time: f64) -> SimulationResult<f64> {
        self.clock.elapsed_until(time)
    }

    /// Schedule an event at an absolute time and return its sequence number
    pub fn push(
        &mut self,
        time: f64,
        action: EventAction,
        payload: EventPayload,
    ) -> SimulationResult<u64> {
        let now = self.clock.now();
        // Negated comparison so NaN is rejected too
        if !(time >= now) || !time.is_finite() {
            return Err(SimulationError::InvalidSchedule { time, now });
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Event { time, sequence, action, payload });
        Ok(sequence)
    }

    /// Schedule an event `delay` time units from now
    pub fn schedule_in(
        &mut self,
        delay: f64,
        action: EventAction,
        payload: EventPayload,
    ) -> SimulationResult<u64> {
        self.push(self.clock.now() + delay, action, payload)
    }

    /// Time of the earliest pending event
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(Event::time)
    }

    /// Remove the earliest event and advance the clock to its time
    pub fn pop(&mut self) -> SimulationResult<Event> {
        let event = self.heap.pop().ok_or(SimulationError::EmptyQueue)?;
        self.clock.advance_to(event.time)?;
        Ok(event)
    }

    /// Move the clock without popping, used to clamp a run to its horizon
    pub fn advance_to(&mut self, time: f64) -> SimulationResult<f64> {
        if let Some(next) = self.peek_time() {
            if time > next {
                return Err(SimulationError::invariant_violation(format!(
                    "cannot advance clock to {} past pending event at {}",
                    time, next
                )));
            }
        }
        self.clock.advance_to(time)
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of events ever pushed
    pub fn scheduled_count(&self) -> u64 {
        self.next_sequence
    }
}
