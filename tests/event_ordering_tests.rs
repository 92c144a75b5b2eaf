//! Tests for event queue ordering and clock behavior
//!
//! These tests verify that events pop in time order, that same-instant events
//! keep their scheduling order, and that the clock only moves on pop.

use earthworks_sim::simulation::{EventAction, EventPayload, EventQueue, SimulationError};
use earthworks_sim::types::{MachineId, VehicleId};

fn vehicle(raw: u32) -> EventPayload {
    EventPayload::Vehicle(VehicleId::new(raw))
}

/// Test that interleaved pushes come back sorted by time
#[test]
fn test_events_pop_in_chronological_order() {
    let mut queue = EventQueue::new();
    let times = [9.0, 1.5, 4.0, 4.0, 0.0, 12.25, 3.0];
    for (i, time) in times.iter().enumerate() {
        queue.push(*time, EventAction::TravelComplete, vehicle(i as u32)).unwrap();
    }

    let mut popped = Vec::new();
    while let Ok(event) = queue.pop() {
        assert_eq!(queue.now(), event.time());
        popped.push(event.time());
    }

    assert_eq!(popped, vec![0.0, 1.5, 3.0, 4.0, 4.0, 9.0, 12.25]);
    assert!(queue.is_empty());
}

/// Test that same-instant events keep insertion order even when pushed later
#[test]
fn test_same_instant_events_follow_insertion_order() {
    let mut queue = EventQueue::new();
    queue.push(5.0, EventAction::FormingComplete, EventPayload::Machine(MachineId::new(0))).unwrap();
    queue.push(2.0, EventAction::LoadingComplete, vehicle(1)).unwrap();
    queue.push(5.0, EventAction::ReturnComplete, vehicle(0)).unwrap();

    // Handling the t=2 event schedules another t=5 event
    let first = queue.pop().unwrap();
    assert_eq!(first.action(), EventAction::LoadingComplete);
    queue.schedule_in(3.0, EventAction::TravelComplete, vehicle(1)).unwrap();

    let actions: Vec<EventAction> = (0..3).map(|_| queue.pop().unwrap().action()).collect();
    assert_eq!(
        actions,
        vec![EventAction::FormingComplete, EventAction::ReturnComplete, EventAction::TravelComplete]
    );
}

/// Test that sequence numbers are unique and increasing
#[test]
fn test_sequence_numbers_are_unique() {
    let mut queue = EventQueue::new();
    let mut sequences = Vec::new();
    for i in 0..10 {
        sequences.push(queue.push(1.0, EventAction::UnloadingComplete, vehicle(i)).unwrap());
    }
    let popped: Vec<u64> = (0..10).map(|_| queue.pop().unwrap().sequence()).collect();
    assert_eq!(popped, sequences);
}

/// Test the clock only moves forward
#[test]
fn test_clock_is_monotonic_across_pops() {
    let mut queue = EventQueue::new();
    for time in [3.0, 1.0, 2.0, 2.0] {
        queue.push(time, EventAction::TravelComplete, vehicle(0)).unwrap();
    }

    let mut last = queue.now();
    while !queue.is_empty() {
        queue.pop().unwrap();
        assert!(queue.now() >= last);
        last = queue.now();
    }
}

/// Test that scheduling into the past is rejected
#[test]
fn test_scheduling_before_now_fails() {
    let mut queue = EventQueue::new();
    queue.push(10.0, EventAction::TravelComplete, vehicle(0)).unwrap();
    queue.pop().unwrap();

    match queue.push(9.999, EventAction::TravelComplete, vehicle(0)) {
        Err(SimulationError::InvalidSchedule { time, now }) => {
            assert_eq!(time, 9.999);
            assert_eq!(now, 10.0);
        }
        other => panic!("Expected InvalidSchedule, got {:?}", other),
    }
    assert!(queue.schedule_in(-1.0, EventAction::TravelComplete, vehicle(0)).is_err());
    assert!(queue.is_empty());
}

/// Test that an empty queue signals termination rather than a fault
#[test]
fn test_empty_queue_is_termination_signal() {
    let mut queue = EventQueue::new();
    let err = queue.pop().unwrap_err();
    assert!(matches!(err, SimulationError::EmptyQueue));
    assert!(err.is_termination_signal());
    assert!(!err.is_fatal());
}

/// Test peeking does not consume or move the clock
#[test]
fn test_peek_leaves_queue_untouched() {
    let mut queue = EventQueue::new();
    assert_eq!(queue.peek_time(), None);
    queue.push(6.0, EventAction::FormingComplete, EventPayload::Machine(MachineId::new(0))).unwrap();
    assert_eq!(queue.peek_time(), Some(6.0));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.now(), 0.0);
}
