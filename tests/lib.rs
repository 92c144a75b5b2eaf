// Integration tests test your crate's public API. They only have access to items
// in your crate that are marked pub. See the Cargo Targets page of the Cargo Book
// for more information.
//
//   https://doc.rust-lang.org/cargo/reference/cargo-targets.html#integration-tests
//

use earthworks_sim::*;

#[test]
fn test_core_id_types() {
    let vehicle = VehicleId::new(3);
    let order = OrderId::new(12);
    let machine = MachineId::new(0);

    assert_eq!(vehicle.to_string(), "VEH_3");
    assert_eq!(order.to_string(), "ORD_12");
    assert_eq!(machine.to_string(), "MCH_0");

    assert_eq!("VEH_3".parse::<VehicleId>().unwrap(), vehicle);
    assert!("ORD_x".parse::<OrderId>().is_err());
    assert!("VEH_3".parse::<MachineId>().is_err());
}

#[test]
fn test_id_serialization() {
    let json = serde_json::to_string(&VehicleId::new(7)).unwrap();
    assert_eq!(json, "\"VEH_7\"");
    let back: VehicleId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, VehicleId::new(7));
}

#[test]
fn test_vehicle_phase_cycle() {
    let mut phase = VehiclePhase::Waiting;
    let mut visited = vec![phase];
    for _ in 0..5 {
        phase = phase.next();
        visited.push(phase);
    }
    assert_eq!(
        visited,
        vec![
            VehiclePhase::Waiting,
            VehiclePhase::Loading,
            VehiclePhase::Traveling,
            VehiclePhase::Unloading,
            VehiclePhase::Returning,
            VehiclePhase::Waiting,
        ]
    );
    assert!(!VehiclePhase::Waiting.is_busy());
    assert!(VehiclePhase::Returning.is_busy());
}

#[test]
fn test_event_action_names() {
    for action in EventAction::ALL {
        assert_eq!(action.name().parse::<EventAction>().unwrap(), action);
    }
    assert!(matches!(
        "teleport_complete".parse::<EventAction>(),
        Err(SimulationError::UnknownEvent(_))
    ));
}

#[test]
fn test_default_config_is_valid() {
    let config = SimulationConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.admission, AdmissionMode::Greedy);
    assert!(config.orders.is_none());
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let config = SimulationConfig {
        loading: ActivityTiming::uniform(3.0, 1.0),
        ..Default::default()
    };
    assert!(matches!(
        Simulation::new(config),
        Err(SimulationError::Configuration(ConfigValidationError::InvalidDuration { .. }))
    ));
}

#[test]
fn test_report_envelope_round_trip() {
    let config = SimulationConfig {
        seed: Some(8),
        horizon: 60.0,
        ..Default::default()
    };
    let report = Simulation::new(config.clone()).unwrap().run().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let envelope = ReportEnvelope::new(config, report.clone());
    envelope.save_to_file(&path).unwrap();

    let loaded: ReportEnvelope =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.run_id, envelope.run_id);
    assert_eq!(loaded.report.completed_cycles, report.completed_cycles);
    assert_eq!(loaded.report.samples.len(), report.samples.len());
    assert_eq!(loaded.report.stop_reason, Some(StopReason::Horizon));
    assert_eq!(loaded.config.seed, Some(8));
}

#[test]
fn test_trace_log_writes_lines() {
    let mut trace = TraceLog::new(true);
    trace.record(1.5, "VEH_0 waiting -> loading");
    trace.record(3.5, "VEH_0 loading -> traveling");

    let mut buffer = Vec::new();
    trace.write_to(&mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();

    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().next().unwrap().ends_with("VEH_0 waiting -> loading"));
}
