//! End-to-end detection and rerouting over JSON-shaped mission data.

use uav_core::{
    detect_conflicts, resolve, resolve_mission, ConflictDetector, Mission, ObstacleSet,
    OtherTrajectory, PlannerConfig, ResolutionConfig, ResolutionOutcome, Waypoint,
};

fn primary_mission() -> Mission {
    serde_json::from_value(serde_json::json!({
        "id": "PRIMARY",
        "waypoints": [[0, 0, 0], [2, 0, 0], [4, 0, 0], [6, 0, 0]],
        "times": [0, 2, 4, 6]
    }))
    .unwrap()
}

fn simulated_drones() -> Vec<OtherTrajectory> {
    serde_json::from_value(serde_json::json!([
        {
            "id": "D1",
            "waypoints": [[3, 3, 0], [3, 0, 0], [3, -3, 0]],
            "times": [2, 3, 4]
        },
        {
            "id": "D2",
            "waypoints": [[20, 20, 20], [21, 20, 20]],
            "times": [0, 1]
        }
    ]))
    .unwrap()
}

#[test]
fn test_detect_then_resolve_batch() {
    let mut mission = primary_mission();
    let others = simulated_drones();

    let conflicts = ConflictDetector::default().detect(mission.current(), &others);
    assert!(!conflicts.is_empty());
    assert!(conflicts.iter().all(|c| c.conflicting_id == "D1"));

    let before = mission.current().clone();
    let outcome = resolve_mission(&mut mission, &others, &ResolutionConfig::default()).unwrap();
    assert!(outcome.is_rerouted());

    let report = mission.report();
    assert_eq!(report.original_waypoints.as_deref(), Some(before.waypoints()));
    assert_eq!(report.waypoints.first(), Some(&Waypoint::new(0.0, 0.0, 0.0)));
    assert_eq!(report.waypoints.last(), Some(&Waypoint::new(6.0, 0.0, 0.0)));
    assert_eq!(report.waypoints.len(), report.times.len());
    assert!(!report.waypoints.contains(&Waypoint::new(3.0, 0.0, 0.0)));
}

#[test]
fn test_malformed_input_is_rejected_at_load() {
    let result = serde_json::from_value::<Vec<OtherTrajectory>>(serde_json::json!([
        { "id": "BAD", "waypoints": [[0, 0, 0], [1, 0, 0]], "times": [0] }
    ]));
    assert!(result.is_err());
}

#[test]
fn test_far_traffic_reports_nothing() {
    let mission = primary_mission();
    let others: Vec<OtherTrajectory> = simulated_drones()
        .into_iter()
        .filter(|other| other.id == "D2")
        .collect();

    let conflicts = detect_conflicts(mission.current(), &others, 4.0, 2.0).unwrap();
    assert!(conflicts.is_empty());
}

#[test]
fn test_outcome_serializes_with_status_tag() {
    let mut mission = primary_mission();
    let outcome =
        resolve_mission(&mut mission, &simulated_drones(), &ResolutionConfig::default()).unwrap();
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "rerouted");
    assert!(json["path"]["waypoints"].is_array());

    let ResolutionOutcome::Rerouted { path, .. } = outcome else {
        panic!("expected a reroute");
    };
    assert_eq!(path.waypoints.len(), mission.current().len());
}

#[test]
fn test_parallel_searches_agree() {
    let others = simulated_drones();
    let obstacles = ObstacleSet::from_trajectories(&others, 1.0);
    let config = PlannerConfig::default();
    let start = Waypoint::new(0.0, 0.0, 0.0);
    let goal = Waypoint::new(6.0, 0.0, 0.0);

    let expected = resolve(&start, &goal, &obstacles, &config).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| resolve(&start, &goal, &obstacles, &config).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
