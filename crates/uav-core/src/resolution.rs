//! Mission resolution workflow.
//!
//! One attempt runs: snapshot original → build obstacle set → search →
//! either replace the mission's trajectory with the rerouted one, or keep it
//! and report that manual intervention is required.

use crate::conflict::ConflictDetector;
use crate::error::{DeconflictError, Result};
use crate::models::{Conflict, Mission, OtherTrajectory, Trajectory, Waypoint};
use crate::route_engine::{self, ObstacleSet, PlannedPath, PlannerConfig};
use crate::rules::{require_positive, SafetyRules};
use crate::spatial::{cumulative_lengths, GridCell};
use serde::{Deserialize, Serialize};

/// How timestamps are assigned to a rerouted path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RetimePolicy {
    /// Keep the original first and last time, spread along path length
    #[default]
    PreserveSpan,
    /// Start at the original first time and fly at a fixed speed
    ConstantSpeed { speed: f64 },
}

impl RetimePolicy {
    pub fn validate(&self) -> Result<()> {
        match self {
            RetimePolicy::PreserveSpan => Ok(()),
            RetimePolicy::ConstantSpeed { speed } => require_positive("speed", *speed),
        }
    }
}

/// Timestamps for `path` derived from the `baseline` schedule.
pub fn retime(path: &[Waypoint], baseline: &Trajectory, policy: RetimePolicy) -> Result<Vec<f64>> {
    policy.validate()?;
    let (Some(start_time), Some(end_time)) = (baseline.start_time(), baseline.end_time()) else {
        return Err(DeconflictError::MalformedTrajectory(
            "cannot retime against an empty schedule".to_string(),
        ));
    };

    let lengths = cumulative_lengths(path);
    let total = lengths.last().copied().unwrap_or(0.0);

    let times = match policy {
        RetimePolicy::PreserveSpan if total > 0.0 => lengths
            .iter()
            .map(|len| start_time + (end_time - start_time) * len / total)
            .collect(),
        RetimePolicy::PreserveSpan => vec![start_time; path.len()],
        RetimePolicy::ConstantSpeed { speed } => {
            lengths.iter().map(|len| start_time + len / speed).collect()
        }
    };
    Ok(times)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub rules: SafetyRules,
    pub planner: PlannerConfig,
    pub retime: RetimePolicy,
}

impl ResolutionConfig {
    pub fn validate(&self) -> Result<()> {
        self.rules.validate()?;
        self.planner.validate()?;
        self.retime.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// The mission now flies `path`. Residual conflicts are what the
    /// detector still reports against the retimed path.
    Rerouted {
        path: PlannedPath,
        residual_conflicts: Vec<Conflict>,
    },
    /// The mission was left unchanged.
    ManualInterventionRequired { reason: String },
}

impl ResolutionOutcome {
    pub fn is_rerouted(&self) -> bool {
        matches!(self, ResolutionOutcome::Rerouted { .. })
    }
}

/// Run one resolution attempt against `others`.
///
/// Configuration, empty-mission and off-grid errors are returned before the
/// snapshot is taken. Search failures are not errors: they come back as
/// [`ResolutionOutcome::ManualInterventionRequired`] with the mission
/// untouched and its original snapshot in place.
pub fn resolve_mission(
    mission: &mut Mission,
    others: &[OtherTrajectory],
    config: &ResolutionConfig,
) -> Result<ResolutionOutcome> {
    config.validate()?;
    let grid_size = config.planner.grid_size;
    let (start, goal) = mission.current().endpoints()?;
    for point in [start, goal] {
        if GridCell::from_waypoint(&point, grid_size).is_none() {
            return Err(DeconflictError::OffGrid { point, grid_size });
        }
    }

    let baseline = mission.current().clone();
    mission.snapshot_original();
    tracing::info!(drone_id = %mission.drone_id, "original trajectory captured");

    let obstacles = ObstacleSet::from_trajectories_with_clearance(
        others,
        grid_size,
        config.planner.obstacle_clearance,
    )?;
    tracing::info!(
        obstacle_cells = obstacles.len(),
        trajectories = others.len(),
        "obstacle set built"
    );

    let path = match route_engine::resolve(&start, &goal, &obstacles, &config.planner) {
        Ok(path) => path,
        Err(err) if err.requires_manual_intervention() => {
            tracing::warn!(
                drone_id = %mission.drone_id,
                reason = %err,
                "unable to find a conflict-free path, manual intervention required"
            );
            return Ok(ResolutionOutcome::ManualInterventionRequired {
                reason: err.to_string(),
            });
        }
        Err(err) => return Err(err),
    };

    let times = retime(&path.waypoints, &baseline, config.retime)?;
    let rerouted = Trajectory::new(path.waypoints.clone(), times)?;
    let residual_conflicts = ConflictDetector::new(config.rules)?.detect(&rerouted, others);
    if !residual_conflicts.is_empty() {
        tracing::warn!(
            residual = residual_conflicts.len(),
            "rerouted path still inside the safety envelope of other trajectories"
        );
    }

    tracing::info!(
        drone_id = %mission.drone_id,
        waypoints = path.waypoints.len(),
        cost = path.cost,
        "new conflict-free path found"
    );
    mission.replace_current(rerouted);

    Ok(ResolutionOutcome::Rerouted {
        path,
        residual_conflicts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(x: f64, y: f64, z: f64) -> Waypoint {
        Waypoint::new(x, y, z)
    }

    fn mission(points: &[(Waypoint, f64)]) -> Mission {
        let trajectory = Trajectory::new(
            points.iter().map(|(w, _)| *w).collect(),
            points.iter().map(|(_, t)| *t).collect(),
        )
        .unwrap();
        Mission::new("PRIMARY", trajectory)
    }

    fn parked(id: &str, waypoints: Vec<Waypoint>) -> OtherTrajectory {
        let times = (0..waypoints.len()).map(|i| i as f64).collect();
        OtherTrajectory::new(id, Trajectory::new(waypoints, times).unwrap())
    }

    #[test]
    fn test_retime_preserve_span() {
        let baseline = Trajectory::new(vec![wp(0.0, 0.0, 0.0), wp(4.0, 0.0, 0.0)], vec![10.0, 18.0])
            .unwrap();
        let path = [wp(0.0, 0.0, 0.0), wp(1.0, 0.0, 0.0), wp(2.0, 0.0, 0.0), wp(4.0, 0.0, 0.0)];
        let times = retime(&path, &baseline, RetimePolicy::PreserveSpan).unwrap();
        assert_eq!(times, vec![10.0, 12.0, 14.0, 18.0]);
    }

    #[test]
    fn test_retime_constant_speed() {
        let baseline = Trajectory::new(vec![wp(0.0, 0.0, 0.0)], vec![5.0]).unwrap();
        let path = [wp(0.0, 0.0, 0.0), wp(2.0, 0.0, 0.0), wp(2.0, 2.0, 0.0)];
        let times = retime(&path, &baseline, RetimePolicy::ConstantSpeed { speed: 2.0 }).unwrap();
        assert_eq!(times, vec![5.0, 6.0, 7.0]);

        assert!(retime(&path, &baseline, RetimePolicy::ConstantSpeed { speed: 0.0 }).is_err());
    }

    #[test]
    fn test_reroute_replaces_current_and_keeps_original() {
        let mut mission = mission(&[(wp(0.0, 0.0, 0.0), 0.0), (wp(2.0, 0.0, 0.0), 4.0)]);
        let before = mission.current().clone();
        let others = vec![parked("D1", vec![wp(1.0, 0.0, 0.0)])];

        let outcome = resolve_mission(&mut mission, &others, &ResolutionConfig::default()).unwrap();

        let ResolutionOutcome::Rerouted { path, .. } = outcome else {
            panic!("expected a reroute");
        };
        assert_eq!(path.cost, 4.0);
        assert_eq!(mission.original(), Some(&before));
        assert_eq!(mission.current().waypoints(), path.waypoints.as_slice());
        assert_eq!(mission.current().times().first(), Some(&0.0));
        assert_eq!(mission.current().times().last(), Some(&4.0));
        assert!(!mission.current().waypoints().contains(&wp(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_reroute_reports_residual_conflicts() {
        let mut mission = mission(&[(wp(0.0, 0.0, 0.0), 0.0), (wp(2.0, 0.0, 0.0), 1.0)]);
        let others = vec![parked("D1", vec![wp(1.0, 0.0, 0.0)])];

        let outcome = resolve_mission(&mut mission, &others, &ResolutionConfig::default()).unwrap();
        let ResolutionOutcome::Rerouted {
            residual_conflicts, ..
        } = outcome
        else {
            panic!("expected a reroute");
        };
        // exact-cell avoidance still passes within the 4.0 safety distance
        assert!(!residual_conflicts.is_empty());
        assert!(residual_conflicts.iter().all(|c| c.conflicting_id == "D1"));
    }

    #[test]
    fn test_boxed_in_goal_requires_manual_intervention() {
        let mut mission = mission(&[(wp(0.0, 0.0, 0.0), 0.0), (wp(5.0, 0.0, 0.0), 5.0)]);
        let before = mission.current().clone();
        let cage: Vec<Waypoint> = GridCell::new(5, 0, 0)
            .neighbors()
            .map(|cell| cell.to_waypoint(1.0))
            .collect();
        let others = vec![parked("CAGE", cage)];

        let outcome = resolve_mission(&mut mission, &others, &ResolutionConfig::default()).unwrap();

        assert!(matches!(
            outcome,
            ResolutionOutcome::ManualInterventionRequired { .. }
        ));
        assert_eq!(mission.current(), &before);
        assert_eq!(mission.original(), Some(&before));
    }

    #[test]
    fn test_second_attempt_keeps_first_snapshot() {
        let mut mission = mission(&[(wp(0.0, 0.0, 0.0), 0.0), (wp(2.0, 0.0, 0.0), 2.0)]);
        let before = mission.current().clone();
        let others = vec![parked("D1", vec![wp(1.0, 0.0, 0.0)])];
        let config = ResolutionConfig::default();

        resolve_mission(&mut mission, &others, &config).unwrap();
        let after_first = mission.current().clone();
        resolve_mission(&mut mission, &others, &config).unwrap();

        assert_eq!(mission.original(), Some(&before));
        assert_eq!(mission.current(), &after_first);
    }

    #[test]
    fn test_errors_before_snapshot() {
        let empty = Trajectory::new(Vec::new(), Vec::new()).unwrap();
        let mut empty_mission = Mission::new("EMPTY", empty);
        let err = resolve_mission(&mut empty_mission, &[], &ResolutionConfig::default()).unwrap_err();
        assert!(matches!(err, DeconflictError::MalformedTrajectory(_)));
        assert!(empty_mission.original().is_none());

        let mut off_grid = mission(&[(wp(0.5, 0.0, 0.0), 0.0), (wp(2.0, 0.0, 0.0), 1.0)]);
        let err = resolve_mission(&mut off_grid, &[], &ResolutionConfig::default()).unwrap_err();
        assert!(matches!(err, DeconflictError::OffGrid { .. }));
        assert!(off_grid.original().is_none());

        let mut valid = mission(&[(wp(0.0, 0.0, 0.0), 0.0), (wp(2.0, 0.0, 0.0), 1.0)]);
        let config = ResolutionConfig {
            rules: SafetyRules {
                safety_distance: -1.0,
                time_threshold: 2.0,
            },
            ..ResolutionConfig::default()
        };
        let err = resolve_mission(&mut valid, &[], &config).unwrap_err();
        assert!(matches!(err, DeconflictError::InvalidConfiguration(_)));
        assert!(valid.original().is_none());
    }

    #[test]
    fn test_huge_coordinates_leave_mission_untouched() {
        let mut far = mission(&[(wp(1e19, 0.0, 0.0), 0.0), (wp(1e19, 1.0, 0.0), 1.0)]);
        let before = far.current().clone();
        let others = vec![parked("FAR", vec![wp(1e19, 0.0, 0.0)])];
        let config = ResolutionConfig {
            planner: PlannerConfig {
                obstacle_clearance: 2.0,
                ..PlannerConfig::default()
            },
            ..ResolutionConfig::default()
        };

        let err = resolve_mission(&mut far, &others, &config).unwrap_err();
        assert!(matches!(err, DeconflictError::OffGrid { .. }));
        assert_eq!(far.current(), &before);
        assert!(far.original().is_none());
    }
}
