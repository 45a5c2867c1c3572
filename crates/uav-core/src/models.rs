//! Core data models for mission deconfliction.

use crate::error::{DeconflictError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 3D position sample. Serialized as an `[x, y, z]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Waypoint {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Waypoint {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Waypoint> for [f64; 3] {
    fn from(waypoint: Waypoint) -> Self {
        [waypoint.x, waypoint.y, waypoint.z]
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ========== TRAJECTORIES ==========

/// Ordered waypoints paired with equal-length timestamps (seconds).
///
/// Construction rejects length mismatches and non-finite values, so every
/// `Trajectory` in circulation satisfies `waypoints().len() == times().len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrajectoryRecord")]
pub struct Trajectory {
    waypoints: Vec<Waypoint>,
    times: Vec<f64>,
}

#[derive(Deserialize)]
struct TrajectoryRecord {
    waypoints: Vec<Waypoint>,
    times: Vec<f64>,
}

impl TryFrom<TrajectoryRecord> for Trajectory {
    type Error = DeconflictError;

    fn try_from(record: TrajectoryRecord) -> Result<Self> {
        Trajectory::new(record.waypoints, record.times)
    }
}

impl Trajectory {
    pub fn new(waypoints: Vec<Waypoint>, times: Vec<f64>) -> Result<Self> {
        if waypoints.len() != times.len() {
            return Err(DeconflictError::MalformedTrajectory(format!(
                "{} waypoints but {} timestamps",
                waypoints.len(),
                times.len()
            )));
        }
        if let Some(idx) = waypoints.iter().position(|wp| !wp.is_finite()) {
            return Err(DeconflictError::MalformedTrajectory(format!(
                "waypoint {} has a non-finite coordinate",
                idx
            )));
        }
        if let Some(idx) = times.iter().position(|t| !t.is_finite()) {
            return Err(DeconflictError::MalformedTrajectory(format!(
                "timestamp {} is not finite",
                idx
            )));
        }
        Ok(Self { waypoints, times })
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoints zipped with their timestamps, in order.
    pub fn points(&self) -> impl Iterator<Item = (&Waypoint, f64)> + '_ {
        self.waypoints.iter().zip(self.times.iter().copied())
    }

    /// First and last waypoint, the start/goal pair for rerouting.
    pub fn endpoints(&self) -> Result<(Waypoint, Waypoint)> {
        match (self.waypoints.first(), self.waypoints.last()) {
            (Some(start), Some(goal)) => Ok((*start, *goal)),
            _ => Err(DeconflictError::MalformedTrajectory(
                "empty trajectory has no start or goal".to_string(),
            )),
        }
    }

    pub fn start_time(&self) -> Option<f64> {
        self.times.first().copied()
    }

    pub fn end_time(&self) -> Option<f64> {
        self.times.last().copied()
    }
}

/// A trajectory flown by another UAV. Read-only input to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherTrajectory {
    pub id: String,
    #[serde(flatten)]
    pub trajectory: Trajectory,
}

impl OtherTrajectory {
    pub fn new(id: impl Into<String>, trajectory: Trajectory) -> Self {
        Self {
            id: id.into(),
            trajectory,
        }
    }
}

// ========== MISSION ==========

fn default_primary_id() -> String {
    "primary".to_string()
}

/// The primary UAV's mission: its current trajectory plus the snapshot taken
/// before the first resolution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    #[serde(default = "default_primary_id", alias = "id")]
    pub drone_id: String,
    #[serde(flatten)]
    current: Trajectory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original: Option<Trajectory>,
}

impl Mission {
    pub fn new(drone_id: impl Into<String>, trajectory: Trajectory) -> Self {
        Self {
            drone_id: drone_id.into(),
            current: trajectory,
            original: None,
        }
    }

    pub fn current(&self) -> &Trajectory {
        &self.current
    }

    /// Trajectory as it was before the first resolution attempt, if any.
    pub fn original(&self) -> Option<&Trajectory> {
        self.original.as_ref()
    }

    /// Capture the pre-resolution trajectory. Later attempts in the same
    /// session keep the first snapshot.
    pub fn snapshot_original(&mut self) -> &Trajectory {
        self.original.get_or_insert_with(|| self.current.clone())
    }

    pub(crate) fn replace_current(&mut self, trajectory: Trajectory) {
        self.current = trajectory;
    }

    pub fn report(&self) -> MissionReport {
        MissionReport {
            drone_id: self.drone_id.clone(),
            original_waypoints: self
                .original
                .as_ref()
                .map(|original| original.waypoints().to_vec()),
            waypoints: self.current.waypoints().to_vec(),
            times: self.current.times().to_vec(),
        }
    }
}

/// Output view of a mission for reporting collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionReport {
    pub drone_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_waypoints: Option<Vec<Waypoint>>,
    pub waypoints: Vec<Waypoint>,
    pub times: Vec<f64>,
}

// ========== CONFLICTS ==========

/// A spatiotemporal proximity violation.
///
/// `location` and `time` come from the other trajectory's waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub location: Waypoint,
    pub time: f64,
    pub conflicting_id: String,
}
