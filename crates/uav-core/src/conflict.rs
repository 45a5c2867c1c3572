//! Conflict detection between a primary trajectory and other UAV trajectories.
//!
//! Every primary waypoint is compared against every waypoint of every other
//! trajectory. A pair conflicts when it is closer than the safety distance
//! and nearer in time than the time threshold, both strictly.

use crate::error::Result;
use crate::models::{Conflict, OtherTrajectory, Trajectory};
use crate::rules::SafetyRules;
use crate::spatial::distance;

/// Pairwise proximity checker.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    rules: SafetyRules,
}

impl ConflictDetector {
    /// Create a detector, rejecting non-positive tolerances.
    pub fn new(rules: SafetyRules) -> Result<Self> {
        rules.validate()?;
        Ok(Self { rules })
    }

    /// Report every conflicting (primary waypoint, other waypoint) pair.
    ///
    /// Order is primary waypoints outermost, then other trajectories, then
    /// their waypoints. Records are not deduplicated.
    pub fn detect(&self, primary: &Trajectory, others: &[OtherTrajectory]) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for (i, (primary_wp, primary_time)) in primary.points().enumerate() {
            for other in others {
                for (j, (other_wp, other_time)) in other.trajectory.points().enumerate() {
                    let dist = distance(primary_wp, other_wp);
                    let time_diff = (primary_time - other_time).abs();

                    tracing::trace!(
                        primary_index = i,
                        other_id = %other.id,
                        other_index = j,
                        distance = dist,
                        time_diff,
                        "compared waypoints"
                    );

                    if dist < self.rules.safety_distance
                        && time_diff < self.rules.time_threshold
                    {
                        tracing::debug!(
                            other_id = %other.id,
                            location = %other_wp,
                            time = other_time,
                            distance = dist,
                            time_diff,
                            "conflict detected"
                        );
                        conflicts.push(Conflict {
                            location: *other_wp,
                            time: other_time,
                            conflicting_id: other.id.clone(),
                        });
                    }
                }
            }
        }

        conflicts
    }
}

/// One-shot detection with explicit tolerances.
pub fn detect_conflicts(
    primary: &Trajectory,
    others: &[OtherTrajectory],
    safety_distance: f64,
    time_threshold: f64,
) -> Result<Vec<Conflict>> {
    let detector = ConflictDetector::new(SafetyRules::new(safety_distance, time_threshold)?)?;
    Ok(detector.detect(primary, others))
}
