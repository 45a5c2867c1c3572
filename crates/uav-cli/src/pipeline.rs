//! Detect → resolve orchestration for one batch of flight data.

use serde::Serialize;
use uav_core::{
    resolve_mission, Conflict, ConflictDetector, Mission, MissionReport, OtherTrajectory,
    ResolutionConfig, ResolutionOutcome,
};

/// Everything a reporting collaborator needs from one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub conflicts: Vec<Conflict>,
    /// `None` when no conflicts were found and no attempt was made
    pub outcome: Option<ResolutionOutcome>,
    pub mission: MissionReport,
}

/// Detect once; if anything conflicts, make a single resolution attempt
/// for the whole batch.
pub fn run_pipeline(
    mission: &mut Mission,
    others: &[OtherTrajectory],
    config: &ResolutionConfig,
) -> uav_core::Result<RunReport> {
    let detector = ConflictDetector::new(config.rules)?;
    let conflicts = detector.detect(mission.current(), others);

    let outcome = if conflicts.is_empty() {
        tracing::info!("no conflicts detected, safe to proceed");
        None
    } else {
        for conflict in &conflicts {
            tracing::warn!(
                time = conflict.time,
                location = %conflict.location,
                drone = %conflict.conflicting_id,
                "conflict"
            );
        }
        Some(resolve_mission(mission, others, config)?)
    };

    Ok(RunReport {
        conflicts,
        outcome,
        mission: mission.report(),
    })
}
