//! UAV mission deconfliction core.
//!
//! Detects spatiotemporal conflicts between a primary mission and the
//! recorded trajectories of other UAVs, and reroutes the mission over a
//! 3D grid with A* when conflicts are found. No I/O happens here; callers
//! load trajectories and render results.

pub mod conflict;
pub mod error;
pub mod models;
pub mod resolution;
pub mod route_engine;
pub mod rules;
pub mod spatial;

pub use conflict::{detect_conflicts, ConflictDetector};
pub use error::{DeconflictError, Result};
pub use models::{Conflict, Mission, MissionReport, OtherTrajectory, Trajectory, Waypoint};
pub use resolution::{resolve_mission, retime, ResolutionConfig, ResolutionOutcome, RetimePolicy};
pub use route_engine::{resolve, ObstacleSet, PlannedPath, PlannerConfig};
pub use rules::SafetyRules;
pub use spatial::{distance, GridCell};
