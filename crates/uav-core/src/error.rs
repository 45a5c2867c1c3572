//! Error taxonomy shared by the detector, the route engine and the
//! resolution workflow.

use crate::models::Waypoint;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeconflictError {
    /// Waypoints and times disagree, hold non-finite values, or a start/goal
    /// is required from an empty trajectory.
    #[error("malformed trajectory: {0}")]
    MalformedTrajectory(String),

    /// A tolerance or planner parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Start and goal must sit on integer multiples of the grid pitch.
    #[error("position {point} does not lie on the grid (pitch {grid_size})")]
    OffGrid { point: Waypoint, grid_size: f64 },

    /// The frontier emptied before the goal cell was reached.
    #[error("no conflict-free path from {start} to {goal} ({nodes_visited} nodes visited)")]
    NoConflictFreePath {
        start: Waypoint,
        goal: Waypoint,
        nodes_visited: usize,
    },

    /// The explicit expansion cap was hit before the search finished.
    #[error("search stopped after {max_expansions} expansions")]
    SearchBudgetExhausted { max_expansions: usize },
}

impl DeconflictError {
    /// True for outcomes that leave the mission untouched and call for an
    /// operator rather than a retry with the same inputs.
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(
            self,
            DeconflictError::NoConflictFreePath { .. }
                | DeconflictError::SearchBudgetExhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DeconflictError>;
