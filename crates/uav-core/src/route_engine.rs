//! Grid A* route engine.
//!
//! Searches a six-connected, axis-aligned 3D grid for the cheapest path from
//! a start cell to a goal cell that never enters an obstacle cell. Step cost
//! and heuristic are both Euclidean, so the heuristic is consistent and the
//! first time the goal is popped its cost is optimal.
//!
//! The search is confined to the box enclosing start, goal and every
//! obstacle cell, padded by `search_margin` cells. With a margin of at
//! least one the outer layer is obstacle-free, so reachability and optimal
//! cost match the unbounded grid and an enclosed goal exhausts the frontier.

use crate::error::{DeconflictError, Result};
use crate::models::{OtherTrajectory, Waypoint};
use crate::rules::require_positive;
use crate::spatial::{distance, CellBounds, GridCell};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Largest obstacle clearance, in grid cells, the obstacle set will inflate by.
pub const MAX_CLEARANCE_CELLS: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Cell pitch in length units
    pub grid_size: f64,
    /// Free cells kept around the occupied region (at least 1)
    pub search_margin: i64,
    /// Optional cap on node expansions
    pub max_expansions: Option<usize>,
    /// Extra radius blocked around each obstacle waypoint (0 = exact cells)
    pub obstacle_clearance: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            grid_size: 1.0,
            search_margin: 1,
            max_expansions: None,
            obstacle_clearance: 0.0,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("grid_size", self.grid_size)?;
        if self.search_margin < 1 {
            return Err(DeconflictError::InvalidConfiguration(format!(
                "search_margin must be at least 1, got {}",
                self.search_margin
            )));
        }
        if self.max_expansions == Some(0) {
            return Err(DeconflictError::InvalidConfiguration(
                "max_expansions must be positive when set".to_string(),
            ));
        }
        check_clearance(self.obstacle_clearance, self.grid_size)
    }
}

fn check_clearance(clearance: f64, grid_size: f64) -> Result<()> {
    if !clearance.is_finite() || clearance < 0.0 {
        return Err(DeconflictError::InvalidConfiguration(format!(
            "obstacle_clearance must be a non-negative finite number, got {}",
            clearance
        )));
    }
    if clearance / grid_size > MAX_CLEARANCE_CELLS {
        return Err(DeconflictError::InvalidConfiguration(format!(
            "obstacle_clearance {} exceeds {} grid cells of pitch {}",
            clearance, MAX_CLEARANCE_CELLS, grid_size
        )));
    }
    Ok(())
}

// ========== OBSTACLES ==========

/// Grid cells the route engine must not enter, built for one pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleSet {
    grid_size: f64,
    cells: HashSet<GridCell>,
}

impl ObstacleSet {
    pub fn empty(grid_size: f64) -> Self {
        Self {
            grid_size,
            cells: HashSet::new(),
        }
    }

    pub fn from_cells(grid_size: f64, cells: impl IntoIterator<Item = GridCell>) -> Self {
        Self {
            grid_size,
            cells: cells.into_iter().collect(),
        }
    }

    /// Every waypoint of every other trajectory, times discarded.
    ///
    /// Waypoints that do not lie on the grid occupy no cell.
    pub fn from_trajectories(others: &[OtherTrajectory], grid_size: f64) -> Self {
        Self::collect(others, grid_size, 0.0)
    }

    /// Like [`ObstacleSet::from_trajectories`], additionally blocking every
    /// cell whose centre lies strictly within `clearance` of a waypoint.
    ///
    /// `grid_size` must be positive and `clearance` at most
    /// [`MAX_CLEARANCE_CELLS`] cells.
    pub fn from_trajectories_with_clearance(
        others: &[OtherTrajectory],
        grid_size: f64,
        clearance: f64,
    ) -> Result<Self> {
        require_positive("grid_size", grid_size)?;
        check_clearance(clearance, grid_size)?;
        Ok(Self::collect(others, grid_size, clearance))
    }

    fn collect(others: &[OtherTrajectory], grid_size: f64, clearance: f64) -> Self {
        let mut set = Self::empty(grid_size);
        for other in others {
            for waypoint in other.trajectory.waypoints() {
                match GridCell::from_waypoint(waypoint, grid_size) {
                    Some(cell) => set.insert(cell),
                    None => tracing::trace!(
                        other_id = %other.id,
                        waypoint = %waypoint,
                        "waypoint off grid, occupies no cell"
                    ),
                }
                if clearance > 0.0 {
                    set.block_around(waypoint, clearance);
                }
            }
        }
        set
    }

    fn block_around(&mut self, waypoint: &Waypoint, clearance: f64) {
        let Some(center) = GridCell::nearest(waypoint, self.grid_size) else {
            return;
        };
        let reach = (clearance / self.grid_size).ceil() as i64 + 1;
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    let Some(cell) = center.offset(dx, dy, dz) else {
                        continue;
                    };
                    if distance(&cell.to_waypoint(self.grid_size), waypoint) < clearance {
                        self.cells.insert(cell);
                    }
                }
            }
        }
    }

    pub fn insert(&mut self, cell: GridCell) {
        self.cells.insert(cell);
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        self.cells.contains(&cell)
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell> + '_ {
        self.cells.iter()
    }
}

// ========== SEARCH ==========

/// A path returned by [`resolve`]. Positions only; no timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPath {
    /// Start to goal, both inclusive
    pub waypoints: Vec<Waypoint>,
    /// Total Euclidean length
    pub cost: f64,
    pub nodes_visited: usize,
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    cell: GridCell,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lowest f first; on ties the deeper node (higher g), then the
/// lexicographically smaller cell.
impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| other.g_score.cmp(&self.g_score))
            .then_with(|| self.cell.cmp(&other.cell))
    }
}

/// Find the cheapest six-connected grid path from `start` to `goal` that
/// avoids every cell in `obstacles`.
///
/// `start` and `goal` must already lie on the grid; they are not rounded.
/// The start cell itself is never checked against `obstacles`.
pub fn resolve(
    start: &Waypoint,
    goal: &Waypoint,
    obstacles: &ObstacleSet,
    config: &PlannerConfig,
) -> Result<PlannedPath> {
    config.validate()?;
    let grid_size = config.grid_size;
    if obstacles.grid_size() != grid_size {
        return Err(DeconflictError::InvalidConfiguration(format!(
            "obstacle set built for grid size {} but planner uses {}",
            obstacles.grid_size(),
            grid_size
        )));
    }

    let start_cell = GridCell::from_waypoint(start, grid_size).ok_or(DeconflictError::OffGrid {
        point: *start,
        grid_size,
    })?;
    let goal_cell = GridCell::from_waypoint(goal, grid_size).ok_or(DeconflictError::OffGrid {
        point: *goal,
        grid_size,
    })?;

    if obstacles.contains(start_cell) {
        tracing::warn!(start = %start, "start cell is occupied by an obstacle");
    }

    let mut bounds = CellBounds::around(start_cell);
    bounds.include(goal_cell);
    for cell in obstacles.cells() {
        bounds.include(*cell);
    }
    let bounds = bounds.padded(config.search_margin);

    let goal_point = goal_cell.to_waypoint(grid_size);
    let heuristic = |cell: GridCell| distance(&cell.to_waypoint(grid_size), &goal_point);

    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    open_set.push(Reverse(OpenNode {
        cell: start_cell,
        g_score: FloatOrd(0.0),
        f_score: FloatOrd(heuristic(start_cell)),
    }));
    let mut closed_set: HashSet<GridCell> = HashSet::new();
    let mut g_score: HashMap<GridCell, f64> = HashMap::new();
    let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
    g_score.insert(start_cell, 0.0);

    let mut nodes_visited = 0usize;

    while let Some(Reverse(current)) = open_set.pop() {
        if closed_set.contains(&current.cell) {
            continue;
        }
        let best_g = g_score
            .get(&current.cell)
            .copied()
            .unwrap_or(f64::INFINITY);
        if current.g_score.0 > best_g {
            continue;
        }

        if let Some(max_expansions) = config.max_expansions {
            if nodes_visited >= max_expansions {
                tracing::warn!(max_expansions, "route search budget exhausted");
                return Err(DeconflictError::SearchBudgetExhausted { max_expansions });
            }
        }
        nodes_visited += 1;

        if current.cell == goal_cell {
            let mut cells = vec![current.cell];
            let mut cursor = current.cell;
            while let Some(previous) = came_from.get(&cursor) {
                cells.push(*previous);
                cursor = *previous;
            }
            cells.reverse();

            let mut waypoints: Vec<Waypoint> =
                cells.iter().map(|cell| cell.to_waypoint(grid_size)).collect();
            if let Some(first) = waypoints.first_mut() {
                *first = *start;
            }
            if let Some(last) = waypoints.last_mut() {
                *last = *goal;
            }

            tracing::debug!(
                steps = waypoints.len(),
                cost = best_g,
                nodes_visited,
                "route found"
            );
            return Ok(PlannedPath {
                waypoints,
                cost: best_g,
                nodes_visited,
            });
        }

        closed_set.insert(current.cell);
        let current_point = current.cell.to_waypoint(grid_size);

        for neighbor in current.cell.neighbors() {
            if !bounds.contains(neighbor)
                || obstacles.contains(neighbor)
                || closed_set.contains(&neighbor)
            {
                continue;
            }

            let tentative_g = best_g + distance(&current_point, &neighbor.to_waypoint(grid_size));
            if tentative_g < g_score.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(neighbor, current.cell);
                g_score.insert(neighbor, tentative_g);
                open_set.push(Reverse(OpenNode {
                    cell: neighbor,
                    g_score: FloatOrd(tentative_g),
                    f_score: FloatOrd(tentative_g + heuristic(neighbor)),
                }));
            }
        }
    }

    tracing::debug!(nodes_visited, "route frontier exhausted");
    Err(DeconflictError::NoConflictFreePath {
        start: *start,
        goal: *goal,
        nodes_visited,
    })
}
