//! Spatial math shared by conflict detection and the route engine.

use crate::models::Waypoint;
use serde::{Deserialize, Serialize};

/// Relative slack when deciding whether a coordinate sits on the grid.
const GRID_EPSILON: f64 = 1e-9;

/// Largest cell index magnitude (2^53); every integer up to it is exact in `f64`.
pub const MAX_GRID_INDEX: i64 = 1 << 53;

const AXIS_STEPS: [(i64, i64, i64); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Euclidean distance between two positions.
pub fn distance(a: &Waypoint, b: &Waypoint) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Running path length at each waypoint, starting from 0.0.
pub fn cumulative_lengths(waypoints: &[Waypoint]) -> Vec<f64> {
    let mut total = 0.0;
    let mut lengths = Vec::with_capacity(waypoints.len());
    for (idx, waypoint) in waypoints.iter().enumerate() {
        if idx > 0 {
            total += distance(&waypoints[idx - 1], waypoint);
        }
        lengths.push(total);
    }
    lengths
}

/// Integer index of a cell on the axis-aligned grid with a given pitch.
///
/// Derived ordering is lexicographic on (x, y, z), which the route engine
/// uses as its tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl GridCell {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Cell whose centre is exactly `waypoint`, or `None` when the waypoint is
    /// not an integer multiple of `grid_size` on every axis.
    pub fn from_waypoint(waypoint: &Waypoint, grid_size: f64) -> Option<Self> {
        Some(Self {
            x: snap_axis(waypoint.x, grid_size)?,
            y: snap_axis(waypoint.y, grid_size)?,
            z: snap_axis(waypoint.z, grid_size)?,
        })
    }

    /// Nearest cell to `waypoint`, whether or not it lies on the grid.
    /// `None` when an axis falls outside the indexable range.
    pub fn nearest(waypoint: &Waypoint, grid_size: f64) -> Option<Self> {
        Some(Self {
            x: index_of((waypoint.x / grid_size).round())?,
            y: index_of((waypoint.y / grid_size).round())?,
            z: index_of((waypoint.z / grid_size).round())?,
        })
    }

    pub fn to_waypoint(self, grid_size: f64) -> Waypoint {
        Waypoint::new(
            self.x as f64 * grid_size,
            self.y as f64 * grid_size,
            self.z as f64 * grid_size,
        )
    }

    /// Cell shifted by `(dx, dy, dz)`, or `None` when that leaves the
    /// indexable range.
    pub fn offset(self, dx: i64, dy: i64, dz: i64) -> Option<Self> {
        let shift = |base: i64, delta: i64| {
            base.checked_add(delta)
                .filter(|index| index.unsigned_abs() <= MAX_GRID_INDEX as u64)
        };
        Some(Self {
            x: shift(self.x, dx)?,
            y: shift(self.y, dy)?,
            z: shift(self.z, dz)?,
        })
    }

    /// Six-connected neighbourhood: one step along a single axis. Steps past
    /// the indexable range are omitted.
    pub fn neighbors(self) -> impl Iterator<Item = GridCell> {
        AXIS_STEPS
            .into_iter()
            .filter_map(move |(dx, dy, dz)| self.offset(dx, dy, dz))
    }
}

fn index_of(rounded: f64) -> Option<i64> {
    if rounded.is_finite() && rounded.abs() <= MAX_GRID_INDEX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

fn snap_axis(value: f64, grid_size: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = value / grid_size;
    let rounded = scaled.round();
    if (scaled - rounded).abs() > GRID_EPSILON * rounded.abs().max(1.0) {
        return None;
    }
    index_of(rounded)
}

/// Inclusive axis-aligned box of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    pub min: GridCell,
    pub max: GridCell,
}

impl CellBounds {
    pub fn around(cell: GridCell) -> Self {
        Self {
            min: cell,
            max: cell,
        }
    }

    pub fn include(&mut self, cell: GridCell) {
        self.min.x = self.min.x.min(cell.x);
        self.min.y = self.min.y.min(cell.y);
        self.min.z = self.min.z.min(cell.z);
        self.max.x = self.max.x.max(cell.x);
        self.max.y = self.max.y.max(cell.y);
        self.max.z = self.max.z.max(cell.z);
    }

    pub fn padded(self, margin: i64) -> Self {
        Self {
            min: GridCell::new(
                self.min.x.saturating_sub(margin),
                self.min.y.saturating_sub(margin),
                self.min.z.saturating_sub(margin),
            ),
            max: GridCell::new(
                self.max.x.saturating_add(margin),
                self.max.y.saturating_add(margin),
                self.max.z.saturating_add(margin),
            ),
        }
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        (self.min.x..=self.max.x).contains(&cell.x)
            && (self.min.y..=self.max.y).contains(&cell.y)
            && (self.min.z..=self.max.z).contains(&cell.z)
    }
}
