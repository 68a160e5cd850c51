//! Warehouse floor-plan and signature lookup.
//!
//! The localiser never inspects the grid directly; it asks a [`MapService`]
//! which cells would produce a given world-frame [`RangeSignature`].
//! [`WarehouseMap`] answers that from an index keyed by signature, rebuilt
//! locally whenever a cell becomes occupied.
//!
//! # Floor-plan text
//!
//! Rows are listed from North to South; `.` is free floor and `#` is an
//! obstacle.  The last row is `y = 0` and the first column is `x = 0`.
//!
//! ```rust
//! use warehouse_perception::map::{MapService, WarehouseMap};
//! use warehouse_perception::ranges::RangeSignature;
//! use warehouse_types::GridPoint;
//!
//! let map = WarehouseMap::from_rows(&["...", ".#.", "..."]).unwrap();
//!
//! // Corners see open floor on two sides only.
//! let south_west = RangeSignature::from_quantized([true, true, false, false]);
//! assert_eq!(map.points_matching(&south_west), vec![GridPoint::new(0, 0)]);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;
use tracing::debug;
use warehouse_types::{Direction, GridPoint};

use crate::ranges::RangeSignature;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Problems found while parsing floor-plan text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("floor plan has no cells")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph {
        glyph: char,
        row: usize,
        column: usize,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// MapService
// ────────────────────────────────────────────────────────────────────────────

/// The map queries the localiser depends on.
pub trait MapService {
    /// Every free cell whose world-frame passability equals `signature`.
    fn points_matching(&self, signature: &RangeSignature) -> Vec<GridPoint>;

    /// Obstacle cells plus cells occupied by already-localised robots.
    fn blocked_points(&self) -> &HashSet<GridPoint>;

    /// Treat `point` as occupied from now on, updating what its neighbours
    /// see.
    fn mark_occupied_around(&mut self, point: GridPoint);
}

// ────────────────────────────────────────────────────────────────────────────
// WarehouseMap
// ────────────────────────────────────────────────────────────────────────────

/// A rectangular grid with static obstacles and robot-occupied cells.
#[derive(Debug, Clone)]
pub struct WarehouseMap {
    width: i32,
    height: i32,
    blocked: HashSet<GridPoint>,
    signatures: HashMap<GridPoint, RangeSignature>,
    index: HashMap<RangeSignature, BTreeSet<GridPoint>>,
}

impl WarehouseMap {
    /// An open `width × height` floor with no obstacles.
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_obstacles(width, height, std::iter::empty())
    }

    /// A `width × height` floor with the given obstacle cells.  Obstacles
    /// outside the grid are ignored.
    pub fn with_obstacles(width: i32, height: i32, obstacles: impl IntoIterator<Item = GridPoint>) -> Self {
        let mut map = Self {
            width: width.max(0),
            height: height.max(0),
            blocked: HashSet::new(),
            signatures: HashMap::new(),
            index: HashMap::new(),
        };
        map.blocked = obstacles.into_iter().filter(|p| map.contains(*p)).collect();
        for y in 0..map.height {
            for x in 0..map.width {
                map.reindex(GridPoint::new(x, y));
            }
        }
        map
    }

    /// Parse floor-plan text, North row first.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, MapError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(MapError::Empty);
        }

        let mut obstacles = Vec::new();
        for (row, text) in rows.iter().enumerate() {
            let found = text.as_ref().chars().count();
            if found != width {
                return Err(MapError::Ragged {
                    row,
                    expected: width,
                    found,
                });
            }
            let y = (height - 1 - row) as i32;
            for (column, glyph) in text.as_ref().chars().enumerate() {
                match glyph {
                    '.' => {}
                    '#' => obstacles.push(GridPoint::new(column as i32, y)),
                    glyph => return Err(MapError::UnknownGlyph { glyph, row, column }),
                }
            }
        }
        Ok(Self::with_obstacles(width as i32, height as i32, obstacles))
    }

    /// The 12 × 8 warehouse floor with four shelving columns.
    pub fn default_warehouse() -> Self {
        let shelves = [1, 4, 7, 10]
            .into_iter()
            .flat_map(|x| (1..=5).map(move |y| GridPoint::new(x, y)));
        Self::with_obstacles(12, 8, shelves)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// `true` when `point` lies on the grid.
    pub fn contains(&self, point: GridPoint) -> bool {
        point.x >= 0 && point.y >= 0 && point.x < self.width && point.y < self.height
    }

    /// `true` when `point` is on the grid and neither an obstacle nor occupied.
    pub fn is_passable(&self, point: GridPoint) -> bool {
        self.contains(point) && !self.blocked.contains(&point)
    }

    /// World-frame passability around `point`.
    pub fn signature_at(&self, point: GridPoint) -> RangeSignature {
        let mut signature = RangeSignature::default();
        for d in Direction::ALL {
            signature.set(d, self.is_passable(point + d.vector()));
        }
        signature
    }

    /// Number of consecutive free cells from `point` in `direction`, not
    /// counting `point` itself.
    pub fn free_run(&self, point: GridPoint, direction: Direction) -> u32 {
        let mut run = 0;
        let mut cursor = point + direction.vector();
        while self.is_passable(cursor) {
            run += 1;
            cursor = cursor + direction.vector();
        }
        run
    }

    /// All passable cells, sorted.
    pub fn free_cells(&self) -> Vec<GridPoint> {
        let mut cells: Vec<GridPoint> = self.signatures.keys().copied().collect();
        cells.sort();
        cells
    }

    /// Render the grid as floor-plan text, North row first.
    pub fn to_rows(&self) -> Vec<String> {
        (0..self.height)
            .rev()
            .map(|y| {
                (0..self.width)
                    .map(|x| if self.is_passable(GridPoint::new(x, y)) { '.' } else { '#' })
                    .collect()
            })
            .collect()
    }

    fn reindex(&mut self, point: GridPoint) {
        if let Some(old) = self.signatures.remove(&point) {
            if let Some(bucket) = self.index.get_mut(&old) {
                bucket.remove(&point);
                if bucket.is_empty() {
                    self.index.remove(&old);
                }
            }
        }
        if self.is_passable(point) {
            let signature = self.signature_at(point);
            self.signatures.insert(point, signature);
            self.index.entry(signature).or_default().insert(point);
        }
    }
}

impl MapService for WarehouseMap {
    fn points_matching(&self, signature: &RangeSignature) -> Vec<GridPoint> {
        self.index
            .get(signature)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }

    fn blocked_points(&self) -> &HashSet<GridPoint> {
        &self.blocked
    }

    fn mark_occupied_around(&mut self, point: GridPoint) {
        if !self.contains(point) {
            debug!(%point, "ignoring occupancy outside the floor plan");
            return;
        }
        self.blocked.insert(point);
        self.reindex(point);
        for d in Direction::ALL {
            let neighbour = point + d.vector();
            if self.contains(neighbour) {
                self.reindex(neighbour);
            }
        }
        debug!(%point, blocked = self.blocked.len(), "marked cell as occupied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(up: bool, right: bool, down: bool, left: bool) -> RangeSignature {
        RangeSignature::from_quantized([up, right, down, left])
    }

    #[test]
    fn open_two_by_two_room_has_one_cell_per_corner_signature() {
        let map = WarehouseMap::new(2, 2);
        assert_eq!(map.points_matching(&sig(true, true, false, false)), vec![GridPoint::new(0, 0)]);
        assert_eq!(map.points_matching(&sig(true, false, false, true)), vec![GridPoint::new(1, 0)]);
        assert_eq!(map.points_matching(&sig(false, true, true, false)), vec![GridPoint::new(0, 1)]);
        assert_eq!(map.points_matching(&sig(false, false, true, true)), vec![GridPoint::new(1, 1)]);
        assert!(map.points_matching(&sig(true, true, true, true)).is_empty());
    }

    #[test]
    fn from_rows_puts_first_row_north() {
        let map = WarehouseMap::from_rows(&["#..", "..."]).unwrap();
        assert_eq!(map.width(), 3);
        assert_eq!(map.height(), 2);
        assert!(!map.is_passable(GridPoint::new(0, 1)));
        assert!(map.is_passable(GridPoint::new(0, 0)));
        assert_eq!(map.to_rows(), vec!["#..".to_string(), "...".to_string()]);
    }

    #[test]
    fn from_rows_rejects_bad_input() {
        let empty: [&str; 0] = [];
        assert_eq!(WarehouseMap::from_rows(&empty).unwrap_err(), MapError::Empty);
        assert_eq!(
            WarehouseMap::from_rows(&["...", ".."]).unwrap_err(),
            MapError::Ragged { row: 1, expected: 3, found: 2 }
        );
        assert!(matches!(
            WarehouseMap::from_rows(&[".x."]).unwrap_err(),
            MapError::UnknownGlyph { glyph: 'x', row: 0, column: 1 }
        ));
    }

    #[test]
    fn obstacles_are_blocked_and_never_matched() {
        let map = WarehouseMap::default_warehouse();
        let shelf = GridPoint::new(4, 3);
        assert!(map.blocked_points().contains(&shelf));
        let all: Vec<GridPoint> = (0u8..16)
            .flat_map(|b| map.points_matching(&sig(b & 1 != 0, b & 2 != 0, b & 4 != 0, b & 8 != 0)))
            .collect();
        assert!(!all.contains(&shelf));
        assert_eq!(all.len(), map.free_cells().len());
        assert_eq!(all.len(), 12 * 8 - 20);
    }

    #[test]
    fn mark_occupied_updates_neighbour_signatures() {
        let mut map = WarehouseMap::new(3, 1);
        let middle = GridPoint::new(1, 0);
        assert_eq!(map.signature_at(GridPoint::new(0, 0)), sig(false, true, false, false));

        map.mark_occupied_around(middle);

        assert!(map.blocked_points().contains(&middle));
        assert_eq!(map.signature_at(GridPoint::new(0, 0)), sig(false, false, false, false));
        let boxed_in = map.points_matching(&sig(false, false, false, false));
        assert_eq!(boxed_in, vec![GridPoint::new(0, 0), GridPoint::new(2, 0)]);
        assert!(map.points_matching(&sig(false, true, false, true)).is_empty());
    }

    #[test]
    fn mark_occupied_outside_grid_is_ignored() {
        let mut map = WarehouseMap::new(2, 2);
        map.mark_occupied_around(GridPoint::new(5, 5));
        assert!(map.blocked_points().is_empty());
    }

    #[test]
    fn free_run_stops_at_walls_and_obstacles() {
        let map = WarehouseMap::from_rows(&["....", "..#."]).unwrap();
        assert_eq!(map.free_run(GridPoint::new(0, 0), Direction::Right), 1);
        assert_eq!(map.free_run(GridPoint::new(0, 1), Direction::Right), 3);
        assert_eq!(map.free_run(GridPoint::new(0, 1), Direction::Up), 0);
    }
}
