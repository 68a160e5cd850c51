//! `warehouse-types` – shared value types for the warehouse fleet.
//!
//! Every other crate in the workspace speaks in terms of these types: grid
//! coordinates, the four canonical directions, the numeric wire protocol
//! understood by the robots, and the resolved pose handed to task execution.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// GridPoint
// ────────────────────────────────────────────────────────────────────────────

/// An integer cell coordinate on the warehouse grid.
///
/// `y` grows towards the North, `x` grows towards the East.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    /// The origin `(0, 0)`.
    pub const ORIGIN: GridPoint = GridPoint { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for GridPoint {
    type Output = GridPoint;

    fn add(self, rhs: GridPoint) -> GridPoint {
        GridPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for GridPoint {
    type Output = GridPoint;

    fn sub(self, rhs: GridPoint) -> GridPoint {
        GridPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Direction
// ────────────────────────────────────────────────────────────────────────────

/// One of the four canonical directions.
///
/// The same value is used both as a relative turn offset (`Up` = keep going
/// forward, `Right` = a quarter turn clockwise, …) and as an absolute heading
/// (`Up` = North, `Right` = East, `Down` = South, `Left` = West).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "north")]
    Up = 0,
    #[serde(alias = "east")]
    Right = 1,
    #[serde(alias = "south")]
    Down = 2,
    #[serde(alias = "west")]
    Left = 3,
}

impl Direction {
    /// All four directions in canonical order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    /// Build a direction from its canonical index.
    ///
    /// # Panics
    ///
    /// Panics when `index > 3`; an out-of-range direction is a caller bug.
    pub fn from_index(index: usize) -> Self {
        assert!(index < 4, "direction index {index} is out of range");
        Self::ALL[index]
    }

    /// Canonical index in `0..4`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    /// Compose two quarter-turn offsets: `(self + by) mod 4`.
    pub fn turned(self, by: Direction) -> Self {
        Self::from_index((self.index() + by.index()) % 4)
    }

    /// Unit movement on the grid when travelling in this direction.
    pub fn vector(self) -> GridPoint {
        match self {
            Direction::Up => GridPoint::new(0, 1),
            Direction::Right => GridPoint::new(1, 0),
            Direction::Down => GridPoint::new(0, -1),
            Direction::Left => GridPoint::new(-1, 0),
        }
    }

    /// Wire command that asks a robot to travel in this direction.
    pub fn wire(self) -> WireCommand {
        match self {
            Direction::Up => WireCommand::North,
            Direction::Right => WireCommand::East,
            Direction::Down => WireCommand::South,
            Direction::Left => WireCommand::West,
        }
    }

    /// Compass name of the direction when read as a heading.
    pub fn compass(self) -> &'static str {
        match self {
            Direction::Up => "North",
            Direction::Right => "East",
            Direction::Down => "South",
            Direction::Left => "West",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.compass())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire protocol
// ────────────────────────────────────────────────────────────────────────────

/// Numeric values exchanged with a robot over its communication link.
///
/// Status replies and commands share one value space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum WireCommand {
    Waiting = 0,
    Ok = 1,
    Fail = 2,
    North = 3,
    East = 4,
    South = 5,
    West = 6,
    Cancel = 7,
    Pickup = 8,
}

/// Returned when an integer read off the wire is not a known protocol value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown wire value {0}")]
pub struct UnknownWireValue(pub i32);

impl WireCommand {
    /// The raw value sent over the link.
    pub fn value(self) -> i32 {
        self as i32
    }

    /// The canonical direction for a movement command, `None` otherwise.
    pub fn direction(self) -> Option<Direction> {
        match self {
            WireCommand::North => Some(Direction::Up),
            WireCommand::East => Some(Direction::Right),
            WireCommand::South => Some(Direction::Down),
            WireCommand::West => Some(Direction::Left),
            _ => None,
        }
    }

    /// `true` for `Waiting`, `Ok` and `Fail`.
    pub fn is_status(self) -> bool {
        matches!(self, WireCommand::Waiting | WireCommand::Ok | WireCommand::Fail)
    }
}

impl TryFrom<i32> for WireCommand {
    type Error = UnknownWireValue;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => WireCommand::Waiting,
            1 => WireCommand::Ok,
            2 => WireCommand::Fail,
            3 => WireCommand::North,
            4 => WireCommand::East,
            5 => WireCommand::South,
            6 => WireCommand::West,
            7 => WireCommand::Cancel,
            8 => WireCommand::Pickup,
            other => return Err(UnknownWireValue(other)),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RobotLocation
// ────────────────────────────────────────────────────────────────────────────

/// A resolved pose: the cell a robot occupies and the wire heading it faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RobotLocation {
    pub point: GridPoint,
    pub heading: WireCommand,
}

impl RobotLocation {
    pub fn new(point: GridPoint, heading: Direction) -> Self {
        Self {
            point,
            heading: heading.wire(),
        }
    }

    pub fn to_point(&self) -> GridPoint {
        self.point
    }
}

impl fmt::Display for RobotLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.heading.direction() {
            Some(d) => write!(f, "{} facing {}", self.point, d),
            None => write!(f, "{} facing {:?}", self.point, self.heading),
        }
    }
}
