//! Range signatures.
//!
//! A [`RangeSignature`] is the quantised answer to "which of my four
//! neighbouring cells can I drive into?".  Readings arrive robot-relative
//! (slot `Up` is whatever the robot faces); [`RangeSignature::rotate`]
//! re-expresses them in the world frame once a heading is assumed.
//!
//! # Example
//!
//! ```rust
//! use warehouse_perception::converter::VirtualRangeConverter;
//! use warehouse_perception::ranges::RangeSignature;
//! use warehouse_types::Direction;
//!
//! let converter = VirtualRangeConverter::default();
//! let measured = RangeSignature::from_continuous([3.0, 0.2, 1.0, 0.0], &converter);
//! let direct = RangeSignature::from_quantized([true, false, true, false]);
//! assert_eq!(measured, direct);
//!
//! // A robot facing East sees its forward reading on the world's East side.
//! let world = direct.rotate(Direction::Right.index());
//! assert_eq!(world, RangeSignature::from_quantized([false, true, false, true]));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use warehouse_types::Direction;

use crate::converter::RangeConverter;

/// Passability of the four neighbouring cells, indexed by [`Direction`].
///
/// Equality and hashing are by value so that signatures can key the map's
/// lookup index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RangeSignature {
    passable: [bool; 4],
}

impl RangeSignature {
    /// Build a signature from pre-quantised values in `Up, Right, Down, Left`
    /// order.
    pub fn from_quantized(values: [bool; 4]) -> Self {
        Self { passable: values }
    }

    /// Build a signature from four raw distances in `Up, Right, Down, Left`
    /// order, quantised through `converter`.
    pub fn from_continuous(distances: [f32; 4], converter: &dyn RangeConverter) -> Self {
        Self {
            passable: distances.map(|d| converter.to_grid(d)),
        }
    }

    pub fn get(&self, direction: Direction) -> bool {
        self.passable[direction.index()]
    }

    pub fn set(&mut self, direction: Direction, value: bool) {
        self.passable[direction.index()] = value;
    }

    /// Passable directions in canonical order.
    pub fn available_directions(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|d| self.get(*d))
            .collect()
    }

    /// Rotate by `quarter_turns` clockwise: the value in slot `d` moves to
    /// slot `(d + quarter_turns) mod 4`.
    pub fn rotate(&self, quarter_turns: usize) -> Self {
        let k = quarter_turns % 4;
        let mut rotated = [false; 4];
        for (d, value) in self.passable.iter().enumerate() {
            rotated[(d + k) % 4] = *value;
        }
        Self { passable: rotated }
    }

    /// Direction opposite to `direction`.
    pub fn opposite(direction: Direction) -> Direction {
        direction.opposite()
    }

    pub fn as_array(&self) -> [bool; 4] {
        self.passable
    }
}

impl fmt::Display for RangeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [up, right, down, left] = self.passable;
        write!(f, "UP: {up}, RIGHT: {right}, DOWN: {down}, LEFT: {left}")
    }
}
