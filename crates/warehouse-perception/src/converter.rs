//! Distance quantisation.
//!
//! A [`RangeConverter`] decides whether a raw distance reading means "the
//! neighbouring cell is free".  The physical robots report centimetres from
//! an optical sensor; the simulator reports distances in grid cells.  Both
//! feed the same [`RangeSignature`][crate::ranges::RangeSignature].

use serde::{Deserialize, Serialize};

/// Threshold strategy turning one continuous distance into passable/blocked.
pub trait RangeConverter: Send + Sync {
    /// `true` when `distance` leaves room to drive into the next cell.
    fn to_grid(&self, distance: f32) -> bool;
}

/// Converter for the optical distance sensor on the physical robots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalRangeConverter {
    /// Minimum free distance, in centimetres, for the next cell to count as
    /// open.
    pub threshold_cm: f32,
}

impl Default for PhysicalRangeConverter {
    fn default() -> Self {
        Self { threshold_cm: 25.0 }
    }
}

impl RangeConverter for PhysicalRangeConverter {
    fn to_grid(&self, distance: f32) -> bool {
        distance >= self.threshold_cm
    }
}

/// Converter for the simulated environment, where distances are measured in
/// grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VirtualRangeConverter {
    pub threshold_cells: f32,
}

impl Default for VirtualRangeConverter {
    fn default() -> Self {
        Self {
            threshold_cells: 1.0,
        }
    }
}

impl RangeConverter for VirtualRangeConverter {
    fn to_grid(&self, distance: f32) -> bool {
        distance >= self.threshold_cells
    }
}
