//! Progress observers.
//!
//! Observers are handed to the [`Localiser`][crate::localiser::Localiser] at
//! construction and called synchronously after every move with one
//! [`CandidateProjection`] per hypothesis, in canonical heading order
//! (North, East, South, West).  They must not block.

use tracing::debug;

use crate::assumption::CandidateProjection;

/// Receives the candidate sets of all four hypotheses after each move.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, projections: &[CandidateProjection<'_>; 4]);
}

/// Logs the candidate count of each hypothesis at `debug` level.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, projections: &[CandidateProjection<'_>; 4]) {
        let [north, east, south, west] = projections;
        debug!(
            north = north.len(),
            east = east.len(),
            south = south.len(),
            west = west.len(),
            "hypotheses after move"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumption::AssumptionTracker;
    use warehouse_perception::{RangeSignature, WarehouseMap};
    use warehouse_types::Direction;

    #[test]
    fn tracing_observer_accepts_projections() {
        let map = WarehouseMap::new(2, 2);
        let mut trackers = Direction::ALL.map(|d| AssumptionTracker::new(d, &map));
        for t in &mut trackers {
            t.start(&RangeSignature::from_quantized([true, true, false, false]));
        }
        let projections = [
            trackers[0].projection(),
            trackers[1].projection(),
            trackers[2].projection(),
            trackers[3].projection(),
        ];
        // Must not panic or consume anything.
        TracingObserver.on_progress(&projections);
        assert!(projections.iter().all(|p| p.len() == 1));
    }
}
