//! [`AssumptionTracker`] – one heading hypothesis.
//!
//! A tracker answers "if the robot powered on facing `H`, which cells could
//! it be standing on now?".  The localiser runs four of them side by side,
//! one per canonical heading, and feeds every move and reading to all four.
//!
//! # Algorithm
//!
//! Seeding rotates the robot-relative reading into the world frame by the
//! assumed heading and asks the map for every cell with that signature.
//! After each move the tracker advances its heading by the relative turn,
//! queries the map again with the new rotated reading, and keeps only the
//! cells `p` for which `p - move` was already a candidate and `p` is not
//! blocked.  Candidates therefore only ever shrink.

use std::collections::HashSet;

use tracing::debug;
use warehouse_perception::{MapService, RangeSignature};
use warehouse_types::{Direction, GridPoint, RobotLocation};

// ─────────────────────────────────────────────────────────────────────────────
// CandidateProjection
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only view of one tracker's candidates paired with its heading.
///
/// Every call to [`iter`][Self::iter] starts a fresh pass; iterating never
/// touches tracker state.
#[derive(Debug, Clone, Copy)]
pub struct CandidateProjection<'a> {
    candidates: &'a [GridPoint],
    heading: Direction,
}

impl<'a> CandidateProjection<'a> {
    /// Each candidate cell as a pose facing the tracker's current heading.
    pub fn iter(&self) -> impl Iterator<Item = RobotLocation> + 'a {
        let heading = self.heading;
        self.candidates
            .iter()
            .map(move |p| RobotLocation::new(*p, heading))
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AssumptionTracker
// ─────────────────────────────────────────────────────────────────────────────

/// Candidate cells consistent with all evidence under one starting heading.
pub struct AssumptionTracker<'a, M: MapService + ?Sized> {
    map: &'a M,
    blocked: &'a HashSet<GridPoint>,
    starting_heading: Direction,
    heading: Direction,
    candidates: Vec<GridPoint>,
}

impl<'a, M: MapService + ?Sized> AssumptionTracker<'a, M> {
    /// Create a tracker assuming the robot powered on facing
    /// `starting_heading`.  Candidates stay empty until
    /// [`start`][Self::start] is called.
    pub fn new(starting_heading: Direction, map: &'a M) -> Self {
        Self {
            map,
            blocked: map.blocked_points(),
            starting_heading,
            heading: starting_heading,
            candidates: Vec::new(),
        }
    }

    /// Seed candidates from the first robot-relative reading, undoing any
    /// turns from an earlier run.
    ///
    /// An empty result is not an error here; the localiser decides what an
    /// empty hypothesis means.
    pub fn start(&mut self, signature: &RangeSignature) {
        self.heading = self.starting_heading;
        let world = signature.rotate(self.heading.index());
        let blocked = self.blocked;
        self.candidates = self
            .map
            .points_matching(&world)
            .into_iter()
            .filter(|p| !blocked.contains(p))
            .collect();
        debug!(
            assumption = %self.starting_heading,
            candidates = self.candidates.len(),
            "seeded hypothesis"
        );
    }

    /// Fold in one move (`relative` turn, then one cell forward) and the
    /// reading taken after it.
    pub fn update(&mut self, relative: Direction, signature: &RangeSignature) {
        if self.candidates.is_empty() {
            return;
        }
        self.heading = self.heading.turned(relative);
        let step = self.heading.vector();

        let previous: HashSet<GridPoint> = self.candidates.iter().copied().collect();
        let blocked = self.blocked;
        let mut next = self.map.points_matching(&signature.rotate(self.heading.index()));
        next.retain(|p| previous.contains(&(*p - step)) && !blocked.contains(p));

        debug!(
            assumption = %self.starting_heading,
            facing = %self.heading,
            before = previous.len(),
            after = next.len(),
            "filtered hypothesis"
        );
        self.candidates = next;
    }

    /// Exactly one candidate remains.
    pub fn is_complete(&self) -> bool {
        self.candidates.len() == 1
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidates(&self) -> &[GridPoint] {
        &self.candidates
    }

    /// The single remaining candidate.
    ///
    /// # Panics
    ///
    /// Panics unless [`is_complete`][Self::is_complete] holds.
    pub fn resolved_point(&self) -> GridPoint {
        assert!(
            self.is_complete(),
            "assumption {} has {} candidates, not 1",
            self.starting_heading,
            self.candidates.len()
        );
        self.candidates[0]
    }

    /// Current heading under this hypothesis.
    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn starting_heading(&self) -> Direction {
        self.starting_heading
    }

    pub fn projection(&self) -> CandidateProjection<'_> {
        CandidateProjection {
            candidates: &self.candidates,
            heading: self.heading,
        }
    }
}
