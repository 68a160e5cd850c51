//! [`Localiser`] – multi-hypothesis pose recovery for one robot.
//!
//! The robot knows the map but not where it stands or which way it faces.
//! The localiser keeps one [`AssumptionTracker`] per possible power-on
//! heading and drives a sense → decide → move → sense loop over the robot's
//! [`RobotLink`] until exactly one hypothesis holds exactly one cell.
//!
//! # States
//!
//! ```text
//! SEEDING ──► EXPLORING ──► RESOLVED
//!    │            │
//!    └────────────┴───────► FAILED
//! ```
//!
//! - **Seeding** reads one signature and seeds all four trackers.  No
//!   candidates anywhere fails immediately, before any move is commanded.
//! - **Exploring** repeats while the total candidate count is not 1 and the
//!   iteration cap has not been reached.
//! - **Resolved** returns the single surviving cell and its heading.
//! - **Failed** carries the last signature read, or the first link error.
//!
//! # Exploration policy
//!
//! From the directions the latest reading reports open, drop "backward" and
//! any direction leading to a cell already visited in the localiser's own
//! frame.  If nothing survives, fall back to every open direction.  Then go
//! forward if possible, otherwise pick uniformly at random.
//!
//! # Example
//!
//! ```rust
//! use warehouse_hal::SimRobot;
//! use warehouse_perception::WarehouseMap;
//! use warehouse_runtime::localiser::{Localiser, LocaliserConfig};
//! use warehouse_types::{Direction, GridPoint};
//!
//! let map = WarehouseMap::from_rows(&["###.", "...."]).unwrap();
//! let mut robot = SimRobot::new("sim", map.clone(), GridPoint::new(0, 0), Direction::Right);
//!
//! let mut localiser = Localiser::new(&map, &LocaliserConfig::default());
//! let pose = localiser.localise(&mut robot).unwrap();
//! assert_eq!(pose, robot.pose());
//! ```

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};
use warehouse_hal::{LinkError, RobotLink};
use warehouse_perception::{MapService, RangeSignature};
use warehouse_types::{Direction, GridPoint, RobotLocation};

use crate::assumption::{AssumptionTracker, CandidateProjection};
use crate::observer::ProgressObserver;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Moves allowed before a run is declared hopeless.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why a localisation run did not produce a pose.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocalisationError {
    /// No hypothesis survived, or the iteration cap ran out first.
    #[error("cannot localise, last ranges were [{signature}]")]
    Impossible { signature: RangeSignature },

    /// The robot rejected a move or the link dropped.
    #[error("robot link failed: {0}")]
    Channel(#[from] LinkError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for one [`Localiser`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaliserConfig {
    pub max_iterations: usize,
    /// Seed for the random tie-break; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for LocaliserConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Localiser
// ─────────────────────────────────────────────────────────────────────────────

/// Localisation engine for one robot at a time.  Every call to
/// [`localise`][Self::localise] starts from a clean slate; only the random
/// stream carries over.
pub struct Localiser<'a, M: MapService + ?Sized> {
    map: &'a M,
    /// Indexed by starting heading, canonical order.
    trackers: [AssumptionTracker<'a, M>; 4],
    relative_position: GridPoint,
    visited: HashSet<GridPoint>,
    /// Cumulative turn since power-on.
    heading_offset: Direction,
    iterations: usize,
    max_iterations: usize,
    rng: StdRng,
    observers: Vec<&'a dyn ProgressObserver>,
}

impl<'a, M: MapService + ?Sized> Localiser<'a, M> {
    /// Build a localiser against `map`.  Cells already in the map's blocked
    /// set are never offered as candidates.
    pub fn new(map: &'a M, config: &LocaliserConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            map,
            trackers: Direction::ALL.map(|d| AssumptionTracker::new(d, map)),
            relative_position: GridPoint::ORIGIN,
            visited: HashSet::from([GridPoint::ORIGIN]),
            heading_offset: Direction::Up,
            iterations: 0,
            max_iterations: config.max_iterations,
            rng,
            observers: Vec::new(),
        }
    }

    /// Register a progress observer, called after every move.
    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observers.push(observer);
        self
    }

    /// Moves commanded by the current or most recent run.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn trackers(&self) -> &[AssumptionTracker<'a, M>; 4] {
        &self.trackers
    }

    /// Current candidates of every hypothesis, North first.
    pub fn current_locations(&self) -> [CandidateProjection<'_>; 4] {
        [
            self.trackers[0].projection(),
            self.trackers[1].projection(),
            self.trackers[2].projection(),
            self.trackers[3].projection(),
        ]
    }

    fn reset(&mut self) {
        let map = self.map;
        self.trackers = Direction::ALL.map(|d| AssumptionTracker::new(d, map));
        self.relative_position = GridPoint::ORIGIN;
        self.visited = HashSet::from([GridPoint::ORIGIN]);
        self.heading_offset = Direction::Up;
        self.iterations = 0;
    }

    fn total_candidates(&self) -> usize {
        self.trackers.iter().map(|t| t.candidate_count()).sum()
    }

    /// Run the full sense/move loop against `link`.
    ///
    /// # Errors
    ///
    /// - [`LocalisationError::Impossible`] when every hypothesis empties,
    ///   the robot is boxed in, or the iteration cap is reached.
    /// - [`LocalisationError::Channel`] on the first link failure.
    pub fn localise<L: RobotLink + ?Sized>(&mut self, link: &mut L) -> Result<RobotLocation, LocalisationError> {
        let span = info_span!("localise", robot = link.name());
        let _enter = span.enter();
        self.reset();

        let mut signature = link.request_signature()?;
        info!(%signature, "seeding hypotheses");
        for tracker in &mut self.trackers {
            tracker.start(&signature);
        }
        if self.total_candidates() == 0 {
            warn!(%signature, "no cell matches the first reading");
            return Err(LocalisationError::Impossible { signature });
        }

        while self.total_candidates() != 1 && self.iterations < self.max_iterations {
            if self.total_candidates() == 0 {
                warn!(%signature, iterations = self.iterations, "every hypothesis eliminated");
                return Err(LocalisationError::Impossible { signature });
            }

            let Some(direction) = self.choose_direction(&signature) else {
                warn!(%signature, "no open direction to explore");
                return Err(LocalisationError::Impossible { signature });
            };
            self.heading_offset = self.heading_offset.turned(direction);
            debug!(chosen = %direction, offset = %self.heading_offset, "moving");

            link.command_move(self.heading_offset.wire())?;

            self.relative_position = self.relative_position + direction.vector();
            self.visited.insert(self.relative_position);

            signature = link.request_signature()?;
            debug!(%signature, "received ranges");
            for tracker in &mut self.trackers {
                tracker.update(direction, &signature);
            }

            let projections = self.current_locations();
            for observer in &self.observers {
                observer.on_progress(&projections);
            }

            self.iterations += 1;
        }

        match self.trackers.iter().find(|t| t.is_complete()) {
            Some(tracker) if self.total_candidates() == 1 => {
                let location = RobotLocation::new(tracker.resolved_point(), tracker.heading());
                info!(%location, iterations = self.iterations, "localised");
                Ok(location)
            }
            _ if self.total_candidates() == 0 => {
                warn!(%signature, iterations = self.iterations, "every hypothesis eliminated");
                Err(LocalisationError::Impossible { signature })
            }
            _ => {
                warn!(%signature, iterations = self.iterations, "iteration cap reached");
                Err(LocalisationError::Impossible { signature })
            }
        }
    }

    /// Forward-biased, cycle-averse choice among the open directions.
    fn choose_direction(&mut self, signature: &RangeSignature) -> Option<Direction> {
        let available = signature.available_directions();
        let preferred: Vec<Direction> = available
            .iter()
            .copied()
            .filter(|d| {
                let next = self.relative_position + self.heading_offset.turned(*d).vector();
                *d != Direction::Down && !self.visited.contains(&next)
            })
            .collect();
        let options = if preferred.is_empty() { available } else { preferred };
        debug!(?options, "available directions");

        if options.contains(&Direction::Up) {
            Some(Direction::Up)
        } else {
            options.choose(&mut self.rng).copied()
        }
    }
}

/// Localise one robot against `map`, after marking every robot in
/// `already_localised` as occupied.
///
/// Taking the map mutably means no other run can read it while the occupied
/// set is being extended, and the run itself only borrows it immutably.
pub fn localise_robot<M, L>(
    link: &mut L,
    map: &mut M,
    already_localised: &[RobotLocation],
    config: &LocaliserConfig,
    observers: &[&dyn ProgressObserver],
) -> Result<RobotLocation, LocalisationError>
where
    M: MapService + ?Sized,
    L: RobotLink + ?Sized,
{
    for location in already_localised {
        map.mark_occupied_around(location.to_point());
    }
    let mut localiser = Localiser::new(&*map, config);
    for observer in observers {
        localiser = localiser.with_observer(*observer);
    }
    localiser.localise(link)
}
