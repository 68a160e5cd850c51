//! [`FleetLocaliser`] – sequential localisation of several robots on one map.
//!
//! Robots are localised one after another.  Each robot that resolves is
//! marked occupied on the shared map before the next run starts, so later
//! robots never place a hypothesis on a cell a teammate already stands on.
//! A robot that fails is logged and skipped; it does not block the rest of
//! the fleet.
//!
//! The map is owned by the fleet and only lent immutably to a running
//! [`Localiser`], so extending the occupied set while a localisation is in
//! flight does not compile.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use warehouse_hal::RobotLink;
use warehouse_perception::MapService;
use warehouse_types::RobotLocation;

use crate::localiser::{LocalisationError, Localiser, LocaliserConfig};
use crate::observer::ProgressObserver;

// ─────────────────────────────────────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────────────────────────────────────

/// A robot whose pose was recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedRobot {
    pub name: String,
    pub location: RobotLocation,
    /// Moves it took to get there.
    pub moves: usize,
}

/// A robot that could not be localised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRobot {
    pub name: String,
    pub reason: String,
}

/// Outcome of a fleet run, in the order robots were attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetReport {
    pub located: Vec<LocatedRobot>,
    pub failed: Vec<FailedRobot>,
    pub generated_at: DateTime<Utc>,
}

impl FleetReport {
    /// `true` when every attempted robot was localised.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FleetLocaliser
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the warehouse map and localises robots against it in turn.
pub struct FleetLocaliser<M: MapService> {
    map: M,
    config: LocaliserConfig,
    located: Vec<LocatedRobot>,
    failed: Vec<FailedRobot>,
    observers: Vec<Box<dyn ProgressObserver>>,
}

impl<M: MapService> FleetLocaliser<M> {
    pub fn new(map: M, config: LocaliserConfig) -> Self {
        Self {
            map,
            config,
            located: Vec::new(),
            failed: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Attach an observer to every subsequent localisation run.
    pub fn with_observer(mut self, observer: Box<dyn ProgressObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Poses resolved so far, in order.
    pub fn located(&self) -> Vec<RobotLocation> {
        self.located.iter().map(|r| r.location).collect()
    }

    /// Localise the next robot.  On success the resolved cell is marked
    /// occupied and the link is told through
    /// [`RobotLink::on_localised`] before this returns.
    pub fn localise_next<L: RobotLink + ?Sized>(&mut self, link: &mut L) -> Result<RobotLocation, LocalisationError> {
        let name = link.name().to_string();
        // Vary the tie-break stream per robot while keeping runs reproducible.
        let attempt = (self.located.len() + self.failed.len()) as u64;
        let config = LocaliserConfig {
            seed: self.config.seed.map(|s| s.wrapping_add(attempt)),
            ..self.config.clone()
        };

        let (outcome, moves) = {
            let mut localiser = Localiser::new(&self.map, &config);
            for observer in &self.observers {
                localiser = localiser.with_observer(observer.as_ref());
            }
            let outcome = localiser.localise(link);
            (outcome, localiser.iterations())
        };

        match outcome {
            Ok(location) => {
                self.map.mark_occupied_around(location.to_point());
                link.on_localised(location);
                info!(robot = %name, %location, moves, "robot localised");
                self.located.push(LocatedRobot { name, location, moves });
                Ok(location)
            }
            Err(err) => {
                error!(robot = %name, error = %err, moves, "localisation failed");
                self.failed.push(FailedRobot {
                    name,
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Localise every robot in `links`, stopping early once `shutdown` is
    /// raised.  Failures are recorded in the report and skipped.
    pub fn localise_all<L: RobotLink>(&mut self, links: &mut [L], shutdown: &AtomicBool) -> FleetReport {
        for link in links.iter_mut() {
            if shutdown.load(Ordering::SeqCst) {
                warn!(remaining = link.name(), "shutdown requested, stopping fleet run");
                break;
            }
            // Recorded in `failed`; the next robot still runs.
            let _ = self.localise_next(link);
        }
        self.report()
    }

    /// Snapshot of everything attempted so far.
    pub fn report(&self) -> FleetReport {
        FleetReport {
            located: self.located.clone(),
            failed: self.failed.clone(),
            generated_at: Utc::now(),
        }
    }

    pub fn into_map(self) -> M {
        self.map
    }
}
