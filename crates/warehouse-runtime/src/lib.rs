//! `warehouse-runtime` – the localisation engine.
//!
//! Recovers the pose of a robot that powered on somewhere in a known
//! warehouse without knowing its cell or heading.
//!
//! # Modules
//!
//! - [`assumption`] – [`AssumptionTracker`][assumption::AssumptionTracker]:
//!   candidate cells under one assumed starting heading, narrowed after
//!   every move by signature matching and reachability.
//! - [`localiser`] – [`Localiser`][localiser::Localiser]: runs four trackers
//!   side by side and drives the robot until one cell survives.
//!   [`localise_robot`][localiser::localise_robot] marks earlier robots as
//!   occupied before running.
//! - [`fleet`] – [`FleetLocaliser`][fleet::FleetLocaliser]: localises
//!   several robots in turn on one shared map and produces a
//!   [`FleetReport`][fleet::FleetReport].
//! - [`observer`] – [`ProgressObserver`][observer::ProgressObserver]:
//!   per-move callbacks carrying every hypothesis' candidates.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP exporter.

pub mod assumption;
pub mod fleet;
pub mod localiser;
pub mod observer;
pub mod telemetry;

pub use assumption::{AssumptionTracker, CandidateProjection};
pub use fleet::{FailedRobot, FleetLocaliser, FleetReport, LocatedRobot};
pub use localiser::{localise_robot, LocalisationError, Localiser, LocaliserConfig, DEFAULT_MAX_ITERATIONS};
pub use observer::{ProgressObserver, TracingObserver};
pub use telemetry::{init_tracing, TracerProviderGuard};
