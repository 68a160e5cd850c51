//! `warehouse-hal` – the PC's view of a robot.
//!
//! Everything the localiser needs from the hardware goes through one trait,
//! so the physical Bluetooth link and the simulator are interchangeable.
//!
//! # Modules
//!
//! - [`link`] – [`RobotLink`][link::RobotLink]: blocking request/response
//!   channel to a single robot (sense, move, acknowledge), plus
//!   [`LinkError`][link::LinkError].
//! - [`sim`] – [`SimRobot`][sim::SimRobot]: an in-process robot with a hidden
//!   ground-truth pose on a [`WarehouseMap`][warehouse_perception::WarehouseMap],
//!   for headless tests and the CLI's simulation mode.  Robots sharing a
//!   [`SharedFloor`][sim::SharedFloor] park on it once localised.

pub mod link;
pub mod sim;

pub use link::{LinkError, RobotLink};
pub use sim::{SharedFloor, SimRobot};
