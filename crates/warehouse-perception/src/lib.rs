//! `warehouse-perception` – what a robot can sense, and where it could be.
//!
//! # Modules
//!
//! - [`ranges`] – [`RangeSignature`][ranges::RangeSignature]: the quantised
//!   four-direction passability reading, with rotation into the world frame.
//! - [`converter`] – [`RangeConverter`][converter::RangeConverter]: threshold
//!   strategies that turn raw distances into passable/blocked, one for the
//!   physical optical sensor and one for the simulator.
//! - [`map`] – [`WarehouseMap`][map::WarehouseMap]: the known floor-plan,
//!   exposed to the localiser through the [`MapService`][map::MapService]
//!   trait as a signature → candidate cells lookup.

pub mod converter;
pub mod map;
pub mod ranges;

pub use converter::{PhysicalRangeConverter, RangeConverter, VirtualRangeConverter};
pub use map::{MapError, MapService, WarehouseMap};
pub use ranges::RangeSignature;
