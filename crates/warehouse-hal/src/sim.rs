//! In-process simulated robot for CI/CD testing without physical hardware.
//!
//! [`SimRobot`] stands on a [`WarehouseMap`] at a true pose the PC does not
//! know.  It answers signature requests by ray-casting the free distance in
//! each robot-relative direction and quantising it through a
//! [`RangeConverter`], exactly as the physical robot's sensor sweep would.
//!
//! Movement commands are interpreted the way the firmware does: `North` is
//! whatever the robot faced when it was switched on, `East` a quarter turn
//! clockwise from that, and so on.  After a move the robot faces the
//! direction it travelled.
//!
//! Robots built with [`SimRobot::on_floor`] share one [`SharedFloor`].  Once
//! a robot is localised it parks, and its cell becomes an obstacle that the
//! other robots see in their readings and cannot drive into.
//!
//! # Example
//!
//! ```rust
//! use warehouse_hal::link::RobotLink;
//! use warehouse_hal::sim::SimRobot;
//! use warehouse_perception::{RangeSignature, WarehouseMap};
//! use warehouse_types::{Direction, GridPoint, WireCommand};
//!
//! let mut robot = SimRobot::new("sim", WarehouseMap::new(2, 2), GridPoint::new(0, 0), Direction::Up);
//! assert_eq!(
//!     robot.request_signature().unwrap(),
//!     RangeSignature::from_quantized([true, true, false, false])
//! );
//!
//! robot.command_move(WireCommand::North).expect("sim move must succeed");
//! assert_eq!(robot.position(), GridPoint::new(0, 1));
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use tracing::{debug, info};
use warehouse_perception::{MapService, RangeConverter, RangeSignature, VirtualRangeConverter, WarehouseMap};
use warehouse_types::{Direction, GridPoint, RobotLocation, WireCommand};

use crate::link::{LinkError, RobotLink};

/// Floor plan shared by every simulated robot standing on it.
pub type SharedFloor = Arc<RwLock<WarehouseMap>>;

/// A simulated robot with a hidden ground-truth pose.
pub struct SimRobot {
    name: String,
    world: SharedFloor,
    position: GridPoint,
    /// True world heading the robot currently faces.
    facing: Direction,
    /// True world heading the robot faced at power-on; its private "North".
    power_on_facing: Direction,
    converter: Box<dyn RangeConverter>,
    /// Units of raw distance per grid cell.
    cell_size: f32,
    replies: VecDeque<WireCommand>,
    waits_per_move: usize,
    moves: usize,
    fail_after: Option<usize>,
    disconnect_after: Option<usize>,
    connected: bool,
}

impl std::fmt::Debug for SimRobot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimRobot")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("facing", &self.facing)
            .field("power_on_facing", &self.power_on_facing)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl SimRobot {
    /// Place a robot at `position` facing the world heading `facing`.
    ///
    /// Readings are reported in grid cells and quantised with the default
    /// [`VirtualRangeConverter`].  The robot is alone on its own copy of
    /// `world`.
    pub fn new(name: impl Into<String>, world: WarehouseMap, position: GridPoint, facing: Direction) -> Self {
        Self::on_floor(name, Arc::new(RwLock::new(world)), position, facing)
    }

    /// Place a robot on a floor shared with other robots.
    pub fn on_floor(name: impl Into<String>, world: SharedFloor, position: GridPoint, facing: Direction) -> Self {
        Self {
            name: name.into(),
            world,
            position,
            facing,
            power_on_facing: facing,
            converter: Box::new(VirtualRangeConverter::default()),
            cell_size: 1.0,
            replies: VecDeque::new(),
            waits_per_move: 0,
            moves: 0,
            fail_after: None,
            disconnect_after: None,
            connected: true,
        }
    }

    /// Report raw distances as `cell_size` units per free cell and quantise
    /// them with `converter`.
    pub fn with_converter(mut self, converter: Box<dyn RangeConverter>, cell_size: f32) -> Self {
        self.converter = converter;
        self.cell_size = cell_size;
        self
    }

    /// Reply `Waiting` this many times before acknowledging each move.
    pub fn with_waits_per_move(mut self, waits: usize) -> Self {
        self.waits_per_move = waits;
        self
    }

    /// Answer `Fail` to every move after the first `moves` succeed.
    pub fn failing_after(mut self, moves: usize) -> Self {
        self.fail_after = Some(moves);
        self
    }

    /// Drop the link once `moves` moves have completed.
    pub fn disconnecting_after(mut self, moves: usize) -> Self {
        self.disconnect_after = Some(moves);
        self
    }

    /// Ground-truth cell.
    pub fn position(&self) -> GridPoint {
        self.position
    }

    /// Ground-truth pose, with the heading on the wire.
    pub fn pose(&self) -> RobotLocation {
        RobotLocation::new(self.position, self.facing)
    }

    /// Number of completed moves.
    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Mark this robot's cell occupied on its floor.  Called once it has
    /// been localised and stops moving.
    pub fn park(&self) {
        self.world
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .mark_occupied_around(self.position);
        info!(robot = %self.name, position = %self.position, "simulated robot parked");
    }

    fn floor(&self) -> RwLockReadGuard<'_, WarehouseMap> {
        self.world.read().unwrap_or_else(|e| e.into_inner())
    }

    fn disconnected(&self) -> LinkError {
        LinkError::Disconnected {
            robot: self.name.clone(),
        }
    }

    fn try_move(&mut self, relative: Direction) -> WireCommand {
        if self.fail_after.is_some_and(|limit| self.moves >= limit) {
            return WireCommand::Fail;
        }
        let heading = self.power_on_facing.turned(relative);
        let target = self.position + heading.vector();
        if !self.floor().is_passable(target) {
            debug!(robot = %self.name, %target, "simulated bump into a blocked cell");
            return WireCommand::Fail;
        }
        self.position = target;
        self.facing = heading;
        self.moves += 1;
        if self.disconnect_after.is_some_and(|limit| self.moves >= limit) {
            self.connected = false;
        }
        WireCommand::Ok
    }
}

impl RobotLink for SimRobot {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_signature(&mut self) -> Result<RangeSignature, LinkError> {
        if !self.connected {
            return Err(self.disconnected());
        }
        let floor = self.floor();
        let distances = Direction::ALL.map(|relative| {
            floor.free_run(self.position, self.facing.turned(relative)) as f32 * self.cell_size
        });
        Ok(RangeSignature::from_continuous(distances, self.converter.as_ref()))
    }

    fn send_command(&mut self, command: WireCommand) -> Result<(), LinkError> {
        if !self.connected {
            return Err(self.disconnected());
        }
        let reply = match command.direction() {
            Some(relative) => {
                let outcome = self.try_move(relative);
                if outcome == WireCommand::Ok {
                    self.replies
                        .extend(std::iter::repeat_n(WireCommand::Waiting, self.waits_per_move));
                }
                outcome
            }
            None => WireCommand::Ok,
        };
        self.replies.push_back(reply);
        Ok(())
    }

    fn read_reply(&mut self) -> Result<WireCommand, LinkError> {
        match self.replies.pop_front() {
            Some(reply) => Ok(reply),
            None => Err(self.disconnected()),
        }
    }

    fn on_localised(&mut self, _location: RobotLocation) {
        self.park();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warehouse_perception::PhysicalRangeConverter;

    fn corridor() -> WarehouseMap {
        // 4 × 1 corridor running East–West.
        WarehouseMap::new(4, 1)
    }

    #[test]
    fn readings_are_robot_relative() {
        let mut east = SimRobot::new("e", corridor(), GridPoint::new(0, 0), Direction::Right);
        assert_eq!(
            east.request_signature().unwrap(),
            RangeSignature::from_quantized([true, false, false, false])
        );

        let mut north = SimRobot::new("n", corridor(), GridPoint::new(0, 0), Direction::Up);
        assert_eq!(
            north.request_signature().unwrap(),
            RangeSignature::from_quantized([false, true, false, false])
        );
    }

    #[test]
    fn moves_are_relative_to_power_on_facing() {
        // Facing West at power-on, so the robot's "East" is world North.
        let world = WarehouseMap::new(3, 3);
        let mut robot = SimRobot::new("w", world, GridPoint::new(1, 1), Direction::Left);
        robot.command_move(WireCommand::East).unwrap();
        assert_eq!(robot.position(), GridPoint::new(1, 2));
        assert_eq!(robot.pose().heading, WireCommand::North);

        robot.command_move(WireCommand::North).unwrap();
        assert_eq!(robot.position(), GridPoint::new(0, 2));
        assert_eq!(robot.pose().heading, WireCommand::West);
        assert_eq!(robot.moves(), 2);
    }

    #[test]
    fn bumping_into_a_wall_is_rejected() {
        let mut robot = SimRobot::new("b", corridor(), GridPoint::new(0, 0), Direction::Up);
        assert_eq!(
            robot.command_move(WireCommand::North),
            Err(LinkError::Rejected { command: WireCommand::North })
        );
        assert_eq!(robot.position(), GridPoint::new(0, 0));
    }

    #[test]
    fn waiting_replies_are_absorbed() {
        let mut robot =
            SimRobot::new("slow", corridor(), GridPoint::new(0, 0), Direction::Right).with_waits_per_move(3);
        robot.command_move(WireCommand::North).unwrap();
        assert_eq!(robot.position(), GridPoint::new(1, 0));
    }

    #[test]
    fn scripted_failure_after_n_moves() {
        let mut robot =
            SimRobot::new("f", corridor(), GridPoint::new(0, 0), Direction::Right).failing_after(1);
        robot.command_move(WireCommand::North).unwrap();
        assert!(matches!(
            robot.command_move(WireCommand::North),
            Err(LinkError::Rejected { .. })
        ));
    }

    #[test]
    fn scripted_disconnect() {
        let mut robot =
            SimRobot::new("d", corridor(), GridPoint::new(0, 0), Direction::Right).disconnecting_after(1);
        robot.command_move(WireCommand::North).unwrap();
        assert!(matches!(
            robot.request_signature(),
            Err(LinkError::Disconnected { .. })
        ));
    }

    #[test]
    fn parked_robot_blocks_its_neighbours() {
        let floor: SharedFloor = Arc::new(RwLock::new(corridor()));
        let mut parked = SimRobot::on_floor("p", floor.clone(), GridPoint::new(1, 0), Direction::Right);
        let mut mover = SimRobot::on_floor("m", floor.clone(), GridPoint::new(0, 0), Direction::Right);
        assert_eq!(
            mover.request_signature().unwrap(),
            RangeSignature::from_quantized([true, false, false, false])
        );

        parked.on_localised(parked.pose());
        assert!(floor.read().unwrap().blocked_points().contains(&GridPoint::new(1, 0)));
        assert_eq!(
            mover.request_signature().unwrap(),
            RangeSignature::from_quantized([false; 4])
        );
        assert_eq!(
            mover.command_move(WireCommand::North),
            Err(LinkError::Rejected { command: WireCommand::North })
        );
        assert_eq!(mover.position(), GridPoint::new(0, 0));
        assert_eq!(
            parked.request_signature().unwrap(),
            RangeSignature::from_quantized([true, false, true, false])
        );
    }

    #[test]
    fn robots_on_separate_floors_do_not_interact() {
        let mut lone = SimRobot::new("a", corridor(), GridPoint::new(1, 0), Direction::Right);
        let mut other = SimRobot::new("b", corridor(), GridPoint::new(0, 0), Direction::Right);
        lone.on_localised(lone.pose());
        other.command_move(WireCommand::North).unwrap();
        assert_eq!(other.position(), GridPoint::new(1, 0));
    }

    #[test]
    fn physical_converter_with_centimetre_cells() {
        let mut robot = SimRobot::new("p", corridor(), GridPoint::new(1, 0), Direction::Up)
            .with_converter(Box::new(PhysicalRangeConverter::default()), 30.0);
        assert_eq!(
            robot.request_signature().unwrap(),
            RangeSignature::from_quantized([false, true, false, true])
        );
    }
}
