//! Generic `RobotLink` trait for the request/response channel to one robot.
//!
//! The PC side never drives motors or reads sensors itself.  It asks the
//! robot, over a blocking link, for a fresh [`RangeSignature`] or to move
//! one cell, and waits for the robot's status reply.  Transports (Bluetooth,
//! the in-process simulator, test doubles) implement the two primitive
//! methods; [`RobotLink::command_move`] layers the acknowledgement protocol
//! on top.

use thiserror::Error;
use tracing::trace;
use warehouse_perception::RangeSignature;
use warehouse_types::{RobotLocation, UnknownWireValue, WireCommand};

/// Failures reported by a robot link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("robot rejected {command:?}")]
    Rejected { command: WireCommand },

    #[error("link to {robot} dropped")]
    Disconnected { robot: String },

    #[error("expected a status reply, got {reply:?}")]
    UnexpectedReply { reply: WireCommand },

    #[error(transparent)]
    Decode(#[from] UnknownWireValue),
}

/// A blocking request/response channel to a single robot.
pub trait RobotLink: Send {
    /// Human-readable robot name, used in logs and errors.
    fn name(&self) -> &str;

    /// Ask the robot to sweep its sensor and report the robot-relative
    /// signature.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Disconnected`] when the link has dropped.
    fn request_signature(&mut self) -> Result<RangeSignature, LinkError>;

    /// Transmit one command without waiting for a reply.
    fn send_command(&mut self, command: WireCommand) -> Result<(), LinkError>;

    /// Block until the robot sends its next reply.
    fn read_reply(&mut self) -> Result<WireCommand, LinkError>;

    /// Told once the localiser has resolved this robot's pose.  The default
    /// does nothing.
    fn on_localised(&mut self, _location: RobotLocation) {}

    /// Send a movement command and block until the robot acknowledges it.
    ///
    /// `Waiting` replies are skipped, `Ok` completes the move and `Fail` is
    /// surfaced as [`LinkError::Rejected`].
    ///
    /// # Panics
    ///
    /// Panics when `command` is not one of the four movement commands.
    fn command_move(&mut self, command: WireCommand) -> Result<(), LinkError> {
        assert!(
            command.direction().is_some(),
            "{command:?} is not a movement command"
        );
        self.send_command(command)?;
        loop {
            match self.read_reply()? {
                WireCommand::Waiting => trace!(robot = self.name(), "robot still moving"),
                WireCommand::Ok => return Ok(()),
                WireCommand::Fail => return Err(LinkError::Rejected { command }),
                reply => return Err(LinkError::UnexpectedReply { reply }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Replays a fixed list of raw replies.
    struct ScriptedLink {
        sent: Vec<WireCommand>,
        replies: VecDeque<i32>,
    }

    impl ScriptedLink {
        fn new(replies: &[i32]) -> Self {
            Self {
                sent: Vec::new(),
                replies: replies.iter().copied().collect(),
            }
        }
    }

    impl RobotLink for ScriptedLink {
        fn name(&self) -> &str {
            "scripted"
        }

        fn request_signature(&mut self) -> Result<RangeSignature, LinkError> {
            Ok(RangeSignature::default())
        }

        fn send_command(&mut self, command: WireCommand) -> Result<(), LinkError> {
            self.sent.push(command);
            Ok(())
        }

        fn read_reply(&mut self) -> Result<WireCommand, LinkError> {
            let raw = self.replies.pop_front().ok_or_else(|| LinkError::Disconnected {
                robot: "scripted".to_string(),
            })?;
            Ok(WireCommand::try_from(raw)?)
        }
    }

    #[test]
    fn command_move_skips_waiting_replies() {
        let mut link = ScriptedLink::new(&[0, 0, 1]);
        link.command_move(WireCommand::East).unwrap();
        assert_eq!(link.sent, vec![WireCommand::East]);
        assert!(link.replies.is_empty());
    }

    #[test]
    fn command_move_surfaces_fail() {
        let mut link = ScriptedLink::new(&[0, 2]);
        assert_eq!(
            link.command_move(WireCommand::North),
            Err(LinkError::Rejected { command: WireCommand::North })
        );
    }

    #[test]
    fn command_move_rejects_non_status_reply() {
        let mut link = ScriptedLink::new(&[8]);
        assert_eq!(
            link.command_move(WireCommand::West),
            Err(LinkError::UnexpectedReply { reply: WireCommand::Pickup })
        );
    }

    #[test]
    fn command_move_reports_undecodable_reply() {
        let mut link = ScriptedLink::new(&[42]);
        assert_eq!(
            link.command_move(WireCommand::South),
            Err(LinkError::Decode(UnknownWireValue(42)))
        );
    }

    #[test]
    fn command_move_reports_dropped_link() {
        let mut link = ScriptedLink::new(&[0]);
        assert!(matches!(
            link.command_move(WireCommand::South),
            Err(LinkError::Disconnected { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "not a movement command")]
    fn command_move_requires_movement() {
        let mut link = ScriptedLink::new(&[1]);
        let _ = link.command_move(WireCommand::Pickup);
    }
}
