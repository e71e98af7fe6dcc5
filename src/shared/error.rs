/***************************************/
/*        3rd party libraries          */
/***************************************/
use thiserror::Error;

use super::structs::{Direction, ElevatorId, ElevatorStatus};

/// Why an operation on the building or an elevator did not take effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElevatorError {
    #[error("invalid floor {floor}, valid floors are {min}..={max}")]
    InvalidFloor { floor: u8, min: u8, max: u8 },

    #[error("invalid call direction: {0}")]
    InvalidDirection(Direction),

    #[error("floor {floor} has no {direction} button")]
    NoSuchButton { floor: u8, direction: Direction },

    #[error("elevator {0} not found")]
    UnknownElevator(ElevatorId),

    #[error("floor {floor} already in elevator {elevator} destinations")]
    DuplicateDestination { elevator: ElevatorId, floor: u8 },

    #[error("elevator {elevator} cannot {action} in {status} state")]
    NotAllowed {
        elevator: ElevatorId,
        action: &'static str,
        status: ElevatorStatus,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid {arg}: {value}")]
    InvalidArgument { arg: &'static str, value: String },
}
