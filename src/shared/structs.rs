/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::CommandError;

pub type ElevatorId = String;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Stop,
}

impl Direction {
    /// Heading needed to get from `from` to `to`.
    pub fn between(from: u8, to: u8) -> Direction {
        if to > from {
            Direction::Up
        } else if to < from {
            Direction::Down
        } else {
            Direction::Stop
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Stop => "none",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Direction {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(Direction::Up),
            "down" | "d" => Ok(Direction::Down),
            "stop" | "none" => Ok(Direction::Stop),
            _ => Err(CommandError::InvalidArgument {
                arg: "direction",
                value: s.to_string(),
            }),
        }
    }
}

/// Where the car and its doors are.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    MovingUp,
    MovingDown,
    DoorOpening,
    Loading,
    DoorClosing,
    Stopped,
}

impl MotionState {
    pub fn is_moving(&self) -> bool {
        matches!(self, MotionState::MovingUp | MotionState::MovingDown)
    }

    pub fn is_door_phase(&self) -> bool {
        matches!(
            self,
            MotionState::DoorOpening | MotionState::Loading | MotionState::DoorClosing
        )
    }
}

/// Interrupt layered on top of the motion state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationalMode {
    Normal,
    Emergency,
    Maintenance,
    Overloaded,
}

/**
 * Externally visible elevator state.
 *
 * Composed from `OperationalMode` and `MotionState`: an interrupt mode wins,
 * otherwise the motion state shows through.
 */
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElevatorStatus {
    Idle,
    MovingUp,
    MovingDown,
    DoorOpening,
    Loading,
    DoorClosing,
    Emergency,
    Maintenance,
    Overloaded,
    Stopped,
}

impl ElevatorStatus {
    pub fn compose(mode: OperationalMode, motion: MotionState) -> ElevatorStatus {
        match mode {
            OperationalMode::Emergency => ElevatorStatus::Emergency,
            OperationalMode::Maintenance => ElevatorStatus::Maintenance,
            OperationalMode::Overloaded => ElevatorStatus::Overloaded,
            OperationalMode::Normal => match motion {
                MotionState::Idle => ElevatorStatus::Idle,
                MotionState::MovingUp => ElevatorStatus::MovingUp,
                MotionState::MovingDown => ElevatorStatus::MovingDown,
                MotionState::DoorOpening => ElevatorStatus::DoorOpening,
                MotionState::Loading => ElevatorStatus::Loading,
                MotionState::DoorClosing => ElevatorStatus::DoorClosing,
                MotionState::Stopped => ElevatorStatus::Stopped,
            },
        }
    }
}

impl fmt::Display for ElevatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElevatorStatus::Idle => "IDLE",
            ElevatorStatus::MovingUp => "MOVING_UP",
            ElevatorStatus::MovingDown => "MOVING_DOWN",
            ElevatorStatus::DoorOpening => "DOOR_OPENING",
            ElevatorStatus::Loading => "LOADING",
            ElevatorStatus::DoorClosing => "DOOR_CLOSING",
            ElevatorStatus::Emergency => "EMERGENCY",
            ElevatorStatus::Maintenance => "MAINTENANCE",
            ElevatorStatus::Overloaded => "OVERLOADED",
            ElevatorStatus::Stopped => "STOPPED",
        };
        write!(f, "{}", s)
    }
}

/**
 * Notifications emitted by elevators and the building.
 *
 * Every elevator and the building write into the same channel, so the order
 * subscribers see is the order things happened in.
 */
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    ElevatorStateChanged {
        elevator: ElevatorId,
        old_state: ElevatorStatus,
        new_state: ElevatorStatus,
        floor: u8,
    },
    ElevatorFloorChanged {
        elevator: ElevatorId,
        old_floor: u8,
        new_floor: u8,
        direction: Direction,
    },
    ElevatorArrived {
        elevator: ElevatorId,
        floor: u8,
    },
    ElevatorDoorsOpening {
        elevator: ElevatorId,
        floor: u8,
    },
    ElevatorDoorsOpened {
        elevator: ElevatorId,
        floor: u8,
    },
    ElevatorDoorsClosing {
        elevator: ElevatorId,
        floor: u8,
    },
    ElevatorDoorsClosed {
        elevator: ElevatorId,
        floor: u8,
    },
    DestinationAdded {
        elevator: ElevatorId,
        floor: u8,
    },
    DestinationsCleared {
        elevator: ElevatorId,
    },
    EmergencyChanged {
        elevator: ElevatorId,
        active: bool,
    },
    MaintenanceChanged {
        elevator: ElevatorId,
        active: bool,
    },
    OverloadChanged {
        elevator: ElevatorId,
        active: bool,
    },
    ElevatorCalled {
        floor: u8,
        direction: Direction,
    },
    BuildingReset,
}

/// A floor call nobody could take yet.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCall {
    pub floor: u8,
    pub direction: Direction,
}
