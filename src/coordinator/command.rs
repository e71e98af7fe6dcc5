/***************************************/
/*        3rd party libraries          */
/***************************************/
use std::str::FromStr;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::{CommandError, Direction, ElevatorId};

/// On/off argument of the emergency and maintenance commands. Left out it toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    Toggle,
    On,
    Off,
}

/// Timing values that can be changed while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingKey {
    DoorOpenTime,
    DoorAnimationTime,
    ArrivalDelay,
}

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Call { floor: u8, direction: Direction },
    Go { elevator: ElevatorId, floor: u8 },
    Open(ElevatorId),
    Close(ElevatorId),
    Emergency { elevator: ElevatorId, switch: Switch },
    Maintenance { elevator: ElevatorId, switch: Switch },
    Overload { elevator: ElevatorId, active: bool },
    Recall,
    Outage,
    Restore,
    Reset,
    Status,
    Set { key: TimingKey, value: u64 },
    Quit,
}

impl FromStr for Switch {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Ok(Switch::On),
            "off" | "false" | "0" => Ok(Switch::Off),
            "toggle" => Ok(Switch::Toggle),
            _ => Err(CommandError::InvalidArgument {
                arg: "switch",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for TimingKey {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "door_open_time" => Ok(TimingKey::DoorOpenTime),
            "door_animation_time" => Ok(TimingKey::DoorAnimationTime),
            "arrival_delay" => Ok(TimingKey::ArrivalDelay),
            _ => Err(CommandError::InvalidArgument {
                arg: "timing key",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut args = line.split_whitespace();
        let name = args.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();

        let command = match name.as_str() {
            "call" => Command::Call {
                floor: parse_arg(args.next(), "floor")?,
                direction: args
                    .next()
                    .ok_or(CommandError::MissingArgument("direction"))?
                    .parse()?,
            },
            "go" => Command::Go {
                elevator: elevator_arg(args.next())?,
                floor: parse_arg(args.next(), "floor")?,
            },
            "open" => Command::Open(elevator_arg(args.next())?),
            "close" => Command::Close(elevator_arg(args.next())?),
            "emergency" => Command::Emergency {
                elevator: elevator_arg(args.next())?,
                switch: switch_arg(args.next())?,
            },
            "maintenance" => Command::Maintenance {
                elevator: elevator_arg(args.next())?,
                switch: switch_arg(args.next())?,
            },
            "overload" => {
                let elevator = elevator_arg(args.next())?;
                let active = match switch_arg(args.next())? {
                    Switch::On => true,
                    Switch::Off => false,
                    Switch::Toggle => return Err(CommandError::MissingArgument("on|off")),
                };
                Command::Overload { elevator, active }
            }
            "recall" => Command::Recall,
            "outage" => Command::Outage,
            "restore" => Command::Restore,
            "reset" => Command::Reset,
            "status" => Command::Status,
            "set" => Command::Set {
                key: args
                    .next()
                    .ok_or(CommandError::MissingArgument("timing key"))?
                    .parse()?,
                value: parse_arg(args.next(), "milliseconds")?,
            },
            "quit" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(name)),
        };
        Ok(command)
    }
}

/***************************************/
/*              Helpers                */
/***************************************/
fn parse_arg<T: FromStr>(arg: Option<&str>, name: &'static str) -> Result<T, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument(name))?;
    arg.parse().map_err(|_| CommandError::InvalidArgument {
        arg: name,
        value: arg.to_string(),
    })
}

// Elevator ids are single letters, accept them in any case
fn elevator_arg(arg: Option<&str>) -> Result<ElevatorId, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument("elevator"))?;
    Ok(arg.to_ascii_uppercase())
}

fn switch_arg(arg: Option<&str>) -> Result<Switch, CommandError> {
    match arg {
        Some(arg) => arg.parse(),
        None => Ok(Switch::Toggle),
    }
}
