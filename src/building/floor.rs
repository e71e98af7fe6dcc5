use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::shared::{Direction, ElevatorId};

/**
 * Call buttons and arrival indicators of one floor.
 *
 * # Fields
 * - `number`:                  Floor number, 0 is the ground floor.
 * - `has_up_button`:           False on the top floor.
 * - `has_down_button`:         False on the ground floor.
 * - `up_button_pressed`:       Up call is lit.
 * - `down_button_pressed`:     Down call is lit.
 * - `elevator_indicators`:     Heading shown per elevator, `Stop` when dark.
 */
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Floor {
    number: u8,
    has_up_button: bool,
    has_down_button: bool,
    up_button_pressed: bool,
    down_button_pressed: bool,
    elevator_indicators: BTreeMap<ElevatorId, Direction>,
}

impl Floor {
    pub fn new(number: u8, n_floors: u8) -> Floor {
        Floor {
            number,
            has_up_button: number + 1 < n_floors,
            has_down_button: number > 0,
            up_button_pressed: false,
            down_button_pressed: false,
            elevator_indicators: BTreeMap::new(),
        }
    }

    pub fn has_button(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.has_up_button,
            Direction::Down => self.has_down_button,
            Direction::Stop => false,
        }
    }

    #[cfg(test)]
    pub fn is_button_pressed(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up_button_pressed,
            Direction::Down => self.down_button_pressed,
            Direction::Stop => false,
        }
    }

    pub fn set_button(&mut self, direction: Direction, pressed: bool) {
        match direction {
            Direction::Up => self.up_button_pressed = pressed,
            Direction::Down => self.down_button_pressed = pressed,
            Direction::Stop => return,
        }
        debug!(
            "Floor {} {} button {}",
            self.number,
            direction,
            if pressed { "pressed" } else { "released" }
        );
    }

    #[cfg(test)]
    pub fn indicator(&self, elevator: &str) -> Direction {
        self.elevator_indicators
            .get(elevator)
            .copied()
            .unwrap_or(Direction::Stop)
    }

    pub fn set_indicator(&mut self, elevator: &str, direction: Direction) {
        if direction == Direction::Stop {
            self.elevator_indicators.remove(elevator);
        } else {
            self.elevator_indicators
                .insert(elevator.to_string(), direction);
        }
    }

    pub fn reset(&mut self) {
        self.up_button_pressed = false;
        self.down_button_pressed = false;
        self.elevator_indicators.clear();
    }
}
