/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::Floor;
use crate::config::{BuildingConfig, DispatchConfig};
use crate::elevator::{Elevator, ElevatorSnapshot};
use crate::shared::{Direction, ElevatorError, ElevatorId, Event};

/**
 * Owns the floors and elevators of the building.
 *
 * Elevators and the building share one event channel; `next_event` hands
 * the events out in the order they were produced. The building never picks
 * an elevator for a call on its own, it only announces the call.
 *
 * # Fields
 * - `n_floors`:        Number of floors, numbered from 0.
 * - `floors`:          One entry per floor, indexed by floor number.
 * - `elevators`:       Elevators keyed by id, iterated in id order.
 * - `start_floors`:    Floor each elevator returns to on reset.
 * - `dispatch`:        Which interrupt modes disqualify an elevator from calls.
 * - `event_tx`:        Sender shared with every elevator.
 * - `event_rx`:        Receiving end drained by `next_event`.
 */
pub struct Building {
    n_floors: u8,
    floors: Vec<Floor>,
    elevators: BTreeMap<ElevatorId, Elevator>,
    start_floors: BTreeMap<ElevatorId, u8>,
    dispatch: DispatchConfig,
    event_tx: cbc::Sender<Event>,
    event_rx: cbc::Receiver<Event>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BuildingSnapshot {
    pub floors: Vec<Floor>,
    pub elevators: Vec<ElevatorSnapshot>,
}

impl Building {
    pub fn new(config: &BuildingConfig, dispatch: &DispatchConfig) -> Building {
        let (event_tx, event_rx) = cbc::unbounded::<Event>();
        let n_floors = config.n_floors;
        let top_floor = n_floors.saturating_sub(1);

        let floors = (0..n_floors).map(|f| Floor::new(f, n_floors)).collect();

        let mut elevators = BTreeMap::new();
        let mut start_floors = BTreeMap::new();
        for index in 0..config.n_elevators {
            let id = elevator_name(index);
            let start = start_floor(index, config.n_elevators, top_floor);
            elevators.insert(
                id.clone(),
                Elevator::new(&id, start, 0, top_floor, event_tx.clone()),
            );
            start_floors.insert(id, start);
        }

        info!(
            "Building initialized with {} floors and {} elevators",
            n_floors, config.n_elevators
        );

        Building {
            n_floors,
            floors,
            elevators,
            start_floors,
            dispatch: dispatch.clone(),
            event_tx,
            event_rx,
        }
    }

    /***************************************/
    /*              Getters                */
    /***************************************/
    #[cfg(test)]
    pub fn n_floors(&self) -> u8 {
        self.n_floors
    }

    #[cfg(test)]
    pub fn floor(&self, number: u8) -> Option<&Floor> {
        self.floors.get(number as usize)
    }

    #[cfg(test)]
    pub fn elevators(&self) -> impl Iterator<Item = &Elevator> {
        self.elevators.values()
    }

    pub fn elevator_ids(&self) -> Vec<ElevatorId> {
        self.elevators.keys().cloned().collect()
    }

    pub fn elevator(&self, id: &str) -> Result<&Elevator, ElevatorError> {
        self.elevators
            .get(id)
            .ok_or_else(|| ElevatorError::UnknownElevator(id.to_string()))
    }

    pub fn elevator_mut(&mut self, id: &str) -> Result<&mut Elevator, ElevatorError> {
        self.elevators
            .get_mut(id)
            .ok_or_else(|| ElevatorError::UnknownElevator(id.to_string()))
    }

    pub fn next_event(&self) -> Option<Event> {
        self.event_rx.try_recv().ok()
    }

    pub fn snapshot(&self) -> BuildingSnapshot {
        BuildingSnapshot {
            floors: self.floors.clone(),
            elevators: self.elevators.values().map(|e| e.snapshot()).collect(),
        }
    }

    /***************************************/
    /*             Floor calls             */
    /***************************************/
    pub fn call_elevator(&mut self, floor: u8, direction: Direction) -> Result<(), ElevatorError> {
        if floor >= self.n_floors {
            return Err(ElevatorError::InvalidFloor {
                floor,
                min: 0,
                max: self.n_floors.saturating_sub(1),
            });
        }
        if direction == Direction::Stop {
            return Err(ElevatorError::InvalidDirection(direction));
        }
        if !self.floors[floor as usize].has_button(direction) {
            return Err(ElevatorError::NoSuchButton { floor, direction });
        }

        // Someone is already standing here with the doors open
        if self
            .elevators
            .values()
            .any(|e| e.current_floor() == floor && e.doors_open())
        {
            debug!("Elevator already at floor {} with doors open", floor);
            return Ok(());
        }

        self.floors[floor as usize].set_button(direction, true);
        info!("Elevator called to floor {}, direction {}", floor, direction);
        self.emit(Event::ElevatorCalled { floor, direction });
        Ok(())
    }

    /**
     * Picks the elevator that should answer a call.
     *
     * Elevators in emergency never qualify; maintenance and overload are
     * excluded according to the dispatch config. Aligned elevators (idle,
     * without heading, or heading the same way as the call) are preferred.
     * Among the preferred set the nearest wins, ties go to the lower floor
     * and then the lower id.
     */
    pub fn find_closest_elevator(&self, floor: u8, direction: Direction) -> Option<ElevatorId> {
        let candidates: Vec<&Elevator> = self
            .elevators
            .values()
            .filter(|e| self.is_candidate(e))
            .collect();

        if candidates.is_empty() {
            warn!("No available elevators");
            return None;
        }

        let aligned: Vec<&Elevator> = candidates
            .iter()
            .copied()
            .filter(|e| Building::is_aligned(e, direction))
            .collect();
        let pool = if aligned.is_empty() {
            &candidates
        } else {
            &aligned
        };

        pool.iter()
            .min_by(|a, b| {
                let distance_a = a.current_floor().abs_diff(floor);
                let distance_b = b.current_floor().abs_diff(floor);
                distance_a
                    .cmp(&distance_b)
                    .then(a.current_floor().cmp(&b.current_floor()))
                    .then_with(|| a.id().cmp(b.id()))
            })
            .map(|e| e.id().to_string())
    }

    pub fn is_aligned(elevator: &Elevator, direction: Direction) -> bool {
        elevator.is_idle()
            || elevator.direction() == direction
            || elevator.direction() == Direction::Stop
    }

    fn is_candidate(&self, elevator: &Elevator) -> bool {
        if elevator.is_in_emergency() {
            return false;
        }
        if self.dispatch.exclude_maintenance && elevator.is_in_maintenance() {
            return false;
        }
        if self.dispatch.exclude_overloaded && elevator.is_overloaded() {
            return false;
        }
        true
    }

    /***************************************/
    /*         Buttons and indicators      */
    /***************************************/
    pub fn clear_call_button(&mut self, floor: u8, direction: Direction) {
        if let Some(f) = self.floors.get_mut(floor as usize) {
            f.set_button(direction, false);
        }
    }

    pub fn clear_floor_buttons(&mut self, floor: u8) {
        if let Some(f) = self.floors.get_mut(floor as usize) {
            f.set_button(Direction::Up, false);
            f.set_button(Direction::Down, false);
        }
    }

    /// Lights the elevator's heading at its current floor only.
    pub fn update_indicators(&mut self, id: &str) {
        let (floor, direction) = match self.elevators.get(id) {
            Some(e) => (e.current_floor(), e.direction()),
            None => return,
        };
        self.clear_indicators(id);
        if let Some(f) = self.floors.get_mut(floor as usize) {
            f.set_indicator(id, direction);
        }
    }

    pub fn clear_indicators(&mut self, id: &str) {
        for floor in self.floors.iter_mut() {
            floor.set_indicator(id, Direction::Stop);
        }
    }

    /***************************************/
    /*               Reset                 */
    /***************************************/
    pub fn reset(&mut self) {
        // Stale notifications from before the reset must not reach anyone
        let dropped = self.event_rx.try_iter().count();
        if dropped > 0 {
            debug!("Dropped {} pending events on reset", dropped);
        }

        for floor in self.floors.iter_mut() {
            floor.reset();
        }
        for (id, elevator) in self.elevators.iter_mut() {
            let start = self.start_floors.get(id).copied().unwrap_or(0);
            elevator.reset(start);
        }

        info!("Building reset to initial state");
        self.emit(Event::BuildingReset);
    }

    fn emit(&self, event: Event) {
        if self.event_tx.send(event).is_err() {
            debug!("Building event stream is closed");
        }
    }
}

/***************************************/
/*              Helpers                */
/***************************************/
fn elevator_name(index: u8) -> ElevatorId {
    ((b'A' + index) as char).to_string()
}

// A on the ground floor, the last one on the top floor, the rest spread between
fn start_floor(index: u8, n_elevators: u8, top_floor: u8) -> u8 {
    if n_elevators <= 1 {
        return 0;
    }
    let spread = index as u32 * top_floor as u32 / (n_elevators as u32 - 1);
    spread as u8
}
