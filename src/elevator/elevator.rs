/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use serde::Serialize;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::{
    Direction, ElevatorError, ElevatorId, ElevatorStatus, Event, MotionState, OperationalMode,
};

/**
 * A single elevator car and its door/motion state machine.
 *
 * The elevator never waits on anything itself. Operations that start a timed
 * phase (door opening, door closing, arrival) emit an event, and whoever owns
 * the clock calls back into `finish_door_animation`, `close_doors` or
 * `open_doors` once the delay has passed.
 *
 * # Fields
 * - `id`:                  Identifier shown to the user, e.g. "A".
 * - `current_floor`:       Floor the car is at. Moves jump directly to the target.
 * - `min_floor`:           Lowest reachable floor.
 * - `max_floor`:           Highest reachable floor.
 * - `motion`:              Where the car and its doors are.
 * - `mode`:                Emergency, maintenance or overload interrupt, or normal operation.
 * - `direction`:           Current heading, `Stop` when none.
 * - `doors_open`:          True from the end of door opening until the end of door closing.
 * - `destinations`:        Floors still to visit, in visiting order, never containing `current_floor`.
 * - `next_destination`:    Head of `destinations`, or the floor being travelled to during a hop.
 * - `move_count`:          Number of hops made since creation or the last reset.
 * - `event_tx`:            Shared building event stream.
 */
pub struct Elevator {
    id: ElevatorId,
    current_floor: u8,
    min_floor: u8,
    max_floor: u8,
    motion: MotionState,
    mode: OperationalMode,
    direction: Direction,
    doors_open: bool,
    destinations: Vec<u8>,
    next_destination: Option<u8>,
    move_count: u64,
    event_tx: cbc::Sender<Event>,
}

/// Serializable view of an elevator for status output.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ElevatorSnapshot {
    pub id: ElevatorId,
    pub floor: u8,
    pub status: ElevatorStatus,
    pub direction: Direction,
    pub doors_open: bool,
    pub destinations: Vec<u8>,
    pub next_destination: Option<u8>,
    pub move_count: u64,
}

impl Elevator {
    pub fn new(
        id: &str,
        current_floor: u8,
        min_floor: u8,
        max_floor: u8,
        event_tx: cbc::Sender<Event>,
    ) -> Elevator {
        Elevator {
            id: id.to_string(),
            current_floor: current_floor.clamp(min_floor, max_floor),
            min_floor,
            max_floor,
            motion: MotionState::Idle,
            mode: OperationalMode::Normal,
            direction: Direction::Stop,
            doors_open: false,
            destinations: Vec::new(),
            next_destination: None,
            move_count: 0,
            event_tx,
        }
    }

    /***************************************/
    /*              Getters                */
    /***************************************/
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current_floor(&self) -> u8 {
        self.current_floor
    }

    pub fn status(&self) -> ElevatorStatus {
        ElevatorStatus::compose(self.mode, self.motion)
    }

    pub fn motion(&self) -> MotionState {
        self.motion
    }

    pub fn mode(&self) -> OperationalMode {
        self.mode
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn doors_open(&self) -> bool {
        self.doors_open
    }

    #[cfg(test)]
    pub fn destinations(&self) -> &[u8] {
        &self.destinations
    }

    #[cfg(test)]
    pub fn next_destination(&self) -> Option<u8> {
        self.next_destination
    }

    pub fn is_idle(&self) -> bool {
        self.status() == ElevatorStatus::Idle
    }

    pub fn is_moving(&self) -> bool {
        self.mode == OperationalMode::Normal && self.motion.is_moving()
    }

    pub fn is_in_emergency(&self) -> bool {
        self.mode == OperationalMode::Emergency
    }

    pub fn is_in_maintenance(&self) -> bool {
        self.mode == OperationalMode::Maintenance
    }

    pub fn is_overloaded(&self) -> bool {
        self.mode == OperationalMode::Overloaded
    }

    pub fn is_stopped(&self) -> bool {
        self.motion == MotionState::Stopped
    }

    pub fn snapshot(&self) -> ElevatorSnapshot {
        ElevatorSnapshot {
            id: self.id.clone(),
            floor: self.current_floor,
            status: self.status(),
            direction: self.direction,
            doors_open: self.doors_open,
            destinations: self.destinations.clone(),
            next_destination: self.next_destination,
            move_count: self.move_count,
        }
    }

    /***************************************/
    /*            Destinations             */
    /***************************************/
    pub fn add_destination(&mut self, floor: u8) -> Result<(), ElevatorError> {
        self.check_floor(floor)?;

        if self.mode != OperationalMode::Normal {
            return Err(self.not_allowed("accept new destinations"));
        }

        if self.destinations.contains(&floor) {
            return Err(ElevatorError::DuplicateDestination {
                elevator: self.id.clone(),
                floor,
            });
        }

        // Already here, just let people in
        if floor == self.current_floor {
            if !self.doors_open && self.motion != MotionState::DoorOpening {
                self.open_doors()?;
            }
            return Ok(());
        }

        self.destinations.push(floor);
        if self.direction == Direction::Stop {
            self.direction = Direction::between(self.current_floor, floor);
        }
        self.sort_destinations();

        info!("Floor {} added to elevator {} destinations", floor, self.id);
        self.emit(Event::DestinationAdded {
            elevator: self.id.clone(),
            floor,
        });
        Ok(())
    }

    pub fn clear_destinations(&mut self) {
        self.destinations.clear();
        self.next_destination = None;
        self.direction = Direction::Stop;

        info!("Elevator {} destinations cleared", self.id);
        self.emit(Event::DestinationsCleared {
            elevator: self.id.clone(),
        });
    }

    /**
     * Orders the destinations for the current heading.
     *
     * Going up: floors above ascending, then floors below ascending.
     * Going down: floors below descending, then floors above descending.
     * The current floor is always dropped.
     */
    fn sort_destinations(&mut self) {
        let current = self.current_floor;

        if self.direction == Direction::Stop {
            if let Some(&first) = self.destinations.iter().find(|&&f| f != current) {
                self.direction = Direction::between(current, first);
            }
        }

        let (mut above, mut below): (Vec<u8>, Vec<u8>) = self
            .destinations
            .iter()
            .copied()
            .filter(|&f| f != current)
            .partition(|&f| f > current);

        self.destinations = match self.direction {
            Direction::Up => {
                above.sort_unstable();
                below.sort_unstable();
                above.into_iter().chain(below).collect()
            }
            Direction::Down => {
                below.sort_unstable_by(|a, b| b.cmp(a));
                above.sort_unstable_by(|a, b| b.cmp(a));
                below.into_iter().chain(above).collect()
            }
            Direction::Stop => self
                .destinations
                .iter()
                .copied()
                .filter(|&f| f != current)
                .collect(),
        };

        self.next_destination = self.destinations.first().copied();
    }

    /// Starts the hop to the head of the queue, or goes idle when there is none.
    pub fn process_next_destination(&mut self) -> Result<(), ElevatorError> {
        match self.destinations.first().copied() {
            Some(next) => {
                self.next_destination = Some(next);
                self.move_to_floor(next)
            }
            None => {
                self.next_destination = None;
                if !self.motion.is_door_phase() && self.motion != MotionState::Stopped {
                    self.set_motion(MotionState::Idle);
                }
                Ok(())
            }
        }
    }

    /***************************************/
    /*               Motion                */
    /***************************************/
    /**
     * Moves the car straight to `floor`.
     *
     * There are no intermediate stops: the floor changes in one step and the
     * car stays in MOVING_UP/MOVING_DOWN until its doors start opening.
     */
    pub fn move_to_floor(&mut self, floor: u8) -> Result<(), ElevatorError> {
        self.check_floor(floor)?;

        if floor == self.current_floor {
            debug!("Elevator {} already at floor {}", self.id, floor);
            return Ok(());
        }

        if self.mode != OperationalMode::Normal || self.motion == MotionState::Stopped {
            return Err(self.not_allowed("move"));
        }

        if self.doors_open || self.motion == MotionState::DoorOpening {
            return Err(self.not_allowed("move with open doors"));
        }

        let arrival = self.next_destination == Some(floor) || self.destinations.contains(&floor);
        let direction = Direction::between(self.current_floor, floor);
        self.set_motion(match direction {
            Direction::Up => MotionState::MovingUp,
            _ => MotionState::MovingDown,
        });

        let old_floor = self.current_floor;
        self.current_floor = floor;
        self.sort_destinations();

        info!(
            "Elevator {} moving from floor {} to {}",
            self.id, old_floor, floor
        );
        self.emit(Event::ElevatorFloorChanged {
            elevator: self.id.clone(),
            old_floor,
            new_floor: floor,
            direction,
        });

        if arrival {
            self.emit(Event::ElevatorArrived {
                elevator: self.id.clone(),
                floor,
            });
        }
        Ok(())
    }

    /// Power outage: freezes a moving car, keeping its queue.
    pub fn force_stop(&mut self) -> Result<(), ElevatorError> {
        if !self.is_moving() {
            return Err(self.not_allowed("stop"));
        }
        self.set_motion(MotionState::Stopped);
        warn!("Elevator {} stopped at floor {}", self.id, self.current_floor);
        Ok(())
    }

    pub fn clear_stop(&mut self) -> Result<(), ElevatorError> {
        if self.motion != MotionState::Stopped {
            return Err(self.not_allowed("clear stop"));
        }
        self.set_motion(MotionState::Idle);
        Ok(())
    }

    /***************************************/
    /*               Doors                 */
    /***************************************/
    pub fn open_doors(&mut self) -> Result<(), ElevatorError> {
        if self.doors_open || self.motion == MotionState::DoorOpening {
            return Err(self.not_allowed("open doors"));
        }
        if self.motion == MotionState::Stopped {
            return Err(self.not_allowed("open doors"));
        }

        self.set_motion(MotionState::DoorOpening);
        self.emit(Event::ElevatorDoorsOpening {
            elevator: self.id.clone(),
            floor: self.current_floor,
        });
        Ok(())
    }

    pub fn close_doors(&mut self) -> Result<(), ElevatorError> {
        if !self.doors_open || self.motion == MotionState::DoorClosing {
            return Err(self.not_allowed("close doors"));
        }
        if self.mode == OperationalMode::Overloaded {
            return Err(self.not_allowed("close doors"));
        }

        self.set_motion(MotionState::DoorClosing);
        self.emit(Event::ElevatorDoorsClosing {
            elevator: self.id.clone(),
            floor: self.current_floor,
        });
        Ok(())
    }

    /**
     * Completes a door opening or closing once its animation time has passed.
     *
     * Opening ends in LOADING. Closing hands over to the next destination, or
     * ends in IDLE when the queue is empty.
     */
    pub fn finish_door_animation(&mut self) {
        match self.motion {
            MotionState::DoorOpening => {
                self.doors_open = true;
                self.set_motion(MotionState::Loading);
                self.emit(Event::ElevatorDoorsOpened {
                    elevator: self.id.clone(),
                    floor: self.current_floor,
                });
            }
            MotionState::DoorClosing => {
                self.doors_open = false;
                if self.destinations.is_empty() {
                    self.set_motion(MotionState::Idle);
                } else if let Err(e) = self.process_next_destination() {
                    warn!("Elevator {} could not continue: {}", self.id, e);
                    self.set_motion(MotionState::Idle);
                }
                self.emit(Event::ElevatorDoorsClosed {
                    elevator: self.id.clone(),
                    floor: self.current_floor,
                });
            }
            _ => debug!("Elevator {} has no door animation in progress", self.id),
        }
    }

    /***************************************/
    /*             Interrupts              */
    /***************************************/
    pub fn set_emergency(&mut self, active: bool) -> Result<(), ElevatorError> {
        if active {
            if matches!(
                self.mode,
                OperationalMode::Emergency | OperationalMode::Maintenance
            ) {
                return Err(self.not_allowed("enter emergency"));
            }
            self.enter_mode(OperationalMode::Emergency);
        } else {
            if self.mode != OperationalMode::Emergency {
                return Err(self.not_allowed("leave emergency"));
            }
            self.leave_mode();
        }

        self.emit(Event::EmergencyChanged {
            elevator: self.id.clone(),
            active,
        });
        Ok(())
    }

    pub fn set_maintenance(&mut self, active: bool) -> Result<(), ElevatorError> {
        if active {
            if matches!(
                self.mode,
                OperationalMode::Emergency | OperationalMode::Maintenance
            ) {
                return Err(self.not_allowed("enter maintenance"));
            }
            self.enter_mode(OperationalMode::Maintenance);
        } else {
            if self.mode != OperationalMode::Maintenance {
                return Err(self.not_allowed("leave maintenance"));
            }
            self.leave_mode();
        }

        self.emit(Event::MaintenanceChanged {
            elevator: self.id.clone(),
            active,
        });
        Ok(())
    }

    /// Overload only makes sense while standing with the doors open.
    pub fn set_overloaded(&mut self, active: bool) -> Result<(), ElevatorError> {
        if active {
            if self.mode != OperationalMode::Normal || self.motion != MotionState::Loading {
                return Err(self.not_allowed("become overloaded"));
            }
            let old_state = self.status();
            self.mode = OperationalMode::Overloaded;
            self.emit_state_change(old_state);
        } else {
            if self.mode != OperationalMode::Overloaded {
                return Err(self.not_allowed("clear overload"));
            }
            self.leave_mode();
        }

        self.emit(Event::OverloadChanged {
            elevator: self.id.clone(),
            active,
        });
        Ok(())
    }

    /// Drops any interrupt mode and the queue. Used by the building-wide recall.
    pub fn clear_interrupts(&mut self) {
        if self.mode != OperationalMode::Normal {
            self.leave_mode();
        }
        self.clear_destinations();
    }

    fn enter_mode(&mut self, mode: OperationalMode) {
        let old_state = self.status();
        self.clear_destinations();
        self.mode = mode;
        warn!("Elevator {} entered {}", self.id, self.status());
        self.emit_state_change(old_state);
    }

    fn leave_mode(&mut self) {
        let old_state = self.status();
        self.mode = OperationalMode::Normal;

        // A running door cycle finishes on its own
        if !self.motion.is_door_phase() && self.motion != MotionState::Stopped {
            self.motion = MotionState::Idle;
            self.direction = Direction::Stop;
        }
        info!("Elevator {} back in {}", self.id, self.status());
        self.emit_state_change(old_state);
    }

    /***************************************/
    /*               Reset                 */
    /***************************************/
    pub fn reset(&mut self, floor: u8) {
        self.destinations.clear();
        self.next_destination = None;
        self.motion = MotionState::Idle;
        self.mode = OperationalMode::Normal;
        self.direction = Direction::Stop;
        self.doors_open = false;
        self.move_count = 0;
        self.current_floor = floor.clamp(self.min_floor, self.max_floor);

        info!("Elevator {} reset to floor {}", self.id, self.current_floor);
    }

    /***************************************/
    /*              Helpers                */
    /***************************************/
    fn set_motion(&mut self, motion: MotionState) {
        let old_state = self.status();
        self.motion = motion;

        match motion {
            MotionState::Idle => self.direction = Direction::Stop,
            MotionState::MovingUp => {
                self.direction = Direction::Up;
                self.move_count += 1;
            }
            MotionState::MovingDown => {
                self.direction = Direction::Down;
                self.move_count += 1;
            }
            MotionState::Loading => self.doors_open = true,
            _ => (),
        }

        self.emit_state_change(old_state);
    }

    fn emit_state_change(&self, old_state: ElevatorStatus) {
        let new_state = self.status();
        if old_state == new_state {
            return;
        }

        debug!(
            "Elevator {} state change: {} -> {}",
            self.id, old_state, new_state
        );
        self.emit(Event::ElevatorStateChanged {
            elevator: self.id.clone(),
            old_state,
            new_state,
            floor: self.current_floor,
        });
    }

    fn emit(&self, event: Event) {
        if self.event_tx.send(event).is_err() {
            debug!("Elevator {} event stream is closed", self.id);
        }
    }

    fn check_floor(&self, floor: u8) -> Result<(), ElevatorError> {
        if floor < self.min_floor || floor > self.max_floor {
            return Err(ElevatorError::InvalidFloor {
                floor,
                min: self.min_floor,
                max: self.max_floor,
            });
        }
        Ok(())
    }

    fn not_allowed(&self, action: &'static str) -> ElevatorError {
        ElevatorError::NotAllowed {
            elevator: self.id.clone(),
            action,
            status: self.status(),
        }
    }
}
