/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{debug, info, warn};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::Building;
use crate::config::DispatchConfig;
use crate::shared::{
    Direction, ElevatorError, ElevatorStatus, Event, MotionState, OperationalMode, PendingCall,
};

/**
 * Binds floor calls to elevators and retries the ones nobody could take.
 *
 * # Fields
 * - `pending_calls`:       Calls waiting for an elevator, at most one per (floor, direction).
 * - `defer_misaligned`:    Park a call rather than hand it to a busy car heading the other way.
 */
pub struct Scheduler {
    pending_calls: Vec<PendingCall>,
    defer_misaligned: bool,
}

impl Scheduler {
    pub fn new(dispatch: &DispatchConfig) -> Scheduler {
        Scheduler {
            pending_calls: Vec::new(),
            defer_misaligned: dispatch.defer_misaligned_calls,
        }
    }

    pub fn pending_calls(&self) -> &[PendingCall] {
        &self.pending_calls
    }

    /// Reacts to one building event. Called for every event before anyone else sees it.
    pub fn handle_event(&mut self, building: &mut Building, event: &Event) {
        match event {
            Event::ElevatorCalled { floor, direction } => {
                self.schedule_elevator(building, *floor, *direction);
            }
            Event::ElevatorFloorChanged { new_floor, .. } => {
                self.handle_floor_change(building, *new_floor);
            }
            Event::ElevatorDoorsClosed { .. }
            | Event::ElevatorStateChanged {
                new_state: ElevatorStatus::Idle,
                ..
            } => {
                self.check_pending_calls(building);
            }
            _ => (),
        }
    }

    pub fn schedule_elevator(&mut self, building: &mut Building, floor: u8, direction: Direction) {
        let call = PendingCall { floor, direction };
        if self.pending_calls.contains(&call) {
            debug!("Call {} {} already pending", floor, direction);
            return;
        }

        let id = match building.find_closest_elevator(floor, direction) {
            Some(id) => id,
            None => {
                self.park(call);
                return;
            }
        };

        if self.defer_misaligned {
            if let Ok(elevator) = building.elevator(&id) {
                if !elevator.is_idle() && !Building::is_aligned(elevator, direction) {
                    info!(
                        "Elevator {} busy heading {}, deferring call {} {}",
                        id,
                        elevator.direction(),
                        floor,
                        direction
                    );
                    self.park(call);
                    return;
                }
            }
        }

        if !Scheduler::assign(building, &id, call) {
            self.park(call);
        }
    }

    /**
     * Retries every pending call against the current building state.
     *
     * Only idle elevators are considered, so calling this twice in a row
     * without anything changing in between assigns nothing the second time.
     * Returns the number of calls that found an elevator.
     */
    pub fn check_pending_calls(&mut self, building: &mut Building) -> usize {
        if self.pending_calls.is_empty() {
            return 0;
        }

        let mut still_pending = Vec::new();
        let mut assigned = 0;
        for call in std::mem::take(&mut self.pending_calls) {
            let idle_choice = building
                .find_closest_elevator(call.floor, call.direction)
                .filter(|id| building.elevator(id).map_or(false, |e| e.is_idle()));

            match idle_choice {
                Some(id) if Scheduler::assign(building, &id, call) => assigned += 1,
                _ => still_pending.push(call),
            }
        }
        self.pending_calls = still_pending;

        if assigned > 0 {
            info!(
                "{} pending calls assigned, {} still waiting",
                assigned,
                self.pending_calls.len()
            );
        }
        assigned
    }

    /// A car reaching a floor serves whatever was waiting there.
    pub fn handle_floor_change(&mut self, building: &mut Building, floor: u8) {
        let before = self.pending_calls.len();
        self.pending_calls.retain(|call| call.floor != floor);
        if self.pending_calls.len() != before {
            building.clear_floor_buttons(floor);
            debug!("Pending calls at floor {} served on arrival", floor);
        }
    }

    /**
     * Hands a call to one elevator. Returns false when the elevator refused it.
     *
     * An elevator already standing at the floor with closed doors just opens
     * them. A duplicate destination counts as served.
     */
    pub fn assign(building: &mut Building, id: &str, call: PendingCall) -> bool {
        let elevator = match building.elevator_mut(id) {
            Ok(elevator) => elevator,
            Err(e) => {
                warn!("{}", e);
                return false;
            }
        };

        let standing = !elevator.is_moving() && elevator.mode() != OperationalMode::Maintenance;
        if elevator.current_floor() == call.floor && standing {
            if elevator.doors_open() || elevator.motion() == MotionState::DoorOpening {
                building.clear_call_button(call.floor, call.direction);
                return true;
            }
            return match elevator.open_doors() {
                Ok(()) => {
                    info!("Elevator {} opening doors at floor {}", id, call.floor);
                    building.clear_call_button(call.floor, call.direction);
                    true
                }
                Err(e) => {
                    warn!("{}", e);
                    false
                }
            };
        }

        match elevator.add_destination(call.floor) {
            Ok(()) | Err(ElevatorError::DuplicateDestination { .. }) => (),
            Err(e) => {
                warn!("{}", e);
                return false;
            }
        }

        info!(
            "Call {} {} assigned to elevator {}",
            call.floor, call.direction, id
        );

        let here = elevator.current_floor() == call.floor;
        if elevator.is_idle() {
            if let Err(e) = elevator.process_next_destination() {
                warn!("{}", e);
            }
        }

        // Doors open here without another floor change to clear the button
        if here {
            building.clear_call_button(call.floor, call.direction);
        }
        true
    }

    pub fn reset(&mut self) {
        self.pending_calls.clear();
    }

    fn park(&mut self, call: PendingCall) {
        info!(
            "No elevator available for floor {} {}, call pending",
            call.floor, call.direction
        );
        self.pending_calls.push(call);
    }
}
