/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{info, warn};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::Building;
use crate::shared::{ElevatorError, ElevatorId};

/// Floor every car is sent to on a building-wide recall.
pub const RECALL_FLOOR: u8 = 0;

/**
 * Emergency and maintenance switches, building recall and power outage.
 *
 * # Fields
 * - `power_out`:   True between `power_outage` and `restore_power`.
 */
#[derive(Debug, Default)]
pub struct EmergencyHandler {
    power_out: bool,
}

impl EmergencyHandler {
    pub fn new() -> EmergencyHandler {
        EmergencyHandler { power_out: false }
    }

    pub fn is_power_out(&self) -> bool {
        self.power_out
    }

    /***************************************/
    /*            Emergency                */
    /***************************************/
    /// Emergency button. Pressing it again cancels the emergency.
    pub fn trigger_emergency(&mut self, building: &mut Building, id: &str) -> Result<(), ElevatorError> {
        if building.elevator(id)?.is_in_emergency() {
            return self.cancel_emergency(building, id);
        }
        self.set_emergency(building, id, true)
    }

    pub fn cancel_emergency(&mut self, building: &mut Building, id: &str) -> Result<(), ElevatorError> {
        self.set_emergency(building, id, false)
    }

    pub fn set_emergency(
        &mut self,
        building: &mut Building,
        id: &str,
        active: bool,
    ) -> Result<(), ElevatorError> {
        building.elevator_mut(id)?.set_emergency(active)?;
        if active {
            warn!("Emergency triggered for elevator {}", id);
        } else {
            info!("Emergency canceled for elevator {}", id);
        }
        Ok(())
    }

    /***************************************/
    /*           Maintenance               */
    /***************************************/
    pub fn trigger_maintenance(&mut self, building: &mut Building, id: &str) -> Result<(), ElevatorError> {
        if building.elevator(id)?.is_in_maintenance() {
            return self.cancel_maintenance(building, id);
        }
        self.set_maintenance(building, id, true)
    }

    pub fn cancel_maintenance(&mut self, building: &mut Building, id: &str) -> Result<(), ElevatorError> {
        self.set_maintenance(building, id, false)
    }

    pub fn set_maintenance(
        &mut self,
        building: &mut Building,
        id: &str,
        active: bool,
    ) -> Result<(), ElevatorError> {
        building.elevator_mut(id)?.set_maintenance(active)?;
        if active {
            warn!("Maintenance mode enabled for elevator {}", id);
        } else {
            info!("Maintenance mode disabled for elevator {}", id);
        }
        Ok(())
    }

    /***************************************/
    /*          Building-wide              */
    /***************************************/
    /**
     * Sends every car to the ground floor.
     *
     * Interrupt modes and queued destinations are dropped first. Cars that
     * are idle leave straight away, the others pick the recall floor up once
     * their current door cycle or hop is done.
     */
    pub fn emergency_recall(&mut self, building: &mut Building) {
        warn!("Emergency recall to floor {}", RECALL_FLOOR);

        for id in building.elevator_ids() {
            let elevator = match building.elevator_mut(&id) {
                Ok(elevator) => elevator,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            elevator.clear_interrupts();
            if let Err(e) = elevator.add_destination(RECALL_FLOOR) {
                warn!("Recall of elevator {} failed: {}", id, e);
                continue;
            }
            if elevator.is_idle() {
                if let Err(e) = elevator.process_next_destination() {
                    warn!("Recall of elevator {} failed: {}", id, e);
                }
            }
        }
    }

    /// Freezes every moving car where it is. Returns the ids of the stopped cars.
    pub fn power_outage(&mut self, building: &mut Building) -> Vec<ElevatorId> {
        self.power_out = true;
        warn!("Power outage");

        let mut stopped = Vec::new();
        for id in building.elevator_ids() {
            if let Ok(elevator) = building.elevator_mut(&id) {
                if elevator.is_moving() && elevator.force_stop().is_ok() {
                    stopped.push(id);
                }
            }
        }
        stopped
    }

    /// Releases stopped cars and lets them continue with the queue they kept.
    pub fn restore_power(&mut self, building: &mut Building) -> Vec<ElevatorId> {
        if !self.power_out {
            info!("Power is not out, nothing to restore");
        }
        self.power_out = false;

        let mut resumed = Vec::new();
        for id in building.elevator_ids() {
            let elevator = match building.elevator_mut(&id) {
                Ok(elevator) if elevator.is_stopped() => elevator,
                _ => continue,
            };
            if let Err(e) = elevator.clear_stop() {
                warn!("{}", e);
                continue;
            }
            if let Err(e) = elevator.process_next_destination() {
                warn!("Elevator {} could not resume: {}", id, e);
            }
            resumed.push(id);
        }

        info!("Power restored, {} elevators resumed", resumed.len());
        resumed
    }

    /// Drops every emergency and maintenance mode and the outage flag.
    pub fn reset(&mut self, building: &mut Building) {
        self.power_out = false;
        for id in building.elevator_ids() {
            if let Ok(elevator) = building.elevator_mut(&id) {
                let result = if elevator.is_in_emergency() {
                    elevator.set_emergency(false)
                } else if elevator.is_in_maintenance() {
                    elevator.set_maintenance(false)
                } else {
                    Ok(())
                };
                if let Err(e) = result {
                    warn!("Elevator {} kept its mode on reset: {}", id, e);
                }
            }
        }
        info!("All emergency states reset");
    }
}
