/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::{Building, BuildingSnapshot};
use crate::config::Config;
use crate::coordinator::command::{Command, Switch, TimingKey};
use crate::coordinator::timers::{TimerKind, Timers};
use crate::emergency::EmergencyHandler;
use crate::scheduler::Scheduler;
use crate::shared::{
    ElevatorError, ElevatorId, ElevatorStatus, Event, MotionState, PendingCall,
};

/**
 * Owns the whole simulation and drives it.
 *
 * Commands and timers mutate the building; every event that causes is then
 * handed to the scheduler, to the coordinator's own door and indicator
 * handling, and finally to the subscribers, in the order it was produced.
 *
 * # Fields
 * - `config`:          Live configuration. Timing values are read each time a timer is armed.
 * - `building`:        Floors, elevators and the event stream.
 * - `scheduler`:       Call assignment and pending calls.
 * - `emergency`:       Emergency, maintenance, recall and power outage handling.
 * - `timers`:          Door, loading and arrival delays on the virtual clock.
 * - `held_arrivals`:   Cars stopped by an outage before their doors could open.
 * - `subscribers`:     Outgoing event channels, dropped once disconnected.
 * - `command_rx`:      Operator commands.
 */
pub struct Coordinator {
    config: Config,
    building: Building,
    scheduler: Scheduler,
    emergency: EmergencyHandler,
    timers: Timers,
    held_arrivals: Vec<ElevatorId>,
    subscribers: Vec<cbc::Sender<Event>>,
    command_rx: cbc::Receiver<Command>,
}

/// Everything the `status` command prints.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CoordinatorSnapshot {
    pub time: u64,
    pub power_out: bool,
    pub pending_calls: Vec<PendingCall>,
    pub building: BuildingSnapshot,
}

impl Coordinator {
    pub fn new(config: Config, command_rx: cbc::Receiver<Command>) -> Coordinator {
        Coordinator {
            building: Building::new(&config.building, &config.dispatch),
            scheduler: Scheduler::new(&config.dispatch),
            emergency: EmergencyHandler::new(),
            timers: Timers::new(),
            held_arrivals: Vec::new(),
            subscribers: Vec::new(),
            command_rx,
            config,
        }
    }

    /***************************************/
    /*              Getters                */
    /***************************************/
    #[cfg(test)]
    pub fn building(&self) -> &Building {
        &self.building
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[cfg(test)]
    pub fn emergency(&self) -> &EmergencyHandler {
        &self.emergency
    }

    #[cfg(test)]
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    #[cfg(test)]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    pub fn now(&self) -> u64 {
        self.timers.now()
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            time: self.timers.now(),
            power_out: self.emergency.is_power_out(),
            pending_calls: self.scheduler.pending_calls().to_vec(),
            building: self.building.snapshot(),
        }
    }

    pub fn status_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Registers a new event subscriber. Events are delivered after internal handling.
    pub fn subscribe(&mut self) -> cbc::Receiver<Event> {
        let (event_tx, event_rx) = cbc::unbounded::<Event>();
        self.subscribers.push(event_tx);
        event_rx
    }

    /***************************************/
    /*              Main loop              */
    /***************************************/
    /// Runs until `quit` is received or the command channel closes.
    pub fn run(&mut self) {
        let start = Instant::now();
        let tick = Duration::from_millis(self.config.coordinator.tick_time);
        let command_rx = self.command_rx.clone();

        loop {
            let next = cbc::select! {
                recv(command_rx) -> command => Some(command.unwrap_or(Command::Quit)),
                default(tick) => None,
            };

            self.advance_to(start.elapsed().as_millis() as u64);

            match next {
                Some(Command::Quit) => {
                    info!("Coordinator terminated");
                    return;
                }
                Some(command) => {
                    if let Err(e) = self.handle_command(command) {
                        warn!("{}", e);
                    }
                }
                None => (),
            }
        }
    }

    /***************************************/
    /*              Commands               */
    /***************************************/
    pub fn handle_command(&mut self, command: Command) -> Result<(), ElevatorError> {
        info!("Command: {:?}", command);

        let result = match command {
            Command::Call { floor, direction } => self.building.call_elevator(floor, direction),
            Command::Go { elevator, floor } => self.select_destination(&elevator, floor),
            Command::Open(elevator) => self.open_door(&elevator),
            Command::Close(elevator) => self.close_door(&elevator),
            Command::Emergency { elevator, switch } => match switch {
                Switch::Toggle => self.emergency.trigger_emergency(&mut self.building, &elevator),
                Switch::On => self.emergency.set_emergency(&mut self.building, &elevator, true),
                Switch::Off => self.emergency.cancel_emergency(&mut self.building, &elevator),
            },
            Command::Maintenance { elevator, switch } => match switch {
                Switch::Toggle => self
                    .emergency
                    .trigger_maintenance(&mut self.building, &elevator),
                Switch::On => self
                    .emergency
                    .set_maintenance(&mut self.building, &elevator, true),
                Switch::Off => self
                    .emergency
                    .cancel_maintenance(&mut self.building, &elevator),
            },
            Command::Overload { elevator, active } => self
                .building
                .elevator_mut(&elevator)
                .and_then(|e| e.set_overloaded(active)),
            Command::Recall => {
                self.emergency.emergency_recall(&mut self.building);
                Ok(())
            }
            Command::Outage => {
                self.power_outage();
                Ok(())
            }
            Command::Restore => {
                self.restore_power();
                Ok(())
            }
            Command::Reset => {
                self.reset();
                Ok(())
            }
            Command::Status => {
                match self.status_json() {
                    Ok(status) => info!("Status:\n{}", status),
                    Err(e) => warn!("Could not serialize status: {}", e),
                }
                Ok(())
            }
            Command::Set { key, value } => {
                self.set_timing(key, value);
                Ok(())
            }
            Command::Quit => Ok(()),
        };

        self.pump();
        result
    }

    /// In-car floor button.
    pub fn select_destination(&mut self, id: &str, floor: u8) -> Result<(), ElevatorError> {
        let elevator = self.building.elevator_mut(id)?;
        if elevator.is_in_emergency() || elevator.is_overloaded() {
            return Err(refused(id, "accept destinations", elevator.status()));
        }

        elevator.add_destination(floor)?;
        if elevator.is_idle() {
            elevator.process_next_destination()?;
        }
        Ok(())
    }

    pub fn open_door(&mut self, id: &str) -> Result<(), ElevatorError> {
        let elevator = self.building.elevator_mut(id)?;
        if elevator.is_moving() || elevator.is_in_emergency() {
            return Err(refused(id, "open doors", elevator.status()));
        }
        elevator.open_doors()
    }

    pub fn close_door(&mut self, id: &str) -> Result<(), ElevatorError> {
        let elevator = self.building.elevator_mut(id)?;
        if elevator.is_moving() || elevator.is_in_emergency() {
            return Err(refused(id, "close doors", elevator.status()));
        }
        elevator.close_doors()
    }

    /// Cars stopped right after reaching a destination get their doors opened on restore.
    fn power_outage(&mut self) {
        let stopped = self.emergency.power_outage(&mut self.building);
        for id in stopped {
            if self.timers.cancel(&id, TimerKind::Arrival) {
                self.held_arrivals.push(id);
            }
        }
    }

    fn restore_power(&mut self) {
        for id in std::mem::take(&mut self.held_arrivals) {
            let result = self
                .building
                .elevator_mut(&id)
                .and_then(|e| e.clear_stop().and_then(|_| e.open_doors()));
            if let Err(e) = result {
                warn!("Elevator {} could not finish its arrival: {}", id, e);
            }
        }
        self.emergency.restore_power(&mut self.building);
    }

    pub fn set_timing(&mut self, key: TimingKey, value: u64) {
        let timing = &mut self.config.timing;
        match key {
            TimingKey::DoorOpenTime => timing.door_open_time = value,
            TimingKey::DoorAnimationTime => timing.door_animation_time = value,
            TimingKey::ArrivalDelay => timing.arrival_delay = value,
        }
        info!("Timing {:?} set to {} ms", key, value);
    }

    /// Back to the initial building: every timer, pending call and interrupt is dropped.
    pub fn reset(&mut self) {
        self.timers.clear();
        self.held_arrivals.clear();
        self.scheduler.reset();
        self.emergency.reset(&mut self.building);
        self.building.reset();
        self.pump();
        info!("System reset");
    }

    /***************************************/
    /*               Clock                 */
    /***************************************/
    #[cfg(test)]
    pub fn advance(&mut self, ms: u64) {
        let target = self.timers.now() + ms;
        self.advance_to(target);
    }

    /// Fires every timer due up to `target`, in deadline order, then sets the clock.
    pub fn advance_to(&mut self, target: u64) {
        while let Some((id, kind)) = self.timers.pop_due(target) {
            self.fire(&id, kind);
            self.pump();
        }
        self.timers.set_now(target);
    }

    fn fire(&mut self, id: &str, kind: TimerKind) {
        let elevator = match self.building.elevator_mut(id) {
            Ok(elevator) => elevator,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        debug!("Timer {:?} fired for elevator {}", kind, id);
        let result = match kind {
            TimerKind::DoorAnimation => {
                elevator.finish_door_animation();
                Ok(())
            }
            TimerKind::DoorHold => elevator.close_doors(),
            TimerKind::Arrival => elevator.open_doors(),
        };
        if let Err(e) = result {
            warn!("{}", e);
        }
    }

    /***************************************/
    /*               Events                */
    /***************************************/
    /// Delivers queued building events: scheduler first, then internal handling, then subscribers.
    pub fn pump(&mut self) {
        while let Some(event) = self.building.next_event() {
            self.scheduler.handle_event(&mut self.building, &event);
            self.handle_event(&event);
            self.publish(&event);
        }
    }

    fn handle_event(&mut self, event: &Event) {
        let timing = &self.config.timing;
        match event {
            Event::ElevatorArrived { elevator, .. } => {
                self.timers
                    .schedule(elevator, TimerKind::Arrival, timing.arrival_delay);
            }
            Event::ElevatorDoorsOpening { elevator, .. } => {
                self.timers.cancel(elevator, TimerKind::Arrival);
                self.timers
                    .schedule(elevator, TimerKind::DoorAnimation, timing.door_animation_time);
            }
            Event::ElevatorDoorsOpened { elevator, .. } => {
                self.timers
                    .schedule(elevator, TimerKind::DoorHold, timing.door_open_time);
            }
            Event::ElevatorDoorsClosing { elevator, .. } => {
                self.timers.cancel(elevator, TimerKind::DoorHold);
                self.timers
                    .schedule(elevator, TimerKind::DoorAnimation, timing.door_animation_time);
            }
            Event::OverloadChanged { elevator, active } => {
                if *active {
                    self.timers.cancel(elevator, TimerKind::DoorHold);
                } else {
                    self.timers
                        .schedule(elevator, TimerKind::DoorHold, timing.door_open_time);
                }
            }
            Event::ElevatorFloorChanged {
                elevator,
                new_floor,
                ..
            } => {
                self.building.clear_floor_buttons(*new_floor);
                self.building.update_indicators(elevator);
            }
            Event::ElevatorStateChanged {
                elevator,
                new_state,
                ..
            } => {
                self.rearm_door_hold(elevator);
                match new_state {
                    ElevatorStatus::MovingUp | ElevatorStatus::MovingDown => {
                        self.building.update_indicators(elevator)
                    }
                    ElevatorStatus::Idle => self.building.clear_indicators(elevator),
                    _ => (),
                }
            }
            _ => (),
        }
    }

    /// A car left standing with open doors and no hold timer would never close them again.
    fn rearm_door_hold(&mut self, id: &str) {
        let loading = match self.building.elevator(id) {
            Ok(elevator) => elevator.motion() == MotionState::Loading && !elevator.is_overloaded(),
            Err(_) => false,
        };
        if loading && self.timers.deadline(id, TimerKind::DoorHold).is_none() {
            debug!("Door hold re-armed for elevator {}", id);
            self.timers
                .schedule(id, TimerKind::DoorHold, self.config.timing.door_open_time);
        }
    }

    fn publish(&mut self, event: &Event) {
        self.subscribers.retain(|event_tx| {
            let connected = event_tx.send(event.clone()).is_ok();
            if !connected {
                debug!("Dropping disconnected event subscriber");
            }
            connected
        });
    }
}

fn refused(id: &str, action: &'static str, status: ElevatorStatus) -> ElevatorError {
    ElevatorError::NotAllowed {
        elevator: id.to_string(),
        action,
        status,
    }
}
