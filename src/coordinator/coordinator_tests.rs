/*
 * Unit tests for coordinator module
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 *
 * The virtual clock is driven with `advance`, nothing in here sleeps.
 *
 * Tests:
 *  - test_coordinator_init
 *  - test_coordinator_call_full_cycle
 *  - test_coordinator_subscriber_event_order
 *  - test_coordinator_drops_disconnected_subscriber
 *  - test_coordinator_pending_call_served_when_emergency_ends
 *  - test_coordinator_go_command_guards
 *  - test_coordinator_door_commands
 *  - test_coordinator_emergency_lets_door_cycle_finish
 *  - test_coordinator_overload_holds_doors
 *  - test_coordinator_recall_while_overloaded
 *  - test_coordinator_emergency_after_overload_keeps_serving
 *  - test_coordinator_maintenance_after_overload_closes_doors
 *  - test_coordinator_call_while_arriving_clears_button
 *  - test_coordinator_recall
 *  - test_coordinator_outage_and_restore
 *  - test_coordinator_set_timing
 *  - test_coordinator_reset
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod coordinator_tests {
    use crate::config::Config;
    use crate::coordinator::command::{Command, Switch, TimingKey};
    use crate::coordinator::timers::TimerKind;
    use crate::coordinator::Coordinator;
    use crate::shared::Direction::{self, Down, Stop, Up};
    use crate::shared::ElevatorStatus::{
        DoorClosing, DoorOpening, Emergency, Idle, Loading, Maintenance, MovingDown, MovingUp,
        Overloaded, Stopped,
    };
    use crate::shared::{ElevatorError, ElevatorStatus, Event, PendingCall};
    use crossbeam_channel::{unbounded, Receiver, Sender};

    fn setup_coordinator() -> (Coordinator, Sender<Command>) {
        // Arrange mock channel
        let (command_tx, command_rx) = unbounded::<Command>();

        // Default configuration: floors 0-6, A at 0, B at 6
        (Coordinator::new(Config::default(), command_rx), command_tx)
    }

    fn status(coordinator: &Coordinator, id: &str) -> ElevatorStatus {
        coordinator.building().elevator(id).unwrap().status()
    }

    fn floor(coordinator: &Coordinator, id: &str) -> u8 {
        coordinator.building().elevator(id).unwrap().current_floor()
    }

    fn drain(event_rx: &Receiver<Event>) -> Vec<Event> {
        event_rx.try_iter().collect()
    }

    fn call(coordinator: &mut Coordinator, floor: u8, direction: Direction) {
        coordinator
            .handle_command(Command::Call { floor, direction })
            .unwrap();
    }

    #[test]
    fn test_coordinator_init() {
        // Arrange
        let (coordinator, _command_tx) = setup_coordinator();

        // Assert
        assert_eq!(coordinator.now(), 0);
        assert_eq!(status(&coordinator, "A"), Idle);
        assert_eq!(status(&coordinator, "B"), Idle);
        assert_eq!(floor(&coordinator, "A"), 0);
        assert_eq!(floor(&coordinator, "B"), 6);
        assert!(coordinator.scheduler().pending_calls().is_empty());
        assert!(coordinator.timers().is_empty());
    }

    #[test]
    fn test_coordinator_call_full_cycle() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();

        // Act: equidistant from A and B, the lower car wins
        call(&mut coordinator, 3, Up);

        // Assert
        assert_eq!(status(&coordinator, "A"), MovingUp);
        assert_eq!(floor(&coordinator, "A"), 3);
        assert_eq!(status(&coordinator, "B"), Idle);
        assert!(!coordinator.building().floor(3).unwrap().is_button_pressed(Up));
        assert_eq!(coordinator.building().floor(3).unwrap().indicator("A"), Up);

        coordinator.advance(199);
        assert_eq!(status(&coordinator, "A"), MovingUp);
        coordinator.advance(1);
        assert_eq!(status(&coordinator, "A"), DoorOpening);

        coordinator.advance(700);
        assert_eq!(status(&coordinator, "A"), Loading);
        assert!(coordinator.building().elevator("A").unwrap().doors_open());

        coordinator.advance(3000);
        assert_eq!(status(&coordinator, "A"), DoorClosing);

        coordinator.advance(700);
        assert_eq!(status(&coordinator, "A"), Idle);
        assert!(!coordinator.building().elevator("A").unwrap().doors_open());
        assert_eq!(coordinator.building().floor(3).unwrap().indicator("A"), Stop);
        assert!(coordinator.timers().is_empty());
    }

    #[test]
    fn test_coordinator_subscriber_event_order() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        let event_rx = coordinator.subscribe();

        // Act
        call(&mut coordinator, 2, Up);

        // Assert
        let a = "A".to_string();
        assert_eq!(
            drain(&event_rx),
            vec![
                Event::ElevatorCalled {
                    floor: 2,
                    direction: Up
                },
                Event::DestinationAdded {
                    elevator: a.clone(),
                    floor: 2
                },
                Event::ElevatorStateChanged {
                    elevator: a.clone(),
                    old_state: Idle,
                    new_state: MovingUp,
                    floor: 0
                },
                Event::ElevatorFloorChanged {
                    elevator: a.clone(),
                    old_floor: 0,
                    new_floor: 2,
                    direction: Up
                },
                Event::ElevatorArrived {
                    elevator: a.clone(),
                    floor: 2
                },
            ]
        );

        coordinator.advance(900);
        assert_eq!(
            drain(&event_rx),
            vec![
                Event::ElevatorStateChanged {
                    elevator: a.clone(),
                    old_state: MovingUp,
                    new_state: DoorOpening,
                    floor: 2
                },
                Event::ElevatorDoorsOpening {
                    elevator: a.clone(),
                    floor: 2
                },
                Event::ElevatorStateChanged {
                    elevator: a.clone(),
                    old_state: DoorOpening,
                    new_state: Loading,
                    floor: 2
                },
                Event::ElevatorDoorsOpened {
                    elevator: a,
                    floor: 2
                },
            ]
        );
    }

    #[test]
    fn test_coordinator_drops_disconnected_subscriber() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        let dropped_rx = coordinator.subscribe();
        let event_rx = coordinator.subscribe();
        drop(dropped_rx);

        // Act
        call(&mut coordinator, 4, Down);

        // Assert
        assert_eq!(status(&coordinator, "B"), MovingDown);
        assert_eq!(
            drain(&event_rx).first(),
            Some(&Event::ElevatorCalled {
                floor: 4,
                direction: Down
            })
        );
    }

    #[test]
    fn test_coordinator_pending_call_served_when_emergency_ends() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        for id in ["A", "B"] {
            coordinator
                .handle_command(Command::Emergency {
                    elevator: id.to_string(),
                    switch: Switch::On,
                })
                .unwrap();
        }

        // Act
        call(&mut coordinator, 4, Up);

        // Assert
        assert_eq!(
            coordinator.scheduler().pending_calls(),
            &[PendingCall {
                floor: 4,
                direction: Up
            }]
        );
        assert!(coordinator.building().floor(4).unwrap().is_button_pressed(Up));

        coordinator
            .handle_command(Command::Emergency {
                elevator: "B".to_string(),
                switch: Switch::Toggle,
            })
            .unwrap();
        assert!(coordinator.scheduler().pending_calls().is_empty());
        assert_eq!(status(&coordinator, "B"), MovingDown);
        assert_eq!(floor(&coordinator, "B"), 4);
        assert_eq!(status(&coordinator, "A"), Emergency);
    }

    #[test]
    fn test_coordinator_go_command_guards() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();

        // Act
        let moved = coordinator.handle_command(Command::Go {
            elevator: "A".to_string(),
            floor: 5,
        });
        let unknown = coordinator.handle_command(Command::Go {
            elevator: "Q".to_string(),
            floor: 5,
        });
        coordinator
            .handle_command(Command::Emergency {
                elevator: "B".to_string(),
                switch: Switch::Toggle,
            })
            .unwrap();
        let in_emergency = coordinator.handle_command(Command::Go {
            elevator: "B".to_string(),
            floor: 1,
        });

        // Assert
        assert!(moved.is_ok());
        assert_eq!(floor(&coordinator, "A"), 5);
        assert_eq!(unknown, Err(ElevatorError::UnknownElevator("Q".to_string())));
        assert!(matches!(
            in_emergency,
            Err(ElevatorError::NotAllowed {
                status: Emergency,
                ..
            })
        ));
        assert_eq!(floor(&coordinator, "B"), 6);
    }

    #[test]
    fn test_coordinator_door_commands() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();

        // Act & Assert
        assert!(coordinator.handle_command(Command::Close("A".to_string())).is_err());
        assert!(coordinator.handle_command(Command::Open("A".to_string())).is_ok());
        coordinator.advance(700);
        assert_eq!(status(&coordinator, "A"), Loading);

        // Closing early skips the rest of the hold time
        assert!(coordinator.handle_command(Command::Close("A".to_string())).is_ok());
        coordinator.advance(700);
        assert_eq!(status(&coordinator, "A"), Idle);
        assert!(coordinator.timers().is_empty());

        // No door control while moving
        call(&mut coordinator, 4, Down);
        assert_eq!(status(&coordinator, "B"), MovingDown);
        assert!(coordinator.handle_command(Command::Open("B".to_string())).is_err());
    }

    #[test]
    fn test_coordinator_emergency_lets_door_cycle_finish() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        coordinator.handle_command(Command::Open("A".to_string())).unwrap();
        coordinator.advance(700);

        // Act
        coordinator
            .handle_command(Command::Emergency {
                elevator: "A".to_string(),
                switch: Switch::On,
            })
            .unwrap();
        coordinator.advance(3700);

        // Assert
        let a = coordinator.building().elevator("A").unwrap();
        assert_eq!(a.status(), Emergency);
        assert!(!a.doors_open());

        coordinator
            .handle_command(Command::Emergency {
                elevator: "A".to_string(),
                switch: Switch::Off,
            })
            .unwrap();
        assert_eq!(status(&coordinator, "A"), Idle);
    }

    #[test]
    fn test_coordinator_overload_holds_doors() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        coordinator.handle_command(Command::Open("A".to_string())).unwrap();
        coordinator.advance(700);

        // Act
        coordinator
            .handle_command(Command::Overload {
                elevator: "A".to_string(),
                active: true,
            })
            .unwrap();
        coordinator.advance(10_000);

        // Assert
        assert_eq!(status(&coordinator, "A"), Overloaded);
        assert!(coordinator.building().elevator("A").unwrap().doors_open());
        assert!(coordinator.handle_command(Command::Close("A".to_string())).is_err());

        coordinator
            .handle_command(Command::Overload {
                elevator: "A".to_string(),
                active: false,
            })
            .unwrap();
        assert_eq!(status(&coordinator, "A"), Loading);
        coordinator.advance(3000);
        assert_eq!(status(&coordinator, "A"), DoorClosing);
    }

    fn overload(coordinator: &mut Coordinator, id: &str) {
        coordinator.handle_command(Command::Open(id.to_string())).unwrap();
        coordinator.advance(700);
        coordinator
            .handle_command(Command::Overload {
                elevator: id.to_string(),
                active: true,
            })
            .unwrap();
    }

    fn switch_emergency(coordinator: &mut Coordinator, id: &str, switch: Switch) {
        coordinator
            .handle_command(Command::Emergency {
                elevator: id.to_string(),
                switch,
            })
            .unwrap();
    }

    #[test]
    fn test_coordinator_recall_while_overloaded() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        overload(&mut coordinator, "B");
        assert_eq!(coordinator.timers().deadline("B", TimerKind::DoorHold), None);

        // Act
        coordinator.handle_command(Command::Recall).unwrap();

        // Assert
        assert_eq!(status(&coordinator, "B"), Loading);
        assert_eq!(
            coordinator.timers().deadline("B", TimerKind::DoorHold),
            Some(3700)
        );

        coordinator.advance(60_000);
        assert_eq!(floor(&coordinator, "B"), 0);
        assert_eq!(status(&coordinator, "B"), Idle);
        assert!(coordinator.building().elevator("B").unwrap().destinations().is_empty());
        assert!(coordinator.timers().is_empty());
    }

    #[test]
    fn test_coordinator_emergency_after_overload_keeps_serving() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        overload(&mut coordinator, "B");

        // Act
        switch_emergency(&mut coordinator, "B", Switch::On);
        switch_emergency(&mut coordinator, "B", Switch::Off);
        switch_emergency(&mut coordinator, "A", Switch::On);
        call(&mut coordinator, 2, Up);

        // Assert
        assert_eq!(status(&coordinator, "B"), Loading);
        assert_eq!(
            coordinator.building().elevator("B").unwrap().destinations(),
            &[2]
        );

        coordinator.advance(60_000);
        assert_eq!(floor(&coordinator, "B"), 2);
        assert_eq!(status(&coordinator, "B"), Idle);
        assert!(coordinator.scheduler().pending_calls().is_empty());
        assert!(!coordinator.building().floor(2).unwrap().is_button_pressed(Up));
    }

    #[test]
    fn test_coordinator_maintenance_after_overload_closes_doors() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        overload(&mut coordinator, "A");

        // Act
        coordinator
            .handle_command(Command::Maintenance {
                elevator: "A".to_string(),
                switch: Switch::On,
            })
            .unwrap();
        coordinator.advance(3700);

        // Assert: the door cycle finishes under maintenance
        let a = coordinator.building().elevator("A").unwrap();
        assert_eq!(a.status(), Maintenance);
        assert!(!a.doors_open());

        coordinator
            .handle_command(Command::Maintenance {
                elevator: "A".to_string(),
                switch: Switch::Off,
            })
            .unwrap();
        assert_eq!(status(&coordinator, "A"), Idle);
        call(&mut coordinator, 1, Up);
        coordinator.advance(60_000);
        assert_eq!(floor(&coordinator, "A"), 1);
        assert_eq!(status(&coordinator, "A"), Idle);
    }

    #[test]
    fn test_coordinator_call_while_arriving_clears_button() {
        // Arrange: A reaches 3 but its arrival delay is still running
        let (mut coordinator, _command_tx) = setup_coordinator();
        call(&mut coordinator, 3, Up);
        coordinator.advance(100);
        assert_eq!(status(&coordinator, "A"), MovingUp);

        // Act
        call(&mut coordinator, 3, Up);

        // Assert
        assert_eq!(status(&coordinator, "A"), DoorOpening);
        assert!(!coordinator.building().floor(3).unwrap().is_button_pressed(Up));

        coordinator.advance(60_000);
        assert_eq!(floor(&coordinator, "A"), 3);
        assert_eq!(status(&coordinator, "A"), Idle);
        assert!(coordinator.scheduler().pending_calls().is_empty());
        assert!(!coordinator.building().floor(3).unwrap().is_button_pressed(Up));
    }

    #[test]
    fn test_coordinator_recall() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        coordinator
            .handle_command(Command::Maintenance {
                elevator: "B".to_string(),
                switch: Switch::Toggle,
            })
            .unwrap();

        // Act
        coordinator.handle_command(Command::Recall).unwrap();

        // Assert
        assert_eq!(status(&coordinator, "A"), DoorOpening);
        assert_eq!(status(&coordinator, "B"), MovingDown);
        assert_eq!(floor(&coordinator, "B"), 0);

        coordinator.advance(10_000);
        assert_eq!(status(&coordinator, "A"), Idle);
        assert_eq!(status(&coordinator, "B"), Idle);
        assert_eq!(floor(&coordinator, "A"), 0);
        assert_eq!(floor(&coordinator, "B"), 0);
    }

    #[test]
    fn test_coordinator_outage_and_restore() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        call(&mut coordinator, 3, Up);

        // Act
        coordinator.handle_command(Command::Outage).unwrap();
        coordinator.advance(5000);

        // Assert
        assert!(coordinator.emergency().is_power_out());
        assert_eq!(status(&coordinator, "A"), Stopped);
        assert_eq!(status(&coordinator, "B"), Idle);

        coordinator.handle_command(Command::Restore).unwrap();
        assert!(!coordinator.emergency().is_power_out());
        assert_eq!(status(&coordinator, "A"), DoorOpening);
        coordinator.advance(4400);
        assert_eq!(status(&coordinator, "A"), Idle);
        assert_eq!(floor(&coordinator, "A"), 3);
    }

    #[test]
    fn test_coordinator_set_timing() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();

        // Act
        coordinator
            .handle_command(Command::Set {
                key: TimingKey::DoorOpenTime,
                value: 500,
            })
            .unwrap();
        coordinator.handle_command(Command::Open("A".to_string())).unwrap();
        coordinator.advance(1200);

        // Assert
        assert_eq!(coordinator.config().timing.door_open_time, 500);
        assert_eq!(status(&coordinator, "A"), DoorClosing);
    }

    #[test]
    fn test_coordinator_reset() {
        // Arrange
        let (mut coordinator, _command_tx) = setup_coordinator();
        let initial = coordinator.snapshot().building;
        let event_rx = coordinator.subscribe();
        call(&mut coordinator, 3, Up);
        coordinator.advance(300);
        coordinator
            .handle_command(Command::Emergency {
                elevator: "B".to_string(),
                switch: Switch::On,
            })
            .unwrap();
        call(&mut coordinator, 5, Down);
        drain(&event_rx);

        // Act
        coordinator.handle_command(Command::Reset).unwrap();

        // Assert
        assert_eq!(drain(&event_rx), vec![Event::BuildingReset]);
        assert_eq!(coordinator.snapshot().building, initial);
        assert!(coordinator.scheduler().pending_calls().is_empty());
        assert!(coordinator.timers().is_empty());
        assert!(coordinator.status_json().unwrap().contains("\"IDLE\""));
    }
}
