use std::collections::BTreeMap;

use crate::shared::ElevatorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// Door opening or closing in progress.
    DoorAnimation,
    /// Doors held open while loading.
    DoorHold,
    /// Pause between reaching a destination and opening the doors.
    Arrival,
}

/**
 * Deferred per-elevator tasks on a virtual millisecond clock.
 *
 * There is at most one task per (elevator, kind). Tasks due at the same
 * instant fire in the order they were scheduled.
 *
 * # Fields
 * - `now`:         Current virtual time in milliseconds.
 * - `next_seq`:    Scheduling order, used to break deadline ties.
 * - `timers`:      Deadline and sequence number per (elevator, kind).
 */
#[derive(Debug, Default)]
pub struct Timers {
    now: u64,
    next_seq: u64,
    timers: BTreeMap<(ElevatorId, TimerKind), (u64, u64)>,
}

impl Timers {
    pub fn new() -> Timers {
        Timers::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedules `kind` for `elevator` in `delay` ms, replacing a task of the same kind.
    pub fn schedule(&mut self, elevator: &str, kind: TimerKind, delay: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers
            .insert((elevator.to_string(), kind), (self.now + delay, seq));
    }

    pub fn cancel(&mut self, elevator: &str, kind: TimerKind) -> bool {
        self.timers.remove(&(elevator.to_string(), kind)).is_some()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn deadline(&self, elevator: &str, kind: TimerKind) -> Option<u64> {
        self.timers
            .get(&(elevator.to_string(), kind))
            .map(|&(deadline, _)| deadline)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /**
     * Removes and returns the earliest task due at or before `until`.
     *
     * The clock is moved forward to that task's deadline, so anything it
     * schedules is relative to when it fired.
     */
    pub fn pop_due(&mut self, until: u64) -> Option<(ElevatorId, TimerKind)> {
        let key = self
            .timers
            .iter()
            .filter(|&(_, &(deadline, _))| deadline <= until)
            .min_by_key(|&(_, &(deadline, seq))| (deadline, seq))
            .map(|(key, _)| key.clone())?;

        let (deadline, _) = self.timers.remove(&key)?;
        self.now = self.now.max(deadline);
        Some(key)
    }

    /// Moves the clock forward. The clock never goes back.
    pub fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }
}

#[cfg(test)]
mod timers_tests {
    use super::{TimerKind, Timers};

    #[test]
    fn test_timers_schedule_replaces_same_kind() {
        // Arrange
        let mut timers = Timers::new();
        timers.schedule("A", TimerKind::DoorHold, 3000);

        // Act
        timers.set_now(1000);
        timers.schedule("A", TimerKind::DoorHold, 3000);

        // Assert
        assert_eq!(timers.deadline("A", TimerKind::DoorHold), Some(4000));
        assert_eq!(timers.pop_due(3000), None);
        assert_eq!(
            timers.pop_due(4000),
            Some(("A".to_string(), TimerKind::DoorHold))
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn test_timers_fire_in_deadline_then_schedule_order() {
        // Arrange
        let mut timers = Timers::new();
        timers.schedule("B", TimerKind::Arrival, 200);
        timers.schedule("A", TimerKind::DoorAnimation, 700);
        timers.schedule("A", TimerKind::Arrival, 200);

        // Act
        let fired: Vec<_> = std::iter::from_fn(|| timers.pop_due(1000)).collect();

        // Assert
        assert_eq!(
            fired,
            vec![
                ("B".to_string(), TimerKind::Arrival),
                ("A".to_string(), TimerKind::Arrival),
                ("A".to_string(), TimerKind::DoorAnimation),
            ]
        );
        assert_eq!(timers.now(), 700);
    }

    #[test]
    fn test_timers_cancel() {
        // Arrange
        let mut timers = Timers::new();
        timers.schedule("A", TimerKind::DoorHold, 10);
        timers.schedule("A", TimerKind::Arrival, 10);
        timers.schedule("B", TimerKind::DoorHold, 10);

        // Act
        let cancelled = timers.cancel("A", TimerKind::DoorHold);

        // Assert
        assert!(cancelled);
        assert!(!timers.cancel("A", TimerKind::DoorHold));
        assert_eq!(timers.deadline("A", TimerKind::Arrival), Some(10));
        assert_eq!(timers.deadline("B", TimerKind::DoorHold), Some(10));

        timers.clear();
        assert!(timers.is_empty());
    }
}
