pub mod elevator;

pub use elevator::Elevator;
pub use elevator::ElevatorSnapshot;
