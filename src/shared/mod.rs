pub mod error;
pub mod macros;
pub mod structs;

pub use error::CommandError;
pub use error::ElevatorError;
pub use structs::Direction;
pub use structs::ElevatorId;
pub use structs::ElevatorStatus;
pub use structs::Event;
pub use structs::MotionState;
pub use structs::OperationalMode;
pub use structs::PendingCall;
