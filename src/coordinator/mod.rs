pub mod command;
pub mod coordinator;
mod coordinator_tests;
pub mod timers;

pub use command::Command;
pub use coordinator::Coordinator;
