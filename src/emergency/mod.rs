pub mod emergency_handler;

pub use emergency_handler::EmergencyHandler;
