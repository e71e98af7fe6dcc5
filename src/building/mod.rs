pub mod building;
pub mod floor;

pub use building::Building;
pub use building::BuildingSnapshot;
pub use floor::Floor;
