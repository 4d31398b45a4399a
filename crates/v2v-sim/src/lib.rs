pub mod collision;
pub mod engine;
pub mod medium;
pub mod protocol;
pub mod trace;
pub mod vehicle;
pub mod vehicle_manager;

pub use engine::SimulationEngine;
pub use medium::Medium;
pub use protocol::{CwmConnection, Protocol};
pub use trace::Statistics;
pub use vehicle::{PeerState, Vehicle};
pub use vehicle_manager::VehicleManager;
