pub mod config;
pub mod digest;
pub mod message;
pub mod scenario;
pub mod vehicle_id;

pub use config::{ConfigError, SimConfig};
pub use digest::Digest;
pub use message::{AckFields, BsmFields, CwmFields, Message, Priority};
pub use scenario::{ScenarioAssertion, ScenarioSpawn, SimConfigOverride, TestScenario};
pub use vehicle_id::VehicleId;
