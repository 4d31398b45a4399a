//! Declarative TOML scenario fixtures for integration tests. This is test
//! tooling, not part of the simulation core's runtime API — the core never
//! reads a scenario file itself.

use serde::Deserialize;

/// A named, declarative test fixture: spawn list, config overrides, and the
/// assertions the test harness checks against the finished run's
/// `Statistics`/belief-maps.
#[derive(Debug, Clone, Deserialize)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub config: SimConfigOverride,
    pub duration_seconds: f64,
    pub spawns: Vec<ScenarioSpawn>,
    #[serde(default)]
    pub assertions: Vec<ScenarioAssertion>,
}

/// A single spawned vehicle's initial state.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSpawn {
    pub position: (f64, f64),
    pub velocity: f64,
}

/// Sparse override of `SimConfig`'s defaults; only fields present in the
/// TOML fixture are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimConfigOverride {
    pub communication_range: Option<f64>,
    pub bsm_interval: Option<f64>,
    pub cwm_max_delay: Option<f64>,
    pub retransmit_timeout: Option<f64>,
    pub connection_idle_ttl: Option<f64>,
    pub packet_loss_probability: Option<f64>,
    pub collision_time_threshold: Option<f64>,
    pub max_acceleration: Option<f64>,
    pub max_deceleration: Option<f64>,
    pub simulation_timestep: Option<f64>,
    pub vehicle_length: Option<f64>,
    pub vehicle_width: Option<f64>,
    pub seed: Option<u64>,
}

impl SimConfigOverride {
    pub fn apply_to(&self, config: &mut crate::config::SimConfig) {
        if let Some(v) = self.communication_range {
            config.communication_range = v;
        }
        if let Some(v) = self.bsm_interval {
            config.bsm_interval = v;
        }
        if let Some(v) = self.cwm_max_delay {
            config.cwm_max_delay = v;
        }
        if let Some(v) = self.retransmit_timeout {
            config.retransmit_timeout = v;
        }
        if let Some(v) = self.connection_idle_ttl {
            config.connection_idle_ttl = v;
        }
        if let Some(v) = self.packet_loss_probability {
            config.packet_loss_probability = v;
        }
        if let Some(v) = self.collision_time_threshold {
            config.collision_time_threshold = v;
        }
        if let Some(v) = self.max_acceleration {
            config.max_acceleration = v;
        }
        if let Some(v) = self.max_deceleration {
            config.max_deceleration = v;
        }
        if let Some(v) = self.simulation_timestep {
            config.simulation_timestep = v;
        }
        if let Some(v) = self.vehicle_length {
            config.vehicle_length = v;
        }
        if let Some(v) = self.vehicle_width {
            config.vehicle_width = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
    }
}

/// An assertion checked against the finished run by the test harness in
/// `v2v-sim/tests/scenarios.rs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioAssertion {
    /// Total BSMs sent falls within `[min, max]` (max unbounded if absent).
    BsmCount { min: u64, max: Option<u64> },
    /// Total CWMs sent falls within `[min, max]`.
    CwmCount { min: u64, max: Option<u64> },
    /// `statistics.packet_loss` is within `epsilon` of `value`.
    PacketLoss { value: f64, epsilon: f64 },
    /// The vehicle at `spawn_index` has an empty belief-map at run's end.
    BeliefMapEmpty { spawn_index: usize },
}
