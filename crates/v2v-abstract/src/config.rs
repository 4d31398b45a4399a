use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable, simulation-wide constants. Build by struct literal or by
/// overriding [`SimConfig::default`], then call [`SimConfig::validated`],
/// which fails fast on a nonsensical configuration — the core never
/// attempts to run with one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub communication_range: f64,
    pub bsm_interval: f64,
    pub cwm_max_delay: f64,
    pub retransmit_timeout: f64,
    pub connection_idle_ttl: f64,
    pub packet_loss_probability: f64,
    pub collision_time_threshold: f64,
    pub max_acceleration: f64,
    pub max_deceleration: f64,
    pub simulation_timestep: f64,
    pub vehicle_length: f64,
    pub vehicle_width: f64,
    pub seed: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("simulation_timestep must be positive, got {0}")]
    NonPositiveTimestep(String),
    #[error("communication_range must be non-negative, got {0}")]
    NegativeCommunicationRange(String),
    #[error("packet_loss_probability must be within [0.0, 1.0], got {0}")]
    PacketLossOutOfRange(String),
    #[error("max_acceleration must be positive, got {0}")]
    NonPositiveAcceleration(String),
    #[error("max_deceleration must be positive, got {0}")]
    NonPositiveDeceleration(String),
}

impl SimConfig {
    /// Validates `self`, returning the config unchanged on success so
    /// construction fails fast rather than letting a nonsensical value
    /// reach the engine. Call this once, right after building a
    /// `SimConfig` (by struct literal or by overriding `default()`), before
    /// handing it to a `SimulationEngine`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.simulation_timestep <= 0.0 {
            return Err(ConfigError::NonPositiveTimestep(
                self.simulation_timestep.to_string(),
            ));
        }
        if self.communication_range < 0.0 {
            return Err(ConfigError::NegativeCommunicationRange(
                self.communication_range.to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.packet_loss_probability) {
            return Err(ConfigError::PacketLossOutOfRange(
                self.packet_loss_probability.to_string(),
            ));
        }
        if self.max_acceleration <= 0.0 {
            return Err(ConfigError::NonPositiveAcceleration(
                self.max_acceleration.to_string(),
            ));
        }
        if self.max_deceleration <= 0.0 {
            return Err(ConfigError::NonPositiveDeceleration(
                self.max_deceleration.to_string(),
            ));
        }

        Ok(self)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            communication_range: 300.0,
            bsm_interval: 0.1,
            cwm_max_delay: 0.005,
            retransmit_timeout: 0.0005,
            connection_idle_ttl: 0.5,
            packet_loss_probability: 0.05,
            collision_time_threshold: 3.0,
            max_acceleration: 3.0,
            max_deceleration: 8.0,
            simulation_timestep: 0.01,
            vehicle_length: 4.5,
            vehicle_width: 2.0,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validated().is_ok());
    }

    #[test]
    fn rejects_negative_timestep() {
        let mut cfg = SimConfig::default();
        cfg.simulation_timestep = -0.01;
        let err = cfg.validated().unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveTimestep(_)));
    }

    #[test]
    fn rejects_packet_loss_out_of_range() {
        let mut cfg = SimConfig::default();
        cfg.packet_loss_probability = 1.5;
        let err = cfg.validated().unwrap_err();
        assert!(matches!(err, ConfigError::PacketLossOutOfRange(_)));
    }
}
