use std::collections::HashMap;

use v2v_abstract::message::BsmFields;
use v2v_abstract::{Message, SimConfig, VehicleId};

use crate::protocol::Protocol;

/// Belief about a neighbor, reconstructed from its most recent BSM.
/// Present only while `timestamp` is within `connection_idle_ttl` of now;
/// pruned otherwise at management time.
#[derive(Debug, Clone)]
pub struct PeerState {
    pub timestamp: f64,
    pub position: (f64, f64),
    pub velocity: f64,
    pub acceleration: f64,
    pub heading: f64,
    pub length: f64,
    pub width: f64,
}

/// A simulated vehicle: physics state, its own `Protocol` instance, and a
/// belief-map of neighbor states.
pub struct Vehicle {
    pub id: VehicleId,
    pub position: (f64, f64),
    pub velocity: f64,
    pub acceleration: f64,
    /// East-pointing unit heading; this core only models straight-line
    /// motion, no lane changes or steering.
    pub heading: (f64, f64),
    pub length: f64,
    pub width: f64,
    pub target_velocity: f64,
    pub emergency_braking: bool,
    pub last_bsm_time: f64,

    pub protocol: Protocol,
    pub beliefs: HashMap<VehicleId, PeerState>,
}

const EAST: (f64, f64) = (1.0, 0.0);

impl Vehicle {
    pub fn spawn(id: VehicleId, position: (f64, f64), velocity: f64, cfg: &SimConfig) -> Self {
        Self {
            id,
            position,
            velocity,
            acceleration: 0.0,
            heading: EAST,
            length: cfg.vehicle_length,
            width: cfg.vehicle_width,
            target_velocity: velocity,
            emergency_braking: false,
            last_bsm_time: 0.0,
            protocol: Protocol::new(),
            beliefs: HashMap::new(),
        }
    }

    /// Emergency braking overrides cruise control with maximum
    /// deceleration; otherwise a proportional controller chases
    /// `target_velocity`, clamped to the configured acceleration limits.
    /// Velocity never goes negative.
    pub fn update_physics(&mut self, dt: f64, cfg: &SimConfig) {
        self.acceleration = if self.emergency_braking {
            -cfg.max_deceleration
        } else {
            let desired = 2.0 * (self.target_velocity - self.velocity);
            desired.clamp(-cfg.max_deceleration, cfg.max_acceleration)
        };

        self.velocity = (self.velocity + self.acceleration * dt).max(0.0);
        self.position.0 += self.heading.0 * self.velocity * dt;
        self.position.1 += self.heading.1 * self.velocity * dt;
    }

    pub fn should_send_bsm(&self, now: f64, cfg: &SimConfig) -> bool {
        now - self.last_bsm_time >= cfg.bsm_interval
    }

    pub fn generate_bsm(&mut self, now: f64) -> Message {
        self.last_bsm_time = now;
        Message::Bsm(BsmFields {
            sender_id: self.id.clone(),
            timestamp: now,
            position: self.position,
            velocity: self.velocity,
            heading: self.heading.1.atan2(self.heading.0),
            acceleration: self.acceleration,
            length: self.length,
            width: self.width,
        })
    }

    /// Overwrites the belief-map entry for the sender with a fresh snapshot.
    pub fn on_received_bsm(&mut self, bsm: &BsmFields) {
        self.beliefs.insert(
            bsm.sender_id.clone(),
            PeerState {
                timestamp: bsm.timestamp,
                position: bsm.position,
                velocity: bsm.velocity,
                acceleration: bsm.acceleration,
                heading: bsm.heading,
                length: bsm.length,
                width: bsm.width,
            },
        );
    }

    /// Puts the vehicle into emergency braking: hard deceleration, target
    /// velocity dropped to zero.
    pub fn engage_emergency_braking(&mut self) {
        self.emergency_braking = true;
        self.target_velocity = 0.0;
    }

    /// Prunes belief-map entries older than `connection_idle_ttl`.
    pub fn prune_beliefs(&mut self, now: f64, cfg: &SimConfig) {
        self.beliefs
            .retain(|_, peer| now - peer.timestamp <= cfg.connection_idle_ttl);
    }
}
