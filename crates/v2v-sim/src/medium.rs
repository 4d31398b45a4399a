use std::collections::HashMap;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace};
use v2v_abstract::{Digest, Message, SimConfig, VehicleId};

use crate::vehicle::Vehicle;

struct PendingFrame {
    sender: VehicleId,
    message: Message,
}

/// Range-gated broadcast medium with uniform random packet loss. One tick
/// of buffering separates `enqueue` from `deliver`, matching the engine's
/// physics-then-delivery tick ordering.
pub struct Medium {
    pending: HashMap<Digest, PendingFrame>,
    rng: StdRng,
    loss_probability: f64,
    communication_range: f64,

    pub total_packets: u64,
    pub lost_packets: u64,
    pub total_latency: f64,
}

impl Medium {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            pending: HashMap::new(),
            rng: StdRng::seed_from_u64(config.seed),
            loss_probability: config.packet_loss_probability,
            communication_range: config.communication_range,
            total_packets: 0,
            lost_packets: 0,
            total_latency: 0.0,
        }
    }

    /// Accepts an outbound frame. With probability `loss_probability` the
    /// frame is dropped silently (counted, never surfaced); otherwise it is
    /// buffered under its digest until the next `deliver`.
    pub fn enqueue(&mut self, sender: VehicleId, message: Message, digest: Digest) {
        self.total_packets += 1;

        if self.rng.random::<f64>() < self.loss_probability {
            self.lost_packets += 1;
            trace!(sender = %sender, "packet lost in channel");
            return;
        }

        self.pending.insert(digest, PendingFrame { sender, message });
    }

    /// Delivers every buffered frame to each in-range receiver other than
    /// the sender, using the sender's *current* position (`vehicles` are
    /// expected to already be physics-stepped for this tick). Drains
    /// `pending` completely.
    ///
    /// Returns `(receiver_id, message, digest)` triples for the engine to
    /// route into each receiver's `Protocol::receive`.
    pub fn deliver(&mut self, now: f64, vehicles: &[Vehicle]) -> Vec<(VehicleId, Message, Digest)> {
        let mut out = Vec::new();

        for (digest, frame) in self.pending.drain() {
            self.total_latency += now - frame.message.timestamp();

            let Some(sender_vehicle) = vehicles.iter().find(|v| v.id == frame.sender) else {
                continue;
            };

            for vehicle in vehicles {
                if vehicle.id == frame.sender {
                    continue;
                }
                if !in_range(sender_vehicle, vehicle, self.communication_range) {
                    continue;
                }
                out.push((vehicle.id.clone(), frame.message.clone(), digest));
            }
        }

        debug!(delivered = out.len(), now, "medium delivery complete");
        out
    }

    pub fn packet_loss(&self) -> f64 {
        if self.total_packets == 0 {
            0.0
        } else {
            self.lost_packets as f64 / self.total_packets as f64
        }
    }

    pub fn average_latency(&self) -> f64 {
        if self.total_packets == 0 {
            0.0
        } else {
            self.total_latency / self.total_packets as f64
        }
    }
}

fn in_range(source: &Vehicle, dest: &Vehicle, communication_range: f64) -> bool {
    let dx = dest.position.0 - source.position.0;
    let dy = dest.position.1 - source.position.1;
    (dx * dx + dy * dy).sqrt() <= communication_range
}
