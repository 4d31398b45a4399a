use v2v_abstract::message::CwmFields;
use v2v_abstract::{Message, SimConfig};

use crate::vehicle::Vehicle;

/// Smallest strictly positive, finite real root of
/// `gap + relative_velocity * t + 0.5 * relative_acceleration * t^2 = 0`.
/// `None` if no such root exists. Handles the zero-leading-coefficient case
/// (equal accelerations) as the linear reduction it is, rather than feeding
/// a degenerate quadratic formula.
pub fn time_to_collision(gap: f64, relative_velocity: f64, relative_acceleration: f64) -> Option<f64> {
    let smallest_positive_finite = |roots: [f64; 2]| -> Option<f64> {
        roots
            .into_iter()
            .filter(|t| *t > 0.0 && t.is_finite())
            .fold(None, |acc, t| match acc {
                Some(best) if best <= t => Some(best),
                _ => Some(t),
            })
    };

    if relative_acceleration.abs() < f64::EPSILON {
        if relative_velocity.abs() < f64::EPSILON {
            return None;
        }
        let t = -gap / relative_velocity;
        return smallest_positive_finite([t, t]);
    }

    let a = 0.5 * relative_acceleration;
    let b = relative_velocity;
    let c = gap;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let t1 = (-b + sqrt_d) / (2.0 * a);
    let t2 = (-b - sqrt_d) / (2.0 * a);
    smallest_positive_finite([t1, t2])
}

/// Scans belief-map peers sorted by ascending peer-x, keeps only those
/// strictly ahead and laterally overlapping, and returns the first
/// CWM-worthy TTC. Engages emergency braking on `vehicle` as a side effect
/// and stops scanning further peers the moment one is found — this reacts
/// to the first risk, it does not collect every risk.
pub fn detect(vehicle: &mut Vehicle, cfg: &SimConfig) -> Option<Message> {
    let mut peers: Vec<_> = vehicle.beliefs.iter().collect();
    peers.sort_by(|a, b| a.1.position.0.partial_cmp(&b.1.position.0).unwrap());

    for (peer_id, peer) in peers {
        if peer.position.0 <= vehicle.position.0 {
            continue;
        }

        let rear_edge = vehicle.position.1 - vehicle.width / 2.0;
        let front_edge = vehicle.position.1 + vehicle.width / 2.0;
        let peer_rear_edge = peer.position.1 - peer.width / 2.0;
        let peer_front_edge = peer.position.1 + peer.width / 2.0;
        if rear_edge > peer_front_edge || front_edge < peer_rear_edge {
            continue;
        }

        let gap = (peer.position.0 - peer.length / 2.0) - (vehicle.position.0 + vehicle.length / 2.0);
        let relative_velocity = peer.velocity - vehicle.velocity;
        let relative_acceleration = peer.acceleration - vehicle.acceleration;

        let Some(ttc) = time_to_collision(gap, relative_velocity, relative_acceleration) else {
            continue;
        };

        if ttc < cfg.collision_time_threshold {
            let target = peer_id.clone();
            let sequence_number = vehicle.protocol.send_seq_num_for(&target);
            vehicle.engage_emergency_braking();
            return Some(Message::Cwm(CwmFields {
                sender_id: vehicle.id.clone(),
                timestamp: 0.0,
                sequence_number,
                warning_type: "rear_end_risk".to_string(),
                target_vehicle_id: target,
                time_to_collision: ttc,
            }));
        }
    }

    None
}
