use serde::{Deserialize, Serialize};

use crate::vehicle_id::VehicleId;

/// Message priority. Declaration order doubles as the total order the
/// protocol relies on: `Emergency` sorts before `Normal` under the derived
/// `Ord`, so a CWM always outranks a BSM or ACK in both inbound and outbound
/// priority queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Emergency,
    Normal,
}

/// Basic Safety Message fields (periodic broadcast of own kinematic state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BsmFields {
    pub sender_id: VehicleId,
    pub timestamp: f64,
    pub position: (f64, f64),
    pub velocity: f64,
    pub heading: f64,
    pub acceleration: f64,
    pub length: f64,
    pub width: f64,
}

/// Collision Warning Message fields (emergency, reliable, targeted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CwmFields {
    pub sender_id: VehicleId,
    pub timestamp: f64,
    pub sequence_number: u64,
    pub warning_type: String,
    pub target_vehicle_id: VehicleId,
    pub time_to_collision: f64,
}

/// Acknowledgement of a received CWM sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckFields {
    pub sender_id: VehicleId,
    pub timestamp: f64,
    pub sequence_number: u64,
    pub target_vehicle_id: VehicleId,
}

/// Closed tagged union over the three wire-level message variants. Shared
/// fields (`sender_id`, `timestamp`, priority, type tag) are reachable via
/// the accessor methods below rather than a common base, since Rust has no
/// inheritance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Bsm(BsmFields),
    Cwm(CwmFields),
    Ack(AckFields),
}

impl Message {
    pub fn sender_id(&self) -> &VehicleId {
        match self {
            Message::Bsm(f) => &f.sender_id,
            Message::Cwm(f) => &f.sender_id,
            Message::Ack(f) => &f.sender_id,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            Message::Bsm(f) => f.timestamp,
            Message::Cwm(f) => f.timestamp,
            Message::Ack(f) => f.timestamp,
        }
    }

    pub fn set_timestamp(&mut self, now: f64) {
        match self {
            Message::Bsm(f) => f.timestamp = now,
            Message::Cwm(f) => f.timestamp = now,
            Message::Ack(f) => f.timestamp = now,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Message::Cwm(_) => Priority::Emergency,
            Message::Bsm(_) | Message::Ack(_) => Priority::Normal,
        }
    }

    /// `Some` only for CWM/ACK, which carry a specific recipient; a BSM is a
    /// one-hop broadcast to every vehicle in range.
    pub fn target_vehicle_id(&self) -> Option<&VehicleId> {
        match self {
            Message::Cwm(f) => Some(&f.target_vehicle_id),
            Message::Ack(f) => Some(&f.target_vehicle_id),
            Message::Bsm(_) => None,
        }
    }

    pub fn as_cwm(&self) -> Option<&CwmFields> {
        match self {
            Message::Cwm(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_ack(&self) -> Option<&AckFields> {
        match self {
            Message::Ack(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_bsm(&self) -> Option<&BsmFields> {
        match self {
            Message::Bsm(f) => Some(f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_outranks_normal() {
        assert!(Priority::Emergency < Priority::Normal);
    }

    #[test]
    fn cwm_is_emergency_priority() {
        let cwm = Message::Cwm(CwmFields {
            sender_id: VehicleId::from_counter(1),
            timestamp: 0.0,
            sequence_number: 0,
            warning_type: "rear_end_risk".to_string(),
            target_vehicle_id: VehicleId::from_counter(2),
            time_to_collision: 1.5,
        });
        assert_eq!(cwm.priority(), Priority::Emergency);
        assert_eq!(cwm.target_vehicle_id(), Some(&VehicleId::from_counter(2)));
    }

    #[test]
    fn bsm_has_no_target() {
        let bsm = Message::Bsm(BsmFields {
            sender_id: VehicleId::from_counter(1),
            timestamp: 0.0,
            position: (0.0, 0.0),
            velocity: 10.0,
            heading: 0.0,
            acceleration: 0.0,
            length: 4.5,
            width: 2.0,
        });
        assert_eq!(bsm.priority(), Priority::Normal);
        assert_eq!(bsm.target_vehicle_id(), None);
    }
}
