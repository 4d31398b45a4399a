use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use tracing::{debug, trace};
use v2v_abstract::message::CwmFields;
use v2v_abstract::{Digest, Message, Priority, SimConfig, VehicleId};

use crate::medium::Medium;

/// Per-pair reliable CWM channel. Only the head of `unacked` is ever on air
/// (head-of-line blocking); `send_seq_num`/`recv_seq_num` are the per-peer
/// sequence counters.
pub struct CwmConnection {
    unacked: VecDeque<CwmFields>,
    transmit_time: f64,
    last_use: f64,
    send_seq_num: u64,
    recv_seq_num: u64,
}

impl CwmConnection {
    fn new(now: f64) -> Self {
        Self {
            unacked: VecDeque::new(),
            transmit_time: now,
            last_use: now,
            send_seq_num: 0,
            recv_seq_num: 0,
        }
    }
}

/// An inbound message ordered by `(priority, timestamp)`, priority
/// ascending so `Emergency` (CWM) always pops before `Normal` (BSM/ACK).
/// `Ord` is reversed so a `BinaryHeap<Envelope>` behaves as the
/// lowest-priority-value-first min-heap this requires.
struct Envelope {
    message: Message,
    digest: Digest,
}

impl Envelope {
    fn key(&self) -> (Priority, f64) {
        (self.message.priority(), self.message.timestamp())
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for Envelope {}

impl PartialOrd for Envelope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Envelope {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key()
            .partial_cmp(&self.key())
            .unwrap_or(Ordering::Equal)
    }
}

/// Per-vehicle protocol state: the CWM connection table and the inbound
/// priority queue. Owned exclusively by one `Vehicle` — `CwmConnection`s
/// reference peers by id only, never by object, so peer lifetime is
/// independent of connection lifetime.
#[derive(Default)]
pub struct Protocol {
    connections: HashMap<VehicleId, CwmConnection>,
    inbound: BinaryHeap<Envelope>,
}

impl Protocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sequence number a fresh CWM to `peer` should carry: the current
    /// `send_seq_num` if a connection already exists, else 0.
    pub fn send_seq_num_for(&self, peer: &VehicleId) -> u64 {
        self.connections.get(peer).map_or(0, |c| c.send_seq_num)
    }

    /// Queues a message for transmission. CWMs are queued behind any CWM
    /// already on air for the same peer (head-of-line); BSM/ACK are handed
    /// to the medium immediately.
    pub fn send(&mut self, own_id: &VehicleId, now: f64, mut message: Message, medium: &mut Medium) {
        if let Message::Cwm(cwm) = &message {
            let target = cwm.target_vehicle_id.clone();
            let connection = self
                .connections
                .entry(target.clone())
                .or_insert_with(|| CwmConnection::new(now));
            connection.last_use = now;
            connection.unacked.push_back(cwm.clone());

            if connection.unacked.len() > 1 {
                trace!(peer = %target, "CWM queued behind in-flight head");
                return;
            }

            connection.transmit_time = now;
        }

        message.set_timestamp(now);
        let digest = Digest::compute(&message);
        medium.enqueue(own_id.clone(), message, digest);
    }

    /// Validates an inbound message's target and digest, then pushes it
    /// onto the inbound priority queue.
    pub fn receive(&mut self, own_id: &VehicleId, message: Message, digest: Digest) {
        if let Some(target) = message.target_vehicle_id()
            && target != own_id
        {
            trace!(own = %own_id, target = %target, "discarding message addressed to a different vehicle");
            return;
        }

        if Digest::compute(&message) != digest {
            debug!(own = %own_id, "discarding message with mismatched digest");
            return;
        }

        self.inbound.push(Envelope { message, digest });
    }

    /// Drains the inbound queue, transparently handling CWM/ACK
    /// bookkeeping, until either the queue empties or a BSM (or actionable
    /// CWM) is ready to hand back to the vehicle.
    pub fn process(&mut self, own_id: &VehicleId, now: f64, medium: &mut Medium) -> Option<Message> {
        while let Some(envelope) = self.inbound.pop() {
            match envelope.message {
                Message::Cwm(cwm) => {
                    if let Some(actionable) = self.process_cwm(own_id, now, medium, cwm) {
                        return Some(Message::Cwm(actionable));
                    }
                }
                Message::Ack(ack) => {
                    self.process_ack(own_id, now, medium, ack);
                }
                bsm @ Message::Bsm(_) => return Some(bsm),
            }
        }
        None
    }

    fn process_cwm(
        &mut self,
        own_id: &VehicleId,
        now: f64,
        medium: &mut Medium,
        cwm: CwmFields,
    ) -> Option<CwmFields> {
        let sender = cwm.sender_id.clone();
        let connection = self
            .connections
            .entry(sender.clone())
            .or_insert_with(|| CwmConnection::new(now));
        connection.last_use = now;

        // Future sequence numbers are silently discarded rather than
        // buffered.
        if cwm.sequence_number > connection.recv_seq_num {
            trace!(peer = %sender, seq = cwm.sequence_number, "discarding out-of-order-future CWM");
            return None;
        }

        // Every CWM at or below the expected sequence is cumulatively
        // re-acked; idempotent on the receiving end.
        let ack = Message::Ack(v2v_abstract::message::AckFields {
            sender_id: own_id.clone(),
            timestamp: now,
            sequence_number: cwm.sequence_number,
            target_vehicle_id: sender.clone(),
        });
        self.send(own_id, now, ack, medium);

        let connection = self.connections.get_mut(&sender)?;
        if cwm.sequence_number == connection.recv_seq_num {
            connection.recv_seq_num += 1;
            Some(cwm)
        } else {
            trace!(peer = %sender, seq = cwm.sequence_number, "re-acking already-delivered CWM");
            None
        }
    }

    fn process_ack(
        &mut self,
        own_id: &VehicleId,
        now: f64,
        medium: &mut Medium,
        ack: v2v_abstract::message::AckFields,
    ) {
        let sender = ack.sender_id.clone();
        let Some(connection) = self.connections.get_mut(&sender) else {
            return;
        };
        connection.last_use = now;

        if ack.sequence_number != connection.send_seq_num {
            trace!(peer = %sender, "ignoring stale or duplicate ACK");
            return;
        }

        connection.send_seq_num += 1;
        connection.unacked.pop_front();

        if let Some(next) = connection.unacked.front().cloned() {
            connection.transmit_time = now;
            self.transmit_cwm(own_id, now, medium, next);
        }
    }

    /// Reaps idle, empty connections; retransmits aged, still-unacked
    /// heads. Retransmission never bumps `last_use` — only real activity
    /// keeps a connection alive, so a dead peer's connection still reaps
    /// on schedule.
    pub fn manage(&mut self, own_id: &VehicleId, now: f64, cfg: &SimConfig, medium: &mut Medium) {
        let mut to_retransmit = Vec::new();
        self.connections.retain(|peer, connection| {
            if connection.unacked.is_empty() {
                let idle = now - connection.last_use > cfg.connection_idle_ttl;
                if idle {
                    debug!(peer = %peer, "reaping idle CWM connection");
                }
                return !idle;
            }

            if now - connection.transmit_time > cfg.retransmit_timeout {
                connection.transmit_time = now;
                to_retransmit.push(connection.unacked.front().unwrap().clone());
            }
            true
        });

        for cwm in to_retransmit {
            debug!(peer = %cwm.target_vehicle_id, seq = cwm.sequence_number, "retransmitting head CWM");
            self.transmit_cwm(own_id, now, medium, cwm);
        }
    }

    fn transmit_cwm(&self, own_id: &VehicleId, now: f64, medium: &mut Medium, mut cwm: CwmFields) {
        cwm.timestamp = now;
        let message = Message::Cwm(cwm);
        let digest = Digest::compute(&message);
        medium.enqueue(own_id.clone(), message, digest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use v2v_abstract::message::BsmFields;

    fn cfg() -> SimConfig {
        let mut c = SimConfig::default();
        c.packet_loss_probability = 0.0;
        c
    }

    fn cwm_message(sender: &str, target: &str, seq: u64, now: f64) -> Message {
        Message::Cwm(CwmFields {
            sender_id: VehicleId::from(sender),
            timestamp: now,
            sequence_number: seq,
            warning_type: "rear_end_risk".to_string(),
            target_vehicle_id: VehicleId::from(target),
            time_to_collision: 1.0,
        })
    }

    #[test]
    fn head_of_line_blocks_second_cwm() {
        let own = VehicleId::from("V001");
        let peer = VehicleId::from("V002");
        let cfg = cfg();
        let mut medium = Medium::new(&cfg);
        let mut protocol = Protocol::new();

        protocol.send(&own, 0.0, cwm_message("V001", "V002", 0, 0.0), &mut medium);
        protocol.send(&own, 0.0, cwm_message("V001", "V002", 1, 0.0), &mut medium);

        // Only the head (seq 0) should actually be on the medium.
        assert_eq!(medium.total_packets, 1);
        let _ = peer;
    }

    #[test]
    fn ack_advances_send_seq_and_releases_next() {
        let own = VehicleId::from("V001");
        let peer = VehicleId::from("V002");
        let cfg = cfg();
        let mut medium = Medium::new(&cfg);
        let mut protocol = Protocol::new();

        protocol.send(&own, 0.0, cwm_message("V001", "V002", 0, 0.0), &mut medium);
        protocol.send(&own, 0.0, cwm_message("V001", "V002", 1, 0.0), &mut medium);
        assert_eq!(protocol.send_seq_num_for(&peer), 0);

        let ack = Message::Ack(v2v_abstract::message::AckFields {
            sender_id: peer.clone(),
            timestamp: 0.1,
            sequence_number: 0,
            target_vehicle_id: own.clone(),
        });
        let digest = Digest::compute(&ack);
        protocol.receive(&own, ack, digest);
        let next = protocol.process(&own, 0.1, &mut medium);
        assert!(next.is_none(), "ACK is consumed internally, not returned");

        assert_eq!(protocol.send_seq_num_for(&peer), 1);
        // seq-0 transmission + seq-1 release after the ACK = 2 packets total.
        assert_eq!(medium.total_packets, 2);
    }

    #[test]
    fn future_sequence_cwm_is_discarded_without_ack() {
        let own = VehicleId::from("V001");
        let cfg = cfg();
        let mut medium = Medium::new(&cfg);
        let mut protocol = Protocol::new();

        let future = cwm_message("V002", "V001", 5, 0.0);
        let digest = Digest::compute(&future);
        protocol.receive(&own, future, digest);
        let result = protocol.process(&own, 0.0, &mut medium);

        assert!(result.is_none());
        assert_eq!(medium.total_packets, 0, "no ACK sent for future sequence");
    }

    #[test]
    fn in_order_cwm_is_returned_and_acked() {
        let own = VehicleId::from("V001");
        let cfg = cfg();
        let mut medium = Medium::new(&cfg);
        let mut protocol = Protocol::new();

        let cwm = cwm_message("V002", "V001", 0, 0.0);
        let digest = Digest::compute(&cwm);
        protocol.receive(&own, cwm, digest);
        let result = protocol.process(&own, 0.0, &mut medium);

        assert!(matches!(result, Some(Message::Cwm(_))));
        assert_eq!(medium.total_packets, 1, "one ACK was sent");
    }

    #[test]
    fn bsm_passes_straight_through() {
        let own = VehicleId::from("V001");
        let cfg = cfg();
        let mut medium = Medium::new(&cfg);
        let mut protocol = Protocol::new();

        let bsm = Message::Bsm(BsmFields {
            sender_id: VehicleId::from("V002"),
            timestamp: 0.0,
            position: (1.0, 0.0),
            velocity: 5.0,
            heading: 0.0,
            acceleration: 0.0,
            length: 4.5,
            width: 2.0,
        });
        let digest = Digest::compute(&bsm);
        protocol.receive(&own, bsm, digest);
        let result = protocol.process(&own, 0.0, &mut medium);
        assert!(matches!(result, Some(Message::Bsm(_))));
    }

    #[test]
    fn wrong_target_is_discarded() {
        let own = VehicleId::from("V001");
        let mut protocol = Protocol::new();

        let ack = Message::Ack(v2v_abstract::message::AckFields {
            sender_id: VehicleId::from("V002"),
            timestamp: 0.0,
            sequence_number: 0,
            target_vehicle_id: VehicleId::from("V003"),
        });
        let digest = Digest::compute(&ack);
        protocol.receive(&own, ack, digest);

        let cfg = cfg();
        let mut medium = Medium::new(&cfg);
        assert!(protocol.process(&own, 0.0, &mut medium).is_none());
    }

    #[test]
    fn tampered_digest_is_discarded() {
        let own = VehicleId::from("V001");
        let bsm = Message::Bsm(BsmFields {
            sender_id: VehicleId::from("V002"),
            timestamp: 0.0,
            position: (1.0, 0.0),
            velocity: 5.0,
            heading: 0.0,
            acceleration: 0.0,
            length: 4.5,
            width: 2.0,
        });
        let real_digest = Digest::compute(&bsm);
        let tampered = Message::Bsm(BsmFields {
            velocity: 99.0,
            ..match bsm {
                Message::Bsm(f) => f,
                _ => unreachable!(),
            }
        });

        let mut protocol = Protocol::new();
        protocol.receive(&own, tampered, real_digest);

        let cfg = cfg();
        let mut medium = Medium::new(&cfg);
        assert!(protocol.process(&own, 0.0, &mut medium).is_none());
    }

    #[test]
    fn idle_empty_connection_is_reaped() {
        let own = VehicleId::from("V001");
        let peer = VehicleId::from("V002");
        let mut cfg = cfg();
        cfg.connection_idle_ttl = 0.5;
        let mut medium = Medium::new(&cfg);
        let mut protocol = Protocol::new();

        // Establish, then immediately ACK so the connection is empty.
        protocol.send(&own, 0.0, cwm_message("V001", "V002", 0, 0.0), &mut medium);
        let ack = Message::Ack(v2v_abstract::message::AckFields {
            sender_id: peer.clone(),
            timestamp: 0.0,
            sequence_number: 0,
            target_vehicle_id: own.clone(),
        });
        let digest = Digest::compute(&ack);
        protocol.receive(&own, ack, digest);
        protocol.process(&own, 0.0, &mut medium);

        protocol.manage(&own, 0.1, &cfg, &mut medium);
        assert_eq!(protocol.send_seq_num_for(&peer), 1, "connection still present before TTL");

        protocol.manage(&own, 0.7, &cfg, &mut medium);
        assert_eq!(protocol.send_seq_num_for(&peer), 0, "connection reaped, defaults back to 0");
    }

    #[test]
    fn retransmit_resends_unacked_head() {
        let own = VehicleId::from("V001");
        let mut cfg = cfg();
        cfg.retransmit_timeout = 0.05;
        let mut medium = Medium::new(&cfg);
        let mut protocol = Protocol::new();

        protocol.send(&own, 0.0, cwm_message("V001", "V002", 0, 0.0), &mut medium);
        assert_eq!(medium.total_packets, 1);

        protocol.manage(&own, 0.1, &cfg, &mut medium);
        assert_eq!(medium.total_packets, 2, "retransmitted after timeout");
    }
}
