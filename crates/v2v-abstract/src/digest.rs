use sha2::{Digest as _, Sha256};

use crate::message::Message;

/// Tamper-evidence digest carried alongside a message through the medium.
/// Models tamper-evident transport without modelling signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Canonicalizes `message` as sorted-key JSON (stable, field-order
    /// independent: `serde_json::Map` is a `BTreeMap` unless the
    /// `preserve_order` feature is enabled, which this workspace never
    /// turns on) and hashes the canonical bytes with SHA-256.
    pub fn compute(message: &Message) -> Self {
        let value = serde_json::to_value(message).expect("Message always serializes");
        let canonical = serde_json::to_vec(&value).expect("Value always serializes");

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        let result = hasher.finalize();

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }
}
