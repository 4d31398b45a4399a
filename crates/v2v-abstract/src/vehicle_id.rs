use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque vehicle identifier, `"V"` followed by a zero-padded monotonic
/// counter starting at 1 (e.g. `"V001"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(String);

impl VehicleId {
    pub fn from_counter(counter: u32) -> Self {
        Self(format!("V{counter:03}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
