use serde::Serialize;

/// Statistics record exposed after/during a run. Computed from the
/// engine's running counters rather than accumulated lazily, so repeated
/// calls mid-run stay cheap and consistent — the engine's owned state is
/// the single source of truth.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub simulation_time: f64,
    pub vehicle_count: usize,
    pub total_bsm_sent: u64,
    pub bsm_rate: f64,
    pub total_cwm_sent: u64,
    pub collisions_prevented: u64,
    pub total_packets: u64,
    pub lost_packets: u64,
    pub packet_loss: f64,
    pub average_latency: f64,
}
