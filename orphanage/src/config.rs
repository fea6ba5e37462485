/// Network-consensus maximum weight for a standard transaction. An orphan
/// heavier than this is rejected outright by `add_tx`.
pub const MAX_STANDARD_TX_WEIGHT: u64 = 400_000;

/// Seconds an orphan may sit in the pool before it becomes eligible for
/// expiry.
pub const ORPHAN_TX_EXPIRE_TIME_SECS: u64 = 20 * 60;

/// Minimum time between expiration sweeps, batching the linear scan.
pub const ORPHAN_TX_EXPIRE_INTERVAL_SECS: u64 = 5 * 60;

/// Tunable limits for one `Orphanage` instance. The defaults reproduce the
/// network's standard-relay policy; an embedding node on a network with a
/// different standardness cap (e.g. a lower-weight test network) can
/// override them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanageConfig {
    pub max_standard_tx_weight: u64,
    pub expire_time_secs: u64,
    pub expire_interval_secs: u64,
}

impl OrphanageConfig {
    pub fn build_default() -> Self {
        Self {
            max_standard_tx_weight: MAX_STANDARD_TX_WEIGHT,
            expire_time_secs: ORPHAN_TX_EXPIRE_TIME_SECS,
            expire_interval_secs: ORPHAN_TX_EXPIRE_INTERVAL_SECS,
        }
    }
}

impl Default for OrphanageConfig {
    fn default() -> Self {
        Self::build_default()
    }
}
