use serde::{Deserialize, Serialize};

/// Tuning for election, heartbeat, and maintenance.
///
/// The defaults are the product values (5 s beats against a 15 s lease
/// leaves margin for two missed beats before expiry); none of the
/// specific numbers are load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Lease duration in milliseconds
    pub lease_ttl_ms: u64,
    /// Interval between renewal writes while master
    pub heartbeat_interval_ms: u64,
    /// Bound on a single acquisition attempt before it reports
    /// NETWORK_ERROR instead of hanging
    pub acquire_timeout_ms: u64,
    /// Commands older than this are purged by the maintenance sweep
    pub command_retention_ms: u64,
    /// Fallback interval for command feeds without push delivery
    pub poll_interval_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lease_ttl_ms: 15_000,
            heartbeat_interval_ms: 5_000,
            acquire_timeout_ms: 3_000,
            command_retention_ms: 3_600_000,
            poll_interval_ms: 2_000,
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.lease_ttl_ms == 0 || self.heartbeat_interval_ms == 0 {
            return Err("lease ttl and heartbeat interval must be non-zero".to_string());
        }
        if self.heartbeat_interval_ms >= self.lease_ttl_ms {
            return Err(format!(
                "heartbeat interval {}ms must be strictly less than lease ttl {}ms",
                self.heartbeat_interval_ms, self.lease_ttl_ms
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err("poll interval must be non-zero".to_string());
        }
        Ok(())
    }

    /// Consecutive renewal misses after which the lease has already
    /// expired server-side and the holder must step down
    pub fn missed_beat_budget(&self) -> u32 {
        (self.lease_ttl_ms / self.heartbeat_interval_ms) as u32
    }
}
