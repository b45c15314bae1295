use serde::{Deserialize, Serialize};

use crate::config::CoordinatorConfig;
use crate::types::{DenyReason, DeviceIdentity, MasterDecision, RenewOutcome};

/// Election lifecycle of one device in one venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Uninitialized,
    /// An acquisition attempt is in flight (or queued for retry)
    Acquiring,
    /// This device is the playback authority
    Master,
    /// Watching state, may issue commands, plays nothing itself
    Observer,
}

/// Tracks one device's mastery over one venue and enforces the demotion
/// rules.
///
/// The heartbeat tick and the command callback run as independent tasks,
/// so every entry point re-reads the current state instead of trusting a
/// cached value.
#[derive(Debug)]
pub struct DeviceSession {
    venue_id: String,
    identity: DeviceIdentity,
    config: CoordinatorConfig,
    state: SessionState,
    /// Renewal writes that failed transiently since the last success
    consecutive_misses: u32,
}

impl DeviceSession {
    pub fn new(
        venue_id: impl Into<String>,
        identity: DeviceIdentity,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            venue_id: venue_id.into(),
            identity,
            config,
            state: SessionState::Uninitialized,
            consecutive_misses: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_master(&self) -> bool {
        self.state == SessionState::Master
    }

    pub fn venue_id(&self) -> &str {
        &self.venue_id
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Begin (or manually retry) an acquisition attempt
    pub fn begin_acquire(&mut self) -> SessionState {
        self.consecutive_misses = 0;
        self.state = SessionState::Acquiring;
        self.state
    }

    /// Apply the store's answer to a mastery request. A NETWORK_ERROR
    /// denial keeps the session in Acquiring limbo: repeated transport
    /// failure is never interpreted as "not master".
    pub fn on_decision(&mut self, decision: &MasterDecision) -> SessionState {
        self.consecutive_misses = 0;
        self.state = if decision.granted {
            SessionState::Master
        } else {
            match decision.reason {
                Some(DenyReason::NetworkError { .. }) => SessionState::Acquiring,
                _ => SessionState::Observer,
            }
        };
        self.state
    }

    /// Apply a renewal outcome. A lease that answers for a different
    /// device is an authoritative demotion signal, not an error to retry.
    pub fn on_renew_outcome(&mut self, outcome: &RenewOutcome) -> SessionState {
        if self.state != SessionState::Master {
            return self.state;
        }
        match outcome {
            RenewOutcome::Renewed { .. } => {
                self.consecutive_misses = 0;
            }
            RenewOutcome::LostToPeer { holder_device } => {
                tracing::warn!(
                    venue = %self.venue_id,
                    holder = %holder_device,
                    "renewal rejected, stepping down"
                );
                self.state = SessionState::Observer;
            }
            RenewOutcome::NoLease => {
                // Record vanished (sweep or manual reclaim); do not keep
                // playing against a lease that no longer exists
                tracing::warn!(venue = %self.venue_id, "lease record gone, stepping down");
                self.state = SessionState::Observer;
            }
        }
        self.state
    }

    /// A renewal write failed in transit. The store clock is
    /// authoritative, so mastery holds until enough beats are missed
    /// that the lease must have expired server-side.
    pub fn on_renew_error(&mut self) -> SessionState {
        if self.state != SessionState::Master {
            return self.state;
        }
        self.consecutive_misses += 1;
        if self.consecutive_misses >= self.config.missed_beat_budget() {
            tracing::warn!(
                venue = %self.venue_id,
                misses = self.consecutive_misses,
                "renewals missed past the lease ttl, stepping down"
            );
            self.state = SessionState::Observer;
        }
        self.state
    }

    /// Authoritative external signal that this device no longer holds
    /// the venue (e.g. a snapshot write was rejected as stale)
    pub fn on_authority_lost(&mut self) -> SessionState {
        if self.state == SessionState::Master {
            tracing::warn!(venue = %self.venue_id, "authority lost, stepping down");
            self.state = SessionState::Observer;
        }
        self.state
    }

    /// Graceful release requested by the holder
    pub fn on_released(&mut self) -> SessionState {
        self.consecutive_misses = 0;
        self.state = SessionState::Observer;
        self.state
    }
}
