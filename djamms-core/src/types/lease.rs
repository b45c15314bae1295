use serde::{Deserialize, Serialize};

/// Lease states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaseStatus {
    /// Lease is held and being renewed
    Active,
    /// Lease TTL elapsed without a heartbeat
    Expired,
    /// Holder released the lease on graceful shutdown
    Offline,
}

/// A time-bound claim of master-player status for a venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    /// Unique lease ID
    pub id: String,
    /// Venue the lease is scoped to (one live lease per venue)
    pub venue_id: String,
    /// Device holding the lease, stable across reconnects
    pub device_id: String,
    /// Current lease status
    pub status: LeaseStatus,
    /// When the venue was first claimed
    pub acquired_at: u64,
    /// Last renewal timestamp
    pub heartbeat_at: u64,
    /// Lease duration in milliseconds
    pub ttl: u64,
    /// When the lease becomes reclaimable (heartbeatAt + ttl)
    pub expires_at: u64,
}

impl Lease {
    pub fn new(id: String, venue_id: String, device_id: String, ttl: u64, now: u64) -> Self {
        Self {
            id,
            venue_id,
            device_id,
            status: LeaseStatus::Active,
            acquired_at: now,
            heartbeat_at: now,
            ttl,
            expires_at: now + ttl,
        }
    }

    /// Whether the lease still blocks other claimants at `now`
    pub fn is_live(&self, now: u64) -> bool {
        self.status == LeaseStatus::Active && now < self.expires_at
    }

    pub fn is_held_by(&self, device_id: &str) -> bool {
        self.device_id == device_id
    }
}

/// How a granted claim came about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grant {
    /// New claim of an unclaimed or reclaimable venue
    Fresh,
    /// Existing holder refreshed its own live lease (reconnect case)
    Reconfirmed,
}

/// Result of attempting to acquire or reconfirm a venue lease
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AcquireResult {
    Granted {
        lease: Lease,
        grant: Grant,
    },
    Denied {
        /// Device currently holding the live lease
        holder_device: String,
        /// The holder's last renewal, for "last seen" display
        heartbeat_at: u64,
    },
}

/// Result of a guarded heartbeat renewal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewOutcome {
    /// Renewal applied; the caller keeps mastery
    Renewed { expires_at: u64 },
    /// The venue lease now belongs to a different device
    LostToPeer { holder_device: String },
    /// No renewable record exists for the venue
    NoLease,
}

/// Machine-readable denial reasons surfaced to the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    /// Another device holds a live lease
    MasterActive {
        holder_device: String,
        heartbeat_at: u64,
    },
    /// The store could not be reached; retryable, never fatal
    NetworkError { detail: String },
}

impl DenyReason {
    /// Wire tag shown to clients
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::MasterActive { .. } => "MASTER_ACTIVE",
            DenyReason::NetworkError { .. } => "NETWORK_ERROR",
        }
    }
}

/// Answer handed to the UI layer for a mastery request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterDecision {
    pub granted: bool,
    pub grant: Option<Grant>,
    pub lease: Option<Lease>,
    pub reason: Option<DenyReason>,
}

impl MasterDecision {
    pub fn granted(lease: Lease, grant: Grant) -> Self {
        Self {
            granted: true,
            grant: Some(grant),
            lease: Some(lease),
            reason: None,
        }
    }

    pub fn denied(reason: DenyReason) -> Self {
        Self {
            granted: false,
            grant: None,
            lease: None,
            reason: Some(reason),
        }
    }
}
