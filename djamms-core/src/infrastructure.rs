use crate::error::StoreError;
use crate::types::{AcquireResult, Command, Lease, PlayerStateSnapshot, RenewOutcome};

/// Contract for venue lease storage backends.
pub trait LeaseStore {
    /// Claim the venue, reclaim an expired/offline lease, or reconfirm
    /// the caller's own live lease
    fn acquire_or_confirm(
        &mut self,
        venue_id: &str,
        device_id: &str,
        ttl: u64,
        now: u64,
    ) -> Result<AcquireResult, StoreError>;

    /// Guarded renewal: applies only while the venue lease still belongs
    /// to `device_id`
    fn renew(
        &mut self,
        venue_id: &str,
        device_id: &str,
        now: u64,
    ) -> Result<RenewOutcome, StoreError>;

    /// Mark the lease Offline on graceful shutdown. Returns false when
    /// the caller no longer holds the venue.
    fn release(&mut self, venue_id: &str, device_id: &str) -> Result<bool, StoreError>;

    /// Current lease record for the venue, live or not
    fn current(&self, venue_id: &str) -> Result<Option<Lease>, StoreError>;

    /// Expire overdue Active leases. Returns the number expired.
    fn evict_expired(&mut self, now: u64) -> Result<usize, StoreError>;
}

/// Contract for the durable command queue.
pub trait CommandStore {
    fn append(&mut self, command: Command) -> Result<(), StoreError>;

    /// Unexecuted commands for the venue, in receipt order
    fn pending(&self, venue_id: &str) -> Result<Vec<Command>, StoreError>;

    /// Stamp a command as handled. Returns false for unknown or
    /// already-executed commands.
    fn mark_executed(
        &mut self,
        command_id: &str,
        device_id: &str,
        now: u64,
    ) -> Result<bool, StoreError>;

    /// Drop commands issued before the cutoff, executed or not. Routine
    /// retention, not correctness-critical.
    fn purge_issued_before(&mut self, cutoff: u64) -> Result<usize, StoreError>;
}

/// Contract for latest-value playback snapshots.
pub trait SnapshotStore {
    /// Overwrite the venue snapshot. `Ok(false)` when the writer does
    /// not hold the live lease (stale master).
    fn publish(&mut self, snapshot: PlayerStateSnapshot, now: u64) -> Result<bool, StoreError>;

    fn latest(&self, venue_id: &str) -> Result<Option<PlayerStateSnapshot>, StoreError>;
}

/// Combined contract a full backend provides. The client facade is
/// generic over this, so storage stays pluggable end to end.
pub trait VenueStore: LeaseStore + CommandStore + SnapshotStore {}
