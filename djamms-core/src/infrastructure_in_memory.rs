use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use nanoid::nanoid;

use crate::election::{ElectionEngine, ElectionVerdict};
use crate::error::StoreError;
use crate::infrastructure::{CommandStore, LeaseStore, SnapshotStore, VenueStore};
use crate::types::{
    AcquireResult, Command, Grant, Lease, LeaseStatus, PlayerStateSnapshot, RenewOutcome,
};

/// Reference backend holding everything in process memory.
pub struct InMemoryVenueStore {
    // Map of Venue ID -> current lease record (one per venue)
    leases: HashMap<String, Lease>,
    // Command log in receipt order, across venues
    commands: Vec<Command>,
    // Map of Venue ID -> latest snapshot
    snapshots: HashMap<String, PlayerStateSnapshot>,
}

impl InMemoryVenueStore {
    pub fn new() -> Self {
        Self {
            leases: HashMap::new(),
            commands: Vec::new(),
            snapshots: HashMap::new(),
        }
    }
}

impl Default for InMemoryVenueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseStore for InMemoryVenueStore {
    fn acquire_or_confirm(
        &mut self,
        venue_id: &str,
        device_id: &str,
        ttl: u64,
        now: u64,
    ) -> Result<AcquireResult, StoreError> {
        match ElectionEngine::decide(self.leases.get(venue_id), device_id, now) {
            ElectionVerdict::Denied {
                holder_device,
                heartbeat_at,
            } => Ok(AcquireResult::Denied {
                holder_device,
                heartbeat_at,
            }),
            ElectionVerdict::Grantable { grant } => {
                if grant == Grant::Reconfirmed {
                    if let Some(existing) = self.leases.get_mut(venue_id) {
                        existing.heartbeat_at = now;
                        existing.expires_at = now + existing.ttl;
                        return Ok(AcquireResult::Granted {
                            lease: existing.clone(),
                            grant,
                        });
                    }
                }

                // Fresh claim overwrites any expired/offline record
                let lease = Lease::new(
                    format!("lease_{}", nanoid!(10)),
                    venue_id.to_string(),
                    device_id.to_string(),
                    ttl,
                    now,
                );
                self.leases.insert(venue_id.to_string(), lease.clone());
                Ok(AcquireResult::Granted { lease, grant })
            }
        }
    }

    fn renew(
        &mut self,
        venue_id: &str,
        device_id: &str,
        now: u64,
    ) -> Result<RenewOutcome, StoreError> {
        let Some(lease) = self.leases.get_mut(venue_id) else {
            return Ok(RenewOutcome::NoLease);
        };
        if !lease.is_held_by(device_id) {
            return Ok(RenewOutcome::LostToPeer {
                holder_device: lease.device_id.clone(),
            });
        }
        if lease.status != LeaseStatus::Active {
            // Own record, but already expired or released
            return Ok(RenewOutcome::NoLease);
        }
        lease.heartbeat_at = now;
        lease.expires_at = now + lease.ttl;
        Ok(RenewOutcome::Renewed {
            expires_at: lease.expires_at,
        })
    }

    fn release(&mut self, venue_id: &str, device_id: &str) -> Result<bool, StoreError> {
        if let Some(lease) = self.leases.get_mut(venue_id) {
            if lease.is_held_by(device_id) && lease.status == LeaseStatus::Active {
                lease.status = LeaseStatus::Offline;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn current(&self, venue_id: &str) -> Result<Option<Lease>, StoreError> {
        Ok(self.leases.get(venue_id).cloned())
    }

    fn evict_expired(&mut self, now: u64) -> Result<usize, StoreError> {
        let mut expired_count = 0;
        for lease in self.leases.values_mut() {
            if lease.status == LeaseStatus::Active && lease.expires_at <= now {
                lease.status = LeaseStatus::Expired;
                expired_count += 1;
            }
        }
        Ok(expired_count)
    }
}

impl CommandStore for InMemoryVenueStore {
    fn append(&mut self, command: Command) -> Result<(), StoreError> {
        self.commands.push(command);
        Ok(())
    }

    fn pending(&self, venue_id: &str) -> Result<Vec<Command>, StoreError> {
        Ok(self
            .commands
            .iter()
            .filter(|c| c.venue_id == venue_id && !c.is_executed())
            .cloned()
            .collect())
    }

    fn mark_executed(
        &mut self,
        command_id: &str,
        device_id: &str,
        now: u64,
    ) -> Result<bool, StoreError> {
        for command in self.commands.iter_mut() {
            if command.id == command_id {
                if command.is_executed() {
                    return Ok(false);
                }
                command.executed_by = Some(device_id.to_string());
                command.executed_at = Some(now);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn purge_issued_before(&mut self, cutoff: u64) -> Result<usize, StoreError> {
        let before = self.commands.len();
        self.commands.retain(|c| c.issued_at >= cutoff);
        Ok(before - self.commands.len())
    }
}

impl SnapshotStore for InMemoryVenueStore {
    fn publish(&mut self, snapshot: PlayerStateSnapshot, now: u64) -> Result<bool, StoreError> {
        let holder_ok = self
            .leases
            .get(&snapshot.venue_id)
            .map(|l| l.is_live(now) && l.is_held_by(&snapshot.updated_by))
            .unwrap_or(false);
        if !holder_ok {
            return Ok(false);
        }
        self.snapshots.insert(snapshot.venue_id.clone(), snapshot);
        Ok(true)
    }

    fn latest(&self, venue_id: &str) -> Result<Option<PlayerStateSnapshot>, StoreError> {
        Ok(self.snapshots.get(venue_id).cloned())
    }
}

impl VenueStore for InMemoryVenueStore {}

// ─── Fault injection ────────────────────────────────────────────────────────

/// Remote control for a [`FaultInjector`], usable after the store has
/// been boxed into a client.
#[derive(Clone)]
pub struct FaultHandle {
    remaining: Arc<AtomicU32>,
}

impl FaultHandle {
    /// Fail the next `n` store calls with `StoreError::Unavailable`
    pub fn fail_next(&self, n: u32) {
        self.remaining.store(n, Ordering::SeqCst);
    }
}

/// Wraps a backend and fails calls on demand, simulating an unreachable
/// store so the NETWORK_ERROR path and the missed-beat budget can be
/// exercised without a network.
pub struct FaultInjector<S> {
    inner: S,
    remaining: Arc<AtomicU32>,
}

impl<S> FaultInjector<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            remaining: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn handle(&self) -> FaultHandle {
        FaultHandle {
            remaining: Arc::clone(&self.remaining),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable("injected fault".to_string()));
        }
        Ok(())
    }
}

impl<S: LeaseStore> LeaseStore for FaultInjector<S> {
    fn acquire_or_confirm(
        &mut self,
        venue_id: &str,
        device_id: &str,
        ttl: u64,
        now: u64,
    ) -> Result<AcquireResult, StoreError> {
        self.check()?;
        self.inner.acquire_or_confirm(venue_id, device_id, ttl, now)
    }

    fn renew(
        &mut self,
        venue_id: &str,
        device_id: &str,
        now: u64,
    ) -> Result<RenewOutcome, StoreError> {
        self.check()?;
        self.inner.renew(venue_id, device_id, now)
    }

    fn release(&mut self, venue_id: &str, device_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.release(venue_id, device_id)
    }

    fn current(&self, venue_id: &str) -> Result<Option<Lease>, StoreError> {
        self.check()?;
        self.inner.current(venue_id)
    }

    fn evict_expired(&mut self, now: u64) -> Result<usize, StoreError> {
        self.check()?;
        self.inner.evict_expired(now)
    }
}

impl<S: CommandStore> CommandStore for FaultInjector<S> {
    fn append(&mut self, command: Command) -> Result<(), StoreError> {
        self.check()?;
        self.inner.append(command)
    }

    fn pending(&self, venue_id: &str) -> Result<Vec<Command>, StoreError> {
        self.check()?;
        self.inner.pending(venue_id)
    }

    fn mark_executed(
        &mut self,
        command_id: &str,
        device_id: &str,
        now: u64,
    ) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.mark_executed(command_id, device_id, now)
    }

    fn purge_issued_before(&mut self, cutoff: u64) -> Result<usize, StoreError> {
        self.check()?;
        self.inner.purge_issued_before(cutoff)
    }
}

impl<S: SnapshotStore> SnapshotStore for FaultInjector<S> {
    fn publish(&mut self, snapshot: PlayerStateSnapshot, now: u64) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.publish(snapshot, now)
    }

    fn latest(&self, venue_id: &str) -> Result<Option<PlayerStateSnapshot>, StoreError> {
        self.check()?;
        self.inner.latest(venue_id)
    }
}

impl<S: VenueStore> VenueStore for FaultInjector<S> {}
