//! High-level ergonomic client that wraps the pure election engine +
//! pluggable storage + per-venue buses. The HTTP server and the napi
//! (JS) FFI layer both delegate to this.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::bus::{CommandBus, StateBus};
use crate::config::CoordinatorConfig;
use crate::error::StoreError;
use crate::infrastructure::VenueStore;
use crate::infrastructure_in_memory::InMemoryVenueStore;
use crate::types::*;

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// What one maintenance pass cleaned up
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SweepReport {
    pub leases_expired: usize,
    pub commands_purged: usize,
}

/// The main entry point for venue coordination. Manages the lease,
/// command, and snapshot collections for every venue behind one API.
pub struct VenueClient {
    store: Box<dyn VenueStore + Send>,
    config: CoordinatorConfig,
    // Lazily created per-venue buses
    command_buses: HashMap<String, CommandBus>,
    state_buses: HashMap<String, StateBus>,
}

impl VenueClient {
    /// Create a new VenueClient with an empty in-memory store.
    pub fn new() -> Self {
        Self::with_store(Box::new(InMemoryVenueStore::new()), CoordinatorConfig::default())
    }

    /// Create a client over any backend. The config is assumed valid;
    /// use [`CoordinatorConfig::validate`] at the configuration edge.
    pub fn with_store(store: Box<dyn VenueStore + Send>, config: CoordinatorConfig) -> Self {
        Self {
            store,
            config,
            command_buses: HashMap::new(),
            state_buses: HashMap::new(),
        }
    }

    /// Create a new VenueClient backed by SQLite at the given path.
    /// Venue state persists across server restarts.
    #[cfg(feature = "sqlite")]
    pub fn with_sqlite(path: &str) -> Result<Self, String> {
        let store = crate::infrastructure_sqlite::SqliteVenueStore::open(path)
            .map_err(|e| format!("Failed to open SQLite database at '{}': {}", path, e))?;
        Ok(Self::with_store(Box::new(store), CoordinatorConfig::default()))
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // ─── Election ───────────────────────────────────────────────────────────

    /// Acquire or reconfirm mastery of a venue for a device.
    pub fn request_master(&mut self, venue_id: &str, device_id: &str) -> MasterDecision {
        let now = now_ms();
        match self
            .store
            .acquire_or_confirm(venue_id, device_id, self.config.lease_ttl_ms, now)
        {
            Ok(AcquireResult::Granted { lease, grant }) => MasterDecision::granted(lease, grant),
            Ok(AcquireResult::Denied {
                holder_device,
                heartbeat_at,
            }) => MasterDecision::denied(DenyReason::MasterActive {
                holder_device,
                heartbeat_at,
            }),
            Err(err) => MasterDecision::denied(DenyReason::NetworkError {
                detail: err.to_string(),
            }),
        }
    }

    /// Mark the venue lease Offline. Best-effort on page unload; a crash
    /// skips this and the lease expires naturally instead.
    pub fn release_master(&mut self, venue_id: &str, device_id: &str) -> Result<bool, StoreError> {
        self.store.release(venue_id, device_id)
    }

    /// Guarded renewal write for the current holder.
    pub fn heartbeat(&mut self, venue_id: &str, device_id: &str) -> Result<RenewOutcome, StoreError> {
        self.store.renew(venue_id, device_id, now_ms())
    }

    /// Current lease record for a venue, live or not.
    pub fn current_master(&self, venue_id: &str) -> Result<Option<Lease>, StoreError> {
        self.store.current(venue_id)
    }

    // ─── Command channel ────────────────────────────────────────────────────

    /// Issue a playback command. Always permitted, regardless of mastery.
    pub fn issue_command(
        &mut self,
        venue_id: &str,
        kind: CommandKind,
        issued_by: &str,
    ) -> Result<Command, StoreError> {
        let command = Command::new(
            venue_id.to_string(),
            kind,
            issued_by.to_string(),
            now_ms(),
        );
        self.store.append(command.clone())?;
        self.command_bus(venue_id).publish(command.clone());
        Ok(command)
    }

    /// Unexecuted commands for a venue in receipt order.
    pub fn pending_commands(&self, venue_id: &str) -> Result<Vec<Command>, StoreError> {
        self.store.pending(venue_id)
    }

    /// Stamp a command as handled by the given master device.
    pub fn mark_executed(&mut self, command_id: &str, device_id: &str) -> Result<bool, StoreError> {
        self.store.mark_executed(command_id, device_id, now_ms())
    }

    /// Push subscription to newly issued commands for a venue.
    pub fn subscribe_commands(&mut self, venue_id: &str) -> broadcast::Receiver<Command> {
        self.command_bus(venue_id).subscribe()
    }

    // ─── State broadcast ────────────────────────────────────────────────────

    /// Publish the venue snapshot. Returns false (and drops the write)
    /// when the writer no longer holds the live lease.
    pub fn publish_state(
        &mut self,
        mut snapshot: PlayerStateSnapshot,
    ) -> Result<bool, StoreError> {
        let now = now_ms();
        snapshot.last_updated = now;
        let venue_id = snapshot.venue_id.clone();
        if !self.store.publish(snapshot.clone(), now)? {
            return Ok(false);
        }
        self.state_bus(&venue_id).publish(snapshot);
        Ok(true)
    }

    /// Latest published snapshot for a venue.
    pub fn latest_state(&self, venue_id: &str) -> Result<Option<PlayerStateSnapshot>, StoreError> {
        self.store.latest(venue_id)
    }

    /// Push subscription to snapshot updates for a venue.
    pub fn subscribe_state(
        &mut self,
        venue_id: &str,
    ) -> watch::Receiver<Option<PlayerStateSnapshot>> {
        self.state_bus(venue_id).subscribe()
    }

    // ─── Maintenance ────────────────────────────────────────────────────────

    /// Expire overdue leases and purge commands past the retention
    /// window. Routine upkeep, safe to run from any client.
    pub fn sweep(&mut self) -> Result<SweepReport, StoreError> {
        let now = now_ms();
        let leases_expired = self.store.evict_expired(now)?;
        let cutoff = now.saturating_sub(self.config.command_retention_ms);
        let commands_purged = self.store.purge_issued_before(cutoff)?;
        Ok(SweepReport {
            leases_expired,
            commands_purged,
        })
    }

    fn command_bus(&mut self, venue_id: &str) -> &CommandBus {
        self.command_buses
            .entry(venue_id.to_string())
            .or_default()
    }

    fn state_bus(&mut self, venue_id: &str) -> &StateBus {
        self.state_buses.entry(venue_id.to_string()).or_default()
    }
}

impl Default for VenueClient {
    fn default() -> Self {
        Self::new()
    }
}
