//! SQLite-backed venue store.
//! Keeps leases, commands, and snapshots across coordination-server
//! restarts.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! djamms-core = { path = "../djamms-core", features = ["sqlite"] }
//! ```

use nanoid::nanoid;
use rusqlite::{Connection, OptionalExtension, params};

use crate::election::{ElectionEngine, ElectionVerdict};
use crate::error::StoreError;
use crate::infrastructure::{CommandStore, LeaseStore, SnapshotStore, VenueStore};
use crate::types::*;

/// A persistent venue store backed by SQLite.
///
/// Uses WAL mode for concurrent read performance.
pub struct SqliteVenueStore {
    conn: Connection,
}

impl SqliteVenueStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS leases (
                id           TEXT PRIMARY KEY,
                venue_id     TEXT NOT NULL UNIQUE,
                device_id    TEXT NOT NULL,
                status       TEXT NOT NULL DEFAULT 'Active',
                acquired_at  INTEGER NOT NULL,
                heartbeat_at INTEGER NOT NULL,
                ttl          INTEGER NOT NULL,
                expires_at   INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_leases_status ON leases(status);

            CREATE TABLE IF NOT EXISTS commands (
                id          TEXT PRIMARY KEY,
                venue_id    TEXT NOT NULL,
                kind        TEXT NOT NULL,
                issued_by   TEXT NOT NULL,
                issued_at   INTEGER NOT NULL,
                executed_by TEXT,
                executed_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_commands_venue ON commands(venue_id, issued_at);

            CREATE TABLE IF NOT EXISTS snapshots (
                venue_id     TEXT PRIMARY KEY,
                now_playing  TEXT,
                is_playing   INTEGER NOT NULL,
                volume       INTEGER NOT NULL,
                last_updated INTEGER NOT NULL,
                updated_by   TEXT NOT NULL
            );",
        )?;

        Ok(Self { conn })
    }

    fn parse_status(s: &str) -> LeaseStatus {
        match s {
            "Active" => LeaseStatus::Active,
            "Expired" => LeaseStatus::Expired,
            "Offline" => LeaseStatus::Offline,
            _ => LeaseStatus::Active,
        }
    }

    fn row_to_lease(row: &rusqlite::Row) -> rusqlite::Result<Lease> {
        let status_str: String = row.get(3)?;
        Ok(Lease {
            id: row.get(0)?,
            venue_id: row.get(1)?,
            device_id: row.get(2)?,
            status: Self::parse_status(&status_str),
            acquired_at: row.get(4)?,
            heartbeat_at: row.get(5)?,
            ttl: row.get(6)?,
            expires_at: row.get(7)?,
        })
    }

    fn lease_row(&self, venue_id: &str) -> Result<Option<Lease>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, venue_id, device_id, status, acquired_at, heartbeat_at, ttl, expires_at
                 FROM leases WHERE venue_id = ?1",
                params![venue_id],
                Self::row_to_lease,
            )
            .optional()?)
    }
}

impl LeaseStore for SqliteVenueStore {
    fn acquire_or_confirm(
        &mut self,
        venue_id: &str,
        device_id: &str,
        ttl: u64,
        now: u64,
    ) -> Result<AcquireResult, StoreError> {
        let existing = self.lease_row(venue_id)?;

        match ElectionEngine::decide(existing.as_ref(), device_id, now) {
            ElectionVerdict::Denied {
                holder_device,
                heartbeat_at,
            } => Ok(AcquireResult::Denied {
                holder_device,
                heartbeat_at,
            }),
            ElectionVerdict::Grantable { grant } => {
                let lease = match (grant, existing) {
                    (Grant::Reconfirmed, Some(mut lease)) => {
                        lease.heartbeat_at = now;
                        lease.expires_at = now + lease.ttl;
                        self.conn.execute(
                            "UPDATE leases SET heartbeat_at = ?1, expires_at = ?2
                             WHERE venue_id = ?3 AND device_id = ?4",
                            params![now, lease.expires_at, venue_id, device_id],
                        )?;
                        lease
                    }
                    _ => {
                        let lease = Lease::new(
                            format!("lease_{}", nanoid!(10)),
                            venue_id.to_string(),
                            device_id.to_string(),
                            ttl,
                            now,
                        );
                        // Single upsert so the claim replaces a dead record
                        // atomically on the venue key
                        self.conn.execute(
                            "INSERT INTO leases (id, venue_id, device_id, status, acquired_at, heartbeat_at, ttl, expires_at)
                             VALUES (?1, ?2, ?3, 'Active', ?4, ?5, ?6, ?7)
                             ON CONFLICT(venue_id) DO UPDATE SET
                                 id = excluded.id,
                                 device_id = excluded.device_id,
                                 status = excluded.status,
                                 acquired_at = excluded.acquired_at,
                                 heartbeat_at = excluded.heartbeat_at,
                                 ttl = excluded.ttl,
                                 expires_at = excluded.expires_at",
                            params![
                                lease.id,
                                lease.venue_id,
                                lease.device_id,
                                lease.acquired_at,
                                lease.heartbeat_at,
                                lease.ttl,
                                lease.expires_at,
                            ],
                        )?;
                        lease
                    }
                };
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
        let rows = self.conn.execute(
            "UPDATE leases SET heartbeat_at = ?1, expires_at = ?1 + ttl
             WHERE venue_id = ?2 AND device_id = ?3 AND status = 'Active'",
            params![now, venue_id, device_id],
        )?;
        if rows > 0 {
            let expires_at: u64 = self.conn.query_row(
                "SELECT expires_at FROM leases WHERE venue_id = ?1",
                params![venue_id],
                |row| row.get(0),
            )?;
            return Ok(RenewOutcome::Renewed { expires_at });
        }

        // Guard failed: distinguish a stolen venue from a missing record
        match self.lease_row(venue_id)? {
            Some(lease) if !lease.is_held_by(device_id) => Ok(RenewOutcome::LostToPeer {
                holder_device: lease.device_id,
            }),
            _ => Ok(RenewOutcome::NoLease),
        }
    }

    fn release(&mut self, venue_id: &str, device_id: &str) -> Result<bool, StoreError> {
        let rows = self.conn.execute(
            "UPDATE leases SET status = 'Offline'
             WHERE venue_id = ?1 AND device_id = ?2 AND status = 'Active'",
            params![venue_id, device_id],
        )?;
        Ok(rows > 0)
    }

    fn current(&self, venue_id: &str) -> Result<Option<Lease>, StoreError> {
        self.lease_row(venue_id)
    }

    fn evict_expired(&mut self, now: u64) -> Result<usize, StoreError> {
        Ok(self.conn.execute(
            "UPDATE leases SET status = 'Expired' WHERE status = 'Active' AND expires_at <= ?1",
            params![now],
        )?)
    }
}

impl CommandStore for SqliteVenueStore {
    fn append(&mut self, command: Command) -> Result<(), StoreError> {
        let kind_json = serde_json::to_string(&command.kind)?;
        self.conn.execute(
            "INSERT INTO commands (id, venue_id, kind, issued_by, issued_at, executed_by, executed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                command.id,
                command.venue_id,
                kind_json,
                command.issued_by,
                command.issued_at,
                command.executed_by,
                command.executed_at,
            ],
        )?;
        Ok(())
    }

    fn pending(&self, venue_id: &str) -> Result<Vec<Command>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, venue_id, kind, issued_by, issued_at, executed_by, executed_at
             FROM commands WHERE venue_id = ?1 AND executed_at IS NULL
             ORDER BY issued_at, id",
        )?;
        let rows: Vec<Command> = stmt
            .query_map(params![venue_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u64>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<u64>>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(
                |(id, venue_id, kind_json, issued_by, issued_at, executed_by, executed_at)| {
                    Ok(Command {
                        id,
                        venue_id,
                        kind: serde_json::from_str(&kind_json)?,
                        issued_by,
                        issued_at,
                        executed_by,
                        executed_at,
                    })
                },
            )
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(rows)
    }

    fn mark_executed(
        &mut self,
        command_id: &str,
        device_id: &str,
        now: u64,
    ) -> Result<bool, StoreError> {
        let rows = self.conn.execute(
            "UPDATE commands SET executed_by = ?1, executed_at = ?2
             WHERE id = ?3 AND executed_at IS NULL",
            params![device_id, now, command_id],
        )?;
        Ok(rows > 0)
    }

    fn purge_issued_before(&mut self, cutoff: u64) -> Result<usize, StoreError> {
        Ok(self.conn.execute(
            "DELETE FROM commands WHERE issued_at < ?1",
            params![cutoff],
        )?)
    }
}

impl SnapshotStore for SqliteVenueStore {
    fn publish(&mut self, snapshot: PlayerStateSnapshot, now: u64) -> Result<bool, StoreError> {
        let holder_ok = self
            .lease_row(&snapshot.venue_id)?
            .map(|l| l.is_live(now) && l.is_held_by(&snapshot.updated_by))
            .unwrap_or(false);
        if !holder_ok {
            return Ok(false);
        }

        let now_playing_json = snapshot
            .now_playing
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO snapshots (venue_id, now_playing, is_playing, volume, last_updated, updated_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                snapshot.venue_id,
                now_playing_json,
                snapshot.is_playing,
                snapshot.volume,
                snapshot.last_updated,
                snapshot.updated_by,
            ],
        )?;
        Ok(true)
    }

    fn latest(&self, venue_id: &str) -> Result<Option<PlayerStateSnapshot>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT venue_id, now_playing, is_playing, volume, last_updated, updated_by
                 FROM snapshots WHERE venue_id = ?1",
                params![venue_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, bool>(2)?,
                        row.get::<_, u8>(3)?,
                        row.get::<_, u64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((venue_id, now_playing_json, is_playing, volume, last_updated, updated_by)) => {
                let now_playing = now_playing_json
                    .map(|json| serde_json::from_str(&json))
                    .transpose()?;
                Ok(Some(PlayerStateSnapshot {
                    venue_id,
                    now_playing,
                    is_playing,
                    volume,
                    last_updated,
                    updated_by,
                }))
            }
        }
    }
}

impl VenueStore for SqliteVenueStore {}
