#![deny(clippy::all)]

use napi_derive::napi;

use djamms_core::client::VenueClient as RustClient;
use djamms_core::types::{CommandKind, DenyReason, Grant, NowPlaying, PlayerStateSnapshot, RenewOutcome};

// ─── JS-facing VenueClient ─────────────────────────────────────────────────

#[napi]
pub struct VenueClient {
    inner: RustClient,
}

#[napi]
impl VenueClient {
    #[napi(constructor)]
    pub fn new() -> Self {
        Self {
            inner: RustClient::new(),
        }
    }

    /// Acquire or reconfirm mastery of a venue for a device.
    /// Returns a JSON string with the decision.
    #[napi]
    pub fn request_master(&mut self, venue_id: String, device_id: String) -> String {
        let decision = self.inner.request_master(&venue_id, &device_id);

        match (decision.lease, decision.reason) {
            (Some(lease), _) => {
                let grant = match decision.grant {
                    Some(Grant::Reconfirmed) => "RECONFIRMED",
                    _ => "FRESH",
                };
                serde_json::json!({
                    "granted": true,
                    "grant": grant,
                    "leaseId": lease.id,
                    "deviceId": lease.device_id,
                    "expiresAt": lease.expires_at,
                })
                .to_string()
            }
            (None, Some(DenyReason::MasterActive {
                holder_device,
                heartbeat_at,
            })) => serde_json::json!({
                "granted": false,
                "reason": "MASTER_ACTIVE",
                "holderDevice": holder_device,
                "heartbeatAt": heartbeat_at,
            })
            .to_string(),
            (None, Some(DenyReason::NetworkError { detail })) => serde_json::json!({
                "granted": false,
                "reason": "NETWORK_ERROR",
                "error": detail,
            })
            .to_string(),
            (None, None) => serde_json::json!({
                "granted": false,
            })
            .to_string(),
        }
    }

    /// Release a held venue. Best-effort on page unload.
    #[napi]
    pub fn release_master(&mut self, venue_id: String, device_id: String) -> bool {
        self.inner
            .release_master(&venue_id, &device_id)
            .unwrap_or(false)
    }

    /// Renew the venue lease for its holder.
    /// Returns a JSON string with the outcome.
    #[napi]
    pub fn heartbeat(&mut self, venue_id: String, device_id: String) -> String {
        match self.inner.heartbeat(&venue_id, &device_id) {
            Ok(RenewOutcome::Renewed { expires_at }) => serde_json::json!({
                "renewed": true,
                "expiresAt": expires_at,
            })
            .to_string(),
            Ok(RenewOutcome::LostToPeer { holder_device }) => serde_json::json!({
                "renewed": false,
                "reason": "LOST_TO_PEER",
                "holderDevice": holder_device,
            })
            .to_string(),
            Ok(RenewOutcome::NoLease) => serde_json::json!({
                "renewed": false,
                "reason": "NO_LEASE",
            })
            .to_string(),
            Err(err) => serde_json::json!({
                "renewed": false,
                "reason": "NETWORK_ERROR",
                "error": err.to_string(),
            })
            .to_string(),
        }
    }

    /// Issue a playback command. `command_json` is the tagged payload,
    /// e.g. `{"kind":"volume","level":40}`.
    /// Returns a JSON string with the created command (or the error).
    #[napi]
    pub fn issue_command(
        &mut self,
        venue_id: String,
        command_json: String,
        issued_by: String,
    ) -> String {
        let kind: CommandKind = match serde_json::from_str(&command_json) {
            Ok(kind) => kind,
            Err(err) => {
                return serde_json::json!({
                    "success": false,
                    "error": format!("invalid command payload: {}", err),
                })
                .to_string();
            }
        };

        match self.inner.issue_command(&venue_id, kind, &issued_by) {
            Ok(command) => serde_json::json!({
                "success": true,
                "commandId": command.id,
                "issuedBy": command.issued_by,
                "issuedAt": command.issued_at,
            })
            .to_string(),
            Err(err) => serde_json::json!({
                "success": false,
                "error": err.to_string(),
            })
            .to_string(),
        }
    }

    /// Unexecuted commands for a venue, in receipt order.
    /// Returns a JSON array string.
    #[napi]
    pub fn pending_commands(&self, venue_id: String) -> String {
        let pending = self.inner.pending_commands(&venue_id).unwrap_or_default();
        let items: Vec<serde_json::Value> = pending
            .iter()
            .map(|command| {
                serde_json::json!({
                    "commandId": command.id,
                    "kind": command.kind,
                    "issuedBy": command.issued_by,
                    "issuedAt": command.issued_at,
                })
            })
            .collect();
        serde_json::json!(items).to_string()
    }

    /// Stamp a command as handled by the given master device.
    #[napi]
    pub fn mark_executed(&mut self, command_id: String, device_id: String) -> bool {
        self.inner
            .mark_executed(&command_id, &device_id)
            .unwrap_or(false)
    }

    /// Publish the venue snapshot. `now_playing_json` uses the core
    /// schema, e.g. `{"track":{"id":"t1","title":"...","duration_ms":1000},"position_ms":0}`.
    /// Returns false when the writer does not hold the live lease.
    #[napi]
    pub fn publish_state(
        &mut self,
        venue_id: String,
        device_id: String,
        is_playing: bool,
        volume: u32,
        now_playing_json: Option<String>,
    ) -> bool {
        let now_playing: Option<NowPlaying> = now_playing_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok());

        let snapshot = PlayerStateSnapshot {
            venue_id,
            now_playing,
            is_playing,
            volume: volume.min(u8::MAX as u32) as u8,
            last_updated: 0, // stamped by the client
            updated_by: device_id,
        };

        self.inner.publish_state(snapshot).unwrap_or(false)
    }

    /// Latest published snapshot for a venue, as a JSON string, or None.
    #[napi]
    pub fn latest_state(&self, venue_id: String) -> Option<String> {
        let snapshot = self.inner.latest_state(&venue_id).ok().flatten()?;
        Some(
            serde_json::json!({
                "venueId": snapshot.venue_id,
                "nowPlaying": snapshot.now_playing,
                "isPlaying": snapshot.is_playing,
                "volume": snapshot.volume,
                "lastUpdated": snapshot.last_updated,
                "updatedBy": snapshot.updated_by,
            })
            .to_string(),
        )
    }

    /// Current lease record for a venue, as a JSON string, or None.
    #[napi]
    pub fn current_master(&self, venue_id: String) -> Option<String> {
        let lease = self.inner.current_master(&venue_id).ok().flatten()?;
        Some(
            serde_json::json!({
                "venueId": lease.venue_id,
                "deviceId": lease.device_id,
                "status": format!("{:?}", lease.status),
                "heartbeatAt": lease.heartbeat_at,
                "expiresAt": lease.expires_at,
            })
            .to_string(),
        )
    }

    /// Expire overdue leases and purge aged commands.
    /// Returns a JSON string with the sweep counts.
    #[napi]
    pub fn sweep(&mut self) -> String {
        match self.inner.sweep() {
            Ok(report) => serde_json::json!({
                "success": true,
                "leasesExpired": report.leases_expired,
                "commandsPurged": report.commands_purged,
            })
            .to_string(),
            Err(err) => serde_json::json!({
                "success": false,
                "error": err.to_string(),
            })
            .to_string(),
        }
    }
}

impl Default for VenueClient {
    fn default() -> Self {
        Self::new()
    }
}
