use serde::{Deserialize, Serialize};

/// Opaque reference to a queued track. The duration is used for
/// scheduling only; the queue documents themselves are externally owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: String,
    pub title: String,
    pub duration_ms: u64,
}

/// The track currently on the venue player, with playback position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub track: TrackRef,
    pub position_ms: u64,
}

/// Latest published playback state for a venue.
///
/// Owned exclusively by whichever device holds the live lease; a stale
/// writer's update is rejected by the store. Observers read this instead
/// of polling the lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStateSnapshot {
    pub venue_id: String,
    pub now_playing: Option<NowPlaying>,
    pub is_playing: bool,
    pub volume: u8,
    pub last_updated: u64,
    /// Device that wrote the snapshot; must match the live lease holder
    pub updated_by: String,
}
