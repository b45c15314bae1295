use serde::{Deserialize, Serialize};

use crate::types::{Grant, Lease};

/// Outcome of an election decision, before any store write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionVerdict {
    /// The claim (or reconfirmation) may proceed
    Grantable { grant: Grant },
    /// A different device holds a live lease
    Denied {
        holder_device: String,
        heartbeat_at: u64,
    },
}

/// Pure decision engine for master election.
///
/// Stateless: callers supply the venue's current lease record and the
/// clock; storage backends apply the verdict. Two devices racing an
/// unclaimed venue can both see `Grantable` — the accepted last-write-wins
/// race, resolved when the loser's next renewal is rejected.
pub struct ElectionEngine;

impl ElectionEngine {
    pub fn decide(existing: Option<&Lease>, device_id: &str, now: u64) -> ElectionVerdict {
        let Some(lease) = existing else {
            return ElectionVerdict::Grantable { grant: Grant::Fresh };
        };

        // Expired and Offline records never block a claim
        if !lease.is_live(now) {
            return ElectionVerdict::Grantable { grant: Grant::Fresh };
        }

        if lease.is_held_by(device_id) {
            return ElectionVerdict::Grantable {
                grant: Grant::Reconfirmed,
            };
        }

        ElectionVerdict::Denied {
            holder_device: lease.device_id.clone(),
            heartbeat_at: lease.heartbeat_at,
        }
    }
}
