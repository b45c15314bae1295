//! In-process push delivery for one venue.
//!
//! Commands are intent and ride a broadcast channel (queue semantics,
//! at-least-once per live subscriber). Snapshots are fact and ride a
//! watch channel (latest value wins, no backlog). Keeping the two apart
//! is deliberate: observers always want the newest truth, never a
//! replay of history.

use tokio::sync::{broadcast, watch};

use crate::types::{Command, PlayerStateSnapshot};

/// Fan-out for newly issued commands.
#[derive(Clone)]
pub struct CommandBus {
    tx: broadcast::Sender<Command>,
}

impl CommandBus {
    pub fn new() -> Self {
        // 64-deep buffer: a subscriber that falls behind loses the oldest
        // notifications and recovers them from the store via polling
        let (tx, _rx) = broadcast::channel(64);
        Self { tx }
    }

    pub fn publish(&self, command: Command) {
        // No subscribers is fine
        let _ = self.tx.send(command);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Command> {
        self.tx.subscribe()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest-value fan-out for published snapshots.
#[derive(Clone)]
pub struct StateBus {
    tx: watch::Sender<Option<PlayerStateSnapshot>>,
}

impl StateBus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn publish(&self, snapshot: PlayerStateSnapshot) {
        let _ = self.tx.send(Some(snapshot));
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PlayerStateSnapshot>> {
        self.tx.subscribe()
    }
}

impl Default for StateBus {
    fn default() -> Self {
        Self::new()
    }
}
