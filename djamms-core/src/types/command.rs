use nanoid::nanoid;
use serde::{Deserialize, Serialize};

/// Highest accepted volume level
pub const MAX_VOLUME: u8 = 100;

/// Playback instructions a client may issue for the venue master.
/// A closed union: each kind carries its own payload shape, so a
/// malformed payload is unrepresentable past the deserialization edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandKind {
    Play,
    Pause,
    Skip,
    Volume { level: u8 },
    Seek { position_ms: u64 },
}

impl CommandKind {
    /// Range checks the type system cannot express. Invalid commands are
    /// dropped by the consumer but still marked executed.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            CommandKind::Volume { level } if *level > MAX_VOLUME => Err(format!(
                "volume level {} out of range 0-{}",
                level, MAX_VOLUME
            )),
            _ => Ok(()),
        }
    }
}

/// An issued playback instruction, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Unique command ID
    pub id: String,
    /// Venue the command targets
    pub venue_id: String,
    /// What the master should do
    pub kind: CommandKind,
    /// Client that issued the command (any client may issue)
    pub issued_by: String,
    pub issued_at: u64,
    /// Master device that processed the command, once handled
    pub executed_by: Option<String>,
    pub executed_at: Option<u64>,
}

impl Command {
    pub fn new(venue_id: String, kind: CommandKind, issued_by: String, now: u64) -> Self {
        Self {
            id: format!("cmd_{}", nanoid!(12)),
            venue_id,
            kind,
            issued_by,
            issued_at: now,
            executed_by: None,
            executed_at: None,
        }
    }

    /// Consumers skip commands that were already handled
    pub fn is_executed(&self) -> bool {
        self.executed_at.is_some()
    }
}
