mod command;
mod identity;
mod lease;
mod snapshot;

pub use command::{Command, CommandKind, MAX_VOLUME};
pub use identity::DeviceIdentity;
pub use lease::{
    AcquireResult, DenyReason, Grant, Lease, LeaseStatus, MasterDecision, RenewOutcome,
};
pub use snapshot::{NowPlaying, PlayerStateSnapshot, TrackRef};
