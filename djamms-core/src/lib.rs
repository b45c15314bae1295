//! # djamms-core
//!
//! The coordination kernel for the DJAMMS venue jukebox. Provides
//! master-player election with heartbeat leases, command-channel
//! plumbing, and playback-state broadcasting, so exactly one device per
//! venue is the playback authority at a time.

pub mod bus;
pub mod config;
pub mod election;
pub mod error;
pub mod infrastructure;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
#[cfg(feature = "sqlite")]
#[path = "infrastructure_sqlite.rs"]
pub mod infrastructure_sqlite;
pub mod mirror;
pub mod runtime;
pub mod session;
pub mod types;
pub mod client;

#[cfg(test)]
mod election_test;
#[cfg(test)]
mod session_test;
#[cfg(test)]
mod runtime_test;
