//! valet-infra: infrastructure implementations of the valet-core traits.
//!
//! SQLite repositories (WAL, split read/write pools), the filesystem persona
//! store, TOML configuration loading, and HTTP clients for the read-only
//! search and social APIs.

pub mod config;
pub mod fs;
pub mod search;
pub mod sqlite;
