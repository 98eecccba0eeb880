//! Shared types for the wanctl platform.
//!
//! This crate contains:
//! - **Config schema** — raw YAML shape plus validated, invariant-checked types
//! - **Snapshot schema** — the forward-compatible per-WAN persisted state
//! - **Error types** — the closed error enums shared across layers
//! - **Health schema** — the JSON shape served by the daemon's health endpoint

pub mod config;
pub mod error;
pub mod health;
pub mod snapshot;

pub use config::{FsmKind, ValidatedWanConfig, WanFile};
pub use error::{ConfigError, PersistenceError};
pub use health::HealthSnapshot;
pub use snapshot::SnapshotRecord;
