//! Per-WAN persisted state, written atomically between ticks.
//!
//! Schema-less in the forward direction: every field is optional on load so
//! that a newer daemon reading an older snapshot (or vice versa) never
//! fails — missing fields are the caller's responsibility to default
//! (streaks → 0, rates → green floor, EWMAs → seed values), since those
//! defaults need the WAN's config and this crate doesn't know about it.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectionSnapshot {
    #[serde(default)]
    pub green_streak: Option<u64>,
    #[serde(default)]
    pub yellow_streak: Option<u64>,
    #[serde(default)]
    pub soft_red_streak: Option<u64>,
    #[serde(default)]
    pub red_streak: Option<u64>,
    #[serde(default)]
    pub current_rate_mbps: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EwmaSnapshot {
    #[serde(default)]
    pub baseline_rtt_ms: Option<f64>,
    #[serde(default)]
    pub load_rtt_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(default)]
    pub download: DirectionSnapshot,
    #[serde(default)]
    pub upload: DirectionSnapshot,
    #[serde(default)]
    pub ewma: EwmaSnapshot,
    pub timestamp_iso: String,
}

impl SnapshotRecord {
    pub fn path_for(state_dir: &Path, wan_name: &str) -> std::path::PathBuf {
        state_dir.join(format!("{wan_name}_state.json"))
    }

    /// Load a snapshot, treating a missing or corrupt file as "no snapshot"
    /// rather than an error: log a warning and initialize from defaults.
    pub fn load_or_none(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read state snapshot, using defaults");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "state snapshot corrupt, using defaults");
                None
            }
        }
    }

    /// Atomically persist the snapshot: write to a temporary sibling file,
    /// `fsync`, then rename over the destination.
    pub fn save_atomic(&self, path: &Path) -> Result<(), PersistenceError> {
        let path_str = path.display().to_string();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
                path: path_str.clone(),
                source: e,
            })?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(self).map_err(|e| PersistenceError::Malformed {
            path: path_str.clone(),
            source: e,
        })?;

        let mut file = File::create(&tmp_path).map_err(|e| PersistenceError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        file.write_all(body.as_bytes())
            .map_err(|e| PersistenceError::Io {
                path: path_str.clone(),
                source: e,
            })?;
        file.sync_all().map_err(|e| PersistenceError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, path).map_err(|e| PersistenceError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        Ok(())
    }
}
