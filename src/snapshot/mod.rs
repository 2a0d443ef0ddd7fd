//! In-progress recording snapshot persistence.
//!
//! A single snapshot slot lets a restarted process recover the in-progress
//! or just-completed recording for display. The slot is a mailbox, not a
//! database: writing replaces the previous snapshot, last writer wins, and
//! no cross-process coordination is attempted.
//!
//! Backends implement [`SnapshotStore`]:
//! - `FileSnapshotStore`: JSON file in the data directory (production)
//! - `InMemorySnapshotStore`: for tests and ephemeral deployments
//!
//! Every operation absorbs its own failures. A save that cannot reach disk
//! is logged and dropped; a snapshot that no longer parses is treated
//! exactly like an absent one. Recording must never be interrupted by
//! storage trouble.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::Sample;

/// Storage key for the in-progress recording snapshot.
pub const SNAPSHOT_KEY: &str = "hysteresis_realtime_data";

/// Point-in-time copy of a recording session and its classified series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSnapshot {
    /// Raw sample log in append order
    #[serde(default)]
    pub data: Vec<Sample>,
    #[serde(default)]
    pub forward_data: Vec<Sample>,
    #[serde(default)]
    pub reverse_data: Vec<Sample>,
    #[serde(default)]
    pub hysteresis_data: Vec<Sample>,
    /// Session start, epoch milliseconds
    #[serde(default)]
    pub start_time: Option<u64>,
    /// When this snapshot was written, epoch milliseconds
    #[serde(default)]
    pub last_update: u64,
}

/// Pluggable snapshot backend.
///
/// Implementations must be thread-safe (`Send + Sync`) — the sampling task
/// and the composition root both touch the store.
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot, replacing any prior one. Failures are absorbed.
    fn save(&self, snapshot: &RecordingSnapshot);

    /// Load the stored snapshot. Absent and malformed both yield `None`.
    fn load(&self) -> Option<RecordingSnapshot>;

    /// Remove the stored snapshot. Failures are absorbed.
    fn clear(&self);

    /// Whether a snapshot is present, independent of whether it parses.
    fn exists(&self) -> bool;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// File-backed store
// ============================================================================

/// Snapshot slot stored as `<data_dir>/<SNAPSHOT_KEY>.json`.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store rooted in the given data directory.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{SNAPSHOT_KEY}.json")),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &RecordingSnapshot) {
        let json = match serde_json::to_vec(snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize recording snapshot");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "failed to write recording snapshot");
        }
    }

    fn load(&self) -> Option<RecordingSnapshot> {
        let contents = std::fs::read(&self.path).ok()?;
        match serde_json::from_slice(&contents) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "stored snapshot does not parse, ignoring");
                None
            }
        }
    }

    fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to clear recording snapshot");
            }
        }
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn backend_name(&self) -> &'static str {
        "File"
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Snapshot slot held in memory. Not durable — for tests and ephemeral runs.
///
/// Stores the serialized form so `exists()` and `load()` behave like the
/// file backend, including the absent-vs-malformed distinction.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    slot: RwLock<Option<String>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot with raw bytes, bypassing serialization.
    ///
    /// Lets tests stage a malformed snapshot.
    pub fn put_raw(&self, raw: &str) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(raw.to_string());
        }
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&self, snapshot: &RecordingSnapshot) {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize recording snapshot");
                return;
            }
        };
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(json);
        }
    }

    fn load(&self) -> Option<RecordingSnapshot> {
        let slot = self.slot.read().ok()?;
        let raw = slot.as_ref()?;
        match serde_json::from_str(raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(error = %e, "stored snapshot does not parse, ignoring");
                None
            }
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = None;
        }
    }

    fn exists(&self) -> bool {
        self.slot.read().map(|s| s.is_some()).unwrap_or(false)
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}
