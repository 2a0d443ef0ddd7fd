//! Completed hysteresis recording storage
//!
//! Persists finished recordings to a sled DB for later review and export.
//! Uses timestamp-based keys for natural chronological ordering.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Sample;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One completed recording as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecording {
    /// When the recording completed, epoch milliseconds. Also the key.
    pub timestamp: u64,
    /// Full point set in time order
    pub points: Vec<Sample>,
}

impl StoredRecording {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

/// Store of completed recordings.
///
/// Key: timestamp as u64 big-endian bytes (sorts chronologically).
/// Value: JSON-serialized [`StoredRecording`].
///
/// Writes are not flushed individually; sled's background flushing is
/// durable enough here, since a lost recording can be re-run on the bench.
#[derive(Clone)]
pub struct RecordingStore {
    db: Arc<sled::Db>,
}

impl RecordingStore {
    /// Open or create the store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Open an ephemeral store that vanishes on drop (tests and dry runs).
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Store a completed recording, replacing any recording with the same
    /// completion timestamp.
    pub fn store(&self, recording: &StoredRecording) -> Result<(), StorageError> {
        let key = recording.timestamp.to_be_bytes();
        let value = serde_json::to_vec(recording)?;
        self.db.insert(key, value)?;
        Ok(())
    }

    /// The most recently completed recording.
    pub fn latest(&self) -> Option<StoredRecording> {
        for item in self.db.iter().rev() {
            if let Ok((_key, value)) = item {
                if let Ok(recording) = serde_json::from_slice(&value) {
                    return Some(recording);
                }
            }
        }
        None
    }

    /// The most recent N recordings (newest first).
    pub fn recent(&self, limit: usize) -> Vec<StoredRecording> {
        let mut recordings = Vec::with_capacity(limit);

        for item in self.db.iter().rev() {
            if recordings.len() >= limit {
                break;
            }
            if let Ok((_key, value)) = item {
                if let Ok(recording) = serde_json::from_slice::<StoredRecording>(&value) {
                    recordings.push(recording);
                }
            }
        }

        recordings
    }

    /// Total number of stored recordings.
    pub fn count(&self) -> usize {
        self.db.len()
    }

    /// Delete recordings completed before the cutoff. Returns how many went.
    pub fn prune_before(&self, cutoff_ts: u64) -> Result<usize, StorageError> {
        let cutoff_key = cutoff_ts.to_be_bytes();
        let mut deleted = 0;

        let keys_to_delete: Vec<_> = self
            .db
            .iter()
            .filter_map(|item| {
                if let Ok((key, _)) = item {
                    if key.as_ref() < cutoff_key.as_slice() {
                        return Some(key.to_vec());
                    }
                }
                None
            })
            .collect();

        for key in keys_to_delete {
            self.db.remove(key)?;
            deleted += 1;
        }

        if deleted > 0 {
            self.db.flush()?;
        }

        Ok(deleted)
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}
