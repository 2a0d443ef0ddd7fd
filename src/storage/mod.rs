//! Persistent storage for completed recordings.

pub mod recordings;

pub use recordings::{RecordingStore, StorageError, StoredRecording};
