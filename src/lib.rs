//! Reducer Bench: Harmonic-Reducer Test Rig Monitoring
//!
//! Monitoring and control service for a harmonic-reducer (gearbox) test
//! bench.
//!
//! ## Architecture
//!
//! - **Recorder**: real-time hysteresis acquisition — sampling timer,
//!   append-only sample log, last-known-value fallback
//! - **Classifier**: decomposes the log into forward/reverse/full traces
//! - **Render Feed**: display-clock push of classified series to the plot
//! - **Snapshot**: crash/restart recovery of the in-progress recording
//! - **Gateway**: HTTP boundary to the DAQ gateway (live data + commands)
//! - **API**: axum endpoints consumed by the browser dashboard

pub mod api;
pub mod config;
pub mod gateway;
pub mod recorder;
pub mod snapshot;
pub mod storage;
pub mod types;

// Re-export bench configuration
pub use config::BenchConfig;

// Re-export the recorder core
pub use recorder::{
    classify, CurvePlotter, FinishedRecording, GatewaySource, LatestFramePlotter, Recorder,
    RecorderStatus, RenderFeed, SampleSource, SyntheticSource, MIN_SAMPLE_INTERVAL_MS,
};

// Re-export the gateway boundary
pub use gateway::{GatewayClient, GatewayError, Reading};

// Re-export persistence
pub use snapshot::{
    FileSnapshotStore, InMemorySnapshotStore, RecordingSnapshot, SnapshotStore, SNAPSHOT_KEY,
};
pub use storage::{RecordingStore, StorageError, StoredRecording};

// Re-export commonly used types
pub use types::{ClassifiedSeries, CurveSeries, RenderFrame, Sample, TestCommand};
