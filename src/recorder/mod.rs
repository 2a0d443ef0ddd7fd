//! Real-time hysteresis-curve acquisition engine.
//!
//! The recorder samples live angle/torque pairs on a timer, buffers them in
//! an append-only log, decomposes the log into forward/reverse/full traces,
//! snapshots in-progress state for crash/restart recovery, and feeds a
//! multi-series curve plotter on an independent display clock.

pub mod classifier;
pub mod render_feed;
pub mod session;
pub mod source;

pub use classifier::classify;
pub use render_feed::{CurvePlotter, LatestFramePlotter, RenderFeed};
pub use session::{FinishedRecording, Recorder, RecorderStatus, MIN_SAMPLE_INTERVAL_MS};
pub use source::{GatewaySource, SampleSource, SyntheticSource};
