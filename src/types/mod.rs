//! Shared types for the test-bench monitoring service.

mod command;
mod curves;
mod sample;

pub use command::{CommandRecord, TestCommand};
pub use curves::{ClassifiedSeries, CurveSeries, RenderFrame};
pub use sample::Sample;

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
