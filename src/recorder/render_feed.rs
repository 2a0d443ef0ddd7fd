//! Display-clock render feed for the live hysteresis plot.
//!
//! Runs on its own timer, independent of the sampling timer. Each tick
//! re-runs the classifier over the full log and pushes the three tagged
//! series to the plotting boundary. Rendering shares only read access with
//! the sampler; a frame assembled mid-append is fine because classification
//! re-derives everything from scratch.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::session::Recorder;
use crate::types::{now_ms, CurveSeries, RenderFrame};

/// Fixed series colors and display names for the hysteresis plot.
const HYSTERESIS_COLOR: &str = "#3b82f6";
const FORWARD_COLOR: &str = "#10b981";
const REVERSE_COLOR: &str = "#f59e0b";

const X_LABEL: &str = "Angle (deg)";
const Y_LABEL: &str = "Torque (N·m)";

/// Boundary that accepts assembled curve frames.
///
/// The production implementation hands frames to the dashboard; tests
/// capture them.
pub trait CurvePlotter: Send + Sync {
    fn render(&self, frame: RenderFrame);
}

/// Plotter that keeps only the most recent frame, for polling consumers.
#[derive(Default)]
pub struct LatestFramePlotter {
    latest: std::sync::RwLock<Option<RenderFrame>>,
}

impl LatestFramePlotter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<RenderFrame> {
        self.latest.read().ok().and_then(|f| f.clone())
    }
}

impl CurvePlotter for LatestFramePlotter {
    fn render(&self, frame: RenderFrame) {
        if let Ok(mut latest) = self.latest.write() {
            *latest = Some(frame);
        }
    }
}

/// Periodic push of classified series to the plotting boundary.
///
/// Restarted whenever the sampling interval changes so the display cadence
/// tracks the operator's rate choice; stopped after one final pass when the
/// recording stops.
pub struct RenderFeed {
    recorder: Recorder,
    plotter: Arc<dyn CurvePlotter>,
    task: Mutex<Option<CancellationToken>>,
}

impl RenderFeed {
    pub fn new(recorder: Recorder, plotter: Arc<dyn CurvePlotter>) -> Self {
        Self {
            recorder,
            plotter,
            task: Mutex::new(None),
        }
    }

    /// Start (or restart) the feed at the given display period.
    pub async fn start(&self, interval_ms: u64) {
        let mut task = self.task.lock().await;
        if let Some(running) = task.take() {
            running.cancel();
        }

        let cancel = CancellationToken::new();
        tokio::spawn(run_feed(
            self.recorder.clone(),
            Arc::clone(&self.plotter),
            interval_ms,
            cancel.clone(),
        ));
        *task = Some(cancel);

        info!(interval_ms, "render feed started");
    }

    /// Stop the feed. Idempotent.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        if let Some(running) = task.take() {
            running.cancel();
            debug!("render feed stopped");
        }
    }

    /// Assemble and push one frame immediately, regardless of recording
    /// state. Used for the final pass on stop and the cold-start seed.
    pub async fn render_once(&self) {
        if let Some(frame) = build_frame(&self.recorder).await {
            self.plotter.render(frame);
        }
    }
}

async fn run_feed(
    recorder: Recorder,
    plotter: Arc<dyn CurvePlotter>,
    interval_ms: u64,
    cancel: CancellationToken,
) {
    let period = Duration::from_millis(interval_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !recorder.is_recording().await {
                    continue;
                }
                if let Some(frame) = build_frame(&recorder).await {
                    plotter.render(frame);
                }
            }
        }
    }
}

/// Re-classify the current log and assemble a frame.
///
/// Returns `None` while the log is empty — an empty chart is never pushed.
/// Sub-series that came out empty are omitted from the frame, the full
/// trace always leads.
async fn build_frame(recorder: &Recorder) -> Option<RenderFrame> {
    let series = recorder.reclassify().await;
    if series.is_empty() {
        return None;
    }

    let point_count = series.full.len();
    let duration_secs = recorder.duration_secs().await;

    let mut out = Vec::with_capacity(3);
    out.push(CurveSeries {
        points: series.full,
        color: HYSTERESIS_COLOR.to_string(),
        name: "Hysteresis".to_string(),
    });
    if !series.forward.is_empty() {
        out.push(CurveSeries {
            points: series.forward,
            color: FORWARD_COLOR.to_string(),
            name: "Forward".to_string(),
        });
    }
    if !series.reverse.is_empty() {
        out.push(CurveSeries {
            points: series.reverse,
            color: REVERSE_COLOR.to_string(),
            name: "Reverse".to_string(),
        });
    }

    Some(RenderFrame {
        series: out,
        x_label: X_LABEL.to_string(),
        y_label: Y_LABEL.to_string(),
        point_count,
        duration_secs,
        generated_at: now_ms(),
    })
}
