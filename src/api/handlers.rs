//! API request handlers for the bench dashboard.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::gateway::GatewayClient;
use crate::recorder::{LatestFramePlotter, Recorder, RenderFeed};
use crate::storage::{RecordingStore, StoredRecording};
use crate::types::{now_ms, CommandRecord, Sample, TestCommand};

/// Maximum command outcomes kept for the history view.
pub const MAX_COMMAND_HISTORY: usize = 200;

/// Shared state for all dashboard endpoints.
#[derive(Clone)]
pub struct ApiState {
    pub recorder: Recorder,
    pub render_feed: Arc<RenderFeed>,
    pub plotter: Arc<LatestFramePlotter>,
    pub gateway: Arc<GatewayClient>,
    /// None when the store failed to open — recordings are then not persisted
    pub recordings: Option<RecordingStore>,
    /// Recent command outcomes, newest at the back
    pub commands: Arc<std::sync::Mutex<VecDeque<CommandRecord>>>,
    pub rig_name: String,
    /// Display refresh period used until the operator picks a sampling rate
    pub render_interval_ms: u64,
    pub started: Instant,
}

impl ApiState {
    fn push_command_record(&self, record: CommandRecord) {
        if let Ok(mut commands) = self.commands.lock() {
            if commands.len() >= MAX_COMMAND_HISTORY {
                commands.pop_front();
            }
            commands.push_back(record);
        }
    }
}

// ============================================================================
// Service status
// ============================================================================

/// GET /api/status — service identity, uptime, and recorder state
pub async fn get_status(State(state): State<ApiState>) -> Response {
    let recording = state.recorder.status().await;
    let stored = state.recordings.as_ref().map(RecordingStore::count);

    ApiResponse::ok(json!({
        "rig": state.rig_name,
        "uptimeSecs": state.started.elapsed().as_secs(),
        "gateway": state.gateway.collection_url(),
        "recording": recording,
        "storedRecordings": stored,
    }))
}

// ============================================================================
// Live data
// ============================================================================

/// GET /api/data/current — one normalized live reading
///
/// Bare shape by contract: `{"angle": number|null, "torque": number|null}`.
/// An unreachable gateway yields nulls, never zeros and never an error
/// status.
pub async fn get_current_data(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let reading = state.gateway.fetch_current().await;
    Json(json!({
        "angle": reading.angle(),
        "torque": reading.torque(),
    }))
}

/// GET /api/data/measurements — raw latest gateway payload
pub async fn get_measurements(State(state): State<ApiState>) -> Response {
    match state.gateway.fetch_raw().await {
        Ok(payload) => ApiResponse::ok(payload),
        Err(e) => ApiErrorResponse::service_unavailable(format!("gateway unavailable: {e}")),
    }
}

// ============================================================================
// Completed recordings
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaveRecordingRequest {
    pub points: Vec<Sample>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// POST /api/data/hysteresis — persist a completed recording
///
/// Fired once per completed session by the recorder itself, and available
/// to gateway flows that push externally-captured curves.
pub async fn save_hysteresis(
    State(state): State<ApiState>,
    Json(req): Json<SaveRecordingRequest>,
) -> Response {
    if req.points.is_empty() {
        return ApiErrorResponse::bad_request("no data to save");
    }
    let Some(store) = state.recordings.clone() else {
        return ApiErrorResponse::service_unavailable("recording store unavailable");
    };

    let recording = StoredRecording {
        timestamp: req.timestamp.unwrap_or_else(now_ms),
        points: req.points,
    };
    let count = recording.point_count();

    match tokio::task::spawn_blocking(move || store.store(&recording)).await {
        Ok(Ok(())) => ApiResponse::ok(json!({"saved": true, "count": count})),
        Ok(Err(e)) => {
            warn!(error = %e, "failed to save recording");
            ApiErrorResponse::internal("failed to save recording")
        }
        Err(e) => {
            warn!(error = %e, "recording save task failed");
            ApiErrorResponse::internal("failed to save recording")
        }
    }
}

/// GET /api/data/hysteresis — most recently persisted recording
pub async fn get_hysteresis(State(state): State<ApiState>) -> Response {
    let Some(store) = state.recordings.as_ref() else {
        return ApiErrorResponse::service_unavailable("recording store unavailable");
    };

    match store.latest() {
        Some(recording) => ApiResponse::ok(json!({
            "points": recording.points,
            "count": recording.point_count(),
            "timestamp": recording.timestamp,
        })),
        None => ApiErrorResponse::not_found("no recording stored"),
    }
}

// ============================================================================
// Recording control
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingRequest {
    pub interval_ms: Option<u64>,
}

/// POST /api/recording/start
///
/// Pressing start while already recording is a guarded no-op, not an error.
pub async fn start_recording(
    State(state): State<ApiState>,
    body: Option<Json<StartRecordingRequest>>,
) -> Response {
    if state.recorder.is_recording().await {
        return ApiResponse::ok(json!({"started": false, "alreadyRecording": true}));
    }

    let requested = body.and_then(|Json(b)| b.interval_ms);
    let effective = match requested {
        Some(ms) => state.recorder.set_sample_interval(ms).await,
        None => state.recorder.sample_interval_ms().await,
    };

    state.recorder.start_recording().await;
    // The display clock tracks the operator's rate choice; without one it
    // runs at the configured default refresh period.
    let display_ms = requested.map_or(state.render_interval_ms, |_| effective);
    state.render_feed.start(display_ms).await;

    ApiResponse::ok(json!({"started": true, "intervalMs": effective}))
}

/// POST /api/recording/stop
///
/// Stops the timers, runs one final render pass, and persists the finished
/// point set. Persist failure is reported but never fatal; stop while idle
/// is a silent no-op.
pub async fn stop_recording(State(state): State<ApiState>) -> Response {
    let Some(finished) = state.recorder.stop_recording().await else {
        return ApiResponse::ok(json!({"stopped": false, "alreadyIdle": true}));
    };

    state.render_feed.stop().await;
    state.render_feed.render_once().await;

    if finished.points.is_empty() {
        warn!("no recorded data to save");
    } else if let Some(store) = state.recordings.clone() {
        let recording = StoredRecording {
            timestamp: finished.stopped_at,
            points: finished.points.clone(),
        };
        // Fire and forget — a failed save must not fail the stop.
        tokio::task::spawn_blocking(move || {
            if let Err(e) = store.store(&recording) {
                warn!(error = %e, "failed to save completed recording");
            }
        });
    }

    ApiResponse::ok(json!({
        "stopped": true,
        "points": finished.points.len(),
        "forward": finished.series.forward.len(),
        "reverse": finished.series.reverse.len(),
        "durationSecs": finished.duration_secs(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub interval_ms: u64,
}

/// POST /api/recording/rate — change the sampling period
///
/// The render feed is restarted at the new cadence so the display never
/// runs on a stale rate assumption.
pub async fn set_recording_rate(
    State(state): State<ApiState>,
    Json(req): Json<RateRequest>,
) -> Response {
    let effective = state.recorder.set_sample_interval(req.interval_ms).await;

    if state.recorder.is_recording().await {
        state.render_feed.start(effective).await;
    }

    ApiResponse::ok(json!({
        "intervalMs": effective,
        "hz": 1000.0 / effective as f64,
    }))
}

/// GET /api/recording/status
pub async fn get_recording_status(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.recorder.status().await)
}

/// GET /api/recording/series — latest frame for the dashboard plot
///
/// `data` is null until the first frame has been rendered.
pub async fn get_recording_series(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.plotter.latest())
}

// ============================================================================
// Commands
// ============================================================================

/// POST /api/command/set/data — forward an operator command to the gateway
pub async fn send_command(
    State(state): State<ApiState>,
    Json(command): Json<TestCommand>,
) -> Response {
    let name = command.name().to_string();

    match state.gateway.send_command(&command).await {
        Ok(response) => {
            state.push_command_record(CommandRecord {
                command: name.clone(),
                success: true,
                timestamp: now_ms(),
                response: Some(response.clone()),
                error: None,
            });
            ApiResponse::ok(json!({"sent": true, "command": name, "response": response}))
        }
        Err(e) => {
            warn!(command = %name, error = %e, "command forwarding failed");
            state.push_command_record(CommandRecord {
                command: name,
                success: false,
                timestamp: now_ms(),
                response: None,
                error: Some(e.to_string()),
            });
            ApiErrorResponse::service_unavailable(format!("gateway rejected command: {e}"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/command/history — recent command outcomes, newest first
pub async fn get_command_history(
    State(state): State<ApiState>,
    Query(params): Query<HistoryParams>,
) -> Response {
    let limit = params.limit.unwrap_or(50).min(MAX_COMMAND_HISTORY);

    let history: Vec<CommandRecord> = state
        .commands
        .lock()
        .map(|commands| commands.iter().rev().take(limit).cloned().collect())
        .unwrap_or_default();

    ApiResponse::ok(json!({
        "history": history,
        "count": history.len(),
        "limit": limit,
    }))
}
