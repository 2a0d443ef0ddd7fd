//! API route definitions
//!
//! Organizes endpoints for the bench dashboard:
//! - /api/status — service identity and recorder state
//! - /api/data/* — live readings and persisted recordings
//! - /api/command/* — operator command forwarding and history
//! - /api/recording/* — hysteresis recording lifecycle and render feed

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};

/// Create all API routes for the dashboard.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        // Live data
        .route("/data/current", get(handlers::get_current_data))
        .route("/data/measurements", get(handlers::get_measurements))
        // Completed recordings
        .route(
            "/data/hysteresis",
            get(handlers::get_hysteresis).post(handlers::save_hysteresis),
        )
        // Operator commands
        .route("/command/set/data", post(handlers::send_command))
        .route("/command/history", get(handlers::get_command_history))
        // Recording lifecycle
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/rate", post(handlers::set_recording_rate))
        .route("/recording/status", get(handlers::get_recording_status))
        .route("/recording/series", get(handlers::get_recording_series))
        .with_state(state)
}
