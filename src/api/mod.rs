//! REST API module using Axum
//!
//! HTTP endpoints for the test-bench dashboard: live readings, recording
//! lifecycle control, classified-series frames for the plot, command
//! forwarding, and persisted recordings.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `REDUCER_BENCH_CORS_ORIGINS` to a comma-separated list of allowed
/// origins for development (e.g. a dashboard dev server).
fn build_cors_layer() -> CorsLayer {
    match std::env::var("REDUCER_BENCH_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
        }
        Err(_) => CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    }
}

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[cfg(test)]
pub(crate) fn test_state() -> ApiState {
    use crate::config::GatewayConfig;
    use crate::gateway::GatewayClient;
    use crate::recorder::{LatestFramePlotter, Recorder, RenderFeed, SyntheticSource};
    use crate::snapshot::InMemorySnapshotStore;
    use crate::storage::RecordingStore;
    use std::sync::Arc;

    // Nothing listens on port 9 — gateway calls fail fast and get absorbed.
    let gateway_cfg = GatewayConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 1,
        ..GatewayConfig::default()
    };
    let gateway = Arc::new(GatewayClient::new(&gateway_cfg).unwrap());

    let recorder = Recorder::new(
        Arc::new(SyntheticSource::default()),
        Arc::new(InMemorySnapshotStore::new()),
        100,
    );
    let plotter = Arc::new(LatestFramePlotter::new());
    let render_feed = Arc::new(RenderFeed::new(
        recorder.clone(),
        Arc::clone(&plotter) as Arc<dyn crate::recorder::CurvePlotter>,
    ));

    ApiState {
        recorder,
        render_feed,
        plotter,
        gateway,
        recordings: RecordingStore::temporary().ok(),
        commands: Arc::new(std::sync::Mutex::new(std::collections::VecDeque::new())),
        rig_name: "BENCH-TEST".to_string(),
        render_interval_ms: 500,
        started: std::time::Instant::now(),
    }
}
