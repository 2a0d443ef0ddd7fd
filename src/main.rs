//! Reducer Bench — harmonic-reducer test rig monitoring service
//!
//! Polls angle/torque readings from the rig's DAQ gateway, records
//! hysteresis curves, and serves the dashboard API.
//!
//! # Usage
//!
//! ```bash
//! # Run against the configured gateway
//! cargo run --release
//!
//! # Run without hardware using the synthetic source
//! cargo run --release -- --synthetic
//!
//! # Point at a different gateway
//! cargo run --release -- --gateway http://192.168.0.10:1880
//! ```
//!
//! # Environment Variables
//!
//! - `REDUCER_BENCH_CONFIG`: Path to a bench_config.toml
//! - `REDUCER_BENCH_CORS_ORIGINS`: Allowed dashboard origins (dev only)
//! - `RUST_LOG`: Logging level (default: info)

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use reducer_bench::api::{create_app, ApiState};
use reducer_bench::config::{self, BenchConfig};
use reducer_bench::gateway::GatewayClient;
use reducer_bench::recorder::{
    CurvePlotter, GatewaySource, LatestFramePlotter, Recorder, RenderFeed, SampleSource,
    SyntheticSource,
};
use reducer_bench::snapshot::{FileSnapshotStore, SnapshotStore};
use reducer_bench::storage::RecordingStore;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "reducer-bench")]
#[command(about = "Harmonic-reducer test bench monitoring service")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Override the gateway base URL
    /// Example: --gateway http://192.168.0.10:1880
    #[arg(long, value_name = "URL")]
    gateway: Option<String>,

    /// Use the built-in synthetic angle/torque source instead of the gateway
    #[arg(long)]
    synthetic: bool,

    /// Time multiplier for the synthetic source (1 = realtime sweep)
    #[arg(long, default_value = "1")]
    speed: u64,
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
        }
    }
}

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let mut cfg = BenchConfig::load();
    if let Some(addr) = &args.addr {
        cfg.server.addr = addr.clone();
    }
    if let Some(gateway) = &args.gateway {
        cfg.gateway.base_url = gateway.clone();
    }
    config::init(cfg);
    let cfg = config::get();

    info!("🔧 Reducer Bench starting");
    info!("   Rig:     {}", cfg.rig.name);
    info!("   Gateway: {}", cfg.gateway.collection_url());

    std::fs::create_dir_all(&cfg.storage.data_dir)
        .with_context(|| format!("Failed to create data directory {}", cfg.storage.data_dir))?;

    let gateway =
        Arc::new(GatewayClient::new(&cfg.gateway).context("Failed to build gateway client")?);

    let snapshots: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(&cfg.storage.data_dir));

    let recordings_path = Path::new(&cfg.storage.data_dir).join("recordings.db");
    let recordings = match RecordingStore::open(&recordings_path) {
        Ok(store) => {
            info!(
                "✓ Recording store opened ({} stored recordings)",
                store.count()
            );
            Some(store)
        }
        Err(e) => {
            warn!(
                "Failed to open recording store: {}. Completed recordings will not be persisted.",
                e
            );
            None
        }
    };

    let source: Arc<dyn SampleSource> = if args.synthetic {
        info!("🧪 Using synthetic angle/torque source (speed {}x)", args.speed);
        Arc::new(SyntheticSource::new(args.speed as f64))
    } else {
        Arc::new(GatewaySource::new(Arc::clone(&gateway)))
    };

    let recorder = Recorder::new(
        source,
        Arc::clone(&snapshots),
        cfg.sampling.default_interval_ms,
    );
    let plotter = Arc::new(LatestFramePlotter::new());
    let render_feed = Arc::new(RenderFeed::new(
        recorder.clone(),
        Arc::clone(&plotter) as Arc<dyn CurvePlotter>,
    ));

    // Cold-start recovery: a leftover snapshot means the process died while
    // a recording was in progress (or just after one completed). Seed the
    // session and the plot from it before any new samples arrive. The
    // snapshot is only consulted here — once the session exists, in-memory
    // state wins.
    if snapshots.exists() {
        if let Some(snapshot) = snapshots.load() {
            recorder.seed_from_snapshot(snapshot).await;
            render_feed.render_once().await;
        }
    }

    let state = ApiState {
        recorder: recorder.clone(),
        render_feed,
        plotter,
        gateway,
        recordings,
        commands: Arc::new(std::sync::Mutex::new(VecDeque::new())),
        rig_name: cfg.rig.name.clone(),
        render_interval_ms: cfg.sampling.render_interval_ms,
        started: Instant::now(),
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&cfg.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", cfg.server.addr))?;
    info!("✓ HTTP server listening on {}", cfg.server.addr);
    info!("");
    info!("🎯 Dashboard API available at: http://{}", cfg.server.addr);
    info!("");

    let cancel_token = CancellationToken::new();
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            cancel_token.cancel();
        }
        Some(result) = task_set.join_next() => {
            match result {
                Ok(Ok(name)) => info!("[{}] Task exited", name),
                Ok(Err(e)) => error!("Task failed: {}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
            cancel_token.cancel();
        }
    }

    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(Ok(name)) => info!("[{}] Task finished", name),
            Ok(Err(e)) => error!("Task failed during shutdown: {}", e),
            Err(e) => error!("Task panicked during shutdown: {}", e),
        }
    }

    // Mirror the dashboard unload rule: the snapshot survives shutdown only
    // while a recording is actively in progress, so a restart can resume
    // display; otherwise it is stale and goes away.
    if recorder.is_recording().await {
        info!("Recording in progress at shutdown — snapshot retained for recovery");
    } else {
        snapshots.clear();
    }

    info!("Shutdown complete");
    Ok(())
}
