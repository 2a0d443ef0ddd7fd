//! Bench configuration — rig identity, gateway addresses, sampling defaults
//!
//! Every struct implements `Default` with the values the service shipped
//! with, so behavior is unchanged when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Configuration load/parse errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a test-bench deployment.
///
/// Load with `BenchConfig::load()` which searches:
/// 1. `$REDUCER_BENCH_CONFIG` env var
/// 2. `./bench_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Rig identification
    #[serde(default)]
    pub rig: RigInfo,

    /// DAQ gateway endpoints
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Sampling and display cadence defaults
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// On-disk storage locations
    #[serde(default)]
    pub storage: StorageConfig,
}

impl BenchConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("REDUCER_BENCH_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), rig = %config.rig.name, "Loaded bench config from REDUCER_BENCH_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from REDUCER_BENCH_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "REDUCER_BENCH_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("bench_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(rig = %config.rig.name, "Loaded bench config from ./bench_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./bench_config.toml, using defaults");
                }
            }
        }

        info!("No bench_config.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Rig identity shown on the dashboard and stamped into logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigInfo {
    /// Bench identifier
    #[serde(default = "default_rig_name")]
    pub name: String,

    /// Reducer model under test
    #[serde(default)]
    pub model: String,
}

fn default_rig_name() -> String {
    "BENCH-001".to_string()
}

impl Default for RigInfo {
    fn default() -> Self {
        Self {
            name: default_rig_name(),
            model: String::new(),
        }
    }
}

/// DAQ gateway endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,

    /// Path of the live-data collection endpoint
    #[serde(default = "default_collection_path")]
    pub collection_path: String,

    /// Path of the command write endpoint
    #[serde(default = "default_write_path")]
    pub write_path: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_base_url() -> String {
    "http://127.0.0.1:1880".to_string()
}

fn default_collection_path() -> String {
    "/get/datas".to_string()
}

fn default_write_path() -> String {
    "/set/data".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    5
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_base_url(),
            collection_path: default_collection_path(),
            write_path: default_write_path(),
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    /// Full URL of the live-data collection endpoint.
    pub fn collection_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.collection_path)
    }

    /// Full URL of the command write endpoint.
    pub fn write_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.write_path)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

/// Sampling and display cadence defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Default sampling period in milliseconds (operator-adjustable at runtime)
    #[serde(default = "default_sample_interval_ms")]
    pub default_interval_ms: u64,

    /// Display refresh period in milliseconds before any rate change
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
}

fn default_sample_interval_ms() -> u64 {
    100
}

fn default_render_interval_ms() -> u64 {
    500
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: default_sample_interval_ms(),
            render_interval_ms: default_render_interval_ms(),
        }
    }
}

/// On-disk storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the recordings database and the in-progress snapshot
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}
