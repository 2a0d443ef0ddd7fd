//! Bench Configuration Module
//!
//! Per-rig configuration loaded from TOML files, replacing hardcoded
//! gateway addresses and sampling defaults with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `REDUCER_BENCH_CONFIG` environment variable (path to TOML file)
//! 2. `bench_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(BenchConfig::load());
//!
//! // Anywhere in the codebase:
//! let addr = &config::get().server.addr;
//! ```

mod bench_config;

pub use bench_config::*;

use std::sync::OnceLock;

/// Global bench configuration, initialized once at startup.
static BENCH_CONFIG: OnceLock<BenchConfig> = OnceLock::new();

/// Initialize the global bench configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: BenchConfig) {
    if BENCH_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global bench configuration.
///
/// Falls back to built-in defaults if `init()` was never called, so library
/// consumers and tests do not need a startup step.
pub fn get() -> &'static BenchConfig {
    BENCH_CONFIG.get_or_init(BenchConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    BENCH_CONFIG.get().is_some()
}
