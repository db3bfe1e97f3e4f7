//! Scan Configuration Module
//!
//! Presentation constants (phase durations, outcome probability, temperature
//! ranges, output geometry) loaded from TOML, replacing hardcoded values with
//! operator-tunable ones.
//!
//! ## Loading Order
//!
//! 1. `THERMASCAN_CONFIG` environment variable (path to TOML file)
//! 2. `scan_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The binary calls `config::init()` once at startup, then `config::get()`
//! anywhere. Library components take their config sub-structs explicitly so
//! tests never touch the global.
//!
//! ```ignore
//! // In main():
//! config::init(ScanConfig::load());
//!
//! // Anywhere in the binary:
//! let p = config::get().outcome.favorable_probability;
//! ```

mod scan_config;
pub mod defaults;

pub use scan_config::*;

use std::sync::OnceLock;

/// Global scan configuration, initialized once at startup.
static SCAN_CONFIG: OnceLock<ScanConfig> = OnceLock::new();

/// Initialize the global scan configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: ScanConfig) {
    if SCAN_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global scan configuration.
///
/// Panics if `init()` has not been called. This is by design — a missing
/// config is a fatal startup error, not a recoverable condition.
#[allow(clippy::expect_used)]
pub fn get() -> &'static ScanConfig {
    SCAN_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    SCAN_CONFIG.get().is_some()
}
