//! Engine Configuration Module
//!
//! Policy constants for scoring, training and validation, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `HEALTHCAST_CONFIG` environment variable (path to TOML file)
//! 2. `healthcast.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! // In main():
//! config::init(EngineConfig::load());
//!
//! // Anywhere after:
//! let tol = config::get().validation.tie_tolerance_pct;
//! ```
//!
//! Library types take their config by reference, so the global is only a
//! convenience for binaries.

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;

use std::sync::OnceLock;

static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration. Later calls are ignored.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// The global engine configuration, or built-in defaults if `init()` was
/// never called.
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG.get_or_init(EngineConfig::default)
}

pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
