// src/config/mod.rs

//! Scheduler configuration.
//!
//! - [`model`] holds the raw TOML shape and the validated [`SchedulerConfig`].
//! - [`loader`] reads a TOML file from disk.
//! - [`validate`] turns the raw shape into a checked config.
//! - [`duration`] parses `"500ms"` / `"30s"` / `"5m"` / `"1h"` strings.
//! - [`tuning`] is the mutable state the adaptive optimizer writes.

pub mod duration;
pub mod loader;
pub mod model;
pub mod tuning;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    CacheConfig, ExecutionConfig, MonitoringConfig, RawCacheSection, RawExecutionSection,
    RawMonitoringSection, RawSchedulerConfig, SchedulerConfig,
};
pub use tuning::{SharedTuning, TuningState};
