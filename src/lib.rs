// src/lib.rs

pub mod cache;
pub mod clock;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod monitor;
pub mod operation;
pub mod optimizer;
pub mod plan;
pub mod types;

use std::path::Path;

use tracing::{debug, info};

pub use crate::engine::{ExecutionReport, Scheduler};
pub use crate::operation::{ExecutionContext, Invocation, Operation, OperationKind};
pub use crate::plan::OptimizationOptions;

use crate::config::loader::load_and_validate;
use crate::errors::Result;

/// Load a TOML config from `path`, set up logging from its `log_level`, and
/// build a scheduler from it.
///
/// Logging setup failures (e.g. a subscriber is already installed) are
/// logged at debug level and otherwise ignored, so this can be called from
/// processes that configure tracing themselves.
pub fn scheduler_from_path(path: impl AsRef<Path>) -> Result<Scheduler> {
    let path = path.as_ref();
    let cfg = load_and_validate(path)?;
    if let Err(e) = logging::init_logging(cfg.log_level) {
        debug!(error = %e, "keeping the existing tracing subscriber");
    }
    info!(config = %path.display(), "loaded scheduler config");
    Scheduler::new(cfg)
}
