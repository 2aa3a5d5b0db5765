// src/operation/outcome.rs

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Why a single operation did not produce a value.
///
/// These are recorded per operation and never abort siblings or the plan.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum OperationError {
    #[error("operation failed: {0}")]
    Failed(String),

    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("operation panicked: {0}")]
    Panicked(String),
}

/// Successful result of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub value: Value,
    /// `true` when the value was served from the cache without running work.
    pub from_cache: bool,
    pub elapsed: Duration,
}

/// Settled state of one operation, success or failure, with its timing.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub result: Result<OperationResult, OperationError>,
    pub elapsed: Duration,
}
