// src/engine/report.rs

//! Result objects returned by the scheduler.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::operation::{OperationError, OperationId, OperationResult};
use crate::plan::ExecutionPlan;
use crate::types::{CacheStrategy, ExecutionMode};

/// Everything `execute_optimized` hands back.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Successful operations keyed by id.
    pub results: HashMap<OperationId, OperationResult>,
    /// Failed operations keyed by id.
    pub errors: HashMap<OperationId, OperationError>,
    pub performance: PerformanceReport,
    /// The plan that ran; `None` when fallback execution was used.
    pub plan: Option<ExecutionPlan>,
    pub cache_analysis: CacheAnalysis,
    /// Always `true`: the request itself never fails, only operations do.
    pub success: bool,
}

impl ExecutionReport {
    pub fn value(&self, id: &str) -> Option<&Value> {
        self.results.get(id).map(|r| &r.value)
    }

    /// `Some(true)` when the operation was served from cache, `None` when it
    /// failed or is unknown.
    pub fn from_cache(&self, id: &str) -> Option<bool> {
        self.results.get(id).map(|r| r.from_cache)
    }

    pub fn error(&self, id: &str) -> Option<&OperationError> {
        self.errors.get(id)
    }

    pub fn used_fallback(&self) -> bool {
        self.performance.used_fallback
    }
}

/// Timing summary for one request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceReport {
    /// Wall-clock time of the whole request.
    pub total_time: Duration,
    /// Sum of every operation's own elapsed time.
    pub summed_operation_time: Duration,
    /// `summed_operation_time / total_time`; exactly 1.0 for fallback runs.
    pub speedup: f64,
    pub operations: usize,
    pub cache_hits: usize,
    pub failures: usize,
    pub parallel_phases: usize,
    pub phases: Vec<PhaseReport>,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub index: usize,
    pub mode: ExecutionMode,
    pub operations: Vec<OperationId>,
    pub elapsed: Duration,
    pub cache_hits: usize,
    pub failures: usize,
}

impl PhaseReport {
    /// A phase performed real work if at least one operation missed the cache.
    pub fn performed_work(&self) -> bool {
        self.cache_hits < self.operations.len()
    }
}

/// How the cache behaved for one request compared to the plan's prediction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheAnalysis {
    pub predicted_hits: usize,
    pub actual_hits: usize,
    pub misses: usize,
    pub estimated_hit_rate: f64,
    pub actual_hit_rate: f64,
    pub strategy: Option<CacheStrategy>,
    /// Entries held after the request completed.
    pub entries: usize,
}

/// `summed / total`, or 1.0 when either side is zero.
pub(crate) fn speedup(summed: Duration, total: Duration) -> f64 {
    if total.is_zero() || summed.is_zero() {
        1.0
    } else {
        summed.as_secs_f64() / total.as_secs_f64()
    }
}
