// src/engine/fallback.rs

//! Degraded execution path.
//!
//! Runs every original operation one after another in the order the caller
//! supplied, without cache reads or writes and without parallelism. Used
//! when graph building or plan execution hit a defect in the scheduler's own
//! logic. Never returns an error.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::engine::executor::invoke_isolated;
use crate::engine::report::{CacheAnalysis, ExecutionReport, PerformanceReport};
use crate::monitor::PerformanceMonitor;
use crate::operation::{ExecutionContext, Operation, OperationId, OperationResult};

pub(crate) async fn execute_sequential(
    operations: Vec<Operation>,
    context: &ExecutionContext,
    monitor: &PerformanceMonitor,
    default_timeout: Option<Duration>,
) -> ExecutionReport {
    let started = Instant::now();
    let total = operations.len();
    info!(operations = total, "running sequential fallback");

    let mut results = HashMap::new();
    let mut errors = HashMap::new();
    let mut failed: HashSet<OperationId> = HashSet::new();
    let mut summed = Duration::ZERO;

    for operation in operations {
        // A duplicated id runs once per occurrence; the last outcome wins.
        let failed_dependencies: Vec<OperationId> = operation
            .dependencies
            .iter()
            .filter(|dep| failed.contains(*dep))
            .cloned()
            .collect();
        let invocation = operation.invocation(context, failed_dependencies);
        let timeout = operation.timeout.or(default_timeout);

        let op_started = Instant::now();
        let outcome = invoke_isolated(operation.work.clone(), invocation, timeout).await;
        let elapsed = op_started.elapsed();
        summed += elapsed;

        monitor.record_operation(&operation.id, elapsed, outcome.is_ok());
        match outcome {
            Ok(value) => {
                failed.remove(&operation.id);
                errors.remove(&operation.id);
                results.insert(
                    operation.id,
                    OperationResult {
                        value,
                        from_cache: false,
                        elapsed,
                    },
                );
            }
            Err(error) => {
                warn!(operation = %operation.id, error = %error, "fallback operation failed");
                failed.insert(operation.id.clone());
                results.remove(&operation.id);
                errors.insert(operation.id, error);
            }
        }
    }

    let total_time = started.elapsed();
    info!(
        succeeded = results.len(),
        failed = errors.len(),
        total_ms = total_time.as_millis() as u64,
        "sequential fallback finished"
    );

    ExecutionReport {
        performance: PerformanceReport {
            total_time,
            summed_operation_time: summed,
            speedup: 1.0,
            operations: total,
            cache_hits: 0,
            failures: errors.len(),
            parallel_phases: 0,
            phases: Vec::new(),
            used_fallback: true,
        },
        results,
        errors,
        plan: None,
        cache_analysis: CacheAnalysis::default(),
        success: true,
    }
}
