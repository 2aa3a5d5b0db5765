// src/engine/executor.rs

//! Phase execution.
//!
//! Every operation of a phase is spawned onto one `JoinSet` and gated by a
//! semaphore sized to the plan's concurrency limit; operations beyond the
//! limit wait for a permit. The phase settles only once every operation has
//! finished, failed, timed out or panicked, and none of those outcomes
//! cancels a sibling.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, ResultCache};
use crate::dag::DependencyGraph;
use crate::errors::{PhasedagError, Result};
use crate::monitor::PerformanceMonitor;
use crate::operation::{
    ExecutionContext, Invocation, Operation, OperationError, OperationId, OperationOutcome,
    OperationResult, OperationWork,
};
use crate::plan::Phase;

/// Runs phases against a shared cache.
#[derive(Debug, Clone)]
pub struct PhaseExecutor {
    cache: Arc<ResultCache>,
    default_timeout: Option<Duration>,
}

/// Everything one spawned operation needs, owned.
struct OperationUnit {
    operation: Operation,
    invocation: Invocation,
    context: ExecutionContext,
    use_cache: bool,
    timeout: Option<Duration>,
    cache: Arc<ResultCache>,
    monitor: Arc<PerformanceMonitor>,
    semaphore: Arc<Semaphore>,
}

impl PhaseExecutor {
    pub fn new(cache: Arc<ResultCache>, default_timeout: Option<Duration>) -> Self {
        Self {
            cache,
            default_timeout,
        }
    }

    /// Run every operation of `phase` and return their outcomes in phase order.
    ///
    /// `failed` holds ids that failed in earlier phases of this request; each
    /// operation's invocation lists the ones among its dependencies. Cache and
    /// operation observations go to `monitor`.
    ///
    /// Returns `Err` only for defects in the plan itself (e.g. an id the
    /// graph does not know), never for operation failures.
    pub async fn execute_phase(
        &self,
        phase: &Phase,
        graph: &DependencyGraph,
        context: &ExecutionContext,
        failed: &HashSet<OperationId>,
        concurrency: usize,
        use_cache: bool,
        monitor: &Arc<PerformanceMonitor>,
    ) -> Result<Vec<(OperationId, OperationOutcome)>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut set = JoinSet::new();
        let mut task_ids: HashMap<tokio::task::Id, OperationId> = HashMap::new();

        info!(
            phase = phase.index,
            mode = ?phase.mode,
            operations = phase.operations.len(),
            concurrency,
            "starting phase"
        );

        for id in &phase.operations {
            let operation = graph.operation(id).cloned().ok_or_else(|| {
                PhasedagError::PlanDefect(format!(
                    "phase {} references unknown operation '{}'",
                    phase.index, id
                ))
            })?;

            let failed_dependencies: Vec<OperationId> = graph
                .dependencies_of(id)
                .iter()
                .filter(|dep| failed.contains(*dep))
                .cloned()
                .collect();
            if !failed_dependencies.is_empty() {
                debug!(
                    operation = %id,
                    failed = ?failed_dependencies,
                    "running operation although dependencies failed"
                );
            }

            let unit = OperationUnit {
                invocation: operation.invocation(context, failed_dependencies),
                timeout: operation.timeout.or(self.default_timeout),
                operation,
                context: context.clone(),
                use_cache,
                cache: Arc::clone(&self.cache),
                monitor: Arc::clone(monitor),
                semaphore: Arc::clone(&semaphore),
            };

            let handle = set.spawn(run_operation(unit));
            task_ids.insert(handle.id(), id.clone());
        }

        let mut settled: HashMap<OperationId, OperationOutcome> = HashMap::new();
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((task_id, outcome)) => {
                    if let Some(op_id) = task_ids.get(&task_id) {
                        settled.insert(op_id.clone(), outcome);
                    }
                }
                Err(join_err) => {
                    let Some(op_id) = task_ids.get(&join_err.id()).cloned() else {
                        warn!(error = %join_err, "unknown operation task ended abnormally");
                        continue;
                    };
                    let error = join_error_to_operation_error(join_err);
                    warn!(operation = %op_id, error = %error, "operation task ended abnormally");
                    monitor.record_operation(&op_id, Duration::ZERO, false);
                    settled.insert(
                        op_id,
                        OperationOutcome {
                            result: Err(error),
                            elapsed: Duration::ZERO,
                        },
                    );
                }
            }
        }

        let mut ordered = Vec::with_capacity(phase.operations.len());
        for id in &phase.operations {
            let outcome = settled.remove(id).ok_or_else(|| {
                PhasedagError::PlanDefect(format!(
                    "operation '{}' in phase {} never settled",
                    id, phase.index
                ))
            })?;
            ordered.push((id.clone(), outcome));
        }

        Ok(ordered)
    }
}

/// Cache lookup, then work on a miss, then cache store.
async fn run_operation(unit: OperationUnit) -> OperationOutcome {
    let OperationUnit {
        operation,
        invocation,
        context,
        use_cache,
        timeout,
        cache,
        monitor,
        semaphore,
    } = unit;

    // Held until this function returns.
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            return OperationOutcome {
                result: Err(OperationError::Failed(format!(
                    "concurrency limiter closed: {e}"
                ))),
                elapsed: Duration::ZERO,
            };
        }
    };

    let started = Instant::now();
    let cache_key = (use_cache && operation.is_cacheable())
        .then(|| CacheKey::for_operation(&operation, &context));

    if let Some(key) = &cache_key {
        match cache.get(key, &context) {
            Some(cached) => {
                monitor.record_cache_hit(key);
                let elapsed = started.elapsed();
                monitor.record_operation(&operation.id, elapsed, true);
                debug!(operation = %operation.id, "served from cache");
                return OperationOutcome {
                    result: Ok(OperationResult {
                        value: cached.value,
                        from_cache: true,
                        elapsed,
                    }),
                    elapsed,
                };
            }
            None => monitor.record_cache_miss(key),
        }
    }

    debug!(operation = %operation.id, name = %operation.name, "invoking operation work");
    let result = invoke_work(operation.work.as_ref(), invocation, timeout).await;
    let elapsed = started.elapsed();

    match result {
        Ok(value) => {
            if let Some(key) = cache_key {
                let delta = cache.set(key, value.clone(), &context, elapsed);
                monitor.record_memory_usage(&operation.id, delta);
            }
            monitor.record_operation(&operation.id, elapsed, true);
            debug!(
                operation = %operation.id,
                elapsed_ms = elapsed.as_millis() as u64,
                "operation succeeded"
            );
            OperationOutcome {
                result: Ok(OperationResult {
                    value,
                    from_cache: false,
                    elapsed,
                }),
                elapsed,
            }
        }
        Err(error) => {
            monitor.record_operation(&operation.id, elapsed, false);
            warn!(
                operation = %operation.id,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %error,
                "operation failed"
            );
            OperationOutcome {
                result: Err(error),
                elapsed,
            }
        }
    }
}

/// Invoke an operation's work, applying the optional timeout.
pub(crate) async fn invoke_work(
    work: &dyn OperationWork,
    invocation: Invocation,
    timeout: Option<Duration>,
) -> std::result::Result<Value, OperationError> {
    let fut = work.run(invocation);
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(OperationError::TimedOut(limit)),
        },
        None => fut.await,
    };
    outcome.map_err(|e| OperationError::Failed(format!("{e:#}")))
}

/// Run work on its own task so a panic becomes an [`OperationError`].
pub(crate) async fn invoke_isolated(
    work: Arc<dyn OperationWork>,
    invocation: Invocation,
    timeout: Option<Duration>,
) -> std::result::Result<Value, OperationError> {
    let handle =
        tokio::spawn(async move { invoke_work(work.as_ref(), invocation, timeout).await });
    match handle.await {
        Ok(result) => result,
        Err(join_err) => Err(join_error_to_operation_error(join_err)),
    }
}

fn join_error_to_operation_error(err: JoinError) -> OperationError {
    if err.is_cancelled() {
        return OperationError::Failed("operation task was cancelled".to_string());
    }
    match err.try_into_panic() {
        Ok(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            OperationError::Panicked(message)
        }
        Err(err) => OperationError::Failed(err.to_string()),
    }
}
