// src/engine/scheduler.rs

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheOptimizationReport, ResultCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{SchedulerConfig, SharedTuning, TuningState};
use crate::dag::{DependencyGraph, build_graph};
use crate::engine::executor::PhaseExecutor;
use crate::engine::fallback::execute_sequential;
use crate::engine::report::{
    CacheAnalysis, ExecutionReport, PerformanceReport, PhaseReport, speedup,
};
use crate::errors::{PhasedagError, Result};
use crate::monitor::{Observation, PerformanceMetrics, PerformanceMonitor};
use crate::operation::{ExecutionContext, Operation, OperationId};
use crate::optimizer::{
    AdaptiveOptimizer, MAINTENANCE_ID, OptimizerHandle, OptimizerThresholds, TuningAction,
    spawn_optimizer,
};
use crate::plan::{ExecutionPlan, OptimizationOptions, Planner, predict_cache_hits};

/// Value returned by [`Scheduler::get_cached_result`].
#[derive(Debug, Clone, Serialize)]
pub struct CachedResult {
    pub value: Value,
    pub from_cache: bool,
    /// Age of the cached entry; zero when the value was just generated.
    pub age: Duration,
}

/// Entry point tying graph building, planning, execution, caching and
/// monitoring together.
///
/// One scheduler is meant to be long-lived and shared; its cache, monitor and
/// tuning state persist across requests while graphs and plans are built
/// fresh for each one.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    cache: Arc<ResultCache>,
    monitor: Arc<PerformanceMonitor>,
    tuning: SharedTuning,
    planner: Planner,
    optimizer: AdaptiveOptimizer,
    executor: PhaseExecutor,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a scheduler whose cache ages entries against `clock`.
    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let tuning = SharedTuning::new(TuningState::from_config(&config));
        let cache = Arc::new(ResultCache::new(
            config.cache.max_entries,
            config.cache.memory_budget_bytes,
            tuning.clone(),
            clock,
        ));
        let monitor = Arc::new(PerformanceMonitor::new());
        let executor = PhaseExecutor::new(Arc::clone(&cache), config.execution.operation_timeout);
        let optimizer = AdaptiveOptimizer::new(OptimizerThresholds::from_config(&config));

        info!(
            max_entries = config.cache.max_entries,
            ttl_ms = config.cache.ttl.as_millis() as u64,
            max_concurrent_operations = config.execution.max_concurrent_operations,
            "scheduler ready"
        );

        Ok(Self {
            config,
            cache,
            monitor,
            tuning,
            planner: Planner::new(),
            optimizer,
            executor,
        })
    }

    /// Schedule and run `operations`.
    ///
    /// Never fails as a whole: operation failures land in the report's
    /// `errors` map, and defects in graph building or plan execution send
    /// the request through sequential fallback.
    pub async fn execute_optimized(
        &self,
        operations: Vec<Operation>,
        context: &ExecutionContext,
        options: &OptimizationOptions,
    ) -> ExecutionReport {
        let originals = operations.clone();

        let report = match self.execute_planned(operations, context, options).await {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    error = %e,
                    "planned execution failed; falling back to sequential execution"
                );
                execute_sequential(
                    originals,
                    context,
                    &self.monitor,
                    self.config.execution.operation_timeout,
                )
                .await
            }
        };

        self.monitor.record_execution(
            report.performance.speedup,
            report.performance.used_fallback,
        );
        report
    }

    async fn execute_planned(
        &self,
        operations: Vec<Operation>,
        context: &ExecutionContext,
        options: &OptimizationOptions,
    ) -> Result<ExecutionReport> {
        let graph = build_graph(operations)?;
        let tuning = self.tuning.snapshot();
        let predictions = predict_cache_hits(&graph, &self.cache, context, options.use_cache);
        let plan = self.planner.plan(&graph, &predictions, options, &tuning);
        self.execute_plan(&graph, plan, context, options).await
    }

    /// Run an already built plan against `graph`.
    ///
    /// The plan is validated first; a defective plan returns
    /// [`PhasedagError::PlanDefect`] without running anything. Unlike
    /// [`execute_optimized`](Self::execute_optimized) this does not fall back.
    ///
    /// Operation and cache observations reach the monitor only once every
    /// phase has settled. A run that stops early commits just its memory
    /// deltas, since the cache keeps what it already wrote.
    pub async fn execute_plan(
        &self,
        graph: &DependencyGraph,
        plan: ExecutionPlan,
        context: &ExecutionContext,
        options: &OptimizationOptions,
    ) -> Result<ExecutionReport> {
        plan.validate(graph)?;

        let staged = Arc::new(PerformanceMonitor::journaled());
        let outcome = self.run_phases(graph, plan, context, options, &staged).await;
        let observations = staged.take_journal();

        match &outcome {
            Ok(_) => observations.iter().for_each(|o| self.monitor.record(o)),
            Err(e) => {
                debug!(
                    error = %e,
                    staged = observations.len(),
                    "discarding observations of an unfinished plan"
                );
                observations
                    .iter()
                    .filter(|o| matches!(o, Observation::MemoryUsage { .. }))
                    .for_each(|o| self.monitor.record(o));
            }
        }
        outcome
    }

    async fn run_phases(
        &self,
        graph: &DependencyGraph,
        plan: ExecutionPlan,
        context: &ExecutionContext,
        options: &OptimizationOptions,
        monitor: &Arc<PerformanceMonitor>,
    ) -> Result<ExecutionReport> {
        let started = Instant::now();
        let mut failed: HashSet<OperationId> = HashSet::new();
        let mut report = ExecutionReport {
            results: Default::default(),
            errors: Default::default(),
            performance: PerformanceReport::default(),
            plan: None,
            cache_analysis: CacheAnalysis::default(),
            success: true,
        };
        let mut summed = Duration::ZERO;

        for phase in &plan.phases {
            let phase_started = Instant::now();
            let outcomes = self
                .executor
                .execute_phase(
                    phase,
                    graph,
                    context,
                    &failed,
                    plan.concurrency_limit,
                    options.use_cache,
                    monitor,
                )
                .await?;

            let mut phase_report = PhaseReport {
                index: phase.index,
                mode: phase.mode,
                operations: phase.operations.clone(),
                elapsed: Duration::ZERO,
                cache_hits: 0,
                failures: 0,
            };

            for (id, outcome) in outcomes {
                summed += outcome.elapsed;
                match outcome.result {
                    Ok(result) => {
                        if result.from_cache {
                            phase_report.cache_hits += 1;
                        }
                        report.results.insert(id, result);
                    }
                    Err(error) => {
                        phase_report.failures += 1;
                        failed.insert(id.clone());
                        report.errors.insert(id, error);
                    }
                }
            }

            phase_report.elapsed = phase_started.elapsed();
            debug!(
                phase = phase_report.index,
                elapsed_ms = phase_report.elapsed.as_millis() as u64,
                cache_hits = phase_report.cache_hits,
                failures = phase_report.failures,
                "phase settled"
            );
            report.performance.phases.push(phase_report);
        }

        let total_time = started.elapsed();
        let cache_hits: usize = report.performance.phases.iter().map(|p| p.cache_hits).sum();
        let lookups = if options.use_cache {
            graph
                .operations()
                .filter_map(|id| graph.operation(id))
                .filter(|op| op.is_cacheable())
                .count()
        } else {
            0
        };

        report.performance.total_time = total_time;
        report.performance.summed_operation_time = summed;
        report.performance.speedup = speedup(summed, total_time);
        report.performance.operations = graph.len();
        report.performance.cache_hits = cache_hits;
        report.performance.failures = report.errors.len();
        report.performance.parallel_phases = plan.parallel_phase_count();

        report.cache_analysis = CacheAnalysis {
            predicted_hits: plan.phases.iter().map(|p| p.predicted_hits).sum(),
            actual_hits: cache_hits,
            misses: lookups.saturating_sub(cache_hits),
            estimated_hit_rate: plan.estimated_hit_rate,
            actual_hit_rate: if lookups == 0 {
                0.0
            } else {
                cache_hits as f64 / lookups as f64
            },
            strategy: Some(plan.cache_strategy),
            entries: self.cache.len(),
        };

        info!(
            operations = report.performance.operations,
            failures = report.performance.failures,
            cache_hits,
            total_ms = total_time.as_millis() as u64,
            speedup = report.performance.speedup,
            "execution finished"
        );

        report.plan = Some(plan);
        Ok(report)
    }

    /// Return the cached value for `key` under `context`, or run `generator`
    /// and cache what it produces.
    ///
    /// The key is combined with the context's classification and project, so
    /// the same key under another project never shares an entry.
    pub async fn get_cached_result<F, Fut>(
        &self,
        key: &str,
        context: &ExecutionContext,
        generator: F,
    ) -> Result<CachedResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Value>>,
    {
        let cache_key = CacheKey::derive(key, &Value::Null, context);

        if let Some(cached) = self.cache.get(&cache_key, context) {
            self.monitor.record_cache_hit(&cache_key);
            return Ok(CachedResult {
                value: cached.value,
                from_cache: true,
                age: cached.age,
            });
        }
        self.monitor.record_cache_miss(&cache_key);

        let started = Instant::now();
        let generated = generator().await;
        let elapsed = started.elapsed();
        self.monitor.record_operation(key, elapsed, generated.is_ok());

        let value = generated.map_err(PhasedagError::Other)?;
        let delta = self.cache.set(cache_key, value.clone(), context, elapsed);
        self.monitor.record_memory_usage(key, delta);

        Ok(CachedResult {
            value,
            from_cache: false,
            age: Duration::ZERO,
        })
    }

    /// Copy of the monitor's current metrics.
    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.monitor.current_metrics()
    }

    /// Manual cache maintenance: expiry, entry-limit and memory-budget passes.
    pub fn optimize_cache(&self) -> CacheOptimizationReport {
        let report = self.cache.optimize();
        if report.memory_freed > 0 {
            self.monitor
                .record_memory_usage(MAINTENANCE_ID, -(report.memory_freed as i64));
        }
        report
    }

    /// Remove entries whose key matches `pattern`, or every entry when `None`.
    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        let before = self.cache.estimated_bytes();
        let cleared = self.cache.clear(pattern);
        let freed = before.saturating_sub(self.cache.estimated_bytes());
        if freed > 0 {
            self.monitor
                .record_memory_usage(MAINTENANCE_ID, -(freed as i64));
        }
        cleared
    }

    /// Start the adaptive optimizer loop on the current Tokio runtime.
    pub fn spawn_optimizer(&self) -> OptimizerHandle {
        spawn_optimizer(
            self.optimizer.clone(),
            Arc::clone(&self.monitor),
            self.tuning.clone(),
            Arc::clone(&self.cache),
            self.config.monitoring.interval,
        )
    }

    /// Run one optimizer evaluation immediately.
    pub fn run_optimizer_tick(&self) -> Vec<TuningAction> {
        self.optimizer.tick(&self.monitor, &self.tuning)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn tuning(&self) -> &SharedTuning {
        &self.tuning
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }
}
