// src/optimizer/mod.rs

//! Adaptive tuning.
//!
//! [`AdaptiveOptimizer`] is a pure decision core: given a metrics snapshot and
//! the current [`TuningState`] it returns [`TuningAction`]s. It has no timers
//! and no channels and is unit tested directly.
//!
//! [`spawn_optimizer`] is the async shell that runs the core on a fixed
//! interval, applies its actions to the shared tuning state and runs the
//! cache's expired-entry maintenance pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::config::model::SchedulerConfig;
use crate::config::tuning::{SharedTuning, TuningState};
use crate::monitor::{PerformanceMetrics, PerformanceMonitor};

/// Operation id under which maintenance passes report freed memory.
pub const MAINTENANCE_ID: &str = "cache-maintenance";

/// One adjustment to the shared tuning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningAction {
    /// Average response time is above the warning threshold.
    ReduceConcurrency { from: usize, to: usize },
    /// Average response time is back under the target.
    RestoreConcurrency { from: usize, to: usize },
    /// Hit rate is below the warning threshold; keep results longer.
    ExtendCacheTtl { from: Duration, to: Duration },
    /// Tracked memory exceeds the budget; expire results sooner.
    ShortenCacheTtl { from: Duration, to: Duration },
}

/// Thresholds the optimizer compares snapshots against.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerThresholds {
    pub response_time_warning: Duration,
    pub response_time_target: Duration,
    pub cache_hit_rate_warning: f64,
    pub memory_budget_bytes: u64,
    /// Hit-rate tuning waits until at least this many lookups happened.
    pub min_cache_lookups: u64,
}

impl OptimizerThresholds {
    pub fn from_config(cfg: &SchedulerConfig) -> Self {
        Self {
            response_time_warning: cfg.monitoring.response_time_warning,
            response_time_target: cfg.monitoring.response_time_target,
            cache_hit_rate_warning: cfg.monitoring.cache_hit_rate_warning,
            memory_budget_bytes: cfg.cache.memory_budget_bytes,
            min_cache_lookups: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveOptimizer {
    thresholds: OptimizerThresholds,
}

impl AdaptiveOptimizer {
    pub fn new(thresholds: OptimizerThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &OptimizerThresholds {
        &self.thresholds
    }

    /// Decide which adjustments a snapshot calls for.
    pub fn evaluate(
        &self,
        metrics: &PerformanceMetrics,
        tuning: &TuningState,
    ) -> Vec<TuningAction> {
        let mut actions = Vec::new();
        let t = &self.thresholds;

        if metrics.total_operations > 0 {
            let average = metrics.average_response_time();
            if average > t.response_time_warning && tuning.concurrency_hint > 1 {
                actions.push(TuningAction::ReduceConcurrency {
                    from: tuning.concurrency_hint,
                    to: tuning.concurrency_hint - 1,
                });
            } else if average < t.response_time_target
                && tuning.concurrency_hint < tuning.max_concurrency
            {
                actions.push(TuningAction::RestoreConcurrency {
                    from: tuning.concurrency_hint,
                    to: tuning.concurrency_hint + 1,
                });
            }
        }

        let over_budget = metrics.current_memory_bytes > 0
            && metrics.current_memory_bytes as u64 > t.memory_budget_bytes;

        if over_budget {
            let to = (tuning.cache_ttl / 2).max(tuning.min_cache_ttl);
            if to < tuning.cache_ttl {
                actions.push(TuningAction::ShortenCacheTtl {
                    from: tuning.cache_ttl,
                    to,
                });
            }
        } else if metrics.cache_lookups() >= t.min_cache_lookups
            && metrics.cache_hit_rate < t.cache_hit_rate_warning
        {
            let to = tuning.cache_ttl.saturating_mul(2).min(tuning.max_cache_ttl);
            if to > tuning.cache_ttl {
                actions.push(TuningAction::ExtendCacheTtl {
                    from: tuning.cache_ttl,
                    to,
                });
            }
        }

        actions
    }

    /// Apply actions to a tuning state.
    pub fn apply(actions: &[TuningAction], tuning: &mut TuningState) {
        for action in actions {
            match *action {
                TuningAction::ReduceConcurrency { to, .. }
                | TuningAction::RestoreConcurrency { to, .. } => {
                    tuning.concurrency_hint = to.clamp(1, tuning.max_concurrency.max(1));
                }
                TuningAction::ExtendCacheTtl { to, .. }
                | TuningAction::ShortenCacheTtl { to, .. } => {
                    tuning.cache_ttl = to.clamp(tuning.min_cache_ttl, tuning.max_cache_ttl);
                }
            }
            tuning.adjustments += 1;
        }
    }

    /// Evaluate the monitor's snapshot and apply the result to `shared`.
    ///
    /// Runs under the tuning write lock, so readers see either the old or the
    /// new state, never a mix.
    pub fn tick(&self, monitor: &PerformanceMonitor, shared: &SharedTuning) -> Vec<TuningAction> {
        let metrics = monitor.current_metrics();
        let mut applied = Vec::new();

        shared.update(|tuning| {
            applied = self.evaluate(&metrics, tuning);
            Self::apply(&applied, tuning);
        });

        for action in &applied {
            match action {
                TuningAction::ReduceConcurrency { from, to } => warn!(
                    from,
                    to,
                    average_response_ms = metrics.average_response_time_ms,
                    "response time above warning threshold; lowering concurrency"
                ),
                TuningAction::RestoreConcurrency { from, to } => info!(
                    from,
                    to,
                    "response time under target; raising concurrency"
                ),
                TuningAction::ExtendCacheTtl { from, to } => warn!(
                    from_ms = from.as_millis() as u64,
                    to_ms = to.as_millis() as u64,
                    hit_rate = metrics.cache_hit_rate,
                    "cache hit rate below warning threshold; extending ttl"
                ),
                TuningAction::ShortenCacheTtl { from, to } => warn!(
                    from_ms = from.as_millis() as u64,
                    to_ms = to.as_millis() as u64,
                    memory_bytes = metrics.current_memory_bytes,
                    "tracked memory above budget; shortening ttl"
                ),
            }
        }

        applied
    }
}

/// Handle to a running optimizer loop.
///
/// Dropping the handle aborts the loop; [`shutdown`](Self::shutdown) stops it
/// gracefully and waits for it to finish.
#[derive(Debug)]
pub struct OptimizerHandle {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl OptimizerHandle {
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                debug!(error = %e, "optimizer loop ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl Drop for OptimizerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawn the optimizer loop on the current Tokio runtime.
///
/// Every `interval` it runs the cache's expired-entry pass and one
/// [`AdaptiveOptimizer::tick`]. The first evaluation happens one full
/// interval after spawning.
pub fn spawn_optimizer(
    optimizer: AdaptiveOptimizer,
    monitor: Arc<PerformanceMonitor>,
    tuning: SharedTuning,
    cache: Arc<ResultCache>,
    interval: Duration,
) -> OptimizerHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "optimizer loop started");
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let (expired, freed) = cache.remove_expired();
                    if freed > 0 {
                        monitor.record_memory_usage(MAINTENANCE_ID, -(freed as i64));
                    }
                    let actions = optimizer.tick(&monitor, &tuning);
                    debug!(expired, actions = actions.len(), "optimizer tick");
                }
                _ = &mut stop_rx => {
                    break;
                }
            }
        }

        info!("optimizer loop finished");
    });

    OptimizerHandle {
        stop: Some(stop_tx),
        handle: Some(handle),
    }
}
