// src/config/tuning.rs

//! Runtime tuning state shared between the optimizer, planner and cache.
//!
//! The optimizer is the only writer. Readers take a copy at the start of
//! their own pass, so an adjustment only affects the *next* plan or cache
//! pass, never one already in flight.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::config::model::SchedulerConfig;

/// Tunable knobs, seeded from [`SchedulerConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct TuningState {
    /// Effective time-to-live for cache reads and expiry passes.
    pub cache_ttl: Duration,
    /// Lower and upper bounds for `cache_ttl` adjustments.
    pub min_cache_ttl: Duration,
    pub max_cache_ttl: Duration,
    /// Effective upper bound on concurrent operations within a phase.
    pub concurrency_hint: usize,
    /// Configured ceiling for `concurrency_hint`.
    pub max_concurrency: usize,
    /// Number of tuning passes applied so far.
    pub adjustments: u64,
}

impl TuningState {
    pub fn from_config(cfg: &SchedulerConfig) -> Self {
        let ttl = cfg.cache.ttl;
        Self {
            cache_ttl: ttl,
            min_cache_ttl: (ttl / 4).max(Duration::from_millis(1)),
            max_cache_ttl: ttl.saturating_mul(4),
            concurrency_hint: cfg.execution.max_concurrent_operations,
            max_concurrency: cfg.execution.max_concurrent_operations,
            adjustments: 0,
        }
    }
}

/// Handle to the shared tuning state.
#[derive(Debug, Clone)]
pub struct SharedTuning {
    inner: Arc<RwLock<TuningState>>,
}

impl SharedTuning {
    pub fn new(state: TuningState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> TuningState {
        self.inner.read().clone()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.inner.read().cache_ttl
    }

    pub fn concurrency_hint(&self) -> usize {
        self.inner.read().concurrency_hint
    }

    /// Apply a mutation under the write lock.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut TuningState),
    {
        let mut guard = self.inner.write();
        f(&mut guard);
    }
}
