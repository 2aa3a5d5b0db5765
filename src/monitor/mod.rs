// src/monitor/mod.rs

//! Performance monitoring.
//!
//! The [`PerformanceMonitor`] is the only writer of [`PerformanceMetrics`].
//! Readers get copies via [`PerformanceMonitor::current_metrics`].

pub mod metrics;

use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::cache::CacheKey;

pub use metrics::{Observation, PerformanceMetrics, running_average};

#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    metrics: Mutex<PerformanceMetrics>,
    journal: Option<Mutex<Vec<Observation>>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor that also keeps every observation it records, in order, until
    /// [`take_journal`](Self::take_journal) drains them.
    pub fn journaled() -> Self {
        Self {
            journal: Some(Mutex::new(Vec::new())),
            ..Self::default()
        }
    }

    /// Drain the recorded observations. Empty for a monitor built with
    /// [`new`](Self::new).
    pub fn take_journal(&self) -> Vec<Observation> {
        self.journal
            .as_ref()
            .map(|journal| std::mem::take(&mut *journal.lock()))
            .unwrap_or_default()
    }

    /// Build a monitor by replaying observations in order.
    pub fn replay<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let monitor = Self::new();
        for observation in observations {
            monitor.record(observation);
        }
        monitor
    }

    pub fn record(&self, observation: &Observation) {
        trace!(?observation, "recording observation");
        self.metrics.lock().apply(observation);
        if let Some(journal) = &self.journal {
            journal.lock().push(observation.clone());
        }
    }

    pub fn record_cache_hit(&self, key: &CacheKey) {
        self.record(&Observation::CacheHit {
            key: key.to_string(),
        });
    }

    pub fn record_cache_miss(&self, key: &CacheKey) {
        self.record(&Observation::CacheMiss {
            key: key.to_string(),
        });
    }

    pub fn record_operation(&self, operation_id: &str, elapsed: Duration, success: bool) {
        self.record(&Observation::Operation {
            operation_id: operation_id.to_string(),
            elapsed,
            success,
        });
    }

    pub fn record_memory_usage(&self, operation_id: &str, delta: i64) {
        self.record(&Observation::MemoryUsage {
            operation_id: operation_id.to_string(),
            delta,
        });
    }

    pub fn record_execution(&self, speedup: f64, used_fallback: bool) {
        self.record(&Observation::Execution {
            speedup,
            used_fallback,
        });
    }

    /// Copy of the current metrics; never a live reference.
    pub fn current_metrics(&self) -> PerformanceMetrics {
        self.metrics.lock().clone()
    }

    /// Reset all aggregates.
    pub fn reset(&self) {
        *self.metrics.lock() = PerformanceMetrics::default();
    }
}
