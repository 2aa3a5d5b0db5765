// src/monitor/metrics.rs

use std::time::Duration;

use serde::Serialize;

use crate::operation::OperationId;

/// Running aggregates owned by the [`PerformanceMonitor`](super::PerformanceMonitor).
///
/// Every average is updated as `(old * (n - 1) + new) / n`, so the whole
/// struct is a pure function of the ordered observations fed into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub success_rate: f64,
    pub average_response_time_ms: f64,

    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,

    pub memory_samples: u64,
    pub current_memory_bytes: i64,
    pub peak_memory_bytes: i64,
    pub average_memory_bytes: f64,

    pub executions: u64,
    pub fallback_executions: u64,
    pub average_speedup: f64,
}

impl PerformanceMetrics {
    pub fn cache_lookups(&self) -> u64 {
        self.cache_hits + self.cache_misses
    }

    pub fn average_response_time(&self) -> Duration {
        Duration::from_secs_f64(self.average_response_time_ms.max(0.0) / 1000.0)
    }
}

/// One recorded fact. Feeding the same ordered sequence into a fresh
/// monitor always yields the same [`PerformanceMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Observation {
    CacheHit {
        key: String,
    },
    CacheMiss {
        key: String,
    },
    Operation {
        operation_id: OperationId,
        elapsed: Duration,
        success: bool,
    },
    MemoryUsage {
        operation_id: OperationId,
        delta: i64,
    },
    Execution {
        speedup: f64,
        used_fallback: bool,
    },
}

/// `(old * (n - 1) + new) / n`, with `n` the count *including* the new value.
pub fn running_average(old: f64, n: u64, new: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    (old * (n - 1.0) + new) / n
}

impl PerformanceMetrics {
    pub(crate) fn apply(&mut self, observation: &Observation) {
        match observation {
            Observation::CacheHit { .. } => {
                self.cache_hits += 1;
                self.cache_hit_rate =
                    running_average(self.cache_hit_rate, self.cache_lookups(), 1.0);
            }
            Observation::CacheMiss { .. } => {
                self.cache_misses += 1;
                self.cache_hit_rate =
                    running_average(self.cache_hit_rate, self.cache_lookups(), 0.0);
            }
            Observation::Operation {
                elapsed, success, ..
            } => {
                self.total_operations += 1;
                if *success {
                    self.successful_operations += 1;
                } else {
                    self.failed_operations += 1;
                }
                let n = self.total_operations;
                self.success_rate =
                    running_average(self.success_rate, n, if *success { 1.0 } else { 0.0 });
                self.average_response_time_ms = running_average(
                    self.average_response_time_ms,
                    n,
                    elapsed.as_secs_f64() * 1000.0,
                );
            }
            Observation::MemoryUsage { delta, .. } => {
                self.memory_samples += 1;
                self.current_memory_bytes = self.current_memory_bytes.saturating_add(*delta);
                self.peak_memory_bytes = self.peak_memory_bytes.max(self.current_memory_bytes);
                self.average_memory_bytes = running_average(
                    self.average_memory_bytes,
                    self.memory_samples,
                    self.current_memory_bytes as f64,
                );
            }
            Observation::Execution {
                speedup,
                used_fallback,
            } => {
                self.executions += 1;
                if *used_fallback {
                    self.fallback_executions += 1;
                }
                self.average_speedup =
                    running_average(self.average_speedup, self.executions, *speedup);
            }
        }
    }
}
