// tests/monitor_metrics.rs

mod common;
use crate::common::approx_eq;

use std::time::Duration;

use phasedag::cache::CacheKey;
use phasedag::monitor::{Observation, PerformanceMonitor, running_average};

fn observations() -> Vec<Observation> {
    vec![
        Observation::CacheMiss { key: "a".into() },
        Observation::Operation {
            operation_id: "a".into(),
            elapsed: Duration::from_millis(100),
            success: true,
        },
        Observation::MemoryUsage {
            operation_id: "a".into(),
            delta: 100,
        },
        Observation::CacheHit { key: "a".into() },
        Observation::Operation {
            operation_id: "b".into(),
            elapsed: Duration::from_millis(200),
            success: false,
        },
        Observation::MemoryUsage {
            operation_id: "b".into(),
            delta: 50,
        },
        Observation::CacheHit { key: "a".into() },
        Observation::CacheHit { key: "a".into() },
        Observation::Operation {
            operation_id: "c".into(),
            elapsed: Duration::from_millis(300),
            success: true,
        },
        Observation::MemoryUsage {
            operation_id: "cache-maintenance".into(),
            delta: -30,
        },
        Observation::Execution {
            speedup: 2.0,
            used_fallback: false,
        },
        Observation::Execution {
            speedup: 1.0,
            used_fallback: true,
        },
    ]
}

#[test]
fn replaying_the_same_observations_yields_identical_metrics() {
    let first = PerformanceMonitor::replay(&observations()).current_metrics();
    let second = PerformanceMonitor::replay(&observations()).current_metrics();
    assert_eq!(first, second);
}

#[test]
fn aggregates_are_running_averages() {
    let metrics = PerformanceMonitor::replay(&observations()).current_metrics();

    assert_eq!(metrics.total_operations, 3);
    assert_eq!(metrics.successful_operations, 2);
    assert_eq!(metrics.failed_operations, 1);
    assert!(approx_eq(metrics.success_rate, 2.0 / 3.0));
    assert!((metrics.average_response_time_ms - 200.0).abs() < 1e-6);

    assert_eq!(metrics.cache_hits, 3);
    assert_eq!(metrics.cache_misses, 1);
    assert!(approx_eq(metrics.cache_hit_rate, 0.75));

    assert_eq!(metrics.current_memory_bytes, 120);
    assert_eq!(metrics.peak_memory_bytes, 150);
    assert!(approx_eq(metrics.average_memory_bytes, (100.0 + 150.0 + 120.0) / 3.0));

    assert_eq!(metrics.executions, 2);
    assert_eq!(metrics.fallback_executions, 1);
    assert!(approx_eq(metrics.average_speedup, 1.5));
}

#[test]
fn running_average_formula() {
    assert_eq!(running_average(0.0, 1, 10.0), 10.0);
    assert_eq!(running_average(10.0, 2, 20.0), 15.0);
    assert_eq!(running_average(15.0, 3, 30.0), 20.0);
    assert_eq!(running_average(5.0, 0, 1.0), 0.0);
}

#[test]
fn current_metrics_is_a_copy() {
    let monitor = PerformanceMonitor::new();
    monitor.record_cache_hit(&CacheKey::from_raw("k"));

    let mut snapshot = monitor.current_metrics();
    snapshot.cache_hits = 99;

    assert_eq!(monitor.current_metrics().cache_hits, 1);
}

#[test]
fn journaled_monitor_keeps_observations_in_order() {
    let monitor = PerformanceMonitor::journaled();
    for observation in &observations() {
        monitor.record(observation);
    }

    let journal = monitor.take_journal();
    assert_eq!(journal, observations());
    assert!(monitor.take_journal().is_empty());
    assert_eq!(
        PerformanceMonitor::replay(&journal).current_metrics(),
        monitor.current_metrics()
    );

    let plain = PerformanceMonitor::new();
    plain.record_cache_hit(&CacheKey::from_raw("k"));
    assert!(plain.take_journal().is_empty());
}

#[test]
fn reset_clears_everything() {
    let monitor = PerformanceMonitor::replay(&observations());
    monitor.reset();
    assert_eq!(monitor.current_metrics(), Default::default());
}
