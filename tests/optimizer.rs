// tests/optimizer.rs

mod common;
use crate::common::{init_tracing, test_config, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use phasedag::cache::{CacheKey, ResultCache};
use phasedag::clock::ManualClock;
use phasedag::config::{SchedulerConfig, SharedTuning, TuningState};
use phasedag::monitor::{PerformanceMetrics, PerformanceMonitor};
use phasedag::operation::ExecutionContext;
use phasedag::optimizer::{
    AdaptiveOptimizer, OptimizerThresholds, TuningAction, spawn_optimizer,
};
use serde_json::json;

fn config() -> SchedulerConfig {
    test_config()
        .with_cache_ttl(Duration::from_secs(60))
        .with_max_concurrent_operations(4)
        .with_response_time_thresholds(Duration::from_millis(500), Duration::from_millis(100))
        .with_cache_hit_rate_warning(0.5)
        .with_memory_budget_bytes(1_000)
}

fn optimizer() -> AdaptiveOptimizer {
    AdaptiveOptimizer::new(OptimizerThresholds::from_config(&config()))
}

fn metrics(avg_ms: f64, hits: u64, misses: u64, memory: i64) -> PerformanceMetrics {
    let lookups = hits + misses;
    PerformanceMetrics {
        total_operations: 10,
        successful_operations: 10,
        success_rate: 1.0,
        average_response_time_ms: avg_ms,
        cache_hits: hits,
        cache_misses: misses,
        cache_hit_rate: if lookups == 0 { 0.0 } else { hits as f64 / lookups as f64 },
        current_memory_bytes: memory,
        ..PerformanceMetrics::default()
    }
}

#[test]
fn slow_responses_lower_concurrency() {
    let tuning = TuningState::from_config(&config());
    let actions = optimizer().evaluate(&metrics(800.0, 10, 0, 0), &tuning);
    assert_eq!(actions, vec![TuningAction::ReduceConcurrency { from: 4, to: 3 }]);
}

#[test]
fn concurrency_never_drops_below_one() {
    let mut tuning = TuningState::from_config(&config());
    tuning.concurrency_hint = 1;
    let actions = optimizer().evaluate(&metrics(800.0, 10, 0, 0), &tuning);
    assert!(actions.is_empty());
}

#[test]
fn fast_responses_restore_concurrency() {
    let mut tuning = TuningState::from_config(&config());
    tuning.concurrency_hint = 2;
    let actions = optimizer().evaluate(&metrics(50.0, 10, 0, 0), &tuning);
    assert_eq!(actions, vec![TuningAction::RestoreConcurrency { from: 2, to: 3 }]);
}

#[test]
fn low_hit_rate_extends_ttl_up_to_the_bound() {
    let mut tuning = TuningState::from_config(&config());
    let actions = optimizer().evaluate(&metrics(300.0, 2, 18, 0), &tuning);
    assert_eq!(
        actions,
        vec![TuningAction::ExtendCacheTtl {
            from: Duration::from_secs(60),
            to: Duration::from_secs(120),
        }]
    );

    tuning.cache_ttl = tuning.max_cache_ttl;
    assert!(optimizer().evaluate(&metrics(300.0, 2, 18, 0), &tuning).is_empty());
}

#[test]
fn ttl_extension_saturates_at_the_bound() {
    let huge = Duration::from_secs(u64::MAX / 2 + 1);
    let tuning = TuningState::from_config(&config().with_cache_ttl(huge));
    let actions = optimizer().evaluate(&metrics(300.0, 2, 18, 0), &tuning);
    assert_eq!(
        actions,
        vec![TuningAction::ExtendCacheTtl {
            from: huge,
            to: Duration::MAX,
        }]
    );
}

#[test]
fn hit_rate_tuning_waits_for_enough_lookups() {
    let tuning = TuningState::from_config(&config());
    assert!(optimizer().evaluate(&metrics(300.0, 0, 5, 0), &tuning).is_empty());
}

#[test]
fn memory_pressure_shortens_ttl() {
    let tuning = TuningState::from_config(&config());
    let actions = optimizer().evaluate(&metrics(300.0, 2, 18, 5_000), &tuning);
    assert_eq!(
        actions,
        vec![TuningAction::ShortenCacheTtl {
            from: Duration::from_secs(60),
            to: Duration::from_secs(30),
        }]
    );
}

#[test]
fn apply_updates_tuning_and_counts_adjustments() {
    let mut tuning = TuningState::from_config(&config());
    AdaptiveOptimizer::apply(
        &[
            TuningAction::ReduceConcurrency { from: 4, to: 3 },
            TuningAction::ShortenCacheTtl {
                from: Duration::from_secs(60),
                to: Duration::from_secs(1),
            },
        ],
        &mut tuning,
    );
    assert_eq!(tuning.concurrency_hint, 3);
    // Clamped to the lower bound.
    assert_eq!(tuning.cache_ttl, tuning.min_cache_ttl);
    assert_eq!(tuning.adjustments, 2);
}

#[test]
fn tick_writes_shared_tuning() {
    init_tracing();
    let monitor = PerformanceMonitor::new();
    for i in 0..3 {
        monitor.record_operation(&format!("op{i}"), Duration::from_secs(1), true);
    }
    let shared = SharedTuning::new(TuningState::from_config(&config()));

    let applied = optimizer().tick(&monitor, &shared);

    assert_eq!(applied.len(), 1);
    assert_eq!(shared.concurrency_hint(), 3);
    assert_eq!(shared.snapshot().adjustments, 1);
}

#[tokio::test]
async fn optimizer_loop_runs_maintenance_and_stops() {
    init_tracing();
    let cfg = config().with_monitoring_interval(Duration::from_millis(10));
    let clock = ManualClock::new();
    let tuning = SharedTuning::new(TuningState::from_config(&cfg));
    let cache = Arc::new(ResultCache::new(
        cfg.cache.max_entries,
        cfg.cache.memory_budget_bytes,
        tuning.clone(),
        Arc::new(clock.clone()),
    ));
    let monitor = Arc::new(PerformanceMonitor::new());
    let ctx = ExecutionContext::default();

    cache.set(CacheKey::from_raw("stale"), json!("old"), &ctx, Duration::ZERO);
    clock.advance(Duration::from_secs(61));

    let handle = spawn_optimizer(
        AdaptiveOptimizer::new(OptimizerThresholds::from_config(&cfg)),
        Arc::clone(&monitor),
        tuning,
        Arc::clone(&cache),
        cfg.monitoring.interval,
    );

    with_timeout(async {
        while !cache.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(!handle.is_finished());
    with_timeout(handle.shutdown()).await;
    assert!(monitor.current_metrics().current_memory_bytes < 0);
}

#[tokio::test]
async fn scheduler_tick_feeds_next_plan() {
    init_tracing();
    let scheduler = phasedag::Scheduler::new(config()).unwrap();
    let ops = vec![
        phasedag_test_utils::builders::OperationBuilder::new("slow")
            .delay(Duration::from_millis(600))
            .build(),
    ];
    let ctx = ExecutionContext::default();
    let options = phasedag::OptimizationOptions {
        aggressiveness: phasedag::types::Aggressiveness::High,
        ..Default::default()
    };

    with_timeout(scheduler.execute_optimized(ops.clone(), &ctx, &options)).await;
    let actions = scheduler.run_optimizer_tick();
    assert_eq!(actions, vec![TuningAction::ReduceConcurrency { from: 4, to: 3 }]);

    scheduler.clear_cache(None);
    let report = with_timeout(scheduler.execute_optimized(ops, &ctx, &options)).await;
    assert_eq!(report.plan.unwrap().concurrency_limit, 3);
}
