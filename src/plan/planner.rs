// src/plan/planner.rs

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{CacheKey, ResultCache};
use crate::config::tuning::TuningState;
use crate::dag::DependencyGraph;
use crate::operation::{ExecutionContext, OperationId};
use crate::plan::{ExecutionPlan, OptimizationOptions, Phase};
use crate::types::{Aggressiveness, CacheStrategy, ExecutionMode, ParallelStrategy};

/// Predict, per operation, whether execution will be served from the cache.
///
/// Uses a counter-free presence check so predictions do not skew hit rates.
/// Non-cacheable operations, and every operation when `use_cache` is off,
/// are predicted as misses.
pub fn predict_cache_hits(
    graph: &DependencyGraph,
    cache: &ResultCache,
    context: &ExecutionContext,
    use_cache: bool,
) -> HashMap<OperationId, bool> {
    graph
        .operations()
        .filter_map(|id| graph.operation(id))
        .map(|op| {
            let hit = use_cache
                && op.is_cacheable()
                && cache.contains_valid(&CacheKey::for_operation(op, context), context);
            (op.id.clone(), hit)
        })
        .collect()
}

/// Turns a leveled graph into an [`ExecutionPlan`].
///
/// Stateless; the tuning state is passed in as a snapshot so a plan only
/// ever sees one consistent set of knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(
        &self,
        graph: &DependencyGraph,
        predictions: &HashMap<OperationId, bool>,
        options: &OptimizationOptions,
        tuning: &TuningState,
    ) -> ExecutionPlan {
        let predicted_hit = |id: &str| predictions.get(id).copied().unwrap_or(false);

        let mut phases = Vec::with_capacity(graph.depth());
        let mut estimated_sequential_time = Duration::ZERO;
        let mut estimated_parallel_time = Duration::ZERO;

        for (index, level) in graph.levels().iter().enumerate() {
            let mut predicted_hits = 0;
            let mut phase_estimate = Duration::ZERO;

            for id in level {
                if predicted_hit(id.as_str()) {
                    predicted_hits += 1;
                    continue;
                }
                let estimate = graph
                    .operation(id)
                    .map(|op| op.estimated_time)
                    .unwrap_or_default();
                estimated_sequential_time += estimate;
                phase_estimate = phase_estimate.max(estimate);
            }
            estimated_parallel_time += phase_estimate;

            let phase = Phase {
                index,
                operations: level.clone(),
                mode: ExecutionMode::for_phase_len(level.len()),
                predicted_hits,
                estimated_time: phase_estimate,
            };
            debug!(
                phase = index,
                operations = ?phase.operations,
                mode = ?phase.mode,
                predicted_hits,
                "planned phase"
            );
            phases.push(phase);
        }

        let total = graph.len();
        let hits = graph.operations().filter(|id| predicted_hit(*id)).count();
        let estimated_hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        let cache_strategy = CacheStrategy::from_hit_rate(estimated_hit_rate);
        let parallel_strategy = select_parallel_strategy(graph.depth(), options.aggressiveness);

        let base_limit = options
            .max_concurrency
            .unwrap_or(tuning.max_concurrency)
            .min(tuning.concurrency_hint)
            .max(1);
        let concurrency_limit = parallel_strategy.concurrency_for(base_limit);

        let plan = ExecutionPlan {
            phases,
            cache_strategy,
            parallel_strategy,
            concurrency_limit,
            estimated_hit_rate,
            estimated_sequential_time,
            estimated_parallel_time,
        };

        info!(
            phases = plan.phases.len(),
            parallel_phases = plan.parallel_phase_count(),
            cache_strategy = %plan.cache_strategy,
            parallel_strategy = %plan.parallel_strategy,
            concurrency_limit,
            estimated_hit_rate,
            "execution plan ready"
        );

        plan
    }
}

/// Pick a parallel strategy from graph depth and caller aggressiveness.
///
/// Shallow graphs gain the most from wide phases, so a medium request on a
/// graph of at most two levels still uses the full limit.
pub fn select_parallel_strategy(depth: usize, aggressiveness: Aggressiveness) -> ParallelStrategy {
    match aggressiveness {
        Aggressiveness::High => ParallelStrategy::Maximum,
        Aggressiveness::Low => ParallelStrategy::Conservative,
        Aggressiveness::Medium if depth <= 2 => ParallelStrategy::Maximum,
        Aggressiveness::Medium => ParallelStrategy::Balanced,
    }
}
