// src/plan/mod.rs

//! Execution plans.
//!
//! A plan is an ordered list of [`Phase`]s built fresh for one request from a
//! [`DependencyGraph`](crate::dag::DependencyGraph). Strategy tags on the plan
//! are tuning metadata; they never change which operations run or in what
//! phase order.

pub mod planner;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Serialize;

use crate::dag::DependencyGraph;
use crate::errors::{PhasedagError, Result};
use crate::operation::OperationId;
use crate::types::{Aggressiveness, CacheStrategy, ExecutionMode, ParallelStrategy};

pub use planner::{Planner, predict_cache_hits};

/// Caller-supplied optimization options for one request.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOptions {
    pub aggressiveness: Aggressiveness,
    /// Upper bound on concurrency for this request; clamped to the
    /// configured limit.
    pub max_concurrency: Option<usize>,
    /// When false, the cache is neither read nor written for this request.
    pub use_cache: bool,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            aggressiveness: Aggressiveness::default(),
            max_concurrency: None,
            use_cache: true,
        }
    }
}

/// A batch of operations that may run together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phase {
    pub index: usize,
    pub operations: Vec<OperationId>,
    pub mode: ExecutionMode,
    /// Operations in this phase expected to be served from the cache.
    pub predicted_hits: usize,
    /// Longest advisory estimate among operations expected to run work.
    pub estimated_time: Duration,
}

/// Single-use plan for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    pub phases: Vec<Phase>,
    pub cache_strategy: CacheStrategy,
    pub parallel_strategy: ParallelStrategy,
    /// Maximum operations in flight within one phase.
    pub concurrency_limit: usize,
    pub estimated_hit_rate: f64,
    /// Sum of advisory estimates of operations expected to miss the cache.
    pub estimated_sequential_time: Duration,
    /// Sum over phases of each phase's longest estimate.
    pub estimated_parallel_time: Duration,
}

impl ExecutionPlan {
    pub fn operation_count(&self) -> usize {
        self.phases.iter().map(|p| p.operations.len()).sum()
    }

    pub fn parallel_phase_count(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| p.mode == ExecutionMode::Parallel)
            .count()
    }

    /// Estimated speedup of the planned execution over running everything
    /// one after another. 1.0 when no estimates were given.
    pub fn estimated_speedup(&self) -> f64 {
        if self.estimated_parallel_time.is_zero() {
            return 1.0;
        }
        self.estimated_sequential_time.as_secs_f64() / self.estimated_parallel_time.as_secs_f64()
    }

    /// Check that the plan schedules every graph operation exactly once and
    /// that each phase only depends on earlier phases.
    ///
    /// A failure here is a planner defect; the scheduler answers it with
    /// sequential fallback execution.
    pub fn validate(&self, graph: &DependencyGraph) -> Result<()> {
        // Positions in `phases` decide ordering; `Phase::index` is informational.
        let mut phase_of: HashMap<&str, usize> = HashMap::new();
        for (position, phase) in self.phases.iter().enumerate() {
            if phase.operations.is_empty() {
                return Err(PhasedagError::PlanDefect(format!(
                    "phase {} is empty",
                    position
                )));
            }
            for id in &phase.operations {
                if graph.operation(id).is_none() {
                    return Err(PhasedagError::PlanDefect(format!(
                        "phase {} references unknown operation '{}'",
                        position, id
                    )));
                }
                if phase_of.insert(id.as_str(), position).is_some() {
                    return Err(PhasedagError::PlanDefect(format!(
                        "operation '{}' scheduled more than once",
                        id
                    )));
                }
            }
        }

        let scheduled: HashSet<&str> = phase_of.keys().copied().collect();
        if let Some(missing) = graph.operations().find(|id| !scheduled.contains(id)) {
            return Err(PhasedagError::PlanDefect(format!(
                "operation '{}' is not scheduled",
                missing
            )));
        }

        for (id, phase_index) in &phase_of {
            for dep in graph.dependencies_of(id) {
                let dep_phase = phase_of.get(dep.as_str()).copied().unwrap_or(usize::MAX);
                if dep_phase >= *phase_index {
                    return Err(PhasedagError::PlanDefect(format!(
                        "operation '{}' in phase {} depends on '{}' \
                         which is not in an earlier phase",
                        id, phase_index, dep
                    )));
                }
            }
        }

        Ok(())
    }
}
