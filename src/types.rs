use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How eagerly results should be kept in the cache for a given plan.
///
/// Selected by the planner from the estimated hit rate and nudged by the
/// adaptive optimizer. It is advisory metadata: correctness never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    Aggressive,
    Moderate,
    Conservative,
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::Moderate
    }
}

impl CacheStrategy {
    /// Pick a strategy purely from an estimated hit rate in `[0, 1]`.
    pub fn from_hit_rate(estimated_hit_rate: f64) -> Self {
        if estimated_hit_rate > 0.7 {
            CacheStrategy::Aggressive
        } else if estimated_hit_rate > 0.3 {
            CacheStrategy::Moderate
        } else {
            CacheStrategy::Conservative
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheStrategy::Aggressive => "aggressive",
            CacheStrategy::Moderate => "moderate",
            CacheStrategy::Conservative => "conservative",
        };
        f.write_str(s)
    }
}

impl FromStr for CacheStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aggressive" => Ok(CacheStrategy::Aggressive),
            "moderate" => Ok(CacheStrategy::Moderate),
            "conservative" => Ok(CacheStrategy::Conservative),
            other => Err(format!(
                "invalid cache strategy: {other} \
                 (expected \"aggressive\", \"moderate\" or \"conservative\")"
            )),
        }
    }
}

/// How wide each parallel phase is allowed to fan out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParallelStrategy {
    /// Use the full concurrency limit.
    Maximum,
    /// Use three quarters of the concurrency limit.
    Balanced,
    /// Use half of the concurrency limit.
    Conservative,
}

impl ParallelStrategy {
    /// Effective concurrency for a phase, given the configured limit.
    ///
    /// Never returns less than 1.
    pub fn concurrency_for(self, limit: usize) -> usize {
        let limit = limit.max(1);
        let scaled = match self {
            ParallelStrategy::Maximum => limit,
            ParallelStrategy::Balanced => (limit / 4) * 3 + (limit % 4) * 3 / 4,
            ParallelStrategy::Conservative => limit / 2,
        };
        scaled.max(1)
    }
}

impl fmt::Display for ParallelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParallelStrategy::Maximum => "maximum",
            ParallelStrategy::Balanced => "balanced",
            ParallelStrategy::Conservative => "conservative",
        };
        f.write_str(s)
    }
}

/// Caller-supplied hint on how hard the planner should push parallelism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggressiveness {
    Low,
    Medium,
    High,
}

impl Default for Aggressiveness {
    fn default() -> Self {
        Aggressiveness::Medium
    }
}

impl FromStr for Aggressiveness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Aggressiveness::Low),
            "medium" => Ok(Aggressiveness::Medium),
            "high" => Ok(Aggressiveness::High),
            other => Err(format!(
                "invalid aggressiveness: {other} (expected \"low\", \"medium\" or \"high\")"
            )),
        }
    }
}

/// Execution mode of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Parallel,
    Sequential,
}

impl ExecutionMode {
    /// A phase with more than one operation runs in parallel.
    pub fn for_phase_len(len: usize) -> Self {
        if len > 1 {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        }
    }
}
