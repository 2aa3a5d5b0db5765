#![allow(dead_code, unused_imports)]

pub use phasedag_test_utils::builders;
pub use phasedag_test_utils::fake_work;
pub use phasedag_test_utils::{init_tracing, test_config, with_timeout};

use phasedag::dag::DependencyGraph;

/// Levels as `&str` for compact assertions.
pub fn level_ids(graph: &DependencyGraph) -> Vec<Vec<&str>> {
    graph
        .levels()
        .iter()
        .map(|level| level.iter().map(|s| s.as_str()).collect())
        .collect()
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
