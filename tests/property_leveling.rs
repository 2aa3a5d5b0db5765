// tests/property_leveling.rs

mod common;
use crate::common::builders::OperationBuilder;

use std::collections::{HashMap, HashSet};

use phasedag::dag::{DependencyGraph, build_graph};
use phasedag::operation::Operation;
use proptest::prelude::*;

fn op_name(i: usize) -> String {
    format!("op_{}", i)
}

// Acyclic by construction: operation N may only depend on operations 0..N-1.
fn acyclic_ops_strategy(max_ops: usize) -> impl Strategy<Value = Vec<Operation>> {
    (1..=max_ops).prop_flat_map(|num_ops| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), num_ops)
            .prop_map(move |raw_deps| {
                raw_deps
                    .into_iter()
                    .enumerate()
                    .map(|(i, potential)| {
                        let mut builder = OperationBuilder::new(&op_name(i));
                        if i > 0 {
                            for dep in potential {
                                builder = builder.after(&op_name(dep % i));
                            }
                        }
                        builder.build()
                    })
                    .collect()
            })
    })
}

// Anything goes: dependencies may point forwards, backwards, at themselves,
// or outside the request.
fn arbitrary_ops_strategy(max_ops: usize) -> impl Strategy<Value = Vec<Operation>> {
    (1..=max_ops).prop_flat_map(|num_ops| {
        proptest::collection::vec(proptest::collection::vec(0..num_ops + 2, 0..4), num_ops)
            .prop_map(move |raw_deps| {
                raw_deps
                    .into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        let mut builder = OperationBuilder::new(&op_name(i));
                        for dep in deps {
                            builder = builder.after(&op_name(dep));
                        }
                        builder.build()
                    })
                    .collect()
            })
    })
}

fn level_map(graph: &DependencyGraph) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, level) in graph.levels().iter().enumerate() {
        for id in level {
            let previous = map.insert(id.clone(), idx);
            assert!(previous.is_none(), "{} appears in more than one level", id);
        }
    }
    map
}

proptest! {
    #[test]
    fn dependencies_sit_in_strictly_earlier_levels(ops in acyclic_ops_strategy(12)) {
        let declared: Vec<(String, Vec<String>)> = ops
            .iter()
            .map(|op| (op.id.clone(), op.dependencies.clone()))
            .collect();

        let graph = build_graph(ops).unwrap();
        let levels = level_map(&graph);

        prop_assert!(graph.forced_operations().is_empty());
        for (id, deps) in declared {
            let own = levels[&id];
            for dep in deps {
                prop_assert!(
                    levels[&dep] < own,
                    "{} (level {}) depends on {} (level {})",
                    id,
                    own,
                    dep,
                    levels[&dep]
                );
            }
        }
    }

    #[test]
    fn leveling_terminates_and_covers_everything(ops in arbitrary_ops_strategy(12)) {
        let ids: HashSet<String> = ops.iter().map(|op| op.id.clone()).collect();
        let count = ops.len();

        let graph = build_graph(ops).unwrap();
        let levels = level_map(&graph);

        prop_assert_eq!(levels.len(), count);
        prop_assert!(graph.depth() <= count);
        for id in &ids {
            prop_assert!(levels.contains_key(id));
            let own = levels[id];
            for dep in graph.dependencies_of(id) {
                prop_assert!(levels[dep] < own);
            }
            for dep in graph.broken_dependencies_of(id) {
                prop_assert!(ids.contains(dep));
            }
        }
    }
}
