// tests/dag_leveling.rs

mod common;
use crate::common::builders::OperationBuilder;
use crate::common::{init_tracing, level_ids};

use phasedag::dag::build_graph;
use phasedag::errors::PhasedagError;

#[test]
fn independent_operations_share_first_level() {
    init_tracing();

    let graph = build_graph(vec![
        OperationBuilder::new("A").build(),
        OperationBuilder::new("B").build(),
        OperationBuilder::new("C").after("A").after("B").build(),
    ])
    .unwrap();

    assert_eq!(level_ids(&graph), vec![vec!["A", "B"], vec!["C"]]);
    assert_eq!(graph.depth(), 2);
    assert_eq!(graph.level_of("C"), Some(1));
    assert_eq!(graph.dependents_of("A"), &["C".to_string()]);
    assert!(graph.forced_operations().is_empty());
}

#[test]
fn chain_gets_one_level_per_operation() {
    init_tracing();

    let graph = build_graph(vec![
        OperationBuilder::new("load").named("Load source document").build(),
        OperationBuilder::new("outline").after("load").build(),
        OperationBuilder::new("draft").after("outline").build(),
        OperationBuilder::new("review").after("draft").after("load").build(),
    ])
    .unwrap();

    assert_eq!(
        level_ids(&graph),
        vec![vec!["load"], vec!["outline"], vec!["draft"], vec!["review"]]
    );
    assert_eq!(graph.operation("load").unwrap().name, "Load source document");
    assert_eq!(graph.operation("draft").unwrap().name, "draft");
}

#[test]
fn two_cycle_is_broken_at_first_member() {
    init_tracing();

    let graph = build_graph(vec![
        OperationBuilder::new("X").after("Y").build(),
        OperationBuilder::new("Y").after("X").build(),
    ])
    .unwrap();

    assert_eq!(level_ids(&graph), vec![vec!["X"], vec!["Y"]]);
    assert_eq!(graph.forced_operations(), &["X".to_string()]);
    assert_eq!(graph.broken_dependencies_of("X"), &["Y".to_string()]);
    assert!(graph.dependencies_of("X").is_empty());
    assert_eq!(graph.dependencies_of("Y"), &["X".to_string()]);
    assert_eq!(graph.dependents_of("X"), &["Y".to_string()]);
    assert!(graph.dependents_of("Y").is_empty());
}

#[test]
fn cycle_members_wait_for_acyclic_operations() {
    init_tracing();

    let graph = build_graph(vec![
        OperationBuilder::new("A").after("C").build(),
        OperationBuilder::new("B").after("A").build(),
        OperationBuilder::new("C").after("B").build(),
        OperationBuilder::new("D").build(),
    ])
    .unwrap();

    assert_eq!(
        level_ids(&graph),
        vec![vec!["D"], vec!["A"], vec!["B"], vec!["C"]]
    );
    assert_eq!(graph.broken_dependencies_of("A"), &["C".to_string()]);
}

#[test]
fn self_dependency_is_dropped() {
    init_tracing();

    let graph = build_graph(vec![
        OperationBuilder::new("A").after("A").build(),
        OperationBuilder::new("B").after("A").build(),
    ])
    .unwrap();

    assert_eq!(level_ids(&graph), vec![vec!["A"], vec!["B"]]);
    assert_eq!(graph.broken_dependencies_of("A"), &["A".to_string()]);
    assert_eq!(graph.forced_operations(), &["A".to_string()]);
}

#[test]
fn unknown_dependency_is_ignored() {
    init_tracing();

    let graph = build_graph(vec![
        OperationBuilder::new("A").after("ghost").build(),
        OperationBuilder::new("B").after("A").build(),
    ])
    .unwrap();

    assert_eq!(level_ids(&graph), vec![vec!["A"], vec!["B"]]);
    assert!(graph.dependencies_of("A").is_empty());
    assert!(graph.forced_operations().is_empty());
}

#[test]
fn duplicate_ids_are_rejected() {
    init_tracing();

    let result = build_graph(vec![
        OperationBuilder::new("A").build(),
        OperationBuilder::new("B").build(),
        OperationBuilder::new("A").build(),
    ]);

    match result {
        Err(PhasedagError::DuplicateOperation(id)) => assert_eq!(id, "A"),
        Err(e) => panic!("Expected DuplicateOperation error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn empty_request_builds_empty_graph() {
    let graph = build_graph(vec![]).unwrap();
    assert!(graph.is_empty());
    assert_eq!(graph.depth(), 0);
}
