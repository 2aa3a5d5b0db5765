// src/dag/builder.rs

//! Topological leveling with deterministic cycle breaking.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info, warn};

use crate::dag::graph::{DagNode, DependencyGraph};
use crate::errors::{PhasedagError, Result};
use crate::operation::{Operation, OperationId};

/// Build a leveled [`DependencyGraph`] from a flat operation list.
///
/// - Level 0 holds operations with no unmet dependencies; level `k` holds
///   operations whose dependencies all resolved by level `k - 1`.
/// - When no operation qualifies but some remain, one is forced into the next
///   level. Members of a cycle are preferred, first in submission order; a
///   self-dependency counts as a cycle. The dependencies it skipped are
///   recorded as broken.
/// - Dependencies naming ids outside the request are ignored with a warning.
/// - Duplicate ids are rejected with [`PhasedagError::DuplicateOperation`].
///
/// Terminates in at most `N` rounds for `N` operations.
pub fn build_graph(operations: Vec<Operation>) -> Result<DependencyGraph> {
    let order = collect_order(&operations)?;
    let known: HashSet<&str> = order.iter().map(|s| s.as_str()).collect();

    // First pass: nodes with known dependency lists.
    let mut nodes: HashMap<OperationId, DagNode> = HashMap::new();
    for op in operations {
        let mut deps = Vec::new();
        for dep in &op.dependencies {
            if !known.contains(dep.as_str()) {
                warn!(
                    operation = %op.id,
                    dependency = %dep,
                    "dependency is not part of this request; ignoring"
                );
                continue;
            }
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        nodes.insert(
            op.id.clone(),
            DagNode {
                operation: op,
                deps,
                broken_deps: Vec::new(),
                dependents: Vec::new(),
                level: 0,
            },
        );
    }

    let cyclic = cyclic_members(&order, &nodes);
    if !cyclic.is_empty() {
        warn!(
            members = ?cyclic_in_order(&order, &cyclic),
            "circular dependencies detected; cycles will be broken during leveling"
        );
    }

    let (levels, forced) = assign_levels(&order, &mut nodes, &cyclic)?;

    // Second pass: dependents from the effective (post-break) dependencies.
    for id in &order {
        let deps = nodes.get(id).map(|n| n.deps.clone()).unwrap_or_default();
        for dep in deps {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                dep_node.dependents.push(id.clone());
            }
        }
    }

    info!(
        operations = order.len(),
        levels = levels.len(),
        forced = forced.len(),
        "dependency graph built"
    );

    Ok(DependencyGraph {
        nodes,
        order,
        levels,
        forced,
    })
}

fn collect_order(operations: &[Operation]) -> Result<Vec<OperationId>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(operations.len());
    for op in operations {
        if !seen.insert(op.id.as_str()) {
            return Err(PhasedagError::DuplicateOperation(op.id.clone()));
        }
        order.push(op.id.clone());
    }
    Ok(order)
}

/// Ids that sit on a cycle: members of a strongly connected component with
/// more than one node, or nodes depending on themselves.
fn cyclic_members(
    order: &[OperationId],
    nodes: &HashMap<OperationId, DagNode>,
) -> HashSet<OperationId> {
    // Edge direction: dep -> operation.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for id in order {
        graph.add_node(id.as_str());
    }
    for id in order {
        if let Some(node) = nodes.get(id) {
            for dep in &node.deps {
                graph.add_edge(dep.as_str(), id.as_str(), ());
            }
        }
    }

    let mut members = HashSet::new();
    for component in tarjan_scc(&graph) {
        let on_cycle = component.len() > 1
            || component
                .first()
                .is_some_and(|n| graph.contains_edge(*n, *n));
        if on_cycle {
            members.extend(component.into_iter().map(|s| s.to_string()));
        }
    }
    members
}

fn cyclic_in_order<'a>(order: &'a [OperationId], cyclic: &HashSet<OperationId>) -> Vec<&'a str> {
    order
        .iter()
        .filter(|id| cyclic.contains(*id))
        .map(|s| s.as_str())
        .collect()
}

type Levels = (Vec<Vec<OperationId>>, Vec<OperationId>);

fn assign_levels(
    order: &[OperationId],
    nodes: &mut HashMap<OperationId, DagNode>,
    cyclic: &HashSet<OperationId>,
) -> Result<Levels> {
    let mut assigned: HashSet<OperationId> = HashSet::new();
    let mut levels: Vec<Vec<OperationId>> = Vec::new();
    let mut forced: Vec<OperationId> = Vec::new();

    while assigned.len() < order.len() {
        if levels.len() >= order.len() {
            let remaining: Vec<&str> = order
                .iter()
                .filter(|id| !assigned.contains(*id))
                .map(|s| s.as_str())
                .collect();
            return Err(PhasedagError::CyclicDependencyUnresolved(format!(
                "leveling made no progress for {:?}",
                remaining
            )));
        }

        let level_index = levels.len();

        // Decide first, then mutate.
        let mut ready: Vec<OperationId> = order
            .iter()
            .filter(|id| !assigned.contains(*id))
            .filter(|id| {
                nodes
                    .get(*id)
                    .is_some_and(|n| n.deps.iter().all(|d| assigned.contains(d)))
            })
            .cloned()
            .collect();

        if ready.is_empty() {
            let victim = order
                .iter()
                .find(|id| !assigned.contains(*id) && cyclic.contains(*id))
                .or_else(|| order.iter().find(|id| !assigned.contains(*id)))
                .cloned()
                .ok_or_else(|| {
                    PhasedagError::CyclicDependencyUnresolved(
                        "no unassigned operation left to force".to_string(),
                    )
                })?;

            if let Some(node) = nodes.get_mut(&victim) {
                let (kept, broken): (Vec<_>, Vec<_>) =
                    node.deps.drain(..).partition(|d| assigned.contains(d));
                warn!(
                    operation = %victim,
                    level = level_index,
                    broken = ?broken,
                    "breaking dependency cycle by forcing operation into level"
                );
                node.deps = kept;
                node.broken_deps = broken;
            }
            forced.push(victim.clone());
            ready.push(victim);
        }

        for id in &ready {
            if let Some(node) = nodes.get_mut(id) {
                node.level = level_index;
            }
            assigned.insert(id.clone());
        }
        debug!(level = level_index, operations = ?ready, "assigned level");
        levels.push(ready);
    }

    Ok((levels, forced))
}
