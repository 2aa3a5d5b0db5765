// src/dag/graph.rs

use std::collections::HashMap;

use crate::operation::{Operation, OperationId};

/// Internal node structure: the operation plus its adjacency.
#[derive(Debug, Clone)]
pub(crate) struct DagNode {
    pub(crate) operation: Operation,
    /// Dependencies that constrain leveling (declared, known, not broken).
    pub(crate) deps: Vec<OperationId>,
    /// Declared dependencies dropped to break a cycle.
    pub(crate) broken_deps: Vec<OperationId>,
    /// Operations whose `deps` contain this one.
    pub(crate) dependents: Vec<OperationId>,
    pub(crate) level: usize,
}

/// Leveled, read-only view of one request's operations.
///
/// Built once per request by [`crate::dag::build_graph`]. Every id in level
/// `k` has all of its [`dependencies_of`](Self::dependencies_of) in levels
/// `0..k`.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    pub(crate) nodes: HashMap<OperationId, DagNode>,
    /// Operation ids in the order the caller submitted them.
    pub(crate) order: Vec<OperationId>,
    pub(crate) levels: Vec<Vec<OperationId>>,
    /// Operations that were forced into a level to break a cycle.
    pub(crate) forced: Vec<OperationId>,
}

impl DependencyGraph {
    /// Number of operations.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Operation ids in submission order.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.nodes.get(id).map(|n| &n.operation)
    }

    /// Leveled operation ids; level 0 first.
    pub fn levels(&self) -> &[Vec<OperationId>] {
        &self.levels
    }

    /// Number of levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.nodes.get(id).map(|n| n.level)
    }

    /// Effective dependencies: the ones leveling honoured.
    pub fn dependencies_of(&self, id: &str) -> &[OperationId] {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Declared dependencies ignored to break a cycle.
    pub fn broken_dependencies_of(&self, id: &str) -> &[OperationId] {
        self.nodes
            .get(id)
            .map(|n| n.broken_deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of an operation.
    pub fn dependents_of(&self, id: &str) -> &[OperationId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Operations forced into a level to break a cycle, in forcing order.
    pub fn forced_operations(&self) -> &[OperationId] {
        &self.forced
    }
}
