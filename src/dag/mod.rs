// src/dag/mod.rs

//! Dependency graph representation and leveling.
//!
//! - [`graph`] holds the read-only leveled [`DependencyGraph`].
//! - [`builder`] turns a flat operation list into that graph, breaking
//!   cycles deterministically so building always terminates.

pub mod builder;
pub mod graph;

pub use builder::build_graph;
pub use graph::DependencyGraph;
