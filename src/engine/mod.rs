// src/engine/mod.rs

//! Execution engine.
//!
//! - [`scheduler`] owns the long-lived cache, monitor and tuning state and is
//!   the entry point for callers.
//! - [`executor`] runs one phase with bounded concurrency.
//! - [`fallback`] runs a request sequentially when planning breaks down.
//! - [`report`] holds the result objects handed back to callers.
//!
//! Phases run strictly in plan order; within a phase there is no ordering
//! guarantee.

pub mod executor;
pub mod fallback;
pub mod report;
pub mod scheduler;

pub use executor::PhaseExecutor;
pub use report::{CacheAnalysis, ExecutionReport, PerformanceReport, PhaseReport};
pub use scheduler::{CachedResult, Scheduler};
