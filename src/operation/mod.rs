// src/operation/mod.rs

//! Schedulable operations.
//!
//! An [`Operation`] is created by the caller for one scheduling request and
//! discarded afterwards. The scheduler only looks at its id, dependencies,
//! kind and parameters; the [`OperationWork`] body stays opaque.

pub mod context;
pub mod outcome;
pub mod work;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use context::ExecutionContext;
pub use outcome::{OperationError, OperationOutcome, OperationResult};
pub use work::{Invocation, OperationWork, WorkFuture};

/// Canonical operation id type used throughout the scheduler.
pub type OperationId = String;

/// Declared type of an operation. Decides cacheability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    #[default]
    Standard,
    RealTime,
    UserSpecific,
    TimeSensitive,
}

impl OperationKind {
    pub fn is_cacheable(self) -> bool {
        matches!(self, OperationKind::Standard)
    }
}

/// A unit of schedulable work.
#[derive(Clone)]
pub struct Operation {
    /// Unique within one scheduling request.
    pub id: OperationId,
    /// Human-readable label for logging.
    pub name: String,
    pub dependencies: Vec<OperationId>,
    /// Advisory duration used for planning estimates only.
    pub estimated_time: Duration,
    pub kind: OperationKind,
    /// Hashed into the cache key together with `id`.
    pub parameters: Value,
    /// Per-operation override of `execution.operation_timeout`.
    pub timeout: Option<Duration>,
    pub work: Arc<dyn OperationWork>,
}

impl Operation {
    pub fn new(id: impl Into<String>, work: impl OperationWork + 'static) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            dependencies: Vec::new(),
            estimated_time: Duration::ZERO,
            kind: OperationKind::Standard,
            parameters: Value::Null,
            timeout: None,
            work: Arc::new(work),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn depends_on(mut self, dep: impl Into<String>) -> Self {
        let dep = dep.into();
        if !self.dependencies.contains(&dep) {
            self.dependencies.push(dep);
        }
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_estimated_time(mut self, estimated: Duration) -> Self {
        self.estimated_time = estimated;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_cacheable(&self) -> bool {
        self.kind.is_cacheable()
    }

    pub(crate) fn invocation(
        &self,
        context: &ExecutionContext,
        failed_dependencies: Vec<OperationId>,
    ) -> Invocation {
        Invocation {
            operation_id: self.id.clone(),
            parameters: self.parameters.clone(),
            context: context.clone(),
            failed_dependencies,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("estimated_time", &self.estimated_time)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
