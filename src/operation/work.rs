// src/operation/work.rs

//! The opaque unit of work an operation wraps.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::operation::{ExecutionContext, OperationId};

/// Everything an operation's work receives when it is invoked.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub operation_id: OperationId,
    pub parameters: Value,
    pub context: ExecutionContext,
    /// Declared dependencies that failed earlier in this request.
    ///
    /// Dependents still run at their level; this is the only signal they get.
    pub failed_dependencies: Vec<OperationId>,
}

/// Boxed future returned by [`OperationWork::run`].
pub type WorkFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send + 'a>>;

/// Trait abstracting what an operation actually computes.
///
/// The scheduler never interprets the produced value; it only times it,
/// caches it and hands it back. Closures returning a `Send` future implement
/// this trait automatically.
pub trait OperationWork: Send + Sync {
    fn run(&self, invocation: Invocation) -> WorkFuture<'_>;
}

impl<F, Fut> OperationWork for F
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    fn run(&self, invocation: Invocation) -> WorkFuture<'_> {
        Box::pin((self)(invocation))
    }
}
