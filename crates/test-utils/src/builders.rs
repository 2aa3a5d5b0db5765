#![allow(dead_code)]

use std::time::Duration;

use phasedag::operation::{Operation, OperationKind};
use serde_json::{Value, json};

use crate::fake_work::{EventLog, FakeWork};

/// Builder for `Operation`s backed by [`FakeWork`].
pub struct OperationBuilder {
    id: String,
    name: Option<String>,
    after: Vec<String>,
    kind: OperationKind,
    parameters: Value,
    estimated: Duration,
    timeout: Option<Duration>,
    work: FakeWork,
}

impl OperationBuilder {
    /// Operation that returns `{"id": <id>}`.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            after: vec![],
            kind: OperationKind::Standard,
            parameters: Value::Null,
            estimated: Duration::ZERO,
            timeout: None,
            work: FakeWork::returning(json!({ "id": id })),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.after.push(dep.to_string());
        self
    }

    pub fn kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn params(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn estimated(mut self, estimated: Duration) -> Self {
        self.estimated = estimated;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn work(mut self, work: FakeWork) -> Self {
        self.work = work;
        self
    }

    pub fn returning(mut self, value: Value) -> Self {
        self.work = FakeWork::returning(value);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.work = FakeWork::failing(message);
        self
    }

    /// Keep the current behaviour, adding a delay.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.work = self.work.with_delay(delay);
        self
    }

    pub fn log(mut self, log: &EventLog) -> Self {
        self.work = self.work.with_log(log);
        self
    }

    pub fn build(self) -> Operation {
        self.build_with_work().0
    }

    /// Build the operation and hand back a handle sharing its call counter.
    pub fn build_with_work(self) -> (Operation, FakeWork) {
        let handle = self.work.clone();
        let mut op = Operation::new(self.id, self.work)
            .with_kind(self.kind)
            .with_parameters(self.parameters)
            .with_estimated_time(self.estimated);
        if let Some(name) = self.name {
            op = op.named(name);
        }
        for dep in self.after {
            op = op.depends_on(dep);
        }
        if let Some(timeout) = self.timeout {
            op = op.with_timeout(timeout);
        }
        (op, handle)
    }
}
