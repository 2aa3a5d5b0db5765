use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use phasedag::operation::{Invocation, OperationWork, WorkFuture};
use serde_json::Value;

/// What a [`FakeWork`] does once its delay has passed.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Return(Value),
    Fail(String),
    Panic(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkEvent {
    Started(String),
    Finished(String),
}

/// Shared start/finish log for several fake operations.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<WorkEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: WorkEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<WorkEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Index of the first `Started` event for `id`.
    pub fn started_at(&self, id: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|e| *e == WorkEvent::Started(id.to_string()))
    }

    /// Index of the `Finished` event for `id`.
    pub fn finished_at(&self, id: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|e| *e == WorkEvent::Finished(id.to_string()))
    }

    /// Highest number of operations running at the same time.
    pub fn max_in_flight(&self) -> usize {
        let mut current = 0usize;
        let mut max = 0usize;
        for event in self.events() {
            match event {
                WorkEvent::Started(_) => {
                    current += 1;
                    max = max.max(current);
                }
                WorkEvent::Finished(_) => current = current.saturating_sub(1),
            }
        }
        max
    }
}

/// Fake operation body:
/// - sleeps for an optional delay
/// - then returns a value, fails, or panics
/// - counts invocations and remembers the last one
#[derive(Debug, Clone)]
pub struct FakeWork {
    behaviour: Behaviour,
    delay: Option<Duration>,
    log: Option<EventLog>,
    calls: Arc<AtomicUsize>,
    last_invocation: Arc<Mutex<Option<Invocation>>>,
}

impl FakeWork {
    pub fn returning(value: Value) -> Self {
        Self::with_behaviour(Behaviour::Return(value))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_behaviour(Behaviour::Fail(message.to_string()))
    }

    pub fn panicking(message: &str) -> Self {
        Self::with_behaviour(Behaviour::Panic(message.to_string()))
    }

    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            delay: None,
            log: None,
            calls: Arc::new(AtomicUsize::new(0)),
            last_invocation: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_log(mut self, log: &EventLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    /// Number of times the work actually ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_invocation(&self) -> Option<Invocation> {
        self.last_invocation.lock().unwrap().clone()
    }
}

impl OperationWork for FakeWork {
    fn run(&self, invocation: Invocation) -> WorkFuture<'_> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = invocation.operation_id.clone();
            *self.last_invocation.lock().unwrap() = Some(invocation);

            if let Some(log) = &self.log {
                log.push(WorkEvent::Started(id.clone()));
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(log) = &self.log {
                log.push(WorkEvent::Finished(id.clone()));
            }

            match &self.behaviour {
                Behaviour::Return(value) => Ok(value.clone()),
                Behaviour::Fail(message) => Err(anyhow::anyhow!("{message}")),
                Behaviour::Panic(message) => panic!("{message}"),
            }
        })
    }
}
