use item_distributor_core::clock::Clock;
use item_distributor_core::error::SendError;
use item_distributor_core::protocol::BrokerFrame;
use item_distributor_core::transport::{ProducerTransport, WorkerTransport};
use item_distributor_core::types::{ItemId, WorkerIdentity};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Shared record of every frame the dispatcher handed to the worker channel.
#[derive(Debug, Clone, Default)]
pub struct FrameLog {
    frames: Rc<RefCell<Vec<(WorkerIdentity, BrokerFrame)>>>,
}

impl FrameLog {
    pub fn all(&self) -> Vec<(WorkerIdentity, BrokerFrame)> {
        self.frames.borrow().clone()
    }

    pub fn to_worker(&self, identity: &WorkerIdentity) -> Vec<BrokerFrame> {
        self.frames
            .borrow()
            .iter()
            .filter(|(to, _)| to == identity)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    fn push(&self, to: WorkerIdentity, frame: BrokerFrame) {
        self.frames.borrow_mut().push((to, frame));
    }
}

/// Shared record of every completion delivered to the producer channel.
#[derive(Debug, Clone, Default)]
pub struct CompletionLog {
    completions: Rc<RefCell<Vec<ItemId>>>,
}

impl CompletionLog {
    pub fn all(&self) -> Vec<ItemId> {
        self.completions.borrow().clone()
    }

    fn push(&self, id: ItemId) {
        self.completions.borrow_mut().push(id);
    }
}

/// Toggle to make a transport refuse sends.
#[derive(Debug, Clone, Default)]
pub struct FailureFlag(Rc<Cell<bool>>);

impl FailureFlag {
    pub fn set(&self, failing: bool) {
        self.0.set(failing);
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }
}

pub struct InMemoryWorkerTransport {
    log: FrameLog,
    failure: FailureFlag,
}

impl InMemoryWorkerTransport {
    pub fn new(log: FrameLog, failure: FailureFlag) -> Self {
        InMemoryWorkerTransport { log, failure }
    }
}

impl WorkerTransport for InMemoryWorkerTransport {
    fn send(&mut self, to: &WorkerIdentity, frame: &BrokerFrame) -> Result<(), SendError> {
        if self.failure.is_set() {
            return Err(SendError::Disconnected);
        }
        self.log.push(to.clone(), frame.clone());
        Ok(())
    }
}

pub struct InMemoryProducerTransport {
    log: CompletionLog,
    failure: FailureFlag,
}

impl InMemoryProducerTransport {
    pub fn new(log: CompletionLog, failure: FailureFlag) -> Self {
        InMemoryProducerTransport { log, failure }
    }
}

impl ProducerTransport for InMemoryProducerTransport {
    fn send_completion(&mut self, id: ItemId) -> Result<(), SendError> {
        if self.failure.is_set() {
            return Err(SendError::QueueFull);
        }
        self.log.push(id);
        Ok(())
    }
}

/// A clock driven by hand.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        MockClock {
            start: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        MockClock::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed.get()
    }
}
