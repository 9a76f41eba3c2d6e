// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::in_memory::{
    CompletionLog, FailureFlag, FrameLog, InMemoryProducerTransport, InMemoryWorkerTransport,
    MockClock,
};
use bytes::Bytes;
use item_distributor_core::dispatcher::Dispatcher;
use item_distributor_core::event::Event;
use item_distributor_core::protocol::{
    BrokerFrame, QueuePolicy, WorkerFrame, WorkerParameters, DEFAULT_HEARTBEAT_INTERVAL,
};
use item_distributor_core::types::{ItemId, WorkerIdentity};
use std::time::Duration;

/// Drives a dispatcher over in-memory transports and a hand-driven clock,
/// and exposes what the peers would have observed.
pub struct TestBroker {
    dispatcher: Dispatcher<InMemoryWorkerTransport, InMemoryProducerTransport, MockClock>,
    frames: FrameLog,
    completions: CompletionLog,
    worker_send_failure: FailureFlag,
    producer_send_failure: FailureFlag,
    clock: MockClock,
}

impl TestBroker {
    pub fn new() -> Self {
        TestBroker::with_heartbeat_interval(DEFAULT_HEARTBEAT_INTERVAL)
    }

    pub fn with_heartbeat_interval(heartbeat_interval: Duration) -> Self {
        let frames = FrameLog::default();
        let completions = CompletionLog::default();
        let worker_send_failure = FailureFlag::default();
        let producer_send_failure = FailureFlag::default();
        let clock = MockClock::new();

        let dispatcher = Dispatcher::new(
            InMemoryWorkerTransport::new(frames.clone(), worker_send_failure.clone()),
            InMemoryProducerTransport::new(completions.clone(), producer_send_failure.clone()),
            clock.clone(),
            heartbeat_interval,
        );

        TestBroker {
            dispatcher,
            frames,
            completions,
            worker_send_failure,
            producer_send_failure,
            clock,
        }
    }

    pub fn register(&mut self, identity: &str, stride: u64, offset: u64, policy: QueuePolicy) {
        let frame = WorkerFrame::Register(WorkerParameters::new(stride, offset, policy, identity));
        self.worker_message(identity, &frame.to_string());
    }

    /// Deliver a raw text frame, bypassing the typed constructors. For
    /// malformed-input tests.
    pub fn worker_message(&mut self, identity: &str, text: &str) {
        self.dispatcher.on_event(Event::WorkerMessage {
            from: WorkerIdentity::from(identity),
            text: text.to_owned(),
        });
    }

    pub fn produce(&mut self, id: ItemId) {
        self.produce_with_payload(id, b"");
    }

    pub fn produce_with_payload(&mut self, id: ItemId, payload: &[u8]) {
        self.dispatcher.on_event(Event::ProducerItem {
            id,
            payload: Bytes::copy_from_slice(payload),
        });
    }

    pub fn complete(&mut self, identity: &str, id: ItemId) {
        self.worker_message(identity, &WorkerFrame::Complete(id).to_string());
    }

    pub fn disconnect(&mut self, identity: &str) {
        self.dispatcher.on_event(Event::WorkerDisconnected {
            from: WorkerIdentity::from(identity),
        });
    }

    pub fn tick(&mut self) {
        self.dispatcher.on_event(Event::Tick);
    }

    pub fn advance_time(&mut self, millis: u64) {
        self.clock.advance(Duration::from_millis(millis));
    }

    pub fn shutdown(&mut self) {
        self.dispatcher.shutdown();
    }

    pub fn fail_worker_sends(&mut self, failing: bool) {
        self.worker_send_failure.set(failing);
    }

    pub fn fail_producer_sends(&mut self, failing: bool) {
        self.producer_send_failure.set(failing);
    }

    /// Completions observed by the producer, in delivery order.
    pub fn completions(&self) -> Vec<ItemId> {
        self.completions.all()
    }

    /// Every worker-channel frame in send order, with its recipient.
    pub fn all_frames(&self) -> Vec<(WorkerIdentity, BrokerFrame)> {
        self.frames.all()
    }

    pub fn frames_to(&self, identity: &str) -> Vec<BrokerFrame> {
        self.frames.to_worker(&WorkerIdentity::from(identity))
    }

    /// IDs of the WORK_ITEM frames sent to a worker, in dispatch order.
    pub fn work_items_to(&self, identity: &str) -> Vec<ItemId> {
        self.frames_to(identity)
            .into_iter()
            .filter_map(|frame| match frame {
                BrokerFrame::WorkItem { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn heartbeat_count(&self, identity: &str) -> usize {
        self.frames_to(identity)
            .into_iter()
            .filter(|frame| *frame == BrokerFrame::Heartbeat)
            .count()
    }

    pub fn worker_count(&self) -> usize {
        self.dispatcher.worker_count()
    }

    pub fn waiting_len(&self, identity: &str) -> usize {
        self.dispatcher
            .worker(&WorkerIdentity::from(identity))
            .map(|worker| worker.waiting_len())
            .unwrap_or(0)
    }

    pub fn outstanding_len(&self, identity: &str) -> usize {
        self.dispatcher
            .worker(&WorkerIdentity::from(identity))
            .map(|worker| worker.outstanding_len())
            .unwrap_or(0)
    }

    pub fn outstanding_ids(&self, identity: &str) -> Vec<ItemId> {
        self.dispatcher
            .worker(&WorkerIdentity::from(identity))
            .map(|worker| worker.outstanding_ids())
            .unwrap_or_default()
    }

    pub fn pending_completions(&self) -> usize {
        self.dispatcher.pending_completions()
    }
}

impl Default for TestBroker {
    fn default() -> Self {
        TestBroker::new()
    }
}
