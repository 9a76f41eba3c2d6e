// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The broker state machine.
//!
//! All broker state lives here and is touched from one thread only; there is
//! no locking because there is no sharing. Each inbound [`Event`] is
//! processed to completion, including all resulting outbound sends and the
//! ledger drain, before the next event is accepted.

use crate::clock::Clock;
use crate::event::Event;
use crate::item::{CompletionLedger, Item};
use crate::protocol::{BrokerFrame, QueuePolicy, WorkerFrame, WorkerParameters};
use crate::transport::{ProducerTransport, WorkerTransport};
use crate::types::{ItemId, WorkerIdentity};
use crate::worker::WorkerRecord;
use bytes::Bytes;
use indexmap::IndexMap;
use std::rc::Rc;
use std::time::Duration;

pub struct Dispatcher<W, P, C> {
    workers: IndexMap<WorkerIdentity, WorkerRecord>,
    ledger: CompletionLedger,
    worker_transport: W,
    producer_transport: P,
    clock: C,
    heartbeat_interval: Duration,
}

impl<W, P, C> Dispatcher<W, P, C>
where
    W: WorkerTransport,
    P: ProducerTransport,
    C: Clock,
{
    pub fn new(
        worker_transport: W,
        producer_transport: P,
        clock: C,
        heartbeat_interval: Duration,
    ) -> Self {
        Dispatcher {
            workers: IndexMap::new(),
            ledger: CompletionLedger::new(),
            worker_transport,
            producer_transport,
            clock,
            heartbeat_interval,
        }
    }

    /// Process one inbound event, then drain the completion ledger.
    pub fn on_event(&mut self, event: Event) {
        match event {
            Event::ProducerItem { id, payload } => self.on_producer_item(id, payload),
            Event::WorkerMessage { from, text } => self.on_worker_message(from, &text),
            Event::WorkerDisconnected { from } => self.on_worker_disconnected(&from),
            Event::Tick => self.on_tick(),
        }
        self.drain_completions();
    }

    /// Tear down: tell every worker to go away, release all held items
    /// (completing them through the ledger), and flush the ledger.
    pub fn shutdown(&mut self) {
        for identity in self.workers.keys() {
            Self::transmit(&mut self.worker_transport, identity, &BrokerFrame::Disconnect);
        }
        self.workers.clear();
        self.drain_completions();
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn worker(&self, identity: &WorkerIdentity) -> Option<&WorkerRecord> {
        self.workers.get(identity)
    }

    /// Completions still awaiting delivery, normally zero after `on_event`
    /// unless the producer channel is failing.
    pub fn pending_completions(&self) -> usize {
        self.ledger.len()
    }

    fn on_producer_item(&mut self, id: ItemId, payload: Bytes) {
        let item = Item::new(&self.ledger, id, payload);

        // Fan out in worker insertion order.
        for (identity, worker) in self.workers.iter_mut() {
            if !worker.wants(item.id()) {
                continue;
            }
            if worker.policy() == QueuePolicy::PrebufferOne {
                // Replace, never grow: the newest matching item wins.
                worker.clear_waiting();
            }
            if worker.is_idle() {
                worker.add_outstanding(Rc::clone(&item));
                let frame = BrokerFrame::WorkItem {
                    id: item.id(),
                    payload: item.payload().clone(),
                };
                Self::transmit(&mut self.worker_transport, identity, &frame);
            } else if worker.policy() != QueuePolicy::Skip {
                worker.push_waiting(Rc::clone(&item));
            }
        }

        // The intake reference drops here. If no worker matched, the item
        // completes immediately through the ledger.
    }

    fn on_worker_message(&mut self, from: WorkerIdentity, text: &str) {
        match WorkerFrame::parse(text) {
            Ok(WorkerFrame::Register(parameters)) => self.on_register(from, parameters),
            Ok(WorkerFrame::Complete(id)) => self.on_complete(&from, id),
            Err(error) => {
                tracing::warn!("dropping malformed frame from {from}: {error}");
            }
        }
    }

    fn on_register(&mut self, from: WorkerIdentity, parameters: WorkerParameters) {
        tracing::info!(
            "worker {from} registered: stride {} offset {} policy {} name {}",
            parameters.stride,
            parameters.offset,
            parameters.policy,
            parameters.client_name
        );
        let record = WorkerRecord::new(parameters, self.clock.now() + self.heartbeat_interval);
        if self.workers.insert(from.clone(), record).is_some() {
            // Reconnect under the same identity: the replaced record's
            // queues drop, completing their items through the ledger.
            tracing::info!("worker {from} replaced an existing registration");
        }
    }

    fn on_complete(&mut self, from: &WorkerIdentity, id: ItemId) {
        let Some(worker) = self.workers.get_mut(from) else {
            tracing::warn!("COMPLETE {id} from unregistered worker {from}, ignoring");
            return;
        };
        let Some(completed) = worker.take_outstanding(id) else {
            tracing::warn!("worker {from} completed item {id} it does not hold, ignoring");
            return;
        };
        drop(completed);

        // Send the next waiting item, if any.
        if let Some(next) = worker.pop_waiting() {
            worker.add_outstanding(Rc::clone(&next));
            let frame = BrokerFrame::WorkItem {
                id: next.id(),
                payload: next.payload().clone(),
            };
            Self::transmit(&mut self.worker_transport, from, &frame);
        }
    }

    fn on_worker_disconnected(&mut self, from: &WorkerIdentity) {
        // Dropping the record releases both queues; items whose last holder
        // was this worker complete through the ledger. No COMPLETE is ever
        // synthesized.
        if self.workers.shift_remove(from).is_some() {
            tracing::info!("worker {from} disconnected, released its items");
        } else {
            tracing::warn!("disconnect notification for unknown worker {from}, ignoring");
        }
    }

    /// Heartbeat sweep. Idle workers whose deadline has passed get a
    /// HEARTBEAT; workers with outstanding items need none, the in-flight
    /// WORK_ITEM is liveness evidence.
    fn on_tick(&mut self) {
        let now = self.clock.now();
        for (identity, worker) in self.workers.iter_mut() {
            if worker.is_idle() && now >= worker.next_heartbeat_time() {
                Self::transmit(&mut self.worker_transport, identity, &BrokerFrame::Heartbeat);
                // Deadline counts from now, not from the stale deadline,
                // and advances even when the send failed.
                worker.set_next_heartbeat_time(now + self.heartbeat_interval);
            }
        }
    }

    /// Report every completed item upstream, in destruction order. On a send
    /// failure the failed ID and the rest stay in the ledger for the next
    /// drain.
    fn drain_completions(&mut self) {
        while let Some(id) = self.ledger.front() {
            if let Err(error) = self.producer_transport.send_completion(id) {
                tracing::warn!("completion send for item {id} failed, will retry: {error}");
                break;
            }
            self.ledger.pop_front();
        }
    }

    fn transmit(transport: &mut W, to: &WorkerIdentity, frame: &BrokerFrame) {
        if let Err(error) = transport.send(to, frame) {
            tracing::warn!("send to worker {to} failed, abandoning frame: {error}");
        }
    }
}
