// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::item::Item;
use crate::protocol::{QueuePolicy, WorkerParameters};
use crate::types::ItemId;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

/// Per-worker broker state: the subscription, the two item queues, and the
/// heartbeat deadline.
///
/// `waiting_items` holds matched items not yet dispatched, in arrival order.
/// `outstanding_items` holds dispatched items awaiting a COMPLETE. A worker
/// is idle iff `outstanding_items` is empty. Dropping the record releases
/// every held item; items whose last holder this was then complete through
/// the ledger.
#[derive(Debug)]
pub struct WorkerRecord {
    parameters: WorkerParameters,
    waiting_items: VecDeque<Rc<Item>>,
    outstanding_items: VecDeque<Rc<Item>>,
    next_heartbeat_time: Instant,
}

impl WorkerRecord {
    pub fn new(parameters: WorkerParameters, next_heartbeat_time: Instant) -> Self {
        WorkerRecord {
            parameters,
            waiting_items: VecDeque::new(),
            outstanding_items: VecDeque::new(),
            next_heartbeat_time,
        }
    }

    pub fn parameters(&self) -> &WorkerParameters {
        &self.parameters
    }

    pub fn policy(&self) -> QueuePolicy {
        self.parameters.policy
    }

    pub fn wants(&self, id: ItemId) -> bool {
        self.parameters.matches(id)
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding_items.is_empty()
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting_items.len()
    }

    pub fn outstanding_len(&self) -> usize {
        self.outstanding_items.len()
    }

    /// IDs of dispatched items awaiting a COMPLETE, in dispatch order.
    pub fn outstanding_ids(&self) -> Vec<ItemId> {
        self.outstanding_items.iter().map(|item| item.id()).collect()
    }

    /// Drop all waiting items, releasing this worker's references.
    pub fn clear_waiting(&mut self) {
        self.waiting_items.clear();
    }

    pub fn push_waiting(&mut self, item: Rc<Item>) {
        self.waiting_items.push_back(item);
    }

    pub fn pop_waiting(&mut self) -> Option<Rc<Item>> {
        self.waiting_items.pop_front()
    }

    pub fn add_outstanding(&mut self, item: Rc<Item>) {
        self.outstanding_items.push_back(item);
    }

    /// Remove and return the outstanding item with the given ID, or `None`
    /// if the worker completed something it was never sent.
    pub fn take_outstanding(&mut self, id: ItemId) -> Option<Rc<Item>> {
        let position = self.outstanding_items.iter().position(|item| item.id() == id)?;
        self.outstanding_items.remove(position)
    }

    pub fn next_heartbeat_time(&self) -> Instant {
        self.next_heartbeat_time
    }

    pub fn set_next_heartbeat_time(&mut self, deadline: Instant) {
        self.next_heartbeat_time = deadline;
    }
}
