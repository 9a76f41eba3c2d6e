// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::types::ItemId;
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Append-only buffer of item IDs awaiting upstream notification.
///
/// Handles are cheap clones sharing one buffer. The reference count of an
/// [`Item`] only changes on the event-loop thread, so `Rc` is sufficient.
#[derive(Debug, Clone, Default)]
pub struct CompletionLedger {
    completed: Rc<RefCell<VecDeque<ItemId>>>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        CompletionLedger::default()
    }

    fn record(&self, id: ItemId) {
        self.completed.borrow_mut().push_back(id);
    }

    /// Next ID awaiting delivery, in destruction order.
    pub fn front(&self) -> Option<ItemId> {
        self.completed.borrow().front().copied()
    }

    pub fn pop_front(&self) -> Option<ItemId> {
        self.completed.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.completed.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.borrow().is_empty()
    }
}

/// A work item under shared ownership.
///
/// The item exists exactly while at least one worker holds it in a queue (or
/// the dispatcher still holds its intake reference). Dropping the last handle
/// appends the ID to the completion ledger; this is the sole source of truth
/// for "item N has been fully processed". No completion is ever reported any
/// other way.
#[derive(Debug)]
pub struct Item {
    id: ItemId,
    payload: Bytes,
    ledger: CompletionLedger,
}

impl Item {
    pub fn new(ledger: &CompletionLedger, id: ItemId, payload: Bytes) -> Rc<Self> {
        Rc::new(Item {
            id,
            payload,
            ledger: ledger.clone(),
        })
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

impl Drop for Item {
    fn drop(&mut self) {
        self.ledger.record(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreferenced_item_completes_immediately() {
        let ledger = CompletionLedger::new();

        let item = Item::new(&ledger, 7, Bytes::new());
        assert!(ledger.is_empty());

        drop(item);
        assert_eq!(ledger.pop_front(), Some(7));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_item_completes_once_after_last_holder_drops() {
        let ledger = CompletionLedger::new();

        let item = Item::new(&ledger, 1, Bytes::from_static(b"payload"));
        let second_holder = Rc::clone(&item);

        drop(item);
        assert!(ledger.is_empty());

        drop(second_holder);
        assert_eq!(ledger.pop_front(), Some(1));
        assert_eq!(ledger.pop_front(), None);
    }

    #[test]
    fn test_ledger_preserves_destruction_order() {
        let ledger = CompletionLedger::new();

        let first = Item::new(&ledger, 10, Bytes::new());
        let second = Item::new(&ledger, 11, Bytes::new());
        drop(second);
        drop(first);

        assert_eq!(ledger.pop_front(), Some(11));
        assert_eq!(ledger.pop_front(), Some(10));
    }
}
