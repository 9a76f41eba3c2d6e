// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use item_distributor_core::protocol::{BrokerFrame, QueuePolicy};
use item_distributor_sim::test_broker::TestBroker;

#[test]
fn test_stride_fan_out_completes_all_items() {
    // Arrange
    let mut broker = TestBroker::new();
    broker.register("worker_a", 2, 0, QueuePolicy::Async);
    broker.register("worker_b", 2, 1, QueuePolicy::Async);

    // Act
    for id in 0..=5 {
        broker.produce(id);
    }
    while let Some(id) = broker.outstanding_ids("worker_a").first().copied() {
        broker.complete("worker_a", id);
    }
    while let Some(id) = broker.outstanding_ids("worker_b").first().copied() {
        broker.complete("worker_b", id);
    }

    // Assert
    assert_eq!(broker.work_items_to("worker_a"), vec![0, 2, 4]);
    assert_eq!(broker.work_items_to("worker_b"), vec![1, 3, 5]);
    let mut completions = broker.completions();
    completions.sort_unstable();
    assert_eq!(completions, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_item_with_no_matching_worker_completes_immediately() {
    // Arrange
    let mut broker = TestBroker::new();
    broker.register("worker_a", 2, 0, QueuePolicy::Async);

    // Act
    broker.produce(7);

    // Assert
    assert_eq!(broker.completions(), vec![7]);
    assert_eq!(broker.work_items_to("worker_a"), Vec::<u64>::new());
}

#[test]
fn test_item_with_no_workers_at_all_completes_immediately() {
    let mut broker = TestBroker::new();

    broker.produce(0);

    assert_eq!(broker.completions(), vec![0]);
}

#[test]
fn test_overlapping_predicates_complete_after_all_holders() {
    // Arrange
    let mut broker = TestBroker::new();
    broker.register("worker_a", 1, 0, QueuePolicy::Async);
    broker.register("worker_b", 2, 0, QueuePolicy::Async);

    // Act
    broker.produce(4);

    // Assert: both idle workers got the item immediately.
    assert_eq!(broker.work_items_to("worker_a"), vec![4]);
    assert_eq!(broker.work_items_to("worker_b"), vec![4]);

    // One completion is not enough.
    broker.complete("worker_a", 4);
    assert_eq!(broker.completions(), Vec::<u64>::new());

    // The second holder finishing releases the item.
    broker.complete("worker_b", 4);
    assert_eq!(broker.completions(), vec![4]);
}

#[test]
fn test_fan_out_follows_registration_order() {
    // Arrange
    let mut broker = TestBroker::new();
    broker.register("worker_b", 1, 0, QueuePolicy::Async);
    broker.register("worker_a", 1, 0, QueuePolicy::Async);

    // Act
    broker.produce(1);

    // Assert: dispatch order is registration order, not identity order.
    let recipients: Vec<String> = broker
        .all_frames()
        .into_iter()
        .filter(|(_, frame)| matches!(frame, BrokerFrame::WorkItem { .. }))
        .map(|(identity, _)| identity.to_string())
        .collect();
    assert_eq!(recipients, vec!["worker_b".to_owned(), "worker_a".to_owned()]);
}

#[test]
fn test_payload_travels_with_the_work_item() {
    // Arrange
    let mut broker = TestBroker::new();
    broker.register("worker_a", 1, 0, QueuePolicy::Async);

    // Act
    broker.produce_with_payload(5, b"blob");

    // Assert
    let frames = broker.frames_to("worker_a");
    assert_eq!(frames.len(), 1);
    match &frames[0] {
        BrokerFrame::WorkItem { id, payload } => {
            assert_eq!(*id, 5);
            assert_eq!(payload.as_ref(), b"blob");
        }
        other => panic!("expected WORK_ITEM, got {other:?}"),
    }
}
