// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use item_distributor_core::protocol::QueuePolicy;
use item_distributor_sim::test_broker::TestBroker;

#[test]
fn test_producer_send_failure_retains_completions_for_next_drain() {
    // Arrange
    let mut broker = TestBroker::new();
    broker.fail_producer_sends(true);

    // Act: an unmatched item completes, but delivery fails.
    broker.produce(7);
    assert_eq!(broker.completions(), Vec::<u64>::new());
    assert_eq!(broker.pending_completions(), 1);

    // Assert: once the channel recovers, the next drain delivers the
    // retained ID and the new one, in destruction order.
    broker.fail_producer_sends(false);
    broker.produce(9);
    assert_eq!(broker.completions(), vec![7, 9]);
    assert_eq!(broker.pending_completions(), 0);
}

#[test]
fn test_worker_send_failure_abandons_frame_but_not_the_item() {
    // Arrange
    let mut broker = TestBroker::new();
    broker.register("worker_w", 1, 0, QueuePolicy::Async);
    broker.fail_worker_sends(true);

    // Act: the WORK_ITEM transmission is lost.
    broker.produce(1);

    // Assert: the item is still accounted as outstanding; nothing retries.
    assert_eq!(broker.outstanding_ids("worker_w"), vec![1]);
    assert_eq!(broker.work_items_to("worker_w"), Vec::<u64>::new());
    assert_eq!(broker.completions(), Vec::<u64>::new());

    // Conservation still holds: the worker's death releases the item.
    broker.disconnect("worker_w");
    assert_eq!(broker.completions(), vec![1]);
}

#[test]
fn test_heartbeat_send_failure_advances_the_deadline() {
    // Arrange
    let mut broker = TestBroker::new();
    broker.register("worker_w", 1, 0, QueuePolicy::Async);
    broker.fail_worker_sends(true);

    // Act: the sweep attempts a heartbeat and the send is abandoned.
    broker.advance_time(500);
    broker.tick();
    assert_eq!(broker.heartbeat_count("worker_w"), 0);

    // Assert: the deadline advanced anyway; no retry until it expires again.
    broker.fail_worker_sends(false);
    broker.tick();
    assert_eq!(broker.heartbeat_count("worker_w"), 0);
    broker.advance_time(500);
    broker.tick();
    assert_eq!(broker.heartbeat_count("worker_w"), 1);
}
