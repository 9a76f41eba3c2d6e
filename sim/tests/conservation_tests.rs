// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Property tests for the broker's accounting invariants: every produced
//! item is reported back exactly once, whatever the workers do, and no
//! worker ever sees an item outside its subscription.

use item_distributor_core::protocol::QueuePolicy;
use item_distributor_sim::test_broker::TestBroker;
use proptest::prelude::*;

fn decode_policy(seed: u8) -> QueuePolicy {
    match seed % 3 {
        0 => QueuePolicy::Async,
        1 => QueuePolicy::PrebufferOne,
        _ => QueuePolicy::Skip,
    }
}

proptest! {
    /// Completion conservation: for any worker population and any
    /// interleaving of completions, once every worker has disconnected the
    /// producer has seen each produced ID exactly once.
    #[test]
    fn prop_every_item_completes_exactly_once(
        workers in prop::collection::vec((1u64..=4, 0u64..=3, any::<u8>()), 1..4),
        actions in prop::collection::vec(any::<u8>(), 1..60),
    ) {
        let mut broker = TestBroker::new();
        for (index, (stride, offset_seed, policy_seed)) in workers.iter().enumerate() {
            broker.register(
                &format!("worker_{index}"),
                *stride,
                offset_seed % stride,
                decode_policy(*policy_seed),
            );
        }

        let mut produced = Vec::new();
        for (index, action) in actions.iter().enumerate() {
            let id = index as u64;
            broker.produce(id);
            produced.push(id);

            // Sometimes let one worker finish its current item.
            if action % 3 != 0 {
                let identity = format!("worker_{}", (*action as usize) % workers.len());
                if let Some(outstanding) = broker.outstanding_ids(&identity).first().copied() {
                    broker.complete(&identity, outstanding);
                }
            }
        }

        for index in 0..workers.len() {
            broker.disconnect(&format!("worker_{index}"));
        }

        let mut completions = broker.completions();
        completions.sort_unstable();
        prop_assert_eq!(completions, produced);
        prop_assert_eq!(broker.pending_completions(), 0);
    }

    /// Predicate correctness: a worker subscribed to (stride, offset) only
    /// ever receives WORK_ITEM frames whose ID matches its slice.
    #[test]
    fn prop_worker_only_receives_matching_ids(
        stride in 1u64..=5,
        offset_seed in 0u64..=4,
        ids in prop::collection::vec(0u64..1000, 1..50),
    ) {
        let offset = offset_seed % stride;
        let mut broker = TestBroker::new();
        broker.register("worker_w", stride, offset, QueuePolicy::Async);

        for id in &ids {
            broker.produce(*id);
            // Keep the worker idle so every matching item is dispatched.
            while let Some(outstanding) = broker.outstanding_ids("worker_w").first().copied() {
                broker.complete("worker_w", outstanding);
            }
        }

        for id in broker.work_items_to("worker_w") {
            prop_assert_eq!(id % stride, offset);
        }
    }
}
