// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use bytes::Bytes;
use item_distributor_clients::producer::ProducerClient;
use item_distributor_clients::worker::WorkerClient;
use item_distributor_core::config::Config;
use item_distributor_core::protocol::{QueuePolicy, WorkerParameters};
use item_distributor_core::types::ItemId;
use item_distributor_tokio_socket::broker::Broker;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_round_trip_over_loopback_sockets() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            // Arrange: broker on ephemeral ports, fast heartbeats.
            let config = Config {
                producer_address: "127.0.0.1:0".to_owned(),
                worker_address: "127.0.0.1:0".to_owned(),
                heartbeat_interval_ms: 100,
                heartbeat_tick_ms: 20,
            };
            let broker = Broker::bind(config).await.unwrap();
            let producer_addr = broker.producer_addr().unwrap().to_string();
            let worker_addr = broker.worker_addr().unwrap().to_string();

            let shutdown = CancellationToken::new();
            let broker_task = tokio::task::spawn_local(broker.run(shutdown.clone()));

            // One worker taking everything, completing instantly.
            let worker_shutdown = CancellationToken::new();
            let worker_task = tokio::task::spawn_local({
                let worker_shutdown = worker_shutdown.clone();
                async move {
                    let client = WorkerClient::new(
                        worker_addr,
                        WorkerParameters::new(1, 0, QueuePolicy::Async, "e2e_worker"),
                    );
                    let mut handler = |_id: ItemId, _payload: Bytes| async {};
                    client.run(&mut handler, &worker_shutdown).await
                }
            });

            // Let the registration land before producing.
            tokio::time::sleep(Duration::from_millis(200)).await;

            // Act
            let mut producer = ProducerClient::connect(&producer_addr).await.unwrap();
            for id in 0..10u64 {
                producer
                    .send_work_item(id, Bytes::from_static(b"payload"))
                    .await
                    .unwrap();
            }

            let mut received = Vec::new();
            for _ in 0..10 {
                let id = tokio::time::timeout(
                    Duration::from_secs(5),
                    producer.receive_completion(),
                )
                .await
                .expect("timed out waiting for a completion")
                .unwrap();
                received.push(id);
            }

            // Assert: the producer saw every item exactly once.
            received.sort_unstable();
            assert_eq!(received, (0..10).collect::<Vec<_>>());

            worker_shutdown.cancel();
            shutdown.cancel();
            let _ = worker_task.await;
            let _ = broker_task.await;
        })
        .await;
}
