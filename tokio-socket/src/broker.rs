// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The runnable broker: sockets bound, one event loop, one dispatcher.
//!
//! The dispatcher and every piece of broker state live on the loop task.
//! The spawned endpoint tasks are transport plumbing only; they feed the
//! loop through the event channel and never touch dispatcher state.

use crate::producer_channel::{ProducerEndpoint, ProducerSocketTransport, COMPLETION_QUEUE_DEPTH};
use crate::worker_channel::WorkerEndpoint;
use item_distributor_core::clock::SystemClock;
use item_distributor_core::config::Config;
use item_distributor_core::dispatcher::Dispatcher;
use item_distributor_core::event::Event;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const EVENT_QUEUE_DEPTH: usize = 1024;

pub struct Broker {
    config: Config,
    producer: ProducerEndpoint,
    workers: WorkerEndpoint,
}

impl Broker {
    pub async fn bind(config: Config) -> io::Result<Self> {
        let producer = ProducerEndpoint::bind(&config.producer_address).await?;
        let workers = WorkerEndpoint::bind(&config.worker_address).await?;
        Ok(Broker {
            config,
            producer,
            workers,
        })
    }

    pub fn producer_addr(&self) -> io::Result<SocketAddr> {
        self.producer.local_addr()
    }

    pub fn worker_addr(&self) -> io::Result<SocketAddr> {
        self.workers.local_addr()
    }

    /// Run the event loop until `shutdown` fires. On the way out the
    /// dispatcher dismisses every worker and flushes the completion ledger.
    pub async fn run(self, shutdown: CancellationToken) {
        let (event_tx, mut event_rx) = mpsc::channel::<Event>(EVENT_QUEUE_DEPTH);
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_QUEUE_DEPTH);

        let mut dispatcher = Dispatcher::new(
            self.workers.transport(),
            ProducerSocketTransport::new(completion_tx),
            SystemClock,
            self.config.heartbeat_interval(),
        );

        let producer_task = tokio::spawn(self.producer.run(event_tx.clone(), completion_rx));
        let worker_task = tokio::spawn(self.workers.run(event_tx));

        let mut tick = tokio::time::interval(self.config.heartbeat_tick());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = event_rx.recv() => match event {
                    Some(event) => dispatcher.on_event(event),
                    None => break,
                },
                _ = tick.tick() => dispatcher.on_event(Event::Tick),
            }
        }

        dispatcher.shutdown();
        // Let the connection tasks flush the final DISCONNECTs and
        // completions before the endpoints go away.
        tokio::time::sleep(Duration::from_millis(50)).await;
        producer_task.abort();
        worker_task.abort();
        tracing::info!("broker stopped");
    }
}
