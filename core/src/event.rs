// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::types::{ItemId, WorkerIdentity};
use bytes::Bytes;

/// Everything that can wake the dispatcher. Transports translate inbound
/// traffic into these; the dispatcher is the only consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new work item arrived on the producer channel.
    ProducerItem { id: ItemId, payload: Bytes },
    /// A text frame arrived from a worker. Left unparsed so the dispatcher
    /// owns the malformed-frame policy.
    WorkerMessage { from: WorkerIdentity, text: String },
    /// The transport noticed a worker's departure.
    WorkerDisconnected { from: WorkerIdentity },
    /// Periodic wake-up for the heartbeat sweep.
    Tick,
}
