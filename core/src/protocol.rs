// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Text wire protocol between the broker and its peers.
//!
//! All frames on the worker channel are space-delimited text with the verb
//! first. Parsing is strict: a frame either matches its shape exactly or
//! yields a [`ProtocolError`]. The broker logs and drops bad frames without
//! tearing down the connection.

use crate::error::ProtocolError;
use crate::types::ItemId;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const HEARTBEAT_INTERVAL_MS: u64 = 500;
pub const HEARTBEAT_TICK_MS: u64 = 100;

/// Minimum spacing between heartbeats to an idle worker.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(HEARTBEAT_INTERVAL_MS);
/// Upper bound on event-loop wake latency, and thus on heartbeat lateness.
pub const DEFAULT_HEARTBEAT_TICK: Duration = Duration::from_millis(HEARTBEAT_TICK_MS);
/// A worker that sees neither work nor heartbeats for this long assumes the
/// broker has died and reconnects.
pub const WORKER_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(4 * HEARTBEAT_INTERVAL_MS);
pub const WORKER_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// How items are buffered for a worker while it is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Buffer every matching item, unbounded, in arrival order.
    Async,
    /// Keep only the newest matching item; older waiting items are dropped.
    PrebufferOne,
    /// Buffer nothing; items arriving while busy are dropped for this worker.
    Skip,
}

impl fmt::Display for QueuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            QueuePolicy::Async => "Async",
            QueuePolicy::PrebufferOne => "PrebufferOne",
            QueuePolicy::Skip => "Skip",
        };
        f.write_str(token)
    }
}

impl FromStr for QueuePolicy {
    type Err = ProtocolError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "Async" => Ok(QueuePolicy::Async),
            "PrebufferOne" => Ok(QueuePolicy::PrebufferOne),
            "Skip" => Ok(QueuePolicy::Skip),
            other => Err(ProtocolError::UnknownPolicy(other.to_owned())),
        }
    }
}

/// A worker's registration: which slice of the ID space it wants and how
/// items queue for it. `client_name` is a single token, diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerParameters {
    pub stride: u64,
    pub offset: u64,
    pub policy: QueuePolicy,
    pub client_name: String,
}

impl WorkerParameters {
    pub fn new(
        stride: u64,
        offset: u64,
        policy: QueuePolicy,
        client_name: impl Into<String>,
    ) -> Self {
        WorkerParameters {
            stride,
            offset,
            policy,
            client_name: client_name.into(),
        }
    }

    /// A subscription is valid iff `stride >= 1` and `offset < stride`.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.stride == 0 || self.offset >= self.stride {
            return Err(ProtocolError::InvalidSubscription {
                stride: self.stride,
                offset: self.offset,
            });
        }
        Ok(())
    }

    /// The subscription predicate: item `n` matches iff
    /// `n mod stride == offset`.
    pub fn matches(&self, id: ItemId) -> bool {
        id % self.stride == self.offset
    }
}

/// Frames the broker receives on the worker channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerFrame {
    Register(WorkerParameters),
    Complete(ItemId),
}

impl WorkerFrame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut tokens = text.split_ascii_whitespace();
        let verb = tokens.next().ok_or(ProtocolError::EmptyFrame)?;
        match verb {
            "REGISTER" => {
                let stride = parse_field(&mut tokens, "REGISTER", "stride")?;
                let offset = parse_field(&mut tokens, "REGISTER", "offset")?;
                let policy_token = tokens.next().ok_or(ProtocolError::MissingField {
                    verb: "REGISTER",
                    field: "policy",
                })?;
                let policy = policy_token.parse()?;
                let client_name = tokens.next().ok_or(ProtocolError::MissingField {
                    verb: "REGISTER",
                    field: "client_name",
                })?;
                if tokens.next().is_some() {
                    return Err(ProtocolError::TrailingInput { verb: "REGISTER" });
                }
                let parameters = WorkerParameters::new(stride, offset, policy, client_name);
                parameters.validate()?;
                Ok(WorkerFrame::Register(parameters))
            }
            "COMPLETE" => {
                let id = parse_field(&mut tokens, "COMPLETE", "id")?;
                if tokens.next().is_some() {
                    return Err(ProtocolError::TrailingInput { verb: "COMPLETE" });
                }
                Ok(WorkerFrame::Complete(id))
            }
            other => Err(ProtocolError::UnknownVerb(other.to_owned())),
        }
    }
}

impl fmt::Display for WorkerFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerFrame::Register(p) => write!(
                f,
                "REGISTER {} {} {} {}",
                p.stride, p.offset, p.policy, p.client_name
            ),
            WorkerFrame::Complete(id) => write!(f, "COMPLETE {id}"),
        }
    }
}

/// Frames the broker sends on the worker channel. Only `WORK_ITEM` carries a
/// payload, and only when the payload is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerFrame {
    WorkItem { id: ItemId, payload: Bytes },
    Heartbeat,
    Disconnect,
}

impl BrokerFrame {
    /// The text part of the frame, without the payload part.
    pub fn verb_text(&self) -> String {
        match self {
            BrokerFrame::WorkItem { id, .. } => format!("WORK_ITEM {id}"),
            BrokerFrame::Heartbeat => "HEARTBEAT".to_owned(),
            BrokerFrame::Disconnect => "DISCONNECT".to_owned(),
        }
    }

    /// The payload part, if this frame carries one.
    pub fn payload_part(&self) -> Option<Bytes> {
        match self {
            BrokerFrame::WorkItem { payload, .. } if !payload.is_empty() => Some(payload.clone()),
            _ => None,
        }
    }

    /// Client-side parse of a broker frame from its text part plus an
    /// optional payload part.
    pub fn parse(text: &str, payload: Option<Bytes>) -> Result<Self, ProtocolError> {
        let mut tokens = text.split_ascii_whitespace();
        let verb = tokens.next().ok_or(ProtocolError::EmptyFrame)?;
        match verb {
            "WORK_ITEM" => {
                let id = parse_field(&mut tokens, "WORK_ITEM", "id")?;
                if tokens.next().is_some() {
                    return Err(ProtocolError::TrailingInput { verb: "WORK_ITEM" });
                }
                Ok(BrokerFrame::WorkItem {
                    id,
                    payload: payload.unwrap_or_default(),
                })
            }
            "HEARTBEAT" => {
                if tokens.next().is_some() {
                    return Err(ProtocolError::TrailingInput { verb: "HEARTBEAT" });
                }
                Ok(BrokerFrame::Heartbeat)
            }
            "DISCONNECT" => {
                if tokens.next().is_some() {
                    return Err(ProtocolError::TrailingInput { verb: "DISCONNECT" });
                }
                Ok(BrokerFrame::Disconnect)
            }
            other => Err(ProtocolError::UnknownVerb(other.to_owned())),
        }
    }
}

/// Parse the ASCII decimal item ID of a producer frame.
pub fn parse_item_id(text: &str) -> Result<ItemId, ProtocolError> {
    text.trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidItemId(text.to_owned()))
}

fn parse_field<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    verb: &'static str,
    field: &'static str,
) -> Result<u64, ProtocolError> {
    let token = tokens
        .next()
        .ok_or(ProtocolError::MissingField { verb, field })?;
    token.parse().map_err(|_| ProtocolError::InvalidField {
        verb,
        field,
        value: token.to_owned(),
    })
}
