use crate::error::SendError;
use crate::protocol::BrokerFrame;
use crate::types::{ItemId, WorkerIdentity};

/// Outbound side of the multiplexed worker channel.
///
/// Sends must not block; a transport that cannot accept a frame right now
/// returns an error and the dispatcher abandons that send.
pub trait WorkerTransport {
    fn send(&mut self, to: &WorkerIdentity, frame: &BrokerFrame) -> Result<(), SendError>;
}

/// Outbound side of the exclusive producer channel.
pub trait ProducerTransport {
    fn send_completion(&mut self, id: ItemId) -> Result<(), SendError>;
}
