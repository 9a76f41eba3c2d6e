use item_distributor_core::error::{FramingError, ProtocolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("connection closed by broker")]
    ConnectionClosed,

    #[error("no traffic from broker within the heartbeat timeout")]
    BrokerSilent,
}
