//! TCP rendition of the exclusive producer channel.
//!
//! The endpoint serves one connection at a time and does not accept another
//! until the current one ends; that is the point-to-point contract. Inbound
//! envelopes become producer-item events; completions flow back over the
//! same connection.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use item_distributor_core::error::{ProtocolError, SendError};
use item_distributor_core::event::Event;
use item_distributor_core::framing::MultipartCodec;
use item_distributor_core::protocol::parse_item_id;
use item_distributor_core::transport::ProducerTransport;
use item_distributor_core::types::ItemId;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::codec::Framed;

pub const COMPLETION_QUEUE_DEPTH: usize = 1024;

/// Dispatcher-side sender for completion notifications.
pub struct ProducerSocketTransport {
    completions: mpsc::Sender<ItemId>,
}

impl ProducerSocketTransport {
    pub fn new(completions: mpsc::Sender<ItemId>) -> Self {
        ProducerSocketTransport { completions }
    }
}

impl ProducerTransport for ProducerSocketTransport {
    fn send_completion(&mut self, id: ItemId) -> Result<(), SendError> {
        self.completions.try_send(id).map_err(|error| match error {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::Disconnected,
        })
    }
}

pub struct ProducerEndpoint {
    listener: TcpListener,
}

impl ProducerEndpoint {
    pub async fn bind(address: &str) -> io::Result<Self> {
        Ok(ProducerEndpoint {
            listener: TcpListener::bind(address).await?,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self, events: mpsc::Sender<Event>, mut completions: mpsc::Receiver<ItemId>) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) => {
                    tracing::warn!("producer accept failed: {error}");
                    continue;
                }
            };
            tracing::info!("producer connected from {peer}");
            serve_producer(stream, &events, &mut completions).await;
            tracing::info!("producer disconnected");
        }
    }
}

async fn serve_producer(
    stream: TcpStream,
    events: &mpsc::Sender<Event>,
    completions: &mut mpsc::Receiver<ItemId>,
) {
    let mut framed = Framed::new(stream, MultipartCodec::new());
    loop {
        tokio::select! {
            inbound = framed.next() => match inbound {
                Some(Ok(parts)) => match parse_producer_item(&parts) {
                    Ok((id, payload)) => {
                        if events.send(Event::ProducerItem { id, payload }).await.is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        tracing::warn!("dropping malformed producer frame: {error}");
                    }
                },
                Some(Err(error)) => {
                    tracing::warn!("producer stream error: {error}");
                    return;
                }
                None => return,
            },
            completion = completions.recv() => match completion {
                Some(id) => {
                    if let Err(error) = framed.send(vec![Bytes::from(id.to_string())]).await {
                        tracing::warn!("completion send to producer failed: {error}");
                        return;
                    }
                }
                None => return,
            },
        }
    }
}

fn parse_producer_item(parts: &[Bytes]) -> Result<(ItemId, Bytes), ProtocolError> {
    let body = parts.first().ok_or(ProtocolError::EmptyFrame)?;
    let text = std::str::from_utf8(body).map_err(|_| ProtocolError::NotText)?;
    let id = parse_item_id(text)?;
    let payload = parts.get(1).cloned().unwrap_or_default();
    Ok((id, payload))
}
