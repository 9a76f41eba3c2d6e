//! TCP rendition of the multiplexed worker channel.
//!
//! Each accepted connection gets an opaque identity and a bounded outbound
//! queue. A reader half turns inbound envelopes into dispatcher events; EOF
//! or a stream error synthesizes the disconnect notification. The dispatcher
//! never blocks on a worker: sends go through `try_send` and a full queue is
//! a send error.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use item_distributor_core::error::SendError;
use item_distributor_core::event::Event;
use item_distributor_core::framing::MultipartCodec;
use item_distributor_core::protocol::BrokerFrame;
use item_distributor_core::transport::WorkerTransport;
use item_distributor_core::types::WorkerIdentity;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::codec::Framed;

const OUTBOUND_QUEUE_DEPTH: usize = 1024;

type OutboundRegistry = Arc<Mutex<HashMap<WorkerIdentity, mpsc::Sender<BrokerFrame>>>>;

/// Dispatcher-side sender. Routes a frame to the outbound queue of the
/// connection behind the identity.
pub struct WorkerSocketTransport {
    registry: OutboundRegistry,
}

impl WorkerTransport for WorkerSocketTransport {
    fn send(&mut self, to: &WorkerIdentity, frame: &BrokerFrame) -> Result<(), SendError> {
        let registry = self.registry.lock().unwrap();
        let Some(outbound) = registry.get(to) else {
            return Err(SendError::Disconnected);
        };
        outbound.try_send(frame.clone()).map_err(|error| match error {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::Disconnected,
        })
    }
}

pub struct WorkerEndpoint {
    listener: TcpListener,
    registry: OutboundRegistry,
}

impl WorkerEndpoint {
    pub async fn bind(address: &str) -> io::Result<Self> {
        Ok(WorkerEndpoint {
            listener: TcpListener::bind(address).await?,
            registry: Arc::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn transport(&self) -> WorkerSocketTransport {
        WorkerSocketTransport {
            registry: self.registry.clone(),
        }
    }

    /// Accept loop. Each connection is served by its own task; the endpoint
    /// itself never touches dispatcher state.
    pub async fn run(self, events: mpsc::Sender<Event>) {
        let mut connection_seq = 0u64;
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) => {
                    tracing::warn!("worker accept failed: {error}");
                    continue;
                }
            };
            let identity = WorkerIdentity::from(format!("{peer}/{connection_seq}"));
            connection_seq += 1;
            tracing::info!("worker connection {identity} accepted");

            let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
            self.registry
                .lock()
                .unwrap()
                .insert(identity.clone(), outbound_tx);
            tokio::spawn(serve_worker(
                stream,
                identity,
                self.registry.clone(),
                events.clone(),
                outbound_rx,
            ));
        }
    }
}

async fn serve_worker(
    stream: TcpStream,
    identity: WorkerIdentity,
    registry: OutboundRegistry,
    events: mpsc::Sender<Event>,
    mut outbound: mpsc::Receiver<BrokerFrame>,
) {
    let mut framed = Framed::new(stream, MultipartCodec::new());
    loop {
        tokio::select! {
            inbound = framed.next() => match inbound {
                Some(Ok(parts)) => {
                    let Some(text) = envelope_text(&parts) else {
                        tracing::warn!("dropping non-text envelope from {identity}");
                        continue;
                    };
                    let event = Event::WorkerMessage {
                        from: identity.clone(),
                        text,
                    };
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                Some(Err(error)) => {
                    tracing::warn!("worker {identity} stream error: {error}");
                    break;
                }
                None => break,
            },
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    let mut parts = vec![Bytes::from(frame.verb_text())];
                    if let Some(payload) = frame.payload_part() {
                        parts.push(payload);
                    }
                    if let Err(error) = framed.send(parts).await {
                        tracing::warn!("send to worker {identity} failed: {error}");
                        break;
                    }
                }
                None => break,
            },
        }
    }

    registry.lock().unwrap().remove(&identity);
    let _ = events
        .send(Event::WorkerDisconnected { from: identity })
        .await;
}

fn envelope_text(parts: &[Bytes]) -> Option<String> {
    let body = parts.first()?;
    std::str::from_utf8(body).ok().map(str::to_owned)
}
