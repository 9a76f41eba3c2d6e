// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::ClientError;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use item_distributor_core::framing::MultipartCodec;
use item_distributor_core::protocol::{
    BrokerFrame, WorkerFrame, WorkerParameters, WORKER_HEARTBEAT_TIMEOUT,
};
use item_distributor_core::types::ItemId;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

const RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Work performed for each dispatched item. Any `FnMut(ItemId, Bytes)`
/// returning a future qualifies.
pub trait WorkHandler {
    fn handle(&mut self, id: ItemId, payload: Bytes) -> impl Future<Output = ()>;
}

impl<F, Fut> WorkHandler for F
where
    F: FnMut(ItemId, Bytes) -> Fut,
    Fut: Future<Output = ()>,
{
    fn handle(&mut self, id: ItemId, payload: Bytes) -> impl Future<Output = ()> {
        (self)(id, payload)
    }
}

/// Worker side of the protocol: registers its subscription, handles
/// dispatched items, and replies COMPLETE for each.
///
/// The broker is expected to heartbeat an idle worker; a connection with no
/// traffic for the heartbeat timeout is presumed dead and reopened with a
/// fresh REGISTER. A DISCONNECT frame is a dismissal and ends the run.
pub struct WorkerClient {
    address: String,
    parameters: WorkerParameters,
    heartbeat_timeout: Duration,
}

impl WorkerClient {
    pub fn new(address: impl Into<String>, parameters: WorkerParameters) -> Self {
        WorkerClient {
            address: address.into(),
            parameters,
            heartbeat_timeout: WORKER_HEARTBEAT_TIMEOUT,
        }
    }

    pub fn with_heartbeat_timeout(mut self, heartbeat_timeout: Duration) -> Self {
        self.heartbeat_timeout = heartbeat_timeout;
        self
    }

    pub async fn run<H: WorkHandler>(
        &self,
        handler: &mut H,
        shutdown: &CancellationToken,
    ) -> Result<(), ClientError> {
        loop {
            match self.serve_connection(handler, shutdown).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    if shutdown.is_cancelled() {
                        return Ok(());
                    }
                    tracing::warn!("connection to broker lost ({error}), reconnecting");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    async fn serve_connection<H: WorkHandler>(
        &self,
        handler: &mut H,
        shutdown: &CancellationToken,
    ) -> Result<(), ClientError> {
        let stream = TcpStream::connect(&self.address).await?;
        let mut framed = Framed::new(stream, MultipartCodec::new());

        let register = WorkerFrame::Register(self.parameters.clone());
        framed.send(vec![Bytes::from(register.to_string())]).await?;
        tracing::info!("sent {register}");

        loop {
            let inbound = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                inbound = tokio::time::timeout(self.heartbeat_timeout, framed.next()) => inbound,
            };
            let parts = match inbound {
                Err(_) => return Err(ClientError::BrokerSilent),
                Ok(None) => return Err(ClientError::ConnectionClosed),
                Ok(Some(Err(error))) => return Err(error.into()),
                Ok(Some(Ok(parts))) => parts,
            };
            let frame = match decode_broker_frame(&parts) {
                Ok(frame) => frame,
                Err(error) => {
                    tracing::warn!("dropping malformed frame from broker: {error}");
                    continue;
                }
            };
            match frame {
                BrokerFrame::WorkItem { id, payload } => {
                    tracing::info!("received work item {id}");
                    handler.handle(id, payload).await;
                    let complete = WorkerFrame::Complete(id);
                    framed.send(vec![Bytes::from(complete.to_string())]).await?;
                    tracing::info!("sent {complete}");
                }
                BrokerFrame::Heartbeat => {}
                BrokerFrame::Disconnect => return Ok(()),
            }
        }
    }
}

fn decode_broker_frame(parts: &[Bytes]) -> Result<BrokerFrame, ClientError> {
    use item_distributor_core::error::ProtocolError;

    let body = parts.first().ok_or(ProtocolError::EmptyFrame)?;
    let text = std::str::from_utf8(body).map_err(|_| ProtocolError::NotText)?;
    Ok(BrokerFrame::parse(text, parts.get(1).cloned())?)
}
