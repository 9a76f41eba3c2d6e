// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::ClientError;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use item_distributor_core::framing::MultipartCodec;
use item_distributor_core::protocol::parse_item_id;
use item_distributor_core::types::ItemId;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// Producer side of the exclusive channel: sends work items, receives
/// completion notifications.
pub struct ProducerClient {
    framed: Framed<TcpStream, MultipartCodec>,
}

impl ProducerClient {
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(address).await?;
        Ok(ProducerClient {
            framed: Framed::new(stream, MultipartCodec::new()),
        })
    }

    /// Hand a work item to the broker. The payload part is omitted when
    /// empty.
    pub async fn send_work_item(&mut self, id: ItemId, payload: Bytes) -> Result<(), ClientError> {
        let mut parts = vec![Bytes::from(id.to_string())];
        if !payload.is_empty() {
            parts.push(payload);
        }
        self.framed.send(parts).await?;
        Ok(())
    }

    /// Wait for the next completion notification.
    pub async fn receive_completion(&mut self) -> Result<ItemId, ClientError> {
        loop {
            let parts = self
                .framed
                .next()
                .await
                .ok_or(ClientError::ConnectionClosed)??;
            let Some(body) = parts.first() else {
                tracing::warn!("dropping empty envelope from broker");
                continue;
            };
            let Ok(text) = std::str::from_utf8(body) else {
                tracing::warn!("dropping non-text completion frame");
                continue;
            };
            return Ok(parse_item_id(text)?);
        }
    }
}
