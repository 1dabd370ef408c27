//! [`Connection`] over an axum WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use serde_json::Value;
use tracing::trace;
use wsevent_core::{CloseCode, Connection, Frame, TransportError, TransportResult};

/// An upgraded WebSocket carrying JSON text frames.
///
/// | WebSocket message | Frame |
/// |-------------------|-------|
/// | text | [`Frame::Text`] |
/// | binary | [`Frame::Binary`] |
/// | close, end of stream | [`Frame::Disconnect`] with the peer's code |
/// | ping, pong | skipped; axum answers pings itself |
pub struct WsConnection {
    socket: WebSocket,
}

impl WsConnection {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }

    pub fn into_inner(self) -> WebSocket {
        self.socket
    }
}

#[async_trait]
impl Connection for WsConnection {
    /// The HTTP upgrade has already completed when the socket exists, so
    /// there is nothing left to accept.
    async fn accept(&mut self) -> TransportResult<()> {
        Ok(())
    }

    async fn receive(&mut self) -> TransportResult<Frame> {
        loop {
            let message = match self.socket.recv().await {
                None => return Ok(Frame::Disconnect(None)),
                Some(Err(err)) => return Err(TransportError::receive(err.to_string())),
                Some(Ok(message)) => message,
            };

            return Ok(match message {
                Message::Text(text) => Frame::Text(text.as_str().to_owned()),
                Message::Binary(data) => Frame::Binary(data.to_vec()),
                Message::Close(frame) => Frame::Disconnect(frame.map(|f| f.code)),
                Message::Ping(_) | Message::Pong(_) => {
                    trace!("control frame skipped");
                    continue;
                }
            });
        }
    }

    async fn send(&mut self, message: Value) -> TransportResult<()> {
        self.socket
            .send(Message::Text(message.to_string().into()))
            .await
            .map_err(|err| TransportError::send(err.to_string()))
    }

    async fn close(&mut self, code: CloseCode) -> TransportResult<()> {
        let frame = CloseFrame {
            code: code.as_u16(),
            reason: Utf8Bytes::from_static(""),
        };
        self.socket
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|err| TransportError::send(err.to_string()))
    }
}
