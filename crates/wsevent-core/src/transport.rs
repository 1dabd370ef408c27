//! The transport capability consumed by sessions.
//!
//! A [`Connection`] is whatever carries frames between the server and one
//! peer. The WebSocket adapter lives in `wsevent-transport`; this module
//! also provides [`ChannelConnection`], an in-memory implementation used to
//! embed sessions and to drive them from tests.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{TransportError, TransportResult};

/// A WebSocket close status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// The peer or the server ended the session cleanly.
    pub const NORMAL_CLOSURE: Self = Self(1000);
    /// The peer sent data that cannot be interpreted.
    pub const UNSUPPORTED_DATA: Self = Self(1003);
    /// An unexpected server-side failure ended the session.
    pub const INTERNAL_ERROR: Self = Self(1011);

    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text data frame.
    Text(String),
    /// A binary data frame.
    Binary(Vec<u8>),
    /// The peer went away, with the close code it supplied if any.
    Disconnect(Option<u16>),
}

/// One bidirectional, message-oriented connection.
#[async_trait]
pub trait Connection: Send {
    /// Completes the opening handshake.
    async fn accept(&mut self) -> TransportResult<()>;

    /// Waits for the next inbound frame.
    async fn receive(&mut self) -> TransportResult<Frame>;

    /// Sends one JSON message as a text frame.
    async fn send(&mut self, message: Value) -> TransportResult<()>;

    /// Closes the connection with `code`.
    async fn close(&mut self, code: CloseCode) -> TransportResult<()>;
}

/// What the server side of a [`ChannelConnection`] emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Accepted,
    Message(Value),
    Closed(CloseCode),
}

/// Server side of an in-memory connection.
pub struct ChannelConnection {
    inbound: mpsc::Receiver<Frame>,
    outbound: mpsc::Sender<Outbound>,
}

/// Peer side of an in-memory connection.
///
/// Dropping the peer is observed by the server as a disconnect without a
/// close code.
pub struct ChannelPeer {
    inbound: mpsc::Sender<Frame>,
    outbound: mpsc::Receiver<Outbound>,
}

/// Creates a connected pair buffering up to `capacity` frames each way.
pub fn channel(capacity: usize) -> (ChannelConnection, ChannelPeer) {
    let (in_tx, in_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::channel(capacity);
    (
        ChannelConnection {
            inbound: in_rx,
            outbound: out_tx,
        },
        ChannelPeer {
            inbound: in_tx,
            outbound: out_rx,
        },
    )
}

impl ChannelConnection {
    async fn emit(&self, item: Outbound) -> TransportResult<()> {
        self.outbound
            .send(item)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    async fn accept(&mut self) -> TransportResult<()> {
        self.emit(Outbound::Accepted).await
    }

    async fn receive(&mut self) -> TransportResult<Frame> {
        Ok(self
            .inbound
            .recv()
            .await
            .unwrap_or(Frame::Disconnect(None)))
    }

    async fn send(&mut self, message: Value) -> TransportResult<()> {
        trace!(payload = %message, "channel send");
        self.emit(Outbound::Message(message)).await
    }

    async fn close(&mut self, code: CloseCode) -> TransportResult<()> {
        self.inbound.close();
        self.emit(Outbound::Closed(code)).await
    }
}

impl ChannelPeer {
    /// Sends a raw text frame.
    pub async fn send_text(&self, text: impl Into<String>) -> TransportResult<()> {
        self.send_frame(Frame::Text(text.into())).await
    }

    /// Serializes `value` and sends it as a text frame.
    pub async fn send_json(&self, value: &Value) -> TransportResult<()> {
        self.send_text(value.to_string()).await
    }

    /// Sends a disconnect signal.
    pub async fn disconnect(&self, code: Option<u16>) -> TransportResult<()> {
        self.send_frame(Frame::Disconnect(code)).await
    }

    pub async fn send_frame(&self, frame: Frame) -> TransportResult<()> {
        self.inbound
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Waits for whatever the server emits next.
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    /// Waits for the next JSON message, skipping the accept notification.
    ///
    /// Returns `None` once the server closed or dropped the connection.
    pub async fn recv_json(&mut self) -> Option<Value> {
        loop {
            match self.outbound.recv().await? {
                Outbound::Accepted => continue,
                Outbound::Message(value) => return Some(value),
                Outbound::Closed(_) => return None,
            }
        }
    }
}
