//! Error types shared across the wsevent crates.

use thiserror::Error;

/// Errors raised while building a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two fields share a name.
    #[error("duplicate field '{field}' in {model}")]
    DuplicateField {
        /// Schema title.
        model: String,
        /// Offending field name.
        field: String,
    },

    /// A field was declared without a name.
    #[error("empty field name in {model}")]
    EmptyFieldName {
        /// Schema title.
        model: String,
    },

    /// A field default does not pass the field's own type.
    #[error("invalid default for field '{field}' in {model}: {reason}")]
    InvalidDefault {
        model: String,
        field: String,
        reason: String,
    },

    /// A parameter collides with the envelope discriminator.
    #[error("parameter '{field}' of event '{event}' collides with the envelope discriminator")]
    ReservedField { event: String, field: String },
}

/// Result type for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Failure to turn a value into JSON.
#[derive(Debug, Error)]
#[error("failed to encode value: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Errors reported by a [`Connection`](crate::transport::Connection).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer is gone.
    #[error("connection closed")]
    Closed,

    /// Sending a frame failed.
    #[error("failed to send frame: {0}")]
    Send(String),

    /// Receiving a frame failed.
    #[error("failed to receive frame: {0}")]
    Receive(String),

    /// The connection was refused during the connect hook.
    #[error("connection rejected: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Creates a send error.
    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }

    /// Creates a receive error.
    pub fn receive(msg: impl Into<String>) -> Self {
        Self::Receive(msg.into())
    }

    /// Creates a rejection error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
