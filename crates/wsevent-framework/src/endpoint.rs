//! Endpoint lifecycle hooks.

use async_trait::async_trait;
use serde_json::Value;
use wsevent_core::{CloseCode, Connection, ErrorEnvelope, TransportResult};

use crate::error::HandlerError;

/// An endpoint type served by a [`Session`](crate::Session).
///
/// One instance is created per connection. Every hook has a default, so
/// an endpoint with no special lifecycle needs is a bare `impl`:
///
/// ```rust,ignore
/// struct Chat;
///
/// impl Endpoint for Chat {}
/// ```
///
/// The `connect`, `disconnect` and `receive` event names are reserved for
/// these hooks and cannot be registered as handlers.
#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
    /// Runs before the receive loop starts.
    ///
    /// The default accepts the connection. An error aborts the session
    /// before any frame is read, and `on_disconnect` is not called.
    async fn on_connect(&self, connection: &mut dyn Connection) -> TransportResult<()> {
        connection.accept().await
    }

    /// Runs exactly once after the receive loop exits.
    async fn on_disconnect(&self, _code: CloseCode) {}

    /// Adjusts each successful response before it is sent.
    fn prepare_response(&self, response: Value) -> Value {
        response
    }

    /// Builds the envelope reported to the peer for a failed event.
    ///
    /// Returning `None` sends nothing. Fatal errors still end the session.
    fn error_envelope(&self, error: &HandlerError, expose_internal: bool) -> Option<ErrorEnvelope> {
        Some(error.to_envelope(expose_internal))
    }
}
