//! The per-connection lifecycle controller.
//!
//! A [`Session`] owns one endpoint instance, its bound handler table and the
//! transport connection. [`Session::run`] drives the state machine
//! `Connecting → Open → Closing → Closed`:
//!
//! | Inbound | Outcome |
//! |---------|---------|
//! | valid event | handler reply sent, loop continues |
//! | unknown type, invalid fields, rejection | error envelope sent, loop continues |
//! | malformed JSON or binary data | closed with 1003, loop ends |
//! | unexpected handler failure | error envelope sent, closed with 1011, loop ends |
//! | peer disconnect | its close code (1000 if none) recorded, loop ends |
//!
//! Frames are processed strictly in arrival order; the next frame is not
//! read until the previous reply has been sent.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;
use wsevent_core::{CloseCode, Connection, EventMessage, Frame, TransportError, TransportResult};

use crate::endpoint::Endpoint;
use crate::error::{HandlerError, SessionError};
use crate::registry::{HandlerTable, LiveHandlers, Registry};

/// Per-session behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Report the message and type of internal errors to the peer instead
    /// of a generic message.
    pub expose_internal_errors: bool,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        })
    }
}

/// How the receive loop ended.
type LoopExit = (CloseCode, Result<(), SessionError>);

/// One endpoint instance bound to one connection.
pub struct Session<E: Endpoint> {
    id: Uuid,
    path: String,
    endpoint: Arc<E>,
    handlers: LiveHandlers,
    connection: Box<dyn Connection>,
    options: SessionOptions,
    state: SessionState,
}

impl<E: Endpoint> Session<E> {
    /// Creates a session for a fresh endpoint instance.
    ///
    /// The handler table is snapshotted and bound to the instance here.
    pub fn new(endpoint: E, registry: &Registry<E>, connection: impl Connection + 'static) -> Self {
        let endpoint = Arc::new(endpoint);
        let handlers = registry.bind(&endpoint);
        Self::from_parts(endpoint, handlers, Box::new(connection))
    }

    /// Creates a session from a class-level table.
    pub fn with_table(
        endpoint: E,
        table: &HandlerTable<E>,
        connection: impl Connection + 'static,
    ) -> Self {
        let endpoint = Arc::new(endpoint);
        let handlers = table.bind(&endpoint);
        Self::from_parts(endpoint, handlers, Box::new(connection))
    }

    pub fn from_parts(
        endpoint: Arc<E>,
        handlers: LiveHandlers,
        connection: Box<dyn Connection>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: String::from("/"),
            endpoint,
            handlers,
            connection,
            options: SessionOptions::default(),
            state: SessionState::Connecting,
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the path recorded on the session span.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn endpoint(&self) -> &Arc<E> {
        &self.endpoint
    }

    /// Runs the session to completion and returns the close code.
    ///
    /// `on_disconnect` runs exactly once on every exit path after a
    /// successful connect, with the same close code.
    pub async fn run(&mut self) -> Result<CloseCode, SessionError> {
        let span = info_span!("session", id = %self.id, path = %self.path);
        async move {
            self.state = SessionState::Connecting;
            if let Err(err) = self.endpoint.on_connect(self.connection.as_mut()).await {
                error!(error = %err, "connect hook failed");
                self.state = SessionState::Closed;
                return Err(SessionError::Connect(err));
            }

            self.state = SessionState::Open;
            info!(events = self.handlers.len(), "session opened");

            let (code, result) = self.receive_loop().await;

            self.state = SessionState::Closing;
            self.endpoint.on_disconnect(code).await;
            self.state = SessionState::Closed;

            match &result {
                Ok(()) => info!(%code, "session closed"),
                Err(err) => error!(%code, error = %err, "session terminated"),
            }
            result.map(|()| code)
        }
        .instrument(span)
        .await
    }

    async fn receive_loop(&mut self) -> LoopExit {
        loop {
            let frame = match self.connection.receive().await {
                Ok(frame) => frame,
                Err(err) => return self.abort(err.into()).await,
            };

            let text = match frame {
                Frame::Text(text) => text,
                Frame::Binary(data) => {
                    return self
                        .reject_frame(format!("binary frame of {} bytes", data.len()))
                        .await;
                }
                Frame::Disconnect(code) => {
                    let code = code.map_or(CloseCode::NORMAL_CLOSURE, CloseCode);
                    debug!(%code, "peer disconnected");
                    return (code, Ok(()));
                }
            };

            let value: Value = match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(err) => return self.reject_frame(err.to_string()).await,
            };

            if let Err(err) = self.handle(value).await {
                return self.abort(err).await;
            }
        }
    }

    async fn handle(&mut self, value: Value) -> Result<(), SessionError> {
        let result = match EventMessage::from_value(value) {
            Ok(message) => self.handlers.dispatch(message).await,
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(Some(response)) => {
                let response = self.endpoint.prepare_response(response);
                self.connection.send(response).await?;
            }
            Ok(None) => {}
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "reporting error to peer");
                self.report(&err).await?;
            }
            Err(err) => {
                if let Err(send_err) = self.report(&err).await {
                    debug!(error = %send_err, "could not report internal error");
                }
                return Err(SessionError::Handler(err));
            }
        }
        Ok(())
    }

    async fn report(&mut self, err: &HandlerError) -> TransportResult<()> {
        match self
            .endpoint
            .error_envelope(err, self.options.expose_internal_errors)
        {
            Some(envelope) => {
                let value = envelope
                    .into_value()
                    .map_err(|e| TransportError::Send(e.to_string()))?;
                self.connection.send(value).await
            }
            None => Ok(()),
        }
    }

    async fn reject_frame(&mut self, reason: String) -> LoopExit {
        warn!(reason = %reason, "received data of wrong type");
        self.close(CloseCode::UNSUPPORTED_DATA, SessionError::MalformedFrame(reason))
            .await
    }

    async fn abort(&mut self, err: SessionError) -> LoopExit {
        self.close(CloseCode::INTERNAL_ERROR, err).await
    }

    async fn close(&mut self, code: CloseCode, err: SessionError) -> LoopExit {
        self.state = SessionState::Closing;
        if let Err(close_err) = self.connection.close(code).await {
            debug!(error = %close_err, "close failed");
        }
        (code, Err(err))
    }
}

impl<E: Endpoint> fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("state", &self.state)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::task::JoinHandle;
    use wsevent_core::{ChannelPeer, Field, Outbound, TransportError, channel};

    use super::*;
    use crate::error::{Rejection, RegistrationResult};
    use crate::handler::{Handler, Params};
    use crate::registry::Members;

    #[derive(Default)]
    struct Recorder {
        disconnects: Mutex<Vec<CloseCode>>,
        refuse: bool,
    }

    #[async_trait]
    impl Endpoint for Recorder {
        async fn on_connect(&self, connection: &mut dyn Connection) -> TransportResult<()> {
            if self.refuse {
                return Err(TransportError::rejected("not today"));
            }
            connection.accept().await
        }

        async fn on_disconnect(&self, code: CloseCode) {
            self.disconnects.lock().push(code);
        }
    }

    impl Members for Recorder {
        fn members() -> RegistrationResult<Vec<Handler<Self>>> {
            Ok(vec![
                Handler::builder("on_echo")
                    .param(Field::of::<String>("msg"))
                    .function(|mut params: Params| async move {
                        let msg: String = params.take("msg")?;
                        Ok::<_, HandlerError>(json!({ "msg": msg }))
                    })?,
                Handler::builder("on_silent").function(|_: Params| async {})?,
                Handler::builder("on_deny").function(|_: Params| async {
                    Err::<(), _>(Rejection::not_found("recipient not found"))
                })?,
                Handler::builder("on_crash").function(|_: Params| async {
                    Err::<(), _>(HandlerError::msg("database unavailable"))
                })?,
            ])
        }
    }

    type Finished = (Session<Recorder>, Result<CloseCode, SessionError>);

    fn start(endpoint: Recorder, options: SessionOptions) -> (JoinHandle<Finished>, ChannelPeer) {
        let table = HandlerTable::<Recorder>::new().unwrap();
        let (conn, peer) = channel(16);
        let mut session = Session::with_table(endpoint, &table, conn).with_options(options);
        let task = tokio::spawn(async move {
            let result = session.run().await;
            (session, result)
        });
        (task, peer)
    }

    fn disconnects(session: &Session<Recorder>) -> Vec<CloseCode> {
        session.endpoint().disconnects.lock().clone()
    }

    #[tokio::test]
    async fn echo_then_peer_disconnect() {
        let (task, mut peer) = start(Recorder::default(), SessionOptions::default());
        assert_eq!(peer.recv().await, Some(Outbound::Accepted));

        peer.send_json(&json!({"type": "echo", "msg": "foobar"})).await.unwrap();
        assert_eq!(peer.recv_json().await, Some(json!({"type": "echo", "msg": "foobar"})));

        peer.send_json(&json!({"type": "silent"})).await.unwrap();
        peer.disconnect(Some(4001)).await.unwrap();

        let (session, result) = task.await.unwrap();
        assert_eq!(result.unwrap(), CloseCode(4001));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(disconnects(&session), vec![CloseCode(4001)]);

        // The silent handler sent nothing before the disconnect.
        drop(session);
        assert_eq!(peer.recv().await, None);
    }

    #[tokio::test]
    async fn dropped_peer_is_a_normal_closure() {
        let (task, mut peer) = start(Recorder::default(), SessionOptions::default());
        assert_eq!(peer.recv().await, Some(Outbound::Accepted));
        drop(peer);

        let (session, result) = task.await.unwrap();
        assert_eq!(tokio_test::assert_ok!(result), CloseCode::NORMAL_CLOSURE);
        assert_eq!(disconnects(&session), vec![CloseCode::NORMAL_CLOSURE]);
    }

    #[tokio::test]
    async fn recoverable_errors_keep_the_loop_running() {
        let (task, mut peer) = start(Recorder::default(), SessionOptions::default());

        peer.send_json(&json!({"type": "unknown"})).await.unwrap();
        let reply = peer.recv_json().await.unwrap();
        assert_eq!(reply["errors"][0]["type"], "value_error.const");
        assert_eq!(reply["errors"][0]["loc"], json!(["type"]));

        peer.send_json(&json!({"type": "echo"})).await.unwrap();
        let reply = peer.recv_json().await.unwrap();
        assert_eq!(
            reply,
            json!({"errors": [{"loc": ["msg"], "msg": "field required", "type": "value_error.missing"}]})
        );

        peer.send_json(&json!({"type": "deny"})).await.unwrap();
        let reply = peer.recv_json().await.unwrap();
        assert_eq!(reply["errors"][0]["status_code"], 404);

        peer.send_json(&json!({"msg": "no type"})).await.unwrap();
        let reply = peer.recv_json().await.unwrap();
        assert_eq!(reply["errors"][0]["loc"], json!(["type"]));

        peer.disconnect(None).await.unwrap();
        let (session, result) = task.await.unwrap();
        assert_eq!(result.unwrap(), CloseCode::NORMAL_CLOSURE);
        assert_eq!(disconnects(&session), vec![CloseCode::NORMAL_CLOSURE]);
    }

    #[tokio::test]
    async fn malformed_json_closes_with_unsupported_data() {
        let (task, mut peer) = start(Recorder::default(), SessionOptions::default());
        peer.send_text("{not json").await.unwrap();

        assert_eq!(peer.recv().await, Some(Outbound::Accepted));
        assert_eq!(
            peer.recv().await,
            Some(Outbound::Closed(CloseCode::UNSUPPORTED_DATA))
        );

        let (session, result) = task.await.unwrap();
        assert!(matches!(result, Err(SessionError::MalformedFrame(_))));
        assert_eq!(disconnects(&session), vec![CloseCode::UNSUPPORTED_DATA]);
    }

    #[tokio::test]
    async fn internal_errors_end_the_session() {
        let (task, mut peer) = start(Recorder::default(), SessionOptions::default());
        peer.send_json(&json!({"type": "crash"})).await.unwrap();

        assert_eq!(
            peer.recv_json().await,
            Some(json!({"errors": [{"msg": "Internal server error", "type": "internal_error"}]}))
        );
        assert_eq!(
            peer.recv().await,
            Some(Outbound::Closed(CloseCode::INTERNAL_ERROR))
        );

        let (session, result) = task.await.unwrap();
        assert!(matches!(result, Err(SessionError::Handler(_))));
        assert_eq!(disconnects(&session), vec![CloseCode::INTERNAL_ERROR]);
    }

    #[tokio::test]
    async fn internal_details_can_be_exposed() {
        let options = SessionOptions::new().expose_internal_errors(true);
        let (task, mut peer) = start(Recorder::default(), options);
        peer.send_json(&json!({"type": "crash"})).await.unwrap();

        assert_eq!(
            peer.recv_json().await,
            Some(json!({"errors": [{"msg": "database unavailable", "type": "Error"}]}))
        );
        let _ = task.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connect_skips_the_loop_and_disconnect_hook() {
        let recorder = Recorder {
            refuse: true,
            ..Recorder::default()
        };
        let (task, mut peer) = start(recorder, SessionOptions::default());

        let (session, result) = task.await.unwrap();
        assert!(matches!(result, Err(SessionError::Connect(_))));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(disconnects(&session).is_empty());

        drop(session);
        assert_eq!(peer.recv().await, None);
    }
}
