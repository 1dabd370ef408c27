//! Mounting endpoint types on WebSocket routes.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{ConnectInfo, State, WebSocketUpgrade, ws::WebSocket},
    response::Response,
    routing::get,
};
use tracing::{Instrument, debug, info_span, warn};
use wsevent_framework::{Endpoint, Registry, Session, SessionOptions};

use crate::connection::WsConnection;

/// What the endpoint factory knows about a new connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub remote_addr: SocketAddr,
    /// The route the peer connected to.
    pub path: String,
}

/// Settings applied to every route of a router.
#[derive(Debug, Clone, Copy, Default)]
struct RouteSettings {
    options: SessionOptions,
    max_message_size: Option<usize>,
}

type RouteFn = Box<dyn FnOnce(RouteSettings) -> Router + Send>;

/// Builds an axum [`Router`] serving endpoint types over WebSockets.
///
/// Each upgrade creates a fresh endpoint instance through the factory,
/// binds the endpoint's registry to it and runs a [`Session`] until the
/// connection ends.
///
/// The router must be served with connect info:
///
/// ```rust,ignore
/// let router = EndpointRouter::new()
///     .options(SessionOptions::new().expose_internal_errors(false))
///     .endpoint("/chat", registry, |_peer| Chat::default())
///     .into_router();
///
/// axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await?;
/// ```
#[derive(Default)]
pub struct EndpointRouter {
    settings: RouteSettings,
    paths: Vec<String>,
    routes: Vec<RouteFn>,
}

impl EndpointRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session options of every route.
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.settings.options = options;
        self
    }

    /// Caps the size of inbound messages.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.settings.max_message_size = Some(size);
        self
    }

    /// Mounts endpoint type `E` on `path`.
    pub fn endpoint<E, F>(mut self, path: impl Into<String>, registry: Registry<E>, factory: F) -> Self
    where
        E: Endpoint,
        F: Fn(&PeerInfo) -> E + Send + Sync + 'static,
    {
        let path = normalize_path(path.into());
        self.paths.push(path.clone());
        self.routes.push(Box::new(move |settings| {
            let state = Arc::new(RouteState {
                path: path.clone(),
                registry,
                factory,
                settings,
            });
            Router::new()
                .route(&path, get(upgrade::<E, F>))
                .with_state(state)
        }));
        self
    }

    /// The mounted paths, in mount order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn into_router(self) -> Router {
        let settings = self.settings;
        self.routes
            .into_iter()
            .fold(Router::new(), |router, route| router.merge(route(settings)))
    }
}

impl fmt::Debug for EndpointRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRouter")
            .field("settings", &self.settings)
            .field("paths", &self.paths)
            .finish()
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

struct RouteState<E, F> {
    path: String,
    registry: Registry<E>,
    factory: F,
    settings: RouteSettings,
}

async fn upgrade<E, F>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RouteState<E, F>>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response
where
    E: Endpoint,
    F: Fn(&PeerInfo) -> E + Send + Sync + 'static,
{
    debug!(%remote_addr, path = %state.path, "websocket upgrade requested");
    let ws = match state.settings.max_message_size {
        Some(size) => ws.max_message_size(size),
        None => ws,
    };
    let peer = PeerInfo {
        remote_addr,
        path: state.path.clone(),
    };
    ws.on_upgrade(move |socket| serve_socket(socket, peer, state))
}

async fn serve_socket<E, F>(socket: WebSocket, peer: PeerInfo, state: Arc<RouteState<E, F>>)
where
    E: Endpoint,
    F: Fn(&PeerInfo) -> E + Send + Sync + 'static,
{
    let endpoint = (state.factory)(&peer);
    let mut session = Session::new(endpoint, &state.registry, WsConnection::new(socket))
        .with_options(state.settings.options)
        .with_path(peer.path.clone());

    let span = info_span!("connection", remote_addr = %peer.remote_addr);
    match session.run().instrument(span).await {
        Ok(code) => debug!(%code, remote_addr = %peer.remote_addr, "connection finished"),
        Err(err) => warn!(error = %err, remote_addr = %peer.remote_addr, "connection ended with error"),
    }
}
