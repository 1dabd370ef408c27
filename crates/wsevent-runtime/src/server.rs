//! Serving endpoints from configuration.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use wsevent_framework::{Endpoint, Registry};
use wsevent_transport::{EndpointRouter, PeerInfo};

use crate::config::WsEventConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Runs an [`EndpointRouter`] until Ctrl+C or until its shutdown token is
/// cancelled.
///
/// ```rust,ignore
/// let config = ConfigLoader::new().load()?;
/// Server::new(config)
///     .mount(Registry::<Chat>::from_members()?, |_peer| Chat::default())
///     .run()
///     .await?;
/// ```
#[derive(Debug)]
pub struct Server {
    config: WsEventConfig,
    router: EndpointRouter,
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(config: WsEventConfig) -> Self {
        Self {
            config,
            router: EndpointRouter::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &WsEventConfig {
        &self.config
    }

    /// Mounts endpoint type `E` on the configured `server.path`.
    pub fn mount<E, F>(self, registry: Registry<E>, factory: F) -> Self
    where
        E: Endpoint,
        F: Fn(&PeerInfo) -> E + Send + Sync + 'static,
    {
        let path = self.config.server.path.clone();
        self.endpoint(path, registry, factory)
    }

    /// Mounts endpoint type `E` on an additional path.
    pub fn endpoint<E, F>(mut self, path: impl Into<String>, registry: Registry<E>, factory: F) -> Self
    where
        E: Endpoint,
        F: Fn(&PeerInfo) -> E + Send + Sync + 'static,
    {
        self.router = std::mem::take(&mut self.router).endpoint(path, registry, factory);
        self
    }

    /// Cancelling the token stops the server.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Binds `server.host:server.port` and serves until shutdown.
    pub async fn run(self) -> RuntimeResult<()> {
        let addr = self.config.server.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RuntimeError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener until shutdown.
    pub async fn serve(self, listener: TcpListener) -> RuntimeResult<()> {
        if self.router.paths().is_empty() {
            return Err(RuntimeError::NoEndpoints);
        }

        let local_addr = listener.local_addr()?;
        let paths = self.router.paths().to_vec();
        let router = self
            .router
            .options(self.config.session.options())
            .max_message_size(self.config.session.max_message_size)
            .into_router();

        info!(addr = %local_addr, ?paths, "wsevent server listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(wait_for_shutdown(self.shutdown))
        .await?;

        info!(addr = %local_addr, "wsevent server stopped");
        Ok(())
    }
}

async fn wait_for_shutdown(token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => debug!("Shutdown requested"),
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                error!(error = %err, "Failed to listen for Ctrl+C");
                token.cancelled().await;
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio_tungstenite::{connect_async, tungstenite::Message};
    use wsevent_framework::{HandlerTable, Handler, Params};

    use super::*;

    struct Hello {
        peer: PeerInfo,
    }

    impl Endpoint for Hello {}

    fn registry() -> Registry<Hello> {
        let registry = Registry::new(HandlerTable::empty());
        registry
            .register(
                None,
                Handler::<Hello>::builder("on_hello").method(|this: Arc<Hello>, _: Params| async move {
                    json!({ "path": this.peer.path })
                }),
                false,
            )
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn serves_until_cancelled() {
        let mut config = WsEventConfig::default();
        config.server.path = "/hello".to_string();

        let server = Server::new(config).mount(registry(), |peer| Hello { peer: peer.clone() });
        let shutdown = server.shutdown_token();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let running = tokio::spawn(server.serve(listener));

        let (mut client, _) = connect_async(format!("ws://{addr}/hello")).await.unwrap();
        client
            .send(Message::Text(json!({"type": "hello"}).to_string().into()))
            .await
            .unwrap();
        let reply = match client.next().await.unwrap().unwrap() {
            Message::Text(text) => serde_json::from_str::<Value>(text.as_str()).unwrap(),
            other => panic!("unexpected message: {other:?}"),
        };
        assert_eq!(reply, json!({"type": "hello", "path": "/hello"}));
        client.close(None).await.unwrap();

        shutdown.cancel();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn refuses_to_serve_without_endpoints() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let result = Server::new(WsEventConfig::default()).serve(listener).await;
        assert!(matches!(result, Err(RuntimeError::NoEndpoints)));
    }
}
