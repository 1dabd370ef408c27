//! # wsevent
//!
//! Typed JSON event dispatch over WebSocket connections.
//!
//! Every frame is a JSON object whose `type` field names an event. The
//! endpoint serving a connection maps each event to a handler, validates
//! the remaining fields against the handler's parameters, calls it and
//! sends back its validated reply with `type` filled in.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌──────────────┐     ┌───────────────┐     ┌─────────────┐
//! │   Server   │────▶│ WsConnection │────▶│    Session    │────▶│ LiveHandlers│──▶ handler
//! │ (runtime)  │     │ (transport)  │     │ (one per peer)│     │ (dispatch)  │
//! └────────────┘     └──────────────┘     └───────────────┘     └─────────────┘
//! ```
//!
//! - **Handlers**: declared with `#[event]` inside a `#[handlers]` impl block,
//!   or built with [`Handler::builder`](framework::Handler::builder)
//! - **Registry**: the class-level event table of an endpoint type, shared by
//!   all its sessions
//! - **Session**: one endpoint instance per connection, running the receive loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsevent::prelude::*;
//!
//! #[derive(Default)]
//! struct Chat;
//!
//! #[async_trait]
//! impl Endpoint for Chat {}
//!
//! #[handlers]
//! impl Chat {
//!     #[event]
//!     async fn on_echo(&self, msg: String) -> Value {
//!         json!({ "msg": msg })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     logging::init_from_config(&config.logging);
//!
//!     Server::new(config)
//!         .mount(Registry::<Chat>::from_members()?, |_peer| Chat)
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `wsevent.toml` configuration files
//! - `yaml-config`: `wsevent.yaml` configuration files
//! - `json-log`: JSON log lines

pub use wsevent_core as core;
pub use wsevent_framework as framework;
pub use wsevent_runtime as runtime;
pub use wsevent_transport as transport;

pub use wsevent_macros::{ResponseModel, event, handlers};

/// Commonly used types for declaring and serving endpoints.
///
/// ```rust,ignore
/// use wsevent::prelude::*;
/// ```
pub mod prelude {
    // Declaration surface
    pub use wsevent_macros::{ResponseModel, event, handlers};

    // Handlers and endpoints
    pub use wsevent_framework::{
        Endpoint, Handler, HandlerError, HandlerResult, HandlerTable, Members, Model, Params,
        Registry, Rejection, ResponseModel, Session, SessionOptions,
    };

    // Wire types
    pub use wsevent_core::{
        CloseCode, Connection, ErrorEnvelope, EventMessage, Field, Json, ObjectSchema,
    };

    // Serving
    pub use wsevent_runtime::{ConfigLoader, Server, WsEventConfig, logging};
    pub use wsevent_transport::{EndpointRouter, PeerInfo};

    pub use async_trait::async_trait;
    pub use serde_json::{Value, json};
}
