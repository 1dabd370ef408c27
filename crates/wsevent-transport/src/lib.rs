//! # wsevent transport
//!
//! WebSocket transport for the wsevent framework, built on axum.
//!
//! - [`WsConnection`]: the [`Connection`](wsevent_core::Connection)
//!   implementation over an upgraded axum WebSocket
//! - [`EndpointRouter`]: mounts endpoint types on routes, one session per
//!   upgraded connection
//!
//! ```text
//! ┌──────────────┐  upgrade  ┌────────────────┐  frames  ┌───────────┐
//! │ axum Router  │──────────▶│  WsConnection  │─────────▶│  Session  │──▶ handlers
//! └──────────────┘           └────────────────┘          └───────────┘
//! ```

pub mod connection;
pub mod router;

pub use connection::WsConnection;
pub use router::{EndpointRouter, PeerInfo};
