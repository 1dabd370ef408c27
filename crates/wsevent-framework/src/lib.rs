//! # wsevent framework
//!
//! Handlers, registries and the per-connection lifecycle.
//!
//! This layer provides:
//! - [`Handler`]: one event name bound to a callable with derived schemas
//! - [`HandlerTable`] / [`Registry`]: the class-level event table of an endpoint type
//! - [`LiveHandlers`]: the per-session dispatch table
//! - [`Endpoint`]: lifecycle hooks of an endpoint type
//! - [`Session`]: the receive loop driving one connection
//!
//! Nothing here knows about WebSockets; sessions talk to any
//! [`Connection`](wsevent_core::Connection).

pub mod endpoint;
pub mod error;
pub mod handler;
pub mod registry;
pub mod session;

pub use endpoint::Endpoint;
pub use error::{
    GENERIC_INTERNAL_MESSAGE, HandlerError, HandlerPanic, HandlerResult, RegistrationError,
    RegistrationResult, Rejection, SessionError,
};
pub use handler::{
    BoundHandler, Handler, HandlerBuilder, HandlerFuture, IntoHandler, IntoReply, Model, Origin,
    Params, Projection, RESERVED_EVENTS, Reply, ResponseModel, resolve_event_name,
};
pub use registry::{HandlerTable, LiveHandlers, Members, Registry};
pub use session::{Session, SessionOptions, SessionState};
