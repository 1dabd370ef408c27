//! # wsevent core
//!
//! Building blocks shared by every wsevent crate:
//!
//! - [`schema`]: declarative object schemas and structured validation errors
//! - [`message`]: the inbound/outbound envelope types
//! - [`encode`]: the serde-backed encode capability
//! - [`transport`]: the abstract [`Connection`] and an in-memory channel
//!
//! Nothing here knows about handlers or sessions; those live in
//! `wsevent-framework`.

pub mod encode;
pub mod error;
pub mod message;
pub mod schema;
pub mod transport;

pub use encode::{Json, encode};
pub use error::{EncodeError, SchemaError, SchemaResult, TransportError, TransportResult};
pub use message::{ErrorEnvelope, EventMessage};
pub use schema::{
    ErrorDetail, ExtraPolicy, Field, FieldType, LocItem, ObjectSchema, SchemaType, TYPE_FIELD,
    ValidationError,
};
pub use transport::{
    ChannelConnection, ChannelPeer, CloseCode, Connection, Frame, Outbound, channel,
};
