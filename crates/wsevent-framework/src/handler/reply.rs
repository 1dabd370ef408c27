//! Handler return values.
//!
//! Whatever a handler returns is converted into a [`Reply`] through
//! [`IntoReply`]. The reply is then validated against the handler's output
//! schema before it is sent.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use wsevent_core::{Json, ObjectSchema, encode};

use crate::error::{HandlerError, HandlerResult};

/// The encoded result of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing is sent to the peer.
    Empty,
    /// A JSON value validated against the handler's output schema.
    Value(Value),
    /// A value produced by a typed model, carrying the model's own schema.
    ///
    /// When the handler declared no output schema, the model schema shapes
    /// this reply instead of the default one.
    Model {
        value: Value,
        schema: Arc<ObjectSchema>,
    },
}

/// Types that can be returned from a handler.
///
/// | Return type | Reply |
/// |-------------|-------|
/// | `()`, `None`, `Value::Null` | nothing is sent |
/// | `Value`, `Map<String, Value>` | the value |
/// | `Json<T>` | `T` encoded with serde |
/// | `Model<T>` or a `#[derive(ResponseModel)]` type | `T` encoded, shaped by its schema |
/// | `Result<T, E>` | `T`'s reply, or `E` converted into a [`HandlerError`] |
pub trait IntoReply {
    fn into_reply(self) -> HandlerResult<Reply>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(self)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(Reply::Empty)
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(match self {
            Value::Null => Reply::Empty,
            value => Reply::Value(value),
        })
    }
}

impl IntoReply for Map<String, Value> {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(Reply::Value(Value::Object(self)))
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> HandlerResult<Reply> {
        match self {
            Some(inner) => inner.into_reply(),
            None => Ok(Reply::Empty),
        }
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> HandlerResult<Reply> {
        self.encode()?.into_reply()
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<HandlerError>,
{
    fn into_reply(self) -> HandlerResult<Reply> {
        self.map_err(Into::into)?.into_reply()
    }
}

/// A typed response with a declared schema.
///
/// Usually derived:
///
/// ```rust,ignore
/// #[derive(Serialize, ResponseModel)]
/// #[model(extra = "allow")]
/// struct Pong {
///     #[model(default = "pong")]
///     #[serde(rename = "type")]
///     kind: String,
///     latency_ms: u64,
/// }
/// ```
pub trait ResponseModel {
    fn schema() -> ObjectSchema;
}

/// Wraps a [`ResponseModel`] value as a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Model<T>(pub T);

impl<T: ResponseModel + Serialize> IntoReply for Model<T> {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(Reply::Model {
            value: encode(&self.0)?,
            schema: Arc::new(T::schema()),
        })
    }
}
