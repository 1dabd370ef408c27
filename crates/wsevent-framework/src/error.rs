//! Error types for the wsevent framework.
//!
//! Request-time failures are funnelled into [`HandlerError`], a closed set
//! of reportable kinds. [`HandlerError::to_envelope`] is the single place
//! where they become the wire-level `{"errors": [...]}` envelope.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;
use wsevent_core::{
    EncodeError, ErrorDetail, ErrorEnvelope, SchemaError, TransportError, ValidationError,
};

/// Message sent in place of internal error details unless exposure is
/// enabled.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

/// Errors raised while registering handlers.
///
/// These surface at setup time, before any connection is served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The event name is one of the lifecycle hook names.
    #[error("'{0}' is a reserved event name")]
    Reserved(String),

    /// Stripping the handler prefix left nothing.
    #[error("handler '{declared}' resolves to an empty event name")]
    EmptyName {
        /// The declared function or method name.
        declared: String,
    },

    /// The event is already taken and overwriting is disabled.
    #[error("duplicate handler for '{0}'")]
    Duplicate(String),

    /// Schema derivation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// An intentional, client-facing failure raised by handler logic.
///
/// Reported to the peer with its status code; the session continues.
///
/// ```rust,ignore
/// async fn on_whisper(&self, to: String) -> Result<Value, HandlerError> {
///     let peer = self.lookup(&to).ok_or_else(|| Rejection::not_found("recipient not found"))?;
///     ...
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status_code}: {detail}")]
pub struct Rejection {
    pub status_code: u16,
    pub detail: String,
    pub kind: String,
}

impl Rejection {
    pub fn new(status_code: u16, detail: impl Into<String>) -> Self {
        Self {
            status_code,
            detail: detail.into(),
            kind: "rejection".to_string(),
        }
    }

    /// Overrides the error category reported to the peer.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(401, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(403, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(409, detail)
    }
}

/// A handler panicked while processing an event.
#[derive(Debug, Error)]
#[error("handler panicked: {0}")]
pub struct HandlerPanic(pub String);

/// The reportable failure kinds of a dispatch.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Input or output did not match its schema. Recoverable.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The handler rejected the request on purpose. Recoverable.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// Anything else. Fatal for the session.
    #[error("{type_name}: {source}")]
    Internal {
        /// Short type name of the underlying error.
        type_name: String,
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl HandlerError {
    /// Wraps an arbitrary error as an internal failure.
    pub fn internal<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Internal {
            type_name: short_type_name::<E>().to_string(),
            source: Box::new(err),
        }
    }

    /// Wraps a message as an internal failure.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::Internal {
            type_name: "Error".to_string(),
            source: message.to_string().into(),
        }
    }

    /// Whether the session may continue after reporting this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }

    /// Converts the error into the wire envelope.
    ///
    /// Internal errors only reveal their message and type when
    /// `expose_internal` is set.
    pub fn to_envelope(&self, expose_internal: bool) -> ErrorEnvelope {
        let detail = match self {
            Self::Validation(err) => return ErrorEnvelope::new(err.errors.clone()),
            Self::Rejected(rejection) => {
                ErrorDetail::new(rejection.detail.clone(), rejection.kind.clone())
                    .with_status(rejection.status_code)
            }
            Self::Internal { type_name, source } if expose_internal => {
                ErrorDetail::new(source.to_string(), type_name.clone())
            }
            Self::Internal { .. } => ErrorDetail::new(GENERIC_INTERNAL_MESSAGE, "internal_error"),
        };
        ErrorEnvelope::new(vec![detail])
    }
}

impl From<EncodeError> for HandlerError {
    fn from(err: EncodeError) -> Self {
        Self::internal(err)
    }
}

impl From<Box<dyn StdError + Send + Sync>> for HandlerError {
    fn from(source: Box<dyn StdError + Send + Sync>) -> Self {
        Self::Internal {
            type_name: "Error".to_string(),
            source,
        }
    }
}

impl From<HandlerPanic> for HandlerError {
    fn from(panic: HandlerPanic) -> Self {
        Self::internal(panic)
    }
}

/// Result type for handler invocations.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Fatal outcomes of a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connect hook failed; the receive loop never started.
    #[error("connect hook failed: {0}")]
    Connect(#[source] TransportError),

    /// The peer sent a frame that is not valid JSON text.
    #[error("malformed frame received: {0}")]
    MalformedFrame(String),

    /// The transport failed mid-session.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A handler failed unexpectedly.
    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
