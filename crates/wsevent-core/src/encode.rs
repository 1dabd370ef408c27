//! The encode capability: rendering Rust values into JSON trees.
//!
//! Anything implementing [`Serialize`] can be encoded. Primitives,
//! sequences, maps and nested structs are handled recursively by serde.

use serde::Serialize;
use serde_json::Value;

use crate::error::EncodeError;

/// Encodes `value` into a JSON tree.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Value, EncodeError> {
    Ok(serde_json::to_value(value)?)
}

/// Marks a serializable value as a plain JSON reply.
///
/// The wrapped value is encoded when the reply is produced and validated
/// against the handler's declared output schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> Json<T> {
    pub fn encode(&self) -> Result<Value, EncodeError> {
        encode(&self.0)
    }
}
