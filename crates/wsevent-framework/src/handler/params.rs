//! Validated handler arguments.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use wsevent_core::{ErrorDetail, LocItem, ValidationError};

use crate::error::HandlerResult;

/// The payload fields of an event after input validation, keyed by
/// parameter name.
///
/// By the time a handler sees `Params`, every required parameter is present
/// and every optional one has been filled with its default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    fields: Map<String, Value>,
}

impl Params {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Removes a parameter and deserializes it.
    ///
    /// An absent parameter deserializes from `null`, which suits `Option`
    /// parameters. A value that does not fit `T` is reported as a
    /// validation error located at the parameter name.
    pub fn take<T: DeserializeOwned>(&mut self, name: &str) -> HandlerResult<T> {
        let value = self.fields.remove(name).unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            ValidationError::single(
                "Params",
                ErrorDetail::new(e.to_string(), "type_error").at(&[LocItem::from(name)]),
            )
            .into()
        })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for Params {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}
