//! Envelope types exchanged with peers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::encode::encode;
use crate::error::EncodeError;
use crate::schema::{ErrorDetail, LocItem, TYPE_FIELD, ValidationError};

/// The open envelope: a `type` discriminator plus arbitrary fields.
///
/// Constructing an `EventMessage` from untrusted input only checks that the
/// payload is an object with a string `type`. Whether that type names a
/// registered handler, and whether the remaining fields fit its schema, is
/// decided at dispatch time against the live handler table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub event: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EventMessage {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            fields: Map::new(),
        }
    }

    /// Adds a payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Validates the envelope shape of a decoded frame.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut fields) = value else {
            return Err(ValidationError::single(
                "EventMessage",
                ErrorDetail::not_dict().at(&["__root__".into()]),
            ));
        };

        let loc = [LocItem::from(TYPE_FIELD)];
        match fields.remove(TYPE_FIELD) {
            Some(Value::String(event)) => Ok(Self { event, fields }),
            Some(Value::Null) => Err(ValidationError::single(
                "EventMessage",
                ErrorDetail::none_not_allowed().at(&loc),
            )),
            Some(_) => Err(ValidationError::single(
                "EventMessage",
                ErrorDetail::not_str().at(&loc),
            )),
            None => Err(ValidationError::single(
                "EventMessage",
                ErrorDetail::missing().at(&loc),
            )),
        }
    }

    /// Reassembles the full object, `type` included.
    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        fields.insert(TYPE_FIELD.to_string(), Value::String(self.event));
        Value::Object(fields)
    }
}

/// The outbound error envelope, `{"errors": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ErrorDetail>,
}

impl ErrorEnvelope {
    pub fn new(errors: Vec<ErrorDetail>) -> Self {
        Self { errors }
    }

    /// Serializes the envelope for sending.
    pub fn into_value(self) -> Result<Value, EncodeError> {
        encode(&self)
    }
}

impl From<ValidationError> for ErrorEnvelope {
    fn from(err: ValidationError) -> Self {
        Self::new(err.errors)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_object_with_string_type() {
        let msg = EventMessage::from_value(json!({"type": "echo", "msg": "hi"})).unwrap();
        assert_eq!(msg.event, "echo");
        assert_eq!(msg.fields["msg"], json!("hi"));
        assert!(!msg.fields.contains_key("type"));
    }

    #[test]
    fn rejects_missing_or_non_string_type() {
        let err = EventMessage::from_value(json!({"msg": "hi"})).unwrap_err();
        assert_eq!(err.errors[0].kind, "value_error.missing");
        assert_eq!(err.errors[0].loc, vec![LocItem::from("type")]);

        let err = EventMessage::from_value(json!({"type": 3})).unwrap_err();
        assert_eq!(err.errors[0].kind, "type_error.str");
    }

    #[test]
    fn rejects_non_objects() {
        let err = EventMessage::from_value(json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.errors[0].kind, "type_error.dict");
    }

    #[test]
    fn round_trips_through_serde() {
        let msg = EventMessage::new("echo").with("msg", "x");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "echo", "msg": "x"}));
        assert_eq!(msg.into_value(), value);
    }

    #[test]
    fn envelope_wraps_errors() {
        let envelope = ErrorEnvelope::new(vec![ErrorDetail::new("nope", "rejection").with_status(404)]);
        assert_eq!(
            envelope.into_value().unwrap(),
            json!({"errors": [{"msg": "nope", "type": "rejection", "status_code": 404}]})
        );
    }
}
