//! Per-event schema derivation.
//!
//! Each handler gets an input schema built from its parameter list and an
//! output schema that is guaranteed to carry a `type` field.

use serde_json::Value;

use super::field::{Field, FieldType};
use super::object::{ExtraPolicy, ObjectSchema};
use crate::error::{SchemaError, SchemaResult};

/// The discriminator key of every envelope.
pub const TYPE_FIELD: &str = "type";

/// Builds the schema validating inbound payloads for `event`.
///
/// The `type` field is pinned to the event name and any key that is not a
/// declared parameter is rejected.
pub fn input_schema(event: &str, params: &[Field]) -> SchemaResult<ObjectSchema> {
    let mut schema = ObjectSchema::new(format!("EventMessage_{event}")).extra(ExtraPolicy::Forbid);
    schema.push(Field::new(TYPE_FIELD, FieldType::literal(event)))?;

    for param in params {
        if param.name == TYPE_FIELD {
            return Err(SchemaError::ReservedField {
                event: event.to_string(),
                field: param.name.clone(),
            });
        }
        schema.push(param.clone())?;
    }

    Ok(schema)
}

/// The output schema used when a handler declares none: a `type` that
/// defaults to the event name, with any other key passed through.
pub fn default_response_schema(event: &str) -> ObjectSchema {
    let mut schema = ObjectSchema::new(format!("Response_{event}")).extra(ExtraPolicy::Allow);
    schema.ensure_field(type_field(event));
    schema
}

/// Patches a supplied output schema so that it carries a `type` field.
///
/// A schema that already declares `type` is left untouched.
pub fn patch_response_schema(event: &str, mut schema: ObjectSchema) -> ObjectSchema {
    schema.ensure_field(type_field(event));
    schema
}

/// Chooses the output schema for `event`.
pub fn response_schema(event: &str, supplied: Option<ObjectSchema>) -> ObjectSchema {
    match supplied {
        Some(schema) => patch_response_schema(event, schema),
        None => default_response_schema(event),
    }
}

fn type_field(event: &str) -> Field {
    Field::new(TYPE_FIELD, FieldType::String).with_default(Value::String(event.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::LocItem;

    #[test]
    fn input_schema_pins_type_and_forbids_extras() {
        let schema = input_schema("echo", &[Field::of::<String>("msg")]).unwrap();

        let out = schema.validate(json!({"type": "echo", "msg": "hi"})).unwrap();
        assert_eq!(out["msg"], json!("hi"));

        let err = schema
            .validate(json!({"type": "echo", "msg": "hi", "extra": 1}))
            .unwrap_err();
        assert_eq!(err.errors[0].kind, "value_error.extra");

        let err = schema.validate(json!({"type": "ping", "msg": "hi"})).unwrap_err();
        assert_eq!(err.errors[0].loc, vec![LocItem::from("type")]);
        assert_eq!(err.errors[0].kind, "value_error.const");
    }

    #[test]
    fn input_schema_rejects_type_parameter() {
        let result = input_schema("echo", &[Field::of::<String>("type")]);
        assert!(matches!(result, Err(SchemaError::ReservedField { .. })));
    }

    #[test]
    fn input_schema_rejects_duplicate_parameters() {
        let params = [Field::of::<String>("a"), Field::of::<i64>("a")];
        assert!(matches!(
            input_schema("echo", &params),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn default_response_injects_type() {
        let schema = default_response_schema("hello");
        let out = schema.validate(json!({"message": "x"})).unwrap();
        assert_eq!(
            Value::Object(out),
            json!({"type": "hello", "message": "x"})
        );
    }

    #[test]
    fn supplied_type_is_preserved() {
        let custom = ObjectSchema::new("Custom")
            .field(Field::of::<String>("type").with_default("custom_type"))
            .unwrap();
        let schema = patch_response_schema("event", custom);
        let out = schema.validate(json!({})).unwrap();
        assert_eq!(out["type"], json!("custom_type"));
    }
}
