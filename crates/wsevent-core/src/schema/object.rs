//! Object schemas: ordered named fields plus a policy for unknown keys.

use serde_json::{Map, Value};

use super::error::{ErrorDetail, LocItem, ValidationError};
use super::field::{Field, FieldType};
use crate::error::{SchemaError, SchemaResult};

/// What to do with keys that are not declared as fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtraPolicy {
    /// Keep unknown keys as they are.
    Allow,
    /// Silently drop unknown keys.
    #[default]
    Ignore,
    /// Report every unknown key as an error.
    Forbid,
}

/// A declarative description of a JSON object.
///
/// Schemas are built once at registration time and then shared; validation
/// never mutates the schema.
///
/// # Example
///
/// ```rust,ignore
/// let schema = ObjectSchema::new("Pong")
///     .extra(ExtraPolicy::Allow)
///     .field(Field::of::<String>("type").with_default("pong"))?
///     .field(Field::of::<i64>("latency"))?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    title: String,
    fields: Vec<Field>,
    extra: ExtraPolicy,
}

impl ObjectSchema {
    /// Creates an empty schema that ignores unknown keys.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            extra: ExtraPolicy::default(),
        }
    }

    /// Sets the policy for unknown keys.
    pub fn extra(mut self, policy: ExtraPolicy) -> Self {
        self.extra = policy;
        self
    }

    /// Appends a field, rejecting empty or duplicate names.
    pub fn field(mut self, field: Field) -> SchemaResult<Self> {
        self.push(field)?;
        Ok(self)
    }

    /// Appends a field in place.
    ///
    /// A default must itself pass the field's type.
    pub fn push(&mut self, field: Field) -> SchemaResult<()> {
        if field.name.is_empty() {
            return Err(SchemaError::EmptyFieldName {
                model: self.title.clone(),
            });
        }
        if self.get(&field.name).is_some() {
            return Err(SchemaError::DuplicateField {
                model: self.title.clone(),
                field: field.name,
            });
        }
        if let Some(default) = &field.default {
            let mut errors = Vec::new();
            let mut loc = vec![LocItem::from(field.name.as_str())];
            field.ty.validate(default.clone(), &mut loc, &mut errors);
            if let Some(error) = errors.first() {
                return Err(SchemaError::InvalidDefault {
                    model: self.title.clone(),
                    field: field.name,
                    reason: error.msg.clone(),
                });
            }
        }
        self.fields.push(field);
        Ok(())
    }

    /// Sets a field, replacing any existing field with the same name.
    pub fn with_field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Inserts `field` unless a field with the same name already exists.
    ///
    /// Returns `true` when the field was added.
    pub fn ensure_field(&mut self, field: Field) -> bool {
        if self.get(&field.name).is_some() {
            return false;
        }
        self.fields.insert(0, field);
        true
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn extra_policy(&self) -> ExtraPolicy {
        self.extra
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates a value, returning the coerced object.
    ///
    /// Declared fields come first in declaration order, absent optional
    /// fields are filled with their defaults.
    pub fn validate(&self, value: Value) -> Result<Map<String, Value>, ValidationError> {
        self.validate_under(value, &[])
    }

    /// Like [`validate`](Self::validate) but with every error location
    /// prefixed by `prefix`.
    pub fn validate_under(
        &self,
        value: Value,
        prefix: &[LocItem],
    ) -> Result<Map<String, Value>, ValidationError> {
        let mut loc = prefix.to_vec();
        let mut errors = Vec::new();
        match self.validate_at(value, &mut loc, &mut errors) {
            Some(Value::Object(map)) if errors.is_empty() => Ok(map),
            _ => Err(ValidationError::new(self.title.clone(), errors)),
        }
    }

    /// Validation entry point used when this schema is nested in another.
    pub fn validate_at(
        &self,
        value: Value,
        loc: &mut Vec<LocItem>,
        errors: &mut Vec<ErrorDetail>,
    ) -> Option<Value> {
        let Value::Object(mut input) = value else {
            errors.push(ErrorDetail::not_dict().at(loc));
            return None;
        };

        let before = errors.len();
        let mut out = Map::new();

        for field in &self.fields {
            loc.push(LocItem::Key(field.name.clone()));
            match input.remove(&field.name) {
                Some(v) => {
                    if let Some(v) = field.ty.validate(v, loc, errors) {
                        out.insert(field.name.clone(), v);
                    }
                }
                None => match &field.default {
                    Some(default) => {
                        out.insert(field.name.clone(), default.clone());
                    }
                    None => errors.push(ErrorDetail::missing().at(loc)),
                },
            }
            loc.pop();
        }

        match self.extra {
            ExtraPolicy::Allow => out.extend(input),
            ExtraPolicy::Ignore => {}
            ExtraPolicy::Forbid => {
                for key in input.keys() {
                    loc.push(LocItem::Key(key.clone()));
                    errors.push(ErrorDetail::extra_forbidden().at(loc));
                    loc.pop();
                }
            }
        }

        (errors.len() == before).then_some(Value::Object(out))
    }

    /// Wraps this schema as a nested field type.
    pub fn into_field_type(self) -> FieldType {
        FieldType::Object(std::sync::Arc::new(self))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn foo() -> ObjectSchema {
        ObjectSchema::new("Foo")
            .field(Field::of::<i64>("count"))
            .and_then(|s| s.field(Field::of::<Option<f64>>("size")))
            .unwrap()
    }

    #[test]
    fn fills_defaults_and_ignores_extras_by_default() {
        let out = foo().validate(json!({"count": 4, "other": 1})).unwrap();
        assert_eq!(Value::Object(out), json!({"count": 4, "size": null}));
    }

    #[test]
    fn forbid_reports_each_unknown_key() {
        let schema = foo().extra(ExtraPolicy::Forbid);
        let err = schema.validate(json!({"count": 1, "a": 1, "b": 2})).unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert!(err.errors.iter().all(|e| e.kind == "value_error.extra"));
        assert_eq!(err.errors[0].loc, vec![LocItem::from("a")]);
    }

    #[test]
    fn allow_keeps_unknown_keys() {
        let schema = foo().extra(ExtraPolicy::Allow);
        let out = schema.validate(json!({"count": 1, "note": "x"})).unwrap();
        assert_eq!(out["note"], json!("x"));
    }

    #[test]
    fn missing_required_field_is_located_under_prefix() {
        let err = foo()
            .validate_under(json!({}), &["response".into()])
            .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].loc, vec![LocItem::from("response"), LocItem::from("count")]);
        assert_eq!(err.errors[0].msg, "field required");
    }

    #[test]
    fn nested_objects_are_validated_recursively() {
        let bar = ObjectSchema::new("Bar")
            .field(Field::of::<String>("apple").with_default("x"))
            .and_then(|s| s.field(Field::of::<String>("banana").with_default("y")))
            .unwrap();
        let spam = ObjectSchema::new("Spam")
            .field(Field::new("foo", foo().into_field_type()))
            .and_then(|s| s.field(Field::new("bars", FieldType::List(Box::new(bar.into_field_type())))))
            .unwrap();

        let out = spam
            .validate(json!({"foo": {"count": 4}, "bars": [{"apple": "x1"}, {"apple": "x2"}]}))
            .unwrap();
        assert_eq!(
            Value::Object(out),
            json!({
                "foo": {"count": 4, "size": null},
                "bars": [{"apple": "x1", "banana": "y"}, {"apple": "x2", "banana": "y"}],
            })
        );

        let err = spam.validate(json!({"foo": {}, "bars": [{"apple": 1}]})).unwrap_err();
        let locs: Vec<_> = err.errors.iter().map(|e| e.loc.clone()).collect();
        assert_eq!(
            locs,
            vec![
                vec![LocItem::from("foo"), LocItem::from("count")],
                vec![LocItem::from("bars"), LocItem::Index(0), LocItem::from("apple")],
            ]
        );
    }

    #[test]
    fn non_objects_are_rejected() {
        let err = foo().validate(json!([1, 2])).unwrap_err();
        assert_eq!(err.errors[0].kind, "type_error.dict");
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let result = foo().field(Field::of::<i64>("count"));
        assert!(matches!(result, Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn defaults_must_match_the_field_type() {
        let result = ObjectSchema::new("Greet").field(Field::of::<String>("name").with_default(5));
        assert_eq!(
            result.unwrap_err(),
            SchemaError::InvalidDefault {
                model: "Greet".to_string(),
                field: "name".to_string(),
                reason: "str type expected".to_string(),
            }
        );

        assert!(ObjectSchema::new("Greet")
            .field(Field::of::<u8>("volume").with_default(11))
            .is_ok());
        assert!(ObjectSchema::new("Greet")
            .field(Field::of::<u8>("volume").with_default(1000))
            .is_err());
    }

    #[test]
    fn ensure_field_does_not_replace() {
        let mut schema = foo();
        assert!(!schema.ensure_field(Field::of::<String>("count")));
        assert!(schema.ensure_field(Field::of::<String>("type").with_default("x")));
        assert_eq!(schema.fields()[0].name, "type");
    }
}
