//! Field descriptors and the value coercion rules behind them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Number, Value};

use super::error::{ErrorDetail, LocItem};
use super::object::ObjectSchema;

/// The declared type of a schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Any JSON value, including `null`.
    Any,
    String,
    Integer,
    /// An integer within `min..=max`, as for a fixed-width Rust integer.
    BoundedInteger { min: i64, max: u64 },
    Float,
    Boolean,
    /// One of a fixed set of values.
    Literal(Vec<Value>),
    List(Box<FieldType>),
    /// An object with arbitrary keys and uniformly typed values.
    Map(Box<FieldType>),
    /// A nested object validated against its own schema.
    Object(Arc<ObjectSchema>),
    /// The inner type or `null`.
    Optional(Box<FieldType>),
}

impl FieldType {
    /// A literal accepting exactly one value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(vec![value.into()])
    }

    /// Validates `value`, returning the coerced value.
    ///
    /// Failures are appended to `errors` at location `loc`; `None` is
    /// returned when at least one error was recorded for this value.
    pub fn validate(
        &self,
        value: Value,
        loc: &mut Vec<LocItem>,
        errors: &mut Vec<ErrorDetail>,
    ) -> Option<Value> {
        match (self, value) {
            (Self::Any, value) => Some(value),
            (Self::Optional(_), Value::Null) => Some(Value::Null),
            (Self::Optional(inner), value) => inner.validate(value, loc, errors),
            (Self::Literal(permitted), value) => {
                if permitted.contains(&value) {
                    Some(value)
                } else {
                    reject(errors, loc, ErrorDetail::unexpected_value(&value, permitted))
                }
            }
            (_, Value::Null) => reject(errors, loc, ErrorDetail::none_not_allowed()),
            (Self::String, Value::String(s)) => Some(Value::String(s)),
            (Self::String, _) => reject(errors, loc, ErrorDetail::not_str()),
            (Self::Integer, value) => match coerce_integer(&value) {
                Some(n) => Some(Value::Number(n)),
                None => reject(errors, loc, ErrorDetail::not_integer()),
            },
            (Self::BoundedInteger { min, max }, value) => match coerce_integer(&value) {
                Some(n) => match as_i128(&n) {
                    Some(v) if v < i128::from(*min) => {
                        reject(errors, loc, ErrorDetail::not_ge(Value::from(*min)))
                    }
                    Some(v) if v > i128::from(*max) => {
                        reject(errors, loc, ErrorDetail::not_le(Value::from(*max)))
                    }
                    _ => Some(Value::Number(n)),
                },
                None => reject(errors, loc, ErrorDetail::not_integer()),
            },
            (Self::Float, value) => match coerce_float(&value) {
                Some(n) => Some(Value::Number(n)),
                None => reject(errors, loc, ErrorDetail::not_float()),
            },
            (Self::Boolean, value) => match coerce_bool(&value) {
                Some(b) => Some(Value::Bool(b)),
                None => reject(errors, loc, ErrorDetail::not_bool()),
            },
            (Self::List(item), Value::Array(items)) => {
                let before = errors.len();
                let mut out = Vec::with_capacity(items.len());
                for (index, item_value) in items.into_iter().enumerate() {
                    loc.push(LocItem::Index(index));
                    if let Some(v) = item.validate(item_value, loc, errors) {
                        out.push(v);
                    }
                    loc.pop();
                }
                (errors.len() == before).then_some(Value::Array(out))
            }
            (Self::List(_), _) => reject(errors, loc, ErrorDetail::not_list()),
            (Self::Map(item), Value::Object(entries)) => {
                let before = errors.len();
                let mut out = Map::new();
                for (key, entry) in entries {
                    loc.push(LocItem::Key(key.clone()));
                    if let Some(v) = item.validate(entry, loc, errors) {
                        out.insert(key, v);
                    }
                    loc.pop();
                }
                (errors.len() == before).then_some(Value::Object(out))
            }
            (Self::Map(_), _) => reject(errors, loc, ErrorDetail::not_dict()),
            (Self::Object(schema), value) => schema.validate_at(value, loc, errors),
        }
    }
}

fn reject(errors: &mut Vec<ErrorDetail>, loc: &[LocItem], detail: ErrorDetail) -> Option<Value> {
    errors.push(detail.at(loc));
    None
}

fn coerce_integer(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.clone()),
        Value::Number(n) => {
            let f = n.as_f64()?;
            (f.fract() == 0.0 && f.is_finite() && f.abs() < i64::MAX as f64)
                .then(|| Number::from(f as i64))
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(Number::from),
        _ => None,
    }
}

fn as_i128(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn coerce_float(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.to_lowercase().as_str() {
            "0" | "off" | "f" | "false" | "n" | "no" => Some(false),
            "1" | "on" | "t" | "true" | "y" | "yes" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// A named field of an [`ObjectSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    /// Value used when the field is absent. A field without a default is
    /// required.
    pub default: Option<Value>,
}

impl Field {
    /// Creates a required field.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Creates a field typed after `T`.
    ///
    /// `Option<T>` fields default to `null` and are therefore optional.
    pub fn of<T: SchemaType>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: T::field_type(),
            default: T::implicit_default(),
        }
    }

    /// Makes the field optional with the given default.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Rust types with a schema representation.
///
/// Implemented for the primitive JSON-compatible types and containers, and
/// generated for structs deriving `ResponseModel`.
pub trait SchemaType {
    fn field_type() -> FieldType;

    /// Default applied when the field is absent from the input.
    fn implicit_default() -> Option<Value> {
        None
    }
}

macro_rules! impl_schema_type {
    ($variant:ident => $($ty:ty),+) => {
        $(
            impl SchemaType for $ty {
                fn field_type() -> FieldType {
                    FieldType::$variant
                }
            }
        )+
    };
}

impl_schema_type!(String => String);
impl_schema_type!(Boolean => bool);
macro_rules! impl_bounded_integer {
    ($($ty:ty),+) => {
        $(
            impl SchemaType for $ty {
                fn field_type() -> FieldType {
                    FieldType::BoundedInteger {
                        min: <$ty>::MIN as i64,
                        max: <$ty>::MAX as u64,
                    }
                }
            }
        )+
    };
}

impl_bounded_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_schema_type!(Float => f32, f64);
impl_schema_type!(Any => Value);

impl<T: SchemaType> SchemaType for Option<T> {
    fn field_type() -> FieldType {
        FieldType::Optional(Box::new(T::field_type()))
    }

    fn implicit_default() -> Option<Value> {
        Some(Value::Null)
    }
}

impl<T: SchemaType> SchemaType for Vec<T> {
    fn field_type() -> FieldType {
        FieldType::List(Box::new(T::field_type()))
    }
}

impl<T: SchemaType> SchemaType for HashMap<String, T> {
    fn field_type() -> FieldType {
        FieldType::Map(Box::new(T::field_type()))
    }
}

impl<T: SchemaType> SchemaType for BTreeMap<String, T> {
    fn field_type() -> FieldType {
        FieldType::Map(Box::new(T::field_type()))
    }
}

impl SchemaType for Map<String, Value> {
    fn field_type() -> FieldType {
        FieldType::Map(Box::new(FieldType::Any))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn check(ty: &FieldType, value: Value) -> Result<Value, Vec<ErrorDetail>> {
        let mut errors = Vec::new();
        match ty.validate(value, &mut vec!["field".into()], &mut errors) {
            Some(v) if errors.is_empty() => Ok(v),
            _ => Err(errors),
        }
    }

    #[test]
    fn strings_are_not_coerced_from_numbers() {
        assert_eq!(check(&FieldType::String, json!("x")), Ok(json!("x")));
        let errors = check(&FieldType::String, json!(5)).unwrap_err();
        assert_eq!(errors[0].kind, "type_error.str");
        assert_eq!(errors[0].loc, vec![LocItem::from("field")]);
    }

    #[test]
    fn integers_accept_integral_floats_and_numeric_strings() {
        assert_eq!(check(&FieldType::Integer, json!(4)), Ok(json!(4)));
        assert_eq!(check(&FieldType::Integer, json!(4.0)), Ok(json!(4)));
        assert_eq!(check(&FieldType::Integer, json!("12")), Ok(json!(12)));
        assert!(check(&FieldType::Integer, json!(4.5)).is_err());
        assert!(check(&FieldType::Integer, json!([1])).is_err());
    }

    #[test]
    fn fixed_width_integers_report_their_limits() {
        let ty = u8::field_type();
        assert_eq!(check(&ty, json!(255)), Ok(json!(255)));

        let errors = check(&ty, json!(300)).unwrap_err();
        assert_eq!(errors[0].msg, "ensure this value is less than or equal to 255");
        assert_eq!(errors[0].kind, "value_error.number.not_le");
        assert_eq!(errors[0].ctx.as_ref().unwrap()["limit_value"], json!(255));

        let errors = check(&ty, json!(-1)).unwrap_err();
        assert_eq!(errors[0].kind, "value_error.number.not_ge");

        let errors = check(&i64::field_type(), json!(u64::MAX)).unwrap_err();
        assert_eq!(errors[0].kind, "value_error.number.not_le");
        assert_eq!(check(&u64::field_type(), json!(u64::MAX)), Ok(json!(u64::MAX)));
        assert_eq!(check(&i8::field_type(), json!("x")).unwrap_err()[0].kind, "type_error.integer");
    }

    #[test]
    fn booleans_follow_lenient_parsing() {
        assert_eq!(check(&FieldType::Boolean, json!("yes")), Ok(json!(true)));
        assert_eq!(check(&FieldType::Boolean, json!(0)), Ok(json!(false)));
        let errors = check(&FieldType::Boolean, json!("maybe")).unwrap_err();
        assert_eq!(errors[0].msg, "value could not be parsed to a boolean");
    }

    #[test]
    fn null_is_rejected_unless_optional() {
        let errors = check(&FieldType::Integer, Value::Null).unwrap_err();
        assert_eq!(errors[0].kind, "type_error.none.not_allowed");

        let optional = FieldType::Optional(Box::new(FieldType::Integer));
        assert_eq!(check(&optional, Value::Null), Ok(Value::Null));
        assert_eq!(check(&FieldType::Any, Value::Null), Ok(Value::Null));
    }

    #[test]
    fn list_errors_carry_item_index() {
        let ty = FieldType::List(Box::new(FieldType::String));
        let errors = check(&ty, json!(["a", 1, "c", 2])).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].loc, vec![LocItem::from("field"), LocItem::Index(1)]);
        assert_eq!(errors[1].loc, vec![LocItem::from("field"), LocItem::Index(3)]);
    }

    #[test]
    fn map_validates_each_value() {
        let ty = <HashMap<String, i64>>::field_type();
        assert_eq!(check(&ty, json!({"a": 1})), Ok(json!({"a": 1})));
        let errors = check(&ty, json!({"a": "x"})).unwrap_err();
        assert_eq!(errors[0].loc, vec![LocItem::from("field"), LocItem::from("a")]);
        assert_eq!(check(&ty, json!([])).unwrap_err()[0].kind, "type_error.dict");
    }

    #[test]
    fn option_fields_default_to_null() {
        let field = Field::of::<Option<String>>("nick");
        assert!(!field.is_required());
        assert_eq!(field.default, Some(Value::Null));
        assert!(Field::of::<String>("msg").is_required());
    }
}
