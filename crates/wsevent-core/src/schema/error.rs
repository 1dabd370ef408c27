//! Structured validation errors.
//!
//! Every violated constraint produces one [`ErrorDetail`] carrying the path
//! to the offending value (`loc`), a human readable message and a dotted
//! error category. The messages and categories are stable and form part of
//! the wire format sent to peers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One segment of an error location path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocItem {
    /// An object key.
    Key(String),
    /// A position inside a list.
    Index(usize),
}

impl From<&str> for LocItem {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for LocItem {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for LocItem {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for LocItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A single entry of an error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Path to the offending value. Omitted on the wire when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loc: Vec<LocItem>,
    /// Human readable description.
    pub msg: String,
    /// Error category, e.g. `value_error.missing`.
    #[serde(rename = "type")]
    pub kind: String,
    /// HTTP-style status code for application rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Extra context, e.g. the given and permitted values of a literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Map<String, Value>>,
}

impl ErrorDetail {
    /// Creates an entry without location or context.
    pub fn new(msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc: Vec::new(),
            msg: msg.into(),
            kind: kind.into(),
            status_code: None,
            ctx: None,
        }
    }

    /// Sets the location path.
    pub fn at(mut self, loc: &[LocItem]) -> Self {
        self.loc = loc.to_vec();
        self
    }

    /// Sets the status code.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Sets the context map.
    pub fn with_ctx(mut self, ctx: Map<String, Value>) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn missing() -> Self {
        Self::new("field required", "value_error.missing")
    }

    pub fn extra_forbidden() -> Self {
        Self::new("extra fields not permitted", "value_error.extra")
    }

    pub fn none_not_allowed() -> Self {
        Self::new("none is not an allowed value", "type_error.none.not_allowed")
    }

    pub fn not_str() -> Self {
        Self::new("str type expected", "type_error.str")
    }

    pub fn not_integer() -> Self {
        Self::new("value is not a valid integer", "type_error.integer")
    }

    pub fn not_ge(limit: Value) -> Self {
        Self::new(
            format!("ensure this value is greater than or equal to {limit}"),
            "value_error.number.not_ge",
        )
        .with_ctx(limit_ctx(limit))
    }

    pub fn not_le(limit: Value) -> Self {
        Self::new(
            format!("ensure this value is less than or equal to {limit}"),
            "value_error.number.not_le",
        )
        .with_ctx(limit_ctx(limit))
    }

    pub fn not_float() -> Self {
        Self::new("value is not a valid float", "type_error.float")
    }

    pub fn not_bool() -> Self {
        Self::new("value could not be parsed to a boolean", "type_error.bool")
    }

    pub fn not_list() -> Self {
        Self::new("value is not a valid list", "type_error.list")
    }

    pub fn not_dict() -> Self {
        Self::new("value is not a valid dict", "type_error.dict")
    }

    /// A value outside a fixed set of permitted literals.
    ///
    /// The context carries both the given value and the permitted set so
    /// that peers can recover the offending input.
    pub fn unexpected_value(given: &Value, permitted: &[Value]) -> Self {
        let listed = permitted
            .iter()
            .map(render_literal)
            .collect::<Vec<_>>()
            .join(", ");

        let mut ctx = Map::new();
        ctx.insert("given".to_string(), given.clone());
        ctx.insert("permitted".to_string(), Value::Array(permitted.to_vec()));

        Self::new(
            format!("unexpected value; permitted: {listed}"),
            "value_error.const",
        )
        .with_ctx(ctx)
    }
}

fn limit_ctx(limit: Value) -> Map<String, Value> {
    let mut ctx = Map::new();
    ctx.insert("limit_value".to_string(), limit);
    ctx
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

/// A collection of validation failures for one model.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ValidationError {
    /// Title of the schema that rejected the value.
    pub model: String,
    /// One entry per violated constraint.
    pub errors: Vec<ErrorDetail>,
}

impl ValidationError {
    pub fn new(model: impl Into<String>, errors: Vec<ErrorDetail>) -> Self {
        Self {
            model: model.into(),
            errors,
        }
    }

    /// Shorthand for a failure with a single entry.
    pub fn single(model: impl Into<String>, detail: ErrorDetail) -> Self {
        Self::new(model, vec![detail])
    }

    pub fn errors(&self) -> &[ErrorDetail] {
        &self.errors
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        let plural = if count == 1 { "" } else { "s" };
        write!(f, "{count} validation error{plural} for {}", self.model)?;
        for error in &self.errors {
            let loc = error
                .loc
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            write!(f, "\n{loc}\n  {} (type={})", error.msg, error.kind)?;
        }
        Ok(())
    }
}
