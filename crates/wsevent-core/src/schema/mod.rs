//! Declarative schemas used to validate envelopes.
//!
//! Schemas are plain data built at registration time from explicit field
//! lists. There is no runtime type synthesis: a handler's parameters are
//! described by [`Field`]s, typed through [`SchemaType`].

pub mod derive;
pub mod error;
pub mod field;
pub mod object;

pub use derive::{
    TYPE_FIELD, default_response_schema, input_schema, patch_response_schema, response_schema,
};
pub use error::{ErrorDetail, LocItem, ValidationError};
pub use field::{Field, FieldType, SchemaType};
pub use object::{ExtraPolicy, ObjectSchema};
