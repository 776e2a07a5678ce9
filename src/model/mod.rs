//! Model layer
//!
//! Domain objects implement [`Model`]: by-name access to the properties
//! declared in their static [`Schema`]. Concrete types additionally implement
//! [`ModelType`] so that lists and stores can resolve the schema without an
//! instance at hand.
//!
//! List-valued properties are backed by [`ObjectList`], which owns its objects
//! and reports every change to weakly-held [`ListObserver`]s.

mod list;
mod schema;

pub use list::{ListEvent, ListObserver, ObjectCollection, ObjectId, ObjectList, ObserverId};
pub use schema::{DataType, PropertyDescriptor, Schema, SchemaFn};

use crate::error::{Result, XrdError};
use crate::types::Value;

/// A domain object with schema-described properties
pub trait Model: 'static {
    fn schema(&self) -> &'static Schema;

    /// Current value of a property, `None` for unknown or list-valued names
    fn get_value(&self, name: &str) -> Option<Value>;

    fn set_value(&mut self, name: &str, value: Value) -> Result<()>;

    /// The list behind a list-valued property
    fn collection(&self, _name: &str) -> Option<&dyn ObjectCollection> {
        None
    }

    fn collection_mut(&mut self, _name: &str) -> Option<&mut dyn ObjectCollection> {
        None
    }
}

/// A concrete model type with a statically known schema
pub trait ModelType: Model + Sized {
    fn type_schema() -> &'static Schema;
}

/// Error for a property name the schema does not declare
pub fn unknown_property(schema: &Schema, name: &str) -> XrdError {
    XrdError::Configuration(format!(
        "{} has no settable property '{}'",
        schema.type_name(),
        name
    ))
}

/// Unwrap a string value for `set_value` implementations
pub fn expect_string(schema: &Schema, name: &str, value: Value) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(XrdError::Configuration(format!(
            "{}.{} expects text, got {:?}",
            schema.type_name(),
            name,
            other
        ))),
    }
}

/// Unwrap a float value for `set_value` implementations
pub fn expect_float(schema: &Schema, name: &str, value: Value) -> Result<f64> {
    match value {
        Value::Float(v) => Ok(v),
        other => Err(XrdError::Configuration(format!(
            "{}.{} expects a float, got {:?}",
            schema.type_name(),
            name,
            other
        ))),
    }
}
