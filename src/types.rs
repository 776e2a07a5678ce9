//! Core value types for xrd-rs
//!
//! This module contains the cell-level data structures shared by the model
//! layer, the tabular stores and the scripting bridge.
//!
//! # Main Types
//!
//! - [`ColumnType`] - Runtime type of a store column (string, float, opaque)
//! - [`Value`] - A single cell or property value
//! - [`ObjectRef`] - Opaque, shareable handle to an arbitrary object
//!
//! # Opaque values
//!
//! Opaque columns hold [`ObjectRef`] handles. They are never coerced: a value
//! placed in an opaque column comes back out exactly as it went in, and two
//! handles compare equal only when they point at the same allocation.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Runtime type of a column in a tabular store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Text column
    String,
    /// 64-bit floating point column
    Float,
    /// Column holding arbitrary object handles
    Opaque,
}

impl ColumnType {
    /// Whether a value may be stored in a column of this type as-is
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ColumnType::String, Value::Str(_) | Value::Null) => true,
            (ColumnType::Float, Value::Float(_)) => true,
            (ColumnType::Opaque, _) => true,
            _ => false,
        }
    }

    /// Placeholder used when an object has no value for a column
    pub fn empty_value(&self) -> Value {
        match self {
            ColumnType::String => Value::Str(String::new()),
            ColumnType::Float => Value::Float(f64::NAN),
            ColumnType::Opaque => Value::Null,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Opaque => write!(f, "object"),
        }
    }
}

/// Shareable handle to an arbitrary object
#[derive(Clone)]
pub struct ObjectRef {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ObjectRef {
    /// Wrap a value in a new handle
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without copying it
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the referenced object if it has type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Full type name of the referenced object
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Last path segment of the type name (`Pattern` for `xrd_rs::project::Pattern`)
    pub fn short_type_name(&self) -> &'static str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// True when both handles point at the same allocation
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.type_name)
    }
}

/// A single cell or property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text
    Str(String),
    /// Floating point number
    Float(f64),
    /// Opaque object handle
    Object(ObjectRef),
    /// No value
    Null,
}

impl Value {
    /// The column type this value naturally belongs to (`None` for `Null`)
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Str(_) => Some(ColumnType::String),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Object(_) => Some(ColumnType::Opaque),
            Value::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Text representation used by string columns and table rendering
    pub fn to_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Float(v) => v.to_string(),
            Value::Object(o) => format!("<{}>", o.short_type_name()),
            Value::Null => String::new(),
        }
    }

    /// Ordering used when sorting store rows
    ///
    /// Floats use a total order (NaN sorts last), strings compare
    /// lexicographically and opaque values never reorder each other.
    /// Mixed kinds order as Null < Float < Str < Object.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.total_cmp(b),
            },
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Object(_), Value::Object(_)) | (Value::Null, Value::Null) => Ordering::Equal,
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Float(_) => 1,
            Value::Str(_) => 2,
            Value::Object(_) => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Str(s) => serializer.serialize_str(s),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Null => serializer.serialize_none(),
            Value::Object(o) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("object", o.short_type_name())?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Marker;

    #[test]
    fn test_column_type_accepts() {
        assert!(ColumnType::String.accepts(&Value::from("a")));
        assert!(ColumnType::String.accepts(&Value::Null));
        assert!(!ColumnType::String.accepts(&Value::Float(1.0)));
        assert!(ColumnType::Float.accepts(&Value::Float(1.0)));
        assert!(!ColumnType::Float.accepts(&Value::from("1.0")));
        assert!(ColumnType::Opaque.accepts(&Value::from("anything")));
    }

    #[test]
    fn test_object_ref_identity() {
        let a = ObjectRef::new(Marker);
        let b = a.clone();
        let c = ObjectRef::new(Marker);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.downcast_ref::<Marker>().is_some());
        assert!(a.downcast_ref::<String>().is_none());
        assert_eq!(a.short_type_name(), "Marker");
    }

    #[test]
    fn test_value_text() {
        assert_eq!(Value::Float(0.5).to_text(), "0.5");
        assert_eq!(Value::from("abc").to_text(), "abc");
        assert_eq!(Value::Object(ObjectRef::new(Marker)).to_text(), "<Marker>");
        assert_eq!(Value::Null.to_text(), "");
    }

    #[test]
    fn test_sort_cmp_floats_nan_last() {
        let mut values = vec![Value::Float(f64::NAN), Value::Float(2.0), Value::Float(-1.0)];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(values[0], Value::Float(-1.0));
        assert_eq!(values[1], Value::Float(2.0));
        assert!(values[2].as_f64().is_some_and(f64::is_nan));
    }

    #[test]
    fn test_value_serialization() {
        let json = serde_json::to_string(&vec![
            Value::from("quartz"),
            Value::Float(1.5),
            Value::Null,
            Value::Object(ObjectRef::new(Marker)),
        ])
        .unwrap();
        assert_eq!(json, r#"["quartz",1.5,null,{"object":"Marker"}]"#);
    }
}
