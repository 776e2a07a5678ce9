//! Static property schemas for model types
//!
//! Every model type declares an ordered list of [`PropertyDescriptor`]s once,
//! as a `static` [`Schema`]. Stores and bindings resolve columns from that
//! list instead of looking attributes up by name at runtime.

use crate::error::{Result, XrdError};
use crate::types::ColumnType;
use std::collections::HashSet;
use std::fmt;

/// Resolves the schema of a nested or listed model type
pub type SchemaFn = fn() -> &'static Schema;

/// Semantic type of a model property
#[derive(Clone, Copy)]
pub enum DataType {
    /// Text
    String,
    /// Floating point number
    Float,
    /// Arbitrary object handle
    Object,
    /// A single nested model object
    Nested(SchemaFn),
    /// An ordered list of model objects
    List(SchemaFn),
}

impl DataType {
    /// Column type used when this property is shown as a column
    pub fn column_type(&self) -> ColumnType {
        match self {
            DataType::String => ColumnType::String,
            DataType::Float => ColumnType::Float,
            DataType::Object | DataType::Nested(_) | DataType::List(_) => ColumnType::Opaque,
        }
    }

    /// Element schema of a list-valued property
    pub fn element_schema(&self) -> Option<&'static Schema> {
        match self {
            DataType::List(schema) => Some(schema()),
            _ => None,
        }
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataType::String, DataType::String)
            | (DataType::Float, DataType::Float)
            | (DataType::Object, DataType::Object) => true,
            (DataType::Nested(a), DataType::Nested(b)) | (DataType::List(a), DataType::List(b)) => {
                a() == b()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::String => write!(f, "String"),
            DataType::Float => write!(f, "Float"),
            DataType::Object => write!(f, "Object"),
            DataType::Nested(schema) => write!(f, "Nested({})", schema().type_name()),
            DataType::List(schema) => write!(f, "List({})", schema().type_name()),
        }
    }
}

/// Metadata for one property of a model type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub data_type: DataType,
    /// Whether the property is materialised as a column in tabular views
    pub is_column: bool,
    /// Display label, in mathtext markup
    pub label: Option<&'static str>,
}

impl PropertyDescriptor {
    /// A property that is not shown as a column
    pub const fn property(name: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            is_column: false,
            label: None,
        }
    }

    /// A property that is shown as a column
    pub const fn column(name: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            is_column: true,
            label: None,
        }
    }

    pub const fn with_label(self, label: &'static str) -> Self {
        Self {
            label: Some(label),
            ..self
        }
    }

    /// Display label, falling back to the property name
    pub fn label(&self) -> &'static str {
        self.label.unwrap_or(self.name)
    }
}

/// Ordered property metadata of a model type
pub struct Schema {
    type_name: &'static str,
    properties: &'static [PropertyDescriptor],
}

impl Schema {
    pub const fn new(type_name: &'static str, properties: &'static [PropertyDescriptor]) -> Self {
        Self {
            type_name,
            properties,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// All properties in declaration order
    pub fn properties(&self) -> &'static [PropertyDescriptor] {
        self.properties
    }

    pub fn property(&self, name: &str) -> Option<&'static PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Column-marked properties in declaration order
    pub fn column_properties(&self) -> impl Iterator<Item = &'static PropertyDescriptor> {
        self.properties.iter().filter(|p| p.is_column)
    }

    pub fn column_count(&self) -> usize {
        self.column_properties().count()
    }

    /// Check that property names are non-empty and unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for property in self.properties {
            if property.name.is_empty() {
                return Err(XrdError::Configuration(format!(
                    "{} declares a property without a name",
                    self.type_name
                )));
            }
            if !seen.insert(property.name) {
                return Err(XrdError::Configuration(format!(
                    "{} declares property '{}' twice",
                    self.type_name, property.name
                )));
            }
        }
        Ok(())
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.type_name == other.type_name && self.properties == other.properties)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field(
                "properties",
                &self.properties.iter().map(|p| p.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
