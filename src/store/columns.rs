//! Schema-to-column mapping and value conversion

use crate::error::{Result, XrdError};
use crate::model::Schema;
use crate::types::{ColumnType, Value};

/// One column derived from a column-marked property
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub index: usize,
    pub name: &'static str,
    pub label: &'static str,
    pub column_type: ColumnType,
}

/// Ordered columns of a store, fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    columns: Vec<ColumnSpec>,
}

impl ColumnMap {
    /// Walk the schema once and assign indices to column properties in order
    pub fn from_schema(schema: &Schema) -> Self {
        let mut columns = Vec::new();
        for property in schema.properties() {
            if !property.is_column {
                continue;
            }
            columns.push(ColumnSpec {
                index: columns.len(),
                name: property.name,
                label: property.label(),
                column_type: property.data_type.column_type(),
            });
        }
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnSpec> {
        self.columns.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter()
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }

    /// Coerce a raw value to the declared type of `column`
    ///
    /// Float columns parse numeric text and reject anything else; string
    /// columns take the text form of any value; opaque columns pass values
    /// through untouched.
    pub fn convert(&self, column: usize, raw: Value) -> Result<Value> {
        let spec = self.get(column).ok_or_else(|| XrdError::Conversion {
            column,
            value: raw.to_text(),
            expected: format!("one of {} columns", self.columns.len()),
        })?;

        match (spec.column_type, raw) {
            (ColumnType::Float, Value::Float(v)) => Ok(Value::Float(v)),
            (ColumnType::Float, Value::Str(text)) => match text.trim().parse::<f64>() {
                Ok(v) => Ok(Value::Float(v)),
                Err(_) => Err(XrdError::Conversion {
                    column,
                    value: text,
                    expected: ColumnType::Float.to_string(),
                }),
            },
            (ColumnType::Float, other) => Err(XrdError::Conversion {
                column,
                value: other.to_text(),
                expected: ColumnType::Float.to_string(),
            }),
            (ColumnType::String, Value::Str(text)) => Ok(Value::Str(text)),
            (ColumnType::String, Value::Null) => Ok(Value::Null),
            (ColumnType::String, other) => Ok(Value::Str(other.to_text())),
            (ColumnType::Opaque, value) => Ok(value),
        }
    }
}
