//! Column-backed object store
//!
//! [`ObjectListStore`] mirrors a list of model objects into a [`TableModel`].
//! Columns come from the element schema's column properties, in declaration
//! order, and never change after construction. The store keeps only
//! [`ObjectId`]s; the objects themselves stay owned by their [`ObjectList`].
//!
//! Synchronisation is driven by [`ListEvent`]s: the store registers itself as
//! a weak observer of the list it projects, so it stays in sync until the
//! presenter that owns it drops it.
//!
//! [`ObjectList`]: crate::model::ObjectList

use crate::error::{Result, XrdError};
use crate::model::{DataType, ListEvent, ListObserver, Model, ObjectId, Schema};
use crate::store::columns::ColumnMap;
use crate::store::table::{ListStore, RowHandle, TableModel};
use crate::types::{ColumnType, ObjectRef, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Store shared between its presenter and the list it observes
pub type SharedStore = Rc<RefCell<ObjectListStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: usize,
    pub order: SortOrder,
}

/// Tabular projection of a list of model objects
pub struct ObjectListStore {
    schema: &'static Schema,
    columns: ColumnMap,
    table: Box<dyn TableModel>,
    rows: HashMap<ObjectId, RowHandle>,
    sort: Option<SortSpec>,
}

impl ObjectListStore {
    fn with_table(schema: &'static Schema, table: Box<dyn TableModel>) -> Result<Self> {
        schema.validate()?;
        let columns = ColumnMap::from_schema(schema);
        if table.n_columns() != columns.len() {
            return Err(XrdError::Configuration(format!(
                "backing store has {} columns, {} declares {}",
                table.n_columns(),
                schema.type_name(),
                columns.len()
            )));
        }
        for spec in columns.iter() {
            if table.column_type(spec.index) != Some(spec.column_type) {
                return Err(XrdError::Configuration(format!(
                    "backing store column {} is {:?}, {}.{} needs {}",
                    spec.index,
                    table.column_type(spec.index),
                    schema.type_name(),
                    spec.name,
                    spec.column_type
                )));
            }
        }
        Ok(Self {
            schema,
            columns,
            table,
            rows: HashMap::new(),
            sort: None,
        })
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_type(&self, column: usize) -> Option<ColumnType> {
        self.columns.get(column).map(|c| c.column_type)
    }

    /// Index of the column backing property `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.index_of(name)
    }

    /// See [`ColumnMap::convert`]
    pub fn convert(&self, column: usize, raw: impl Into<Value>) -> Result<Value> {
        self.columns.convert(column, raw.into())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    /// Cell value by display position
    pub fn value(&self, position: usize, column: usize) -> Option<Value> {
        let row = self.table.row_at(position)?;
        self.table.value(row, column)
    }

    /// All cells of a row by display position
    pub fn row_values(&self, position: usize) -> Option<Vec<Value>> {
        let row = self.table.row_at(position)?;
        (0..self.columns.len())
            .map(|column| self.table.value(row, column))
            .collect()
    }

    /// Object shown at a display position (`None` for literal rows)
    pub fn object_at(&self, position: usize) -> Option<ObjectId> {
        let row = self.table.row_at(position)?;
        self.rows
            .iter()
            .find(|(_, handle)| **handle == row)
            .map(|(id, _)| *id)
    }

    /// Display position of an object's row
    pub fn row_of(&self, id: ObjectId) -> Option<usize> {
        self.rows.get(&id).and_then(|row| self.table.position(*row))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.rows.contains_key(&id)
    }

    fn cells_for(&self, object: &dyn Model) -> Result<Vec<Value>> {
        self.columns
            .iter()
            .map(|spec| match object.get_value(spec.name) {
                Some(raw) => self.columns.convert(spec.index, raw),
                None => {
                    tracing::warn!(
                        "{} has no value for column '{}'",
                        self.schema.type_name(),
                        spec.name
                    );
                    Ok(spec.column_type.empty_value())
                }
            })
            .collect()
    }

    /// Add a row for an object at `index`, or re-sort it into place
    pub fn insert_object(&mut self, id: ObjectId, index: usize, object: &dyn Model) -> Result<()> {
        if self.rows.contains_key(&id) {
            tracing::debug!("{:?} already has a row", id);
            return Ok(());
        }
        let cells = self.cells_for(object)?;
        let row = match self.sort {
            Some(_) => self.table.append(cells)?,
            None => self.table.insert(index.min(self.table.len()), cells)?,
        };
        self.rows.insert(id, row);
        self.resort()
    }

    /// Append a row for an object
    pub fn append_object(&mut self, id: ObjectId, object: &dyn Model) -> Result<()> {
        let end = self.table.len();
        self.insert_object(id, end, object)
    }

    /// Refresh the cell for `property`; non-column properties are ignored
    pub fn update_cell(&mut self, id: ObjectId, property: &str, object: &dyn Model) -> Result<()> {
        let Some(column) = self.columns.index_of(property) else {
            return Ok(());
        };
        let Some(row) = self.rows.get(&id).copied() else {
            tracing::debug!("Change for {:?} which has no row", id);
            return Ok(());
        };
        let value = match object.get_value(property) {
            Some(raw) => self.columns.convert(column, raw)?,
            None => self.columns.get(column).map_or(Value::Null, |c| c.column_type.empty_value()),
        };
        self.table.set_cell(row, column, value)?;
        if self.sort.is_some_and(|s| s.column == column) {
            self.resort()?;
        }
        Ok(())
    }

    /// Drop an object's row; returns false when the object had none
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        match self.rows.remove(&id) {
            Some(row) => self.table.remove(row),
            None => {
                tracing::trace!("Ignoring removal of untracked {:?}", id);
                false
            }
        }
    }

    /// Replace every tracked row with rows for `entries`, in order
    pub fn rebuild<'m>(
        &mut self,
        entries: impl IntoIterator<Item = (ObjectId, &'m dyn Model)>,
    ) -> Result<()> {
        for (_, row) in self.rows.drain() {
            self.table.remove(row);
        }
        for (id, object) in entries {
            let cells = self.cells_for(object)?;
            let row = self.table.append(cells)?;
            self.rows.insert(id, row);
        }
        self.resort()
    }

    /// Append an untracked row of raw values, converting each cell
    pub fn append_row(&mut self, raw: Vec<Value>) -> Result<RowHandle> {
        if raw.len() != self.columns.len() {
            return Err(XrdError::Configuration(format!(
                "row has {} values, {} has {} columns",
                raw.len(),
                self.schema.type_name(),
                self.columns.len()
            )));
        }
        let cells = raw
            .into_iter()
            .enumerate()
            .map(|(column, value)| self.columns.convert(column, value))
            .collect::<Result<Vec<_>>>()?;
        let row = self.table.append(cells)?;
        self.resort()?;
        Ok(row)
    }

    /// Sort rows by a column; later inserts and edits keep the order
    pub fn sort_by(&mut self, column: usize, order: SortOrder) -> Result<()> {
        if column >= self.columns.len() {
            return Err(XrdError::Configuration(format!(
                "cannot sort by column {}, store has {}",
                column,
                self.columns.len()
            )));
        }
        self.sort = Some(SortSpec { column, order });
        self.resort()
    }

    /// Stop keeping rows sorted; the current order is kept
    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    fn resort(&mut self) -> Result<()> {
        let Some(SortSpec { column, order }) = self.sort else {
            return Ok(());
        };
        let mut keyed: Vec<(RowHandle, Value)> = (0..self.table.len())
            .filter_map(|position| self.table.row_at(position))
            .map(|row| {
                let value = self.table.value(row, column).unwrap_or(Value::Null);
                (row, value)
            })
            .collect();
        match order {
            SortOrder::Ascending => keyed.sort_by(|a, b| a.1.sort_cmp(&b.1)),
            SortOrder::Descending => keyed.sort_by(|a, b| b.1.sort_cmp(&a.1)),
        }
        let handles: Vec<RowHandle> = keyed.into_iter().map(|(row, _)| row).collect();
        self.table.reorder(&handles)
    }

    /// Rows as a JSON array of `{column: value}` objects
    pub fn to_json(&self) -> Result<String> {
        let mut rows = Vec::with_capacity(self.len());
        for position in 0..self.len() {
            let mut row = serde_json::Map::new();
            for spec in self.columns.iter() {
                let value = self.value(position, spec.index).unwrap_or(Value::Null);
                row.insert(spec.name.to_string(), serde_json::to_value(&value)?);
            }
            rows.push(serde_json::Value::Object(row));
        }
        Ok(serde_json::to_string_pretty(&rows)?)
    }
}

impl ListObserver for ObjectListStore {
    fn on_list_event(&mut self, event: &ListEvent, object: Option<&dyn Model>) {
        let result = match (*event, object) {
            (ListEvent::Inserted { id, index }, Some(object)) => {
                self.insert_object(id, index, object)
            }
            (ListEvent::Changed { id, property }, Some(object)) => {
                self.update_cell(id, property, object)
            }
            (ListEvent::Removed { id }, _) => {
                self.remove_object(id);
                Ok(())
            }
            (_, None) => Ok(()),
        };
        if let Err(e) = result {
            tracing::error!(
                "Failed to mirror {:?} into {} store: {}",
                event,
                self.schema.type_name(),
                e
            );
        }
    }

    fn resync(&mut self, entries: &mut dyn Iterator<Item = (ObjectId, &dyn Model)>) {
        tracing::debug!("Rebuilding {} store after missed events", self.schema.type_name());
        if let Err(e) = self.rebuild(entries) {
            tracing::error!("Failed to rebuild {} store: {}", self.schema.type_name(), e);
        }
    }
}

impl std::fmt::Debug for ObjectListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectListStore")
            .field("schema", &self.schema.type_name())
            .field("columns", &self.columns.len())
            .field("rows", &self.table.len())
            .field("sort", &self.sort)
            .finish()
    }
}

/// Parse literal row data from a JSON array of `{column: value}` objects
///
/// Missing keys become empty cells; every cell goes through
/// [`ColumnMap::convert`], so numeric text is accepted for float columns.
/// Opaque columns keep any JSON value (such as the `{"object": ..}` form
/// written by [`ObjectListStore::to_json`]) as an [`ObjectRef`] holding the
/// `serde_json::Value`.
pub fn rows_from_json(schema: &'static Schema, json: &str) -> Result<Vec<Vec<Value>>> {
    let columns = ColumnMap::from_schema(schema);
    let parsed: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json)?;
    parsed
        .into_iter()
        .map(|row| {
            columns
                .iter()
                .map(|spec| {
                    let raw = match row.get(spec.name) {
                        None | Some(serde_json::Value::Null) => {
                            return Ok(spec.column_type.empty_value());
                        }
                        Some(json) if spec.column_type == ColumnType::Opaque => {
                            Value::Object(ObjectRef::new(json.clone()))
                        }
                        Some(serde_json::Value::String(s)) => Value::Str(s.clone()),
                        Some(serde_json::Value::Number(n)) => match n.as_f64() {
                            Some(v) => Value::Float(v),
                            None => Value::Str(n.to_string()),
                        },
                        Some(serde_json::Value::Bool(b)) => Value::Str(b.to_string()),
                        Some(other) => {
                            return Err(XrdError::Conversion {
                                column: spec.index,
                                value: other.to_string(),
                                expected: spec.column_type.to_string(),
                            });
                        }
                    };
                    columns.convert(spec.index, raw)
                })
                .collect()
        })
        .collect()
}

/// Builds an [`ObjectListStore`] from exactly one source of rows
///
/// The sources are an explicit backing [`TableModel`], a list-valued property
/// of a parent model, or literal row data. Supplying none, or more than one,
/// is a configuration error.
#[derive(Default)]
pub struct ObjectStoreBuilder<'a> {
    schema: Option<&'static Schema>,
    backing: Option<Box<dyn TableModel>>,
    property: Option<(&'a mut dyn Model, String)>,
    rows: Option<Vec<Vec<Value>>>,
}

impl<'a> ObjectStoreBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element schema, required with a backing store or row data
    pub fn schema(mut self, schema: &'static Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn backing_store(mut self, table: Box<dyn TableModel>) -> Self {
        self.backing = Some(table);
        self
    }

    pub fn list_property(mut self, parent: &'a mut dyn Model, property: &str) -> Self {
        self.property = Some((parent, property.to_string()));
        self
    }

    pub fn rows(mut self, rows: Vec<Vec<Value>>) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn build(self) -> Result<SharedStore> {
        let sources = [
            self.backing.is_some(),
            self.property.is_some(),
            self.rows.is_some(),
        ]
        .into_iter()
        .filter(|supplied| *supplied)
        .count();
        match sources {
            0 => {
                return Err(XrdError::Configuration(
                    "either a backing store, a list property or row data is required".to_string(),
                ))
            }
            1 => {}
            _ => {
                return Err(XrdError::Configuration(
                    "only one of a backing store, a list property or row data may be supplied"
                        .to_string(),
                ))
            }
        }

        if let Some((parent, property)) = self.property {
            return Self::build_for_property(parent, &property);
        }

        let schema = self.schema.ok_or_else(|| {
            XrdError::Configuration("a schema is required for a backing store or row data".into())
        })?;

        if let Some(table) = self.backing {
            return Ok(Rc::new(RefCell::new(ObjectListStore::with_table(schema, table)?)));
        }

        let columns = ColumnMap::from_schema(schema);
        let mut store =
            ObjectListStore::with_table(schema, Box::new(ListStore::new(columns.column_types())))?;
        for row in self.rows.unwrap_or_default() {
            store.append_row(row)?;
        }
        Ok(Rc::new(RefCell::new(store)))
    }

    fn build_for_property(parent: &mut dyn Model, property: &str) -> Result<SharedStore> {
        let parent_schema = parent.schema();
        let descriptor = parent_schema.property(property).ok_or_else(|| {
            XrdError::Configuration(format!(
                "{} has no property '{}'",
                parent_schema.type_name(),
                property
            ))
        })?;
        let DataType::List(element) = descriptor.data_type else {
            return Err(XrdError::Configuration(format!(
                "{}.{} is not a list-valued property",
                parent_schema.type_name(),
                property
            )));
        };
        let schema = element();
        let collection = parent.collection_mut(property).ok_or_else(|| {
            XrdError::Configuration(format!(
                "{}.{} has no backing list",
                parent_schema.type_name(),
                property
            ))
        })?;
        if collection.element_schema() != schema {
            return Err(XrdError::Configuration(format!(
                "{}.{} holds {} objects, schema declares {}",
                parent_schema.type_name(),
                property,
                collection.element_schema().type_name(),
                schema.type_name()
            )));
        }

        let columns = ColumnMap::from_schema(schema);
        let mut store =
            ObjectListStore::with_table(schema, Box::new(ListStore::new(columns.column_types())))?;
        for (id, object) in collection.entries() {
            store.append_object(id, object)?;
        }

        let shared = Rc::new(RefCell::new(store));
        let weak: Weak<RefCell<ObjectListStore>> = Rc::downgrade(&shared);
        collection.subscribe(weak);
        tracing::debug!(
            "Projected {}.{} into a {}-column store",
            parent_schema.type_name(),
            property,
            columns.len()
        );
        Ok(shared)
    }
}
