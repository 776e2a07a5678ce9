//! Tabular stores
//!
//! - [`table`] - typed-column row storage ([`TableModel`], [`ListStore`])
//! - [`columns`] - schema-derived column mapping and value conversion
//! - [`object_store`] - [`ObjectListStore`], a table kept in sync with an
//!   observable object list

pub mod columns;
pub mod object_store;
pub mod table;

pub use columns::{ColumnMap, ColumnSpec};
pub use object_store::{
    rows_from_json, ObjectListStore, ObjectStoreBuilder, SharedStore, SortOrder, SortSpec,
};
pub use table::{ListStore, RowHandle, TableModel};
