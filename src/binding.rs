//! Choice binding
//!
//! [`ChoiceBinding`] ties a key/label list to a string-valued model property,
//! the way a combo box would: the active entry follows the property's current
//! value, and selecting an entry writes its key back to the model.

use crate::error::{Result, XrdError};
use crate::model::Model;
use crate::store::{ListStore, TableModel};
use crate::types::{ColumnType, Value};

/// Ordered `(key, label)` pairs
pub type Choices = Vec<(String, String)>;

/// Column holding the key written to the model
pub const KEY_COLUMN: usize = 0;
/// Column holding the display label
pub const LABEL_COLUMN: usize = 1;

/// A key/label list bound to one property of a model
#[derive(Debug)]
pub struct ChoiceBinding {
    property: String,
    store: ListStore,
    active: Option<usize>,
}

impl ChoiceBinding {
    pub fn builder(property: &str) -> ChoiceBindingBuilder {
        ChoiceBindingBuilder {
            property: property.to_string(),
            store: None,
            choices: None,
            list_property: None,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn store(&self) -> &ListStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Index of the active entry
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn key(&self, index: usize) -> Option<String> {
        self.cell_text(index, KEY_COLUMN)
    }

    pub fn label(&self, index: usize) -> Option<String> {
        self.cell_text(index, LABEL_COLUMN)
    }

    pub fn active_key(&self) -> Option<String> {
        self.active.and_then(|i| self.key(i))
    }

    pub fn active_label(&self) -> Option<String> {
        self.active.and_then(|i| self.label(i))
    }

    fn cell_text(&self, index: usize, column: usize) -> Option<String> {
        let row = self.store.row_at(index)?;
        self.store.value(row, column).map(|v| v.to_text())
    }

    /// Make entry `index` active and write its key to the model
    pub fn select(&mut self, index: usize, model: &mut dyn Model) -> Result<()> {
        let key = self.key(index).ok_or_else(|| {
            XrdError::Configuration(format!(
                "no choice at index {} for '{}' ({} choices)",
                index,
                self.property,
                self.len()
            ))
        })?;
        model.set_value(&self.property, Value::Str(key))?;
        self.active = Some(index);
        Ok(())
    }

    /// Re-read the model and activate the entry matching its value
    pub fn sync_from(&mut self, model: &dyn Model) {
        let current = model
            .get_value(&self.property)
            .map(|v| v.to_text())
            .unwrap_or_default();
        self.active = (0..self.len()).find(|i| self.key(*i).as_deref() == Some(current.as_str()));
        if self.active.is_none() {
            tracing::debug!(
                "'{}' value {:?} matches none of {} choices",
                self.property,
                current,
                self.len()
            );
        }
    }
}

/// Builds a [`ChoiceBinding`] from exactly one source of choices
#[derive(Debug)]
pub struct ChoiceBindingBuilder {
    property: String,
    store: Option<ListStore>,
    choices: Option<Choices>,
    list_property: Option<String>,
}

impl ChoiceBindingBuilder {
    /// A prepared store whose first two columns are key and label
    pub fn store(mut self, store: ListStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn choices<K, L>(mut self, choices: impl IntoIterator<Item = (K, L)>) -> Self
    where
        K: Into<String>,
        L: Into<String>,
    {
        self.choices = Some(
            choices
                .into_iter()
                .map(|(k, l)| (k.into(), l.into()))
                .collect(),
        );
        self
    }

    /// A model property holding the [`Choices`] as an object value
    pub fn list_property(mut self, name: &str) -> Self {
        self.list_property = Some(name.to_string());
        self
    }

    pub fn bind(self, model: &dyn Model) -> Result<ChoiceBinding> {
        let store = if let Some(store) = self.store {
            check_store(&store)?;
            store
        } else if let Some(choices) = self.choices {
            store_from(&choices)?
        } else if let Some(list_property) = self.list_property {
            let value = model.get_value(&list_property).ok_or_else(|| {
                XrdError::Configuration(format!(
                    "{} has no property '{}'",
                    model.schema().type_name(),
                    list_property
                ))
            })?;
            let choices = value
                .as_object()
                .and_then(|o| o.downcast_ref::<Choices>())
                .ok_or_else(|| {
                    XrdError::Configuration(format!(
                        "{}.{} does not hold a list of choices",
                        model.schema().type_name(),
                        list_property
                    ))
                })?;
            store_from(choices)?
        } else {
            return Err(XrdError::Configuration(
                "either one of a list property, choice data or a store is required".to_string(),
            ));
        };

        let mut binding = ChoiceBinding {
            property: self.property,
            store,
            active: None,
        };
        binding.sync_from(model);
        Ok(binding)
    }
}

fn check_store(store: &ListStore) -> Result<()> {
    let ok = store.n_columns() >= 2
        && store.column_type(KEY_COLUMN) == Some(ColumnType::String)
        && store.column_type(LABEL_COLUMN) == Some(ColumnType::String);
    if ok {
        Ok(())
    } else {
        Err(XrdError::Configuration(format!(
            "choice store needs two leading string columns, has {:?}",
            store.column_types()
        )))
    }
}

fn store_from(choices: &[(String, String)]) -> Result<ListStore> {
    let mut store = ListStore::new(vec![ColumnType::String, ColumnType::String]);
    for (key, label) in choices {
        store.append(vec![key.as_str().into(), label.as_str().into()])?;
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{expect_string, unknown_property, DataType, PropertyDescriptor, Schema};
    use crate::types::ObjectRef;

    static VIEW_SCHEMA: Schema = Schema::new(
        "View",
        &[
            PropertyDescriptor::property("layout", DataType::String),
            PropertyDescriptor::property("layouts", DataType::Object),
        ],
    );

    struct View {
        layout: String,
        layouts: ObjectRef,
    }

    impl View {
        fn new(layout: &str) -> Self {
            let choices: Choices = vec![
                ("FULL".to_string(), "Full".to_string()),
                ("VIEWONLY".to_string(), "View-only".to_string()),
            ];
            Self {
                layout: layout.to_string(),
                layouts: ObjectRef::new(choices),
            }
        }
    }

    impl Model for View {
        fn schema(&self) -> &'static Schema {
            &VIEW_SCHEMA
        }

        fn get_value(&self, name: &str) -> Option<Value> {
            match name {
                "layout" => Some(self.layout.as_str().into()),
                "layouts" => Some(Value::Object(self.layouts.clone())),
                _ => None,
            }
        }

        fn set_value(&mut self, name: &str, value: Value) -> Result<()> {
            match name {
                "layout" => self.layout = expect_string(&VIEW_SCHEMA, name, value)?,
                _ => return Err(unknown_property(&VIEW_SCHEMA, name)),
            }
            Ok(())
        }
    }

    #[test]
    fn test_requires_a_source() {
        let view = View::new("FULL");
        let result = ChoiceBinding::builder("layout").bind(&view);
        assert!(matches!(result, Err(XrdError::Configuration(_))));
    }

    #[test]
    fn test_initial_selection_follows_model() {
        let view = View::new("VIEWONLY");
        let binding = ChoiceBinding::builder("layout")
            .list_property("layouts")
            .bind(&view)
            .unwrap();
        assert_eq!(binding.len(), 2);
        assert_eq!(binding.active(), Some(1));
        assert_eq!(binding.active_label().as_deref(), Some("View-only"));
    }

    #[test]
    fn test_unknown_value_selects_nothing() {
        let view = View::new("SPLIT");
        let binding = ChoiceBinding::builder("layout")
            .choices([("FULL", "Full")])
            .bind(&view)
            .unwrap();
        assert_eq!(binding.active(), None);
    }

    #[test]
    fn test_select_writes_key() {
        let mut view = View::new("FULL");
        let mut binding = ChoiceBinding::builder("layout")
            .list_property("layouts")
            .bind(&view)
            .unwrap();
        binding.select(1, &mut view).unwrap();
        assert_eq!(view.layout, "VIEWONLY");
        assert_eq!(binding.active_key().as_deref(), Some("VIEWONLY"));
        assert!(binding.select(5, &mut view).is_err());
        assert_eq!(binding.active(), Some(1));
    }

    #[test]
    fn test_explicit_store() {
        let view = View::new("b");
        let mut store = ListStore::new(vec![ColumnType::String, ColumnType::String]);
        store.append(vec!["a".into(), "A".into()]).unwrap();
        store.append(vec!["b".into(), "B".into()]).unwrap();
        let binding = ChoiceBinding::builder("layout")
            .store(store)
            .bind(&view)
            .unwrap();
        assert_eq!(binding.active(), Some(1));

        let numeric = ListStore::new(vec![ColumnType::Float, ColumnType::String]);
        assert!(ChoiceBinding::builder("layout")
            .store(numeric)
            .bind(&view)
            .is_err());
    }

    #[test]
    fn test_list_property_must_hold_choices() {
        let view = View::new("FULL");
        let result = ChoiceBinding::builder("layout")
            .list_property("layout")
            .bind(&view);
        assert!(result.is_err());
    }
}
