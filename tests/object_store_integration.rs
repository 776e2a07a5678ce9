//! Integration tests for object list stores over project collections
//!
//! These tests follow a store through the lifetime of its backing list:
//! - Column layout derived from the element schema
//! - Conversion of edited text into typed cells
//! - Rows following appends, edits and removals
//! - Sorted views staying consistent with the list

mod common;

use common::builders::{PatternBuilder, ProjectBuilder};
use common::recorder::EventRecorder;
use common::{assert_float_eq, column_floats, column_text};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use xrd_rs::model::{ListEvent, ListObserver, ObjectCollection};
use xrd_rs::project::{Phase, Specimen, PHASE_SCHEMA, SPECIMEN_SCHEMA};
use xrd_rs::store::{ObjectStoreBuilder, SortOrder};
use xrd_rs::{ColumnType, Model, Value, XrdError};

#[test]
fn test_column_layout_matches_schema() {
    for (property, schema) in [("phases", &PHASE_SCHEMA), ("specimens", &SPECIMEN_SCHEMA)] {
        let mut project = ProjectBuilder::new("Mix").build();
        let store = ObjectStoreBuilder::new()
            .list_property(&mut project, property)
            .build()
            .unwrap();
        let store = store.borrow();

        assert_eq!(store.n_columns(), schema.column_count());
        for (index, descriptor) in schema.column_properties().enumerate() {
            assert_eq!(store.column_index(descriptor.name), Some(index));
            assert_eq!(
                store.column_type(index),
                Some(descriptor.data_type.column_type())
            );
        }
    }
}

#[test]
fn test_specimen_pattern_is_opaque_column() {
    let mut project = ProjectBuilder::new("Mix")
        .specimen("AD", PatternBuilder::new().intensities(&[1.0, 4.0]).build())
        .build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "specimens")
        .build()
        .unwrap();
    let store = store.borrow();

    let column = store.column_index("pattern").unwrap();
    assert_eq!(store.column_type(column), Some(ColumnType::Opaque));
    assert!(matches!(store.value(0, column), Some(Value::Object(_))));
}

#[test]
fn test_convert_weight_fraction_text() {
    let mut project = ProjectBuilder::new("Mix").build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "phases")
        .build()
        .unwrap();
    let store = store.borrow();
    let column = store.column_index("weight_fraction").unwrap();

    assert_eq!(store.convert(column, "0.5").unwrap(), Value::Float(0.5));
    let err = store.convert(column, "abc").unwrap_err();
    assert!(matches!(err, XrdError::Conversion { .. }));

    let name = store.column_index("name").unwrap();
    assert_eq!(store.convert(name, 2.5).unwrap(), Value::Str("2.5".into()));
}

#[test]
fn test_rejected_edit_leaves_row_untouched() {
    let mut project = ProjectBuilder::new("Mix").phase("Illite", 0.4).build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "phases")
        .build()
        .unwrap();
    let column = store.borrow().column_index("weight_fraction").unwrap();

    let edit = store.borrow().convert(column, "forty percent");
    assert!(edit.is_err());
    assert_eq!(store.borrow().value(0, column), Some(Value::Float(0.4)));

    let id = project.phases.id_at(0).unwrap();
    let value = store.borrow().convert(column, " 0.45 ").unwrap();
    project.phases.set(id, "weight_fraction", value).unwrap();
    assert_float_eq(column_floats(&store.borrow(), column)[0], 0.45, 1e-12);
}

#[test]
fn test_store_follows_list() {
    let mut project = ProjectBuilder::new("Mix").build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "phases")
        .build()
        .unwrap();

    let ids: Vec<_> = ["Illite", "Kaolinite", "Chlorite", "Smectite"]
        .iter()
        .map(|name| project.phases.push(Phase::new(*name, 0.25)))
        .collect();
    assert_eq!(
        column_text(&store.borrow(), 0),
        vec!["Illite", "Kaolinite", "Chlorite", "Smectite"]
    );

    project
        .phases
        .update(ids[1], "sigma_star", |p| p.sigma_star = 1.5)
        .unwrap();
    let sigma = store.borrow().column_index("sigma_star").unwrap();
    assert_eq!(store.borrow().value(1, sigma), Some(Value::Float(1.5)));
    assert_eq!(store.borrow().len(), 4);

    project.phases.remove(ids[2]);
    assert_eq!(
        column_text(&store.borrow(), 0),
        vec!["Illite", "Kaolinite", "Smectite"]
    );
    assert!(!store.borrow().contains(ids[2]));
    assert_eq!(store.borrow().row_of(ids[3]), Some(2));
}

#[test]
fn test_store_and_other_observers_share_list() {
    let mut project = ProjectBuilder::new("Mix").build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "phases")
        .build()
        .unwrap();
    let recorder = EventRecorder::shared();
    let weak: Weak<RefCell<dyn ListObserver>> = Rc::downgrade(&recorder) as Weak<RefCell<dyn ListObserver>>;
    project.phases.subscribe(weak);

    let id = project.phases.push(Phase::new("Illite", 1.0));
    project.phases.remove(id);

    assert_eq!(store.borrow().len(), 0);
    let recorder = recorder.borrow();
    let events = &recorder.events;
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        (ListEvent::Inserted { id, index: 0 }, Some("Illite".to_string()))
    );
    assert_eq!(events[1], (ListEvent::Removed { id }, None));
}

#[test]
fn test_sorted_view_over_edits() {
    let mut project = ProjectBuilder::new("Mix")
        .phase("Illite", 0.5)
        .phase("Kaolinite", 0.2)
        .phase("Chlorite", 0.3)
        .build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "phases")
        .build()
        .unwrap();
    let column = store.borrow().column_index("weight_fraction").unwrap();
    store
        .borrow_mut()
        .sort_by(column, SortOrder::Ascending)
        .unwrap();
    assert_eq!(
        column_text(&store.borrow(), 0),
        vec!["Kaolinite", "Chlorite", "Illite"]
    );

    let kaolinite = project.phases.id_at(1).unwrap();
    project
        .phases
        .set(kaolinite, "weight_fraction", Value::Float(0.9))
        .unwrap();
    assert_eq!(
        column_text(&store.borrow(), 0),
        vec!["Chlorite", "Illite", "Kaolinite"]
    );
    assert_eq!(store.borrow().object_at(2), Some(kaolinite));

    store.borrow_mut().clear_sort();
    project.phases.push(Phase::new("Smectite", 0.0));
    assert_eq!(store.borrow().len(), 4);
    assert_eq!(store.borrow().object_at(3), project.phases.id_at(3));
}

#[test]
fn test_store_borrowed_during_push_catches_up() {
    let mut project = ProjectBuilder::new("Mix").phase("Chlorite", 0.1).build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "phases")
        .build()
        .unwrap();

    {
        let view = store.borrow();
        project.phases.push(Phase::new("Illite", 0.5));
        assert_eq!(view.len(), 1);
    }
    project.phases.push(Phase::new("Kaolinite", 0.4));

    assert_eq!(store.borrow().len(), project.phases.len());
    assert_eq!(
        column_text(&store.borrow(), 0),
        vec!["Chlorite", "Illite", "Kaolinite"]
    );
    for (row, id) in project.phases.ids().into_iter().enumerate() {
        assert_eq!(store.borrow().row_of(id), Some(row));
    }
}

#[test]
fn test_store_borrowed_during_removal_catches_up_on_sync() {
    let mut project = ProjectBuilder::new("Mix")
        .phase("Illite", 0.5)
        .phase("Kaolinite", 0.3)
        .build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "phases")
        .build()
        .unwrap();
    let column = store.borrow().column_index("weight_fraction").unwrap();
    store
        .borrow_mut()
        .sort_by(column, SortOrder::Ascending)
        .unwrap();

    let illite = project.phases.id_at(0).unwrap();
    {
        let _view = store.borrow();
        project.phases.remove(illite);
        project.phases.push(Phase::new("Smectite", 0.1));
    }
    project.phases.sync_observers();

    let store = store.borrow();
    assert!(!store.contains(illite));
    assert_eq!(column_text(&store, 0), vec!["Smectite", "Kaolinite"]);
}

#[test]
fn test_store_dropped_before_list() {
    let mut project = ProjectBuilder::new("Mix").phase("Illite", 0.5).build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "phases")
        .build()
        .unwrap();
    drop(store);

    project.phases.push(Phase::new("Kaolinite", 0.5));
    assert_eq!(project.phases.observer_count(), 0);
}

#[test]
fn test_json_rows_build_a_detached_store() {
    let mut project = ProjectBuilder::new("Mix")
        .phase("Illite", 0.5)
        .phase("Kaolinite", 0.5)
        .build();
    let json = {
        let store = ObjectStoreBuilder::new()
            .list_property(&mut project, "phases")
            .build()
            .unwrap();
        let json = store.borrow().to_json();
        json.unwrap()
    };

    let rows = xrd_rs::store::rows_from_json(&PHASE_SCHEMA, &json).unwrap();
    let copy = ObjectStoreBuilder::new()
        .schema(&PHASE_SCHEMA)
        .rows(rows)
        .build()
        .unwrap();
    assert_eq!(column_text(&copy.borrow(), 0), vec!["Illite", "Kaolinite"]);

    // The copy does not follow the project
    project.phases.push(Phase::new("Chlorite", 0.0));
    assert_eq!(copy.borrow().len(), 2);
}

#[test]
fn test_specimen_rows_round_trip_through_json() {
    let mut project = ProjectBuilder::new("Mix")
        .specimen("AD", PatternBuilder::new().intensities(&[1.0, 4.0]).build())
        .specimen("EG", PatternBuilder::new().intensities(&[2.0, 3.0]).build())
        .build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "specimens")
        .build()
        .unwrap();
    let json = store.borrow().to_json().unwrap();

    // Keys follow column order
    let first_row = &json[json.find('{').unwrap()..json.find('}').unwrap()];
    let positions: Vec<usize> = ["name", "sample_length", "abs_scale", "pattern"]
        .iter()
        .map(|key| first_row.find(&format!("\"{}\"", key)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", first_row);

    let rows = xrd_rs::store::rows_from_json(&SPECIMEN_SCHEMA, &json).unwrap();
    let copy = ObjectStoreBuilder::new()
        .schema(&SPECIMEN_SCHEMA)
        .rows(rows)
        .build()
        .unwrap();
    let copy = copy.borrow();
    assert_eq!(column_text(&copy, 0), vec!["AD", "EG"]);
    let pattern = copy.column_index("pattern").unwrap();
    assert!(matches!(copy.value(1, pattern), Some(Value::Object(_))));
    let length = copy.column_index("sample_length").unwrap();
    assert_eq!(column_floats(&copy, length), vec![3.0, 3.0]);
}

#[test]
fn test_list_property_requires_collection() {
    let mut project = ProjectBuilder::new("Mix").build();
    let err = ObjectStoreBuilder::new()
        .list_property(&mut project, "layout")
        .build()
        .unwrap_err();
    assert!(matches!(err, XrdError::Configuration(_)));
    assert_eq!(project.get_value("layout"), Some(Value::Str("FULL".into())));
}

#[derive(Debug, Clone)]
enum Op {
    Append,
    Insert(usize),
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Append),
        1 => (0usize..16).prop_map(Op::Insert),
        2 => (0usize..16).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_rows_mirror_list_order(ops in prop::collection::vec(op(), 0..40)) {
        let mut project = ProjectBuilder::new("Mix").build();
        let store = ObjectStoreBuilder::new()
            .list_property(&mut project, "phases")
            .build()
            .unwrap();

        for (n, op) in ops.into_iter().enumerate() {
            let phase = Phase::new(format!("P{}", n), n as f64);
            match op {
                Op::Append => {
                    project.phases.push(phase);
                }
                Op::Insert(i) => {
                    let index = i.min(project.phases.len());
                    project.phases.insert(index, phase);
                }
                Op::Remove(i) => {
                    if let Some(id) = project.phases.id_at(i) {
                        project.phases.remove(id);
                    }
                }
            }
        }

        let expected: Vec<String> = project.phases.iter().map(|(_, p)| p.name.clone()).collect();
        prop_assert_eq!(store.borrow().len(), project.phases.len());
        prop_assert_eq!(column_text(&store.borrow(), 0), expected);
        for (row, id) in project.phases.ids().into_iter().enumerate() {
            prop_assert_eq!(store.borrow().row_of(id), Some(row));
        }
    }

    #[test]
    fn prop_float_column_accepts_any_number_text(x in -1.0e9f64..1.0e9) {
        let mut project = ProjectBuilder::new("Mix").build();
        let store = ObjectStoreBuilder::new()
            .list_property(&mut project, "specimens")
            .build()
            .unwrap();
        let column = store.borrow().column_index("sample_length").unwrap();
        let converted = store.borrow().convert(column, x.to_string()).unwrap();
        prop_assert_eq!(converted, Value::Float(x));
    }
}

#[test]
fn test_specimen_edits_keep_row_position() {
    let mut project = ProjectBuilder::new("Mix")
        .specimen("AD", PatternBuilder::new().peak(10, 5, 10.0).build())
        .specimen("EG", PatternBuilder::new().peak(10, 5, 20.0).build())
        .build();
    let store = ObjectStoreBuilder::new()
        .list_property(&mut project, "specimens")
        .build()
        .unwrap();

    let eg = project.specimens.id_at(1).unwrap();
    project
        .specimens
        .set(eg, "sample_length", Value::Float(2.5))
        .unwrap();
    project.specimens.push(Specimen::new("HT"));

    let store = store.borrow();
    assert_eq!(column_text(&store, 0), vec!["AD", "EG", "HT"]);
    let column = store.column_index("sample_length").unwrap();
    assert_eq!(column_floats(&store, column), vec![3.0, 2.5, 3.0]);
}
