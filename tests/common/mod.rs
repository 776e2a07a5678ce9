//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod recorder;

use xrd_rs::store::ObjectListStore;
use xrd_rs::Value;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Text of one column for every row, in row order
pub fn column_text(store: &ObjectListStore, column: usize) -> Vec<String> {
    (0..store.len())
        .map(|row| {
            store
                .value(row, column)
                .map(|v| v.to_text())
                .unwrap_or_default()
        })
        .collect()
}

/// Float of one column for every row, in row order
pub fn column_floats(store: &ObjectListStore, column: usize) -> Vec<f64> {
    (0..store.len())
        .filter_map(|row| store.value(row, column).and_then(|v| v.as_f64()))
        .collect()
}

/// Unwrap a string value
pub fn text(value: Option<Value>) -> String {
    value.map(|v| v.to_text()).unwrap_or_default()
}
