//! Proptest strategies for rows and values.

use proptest::prelude::*;
use siphon_codec::{Row, Value};

/// Strategy producing any relational scalar.
///
/// Floats are drawn from finite values only, so generated rows compare
/// equal after a codec roundtrip.
pub fn value_strategy() -> BoxedStrategy<Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e12f64..1.0e12).prop_map(Value::Real),
        ".*".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
    ]
    .boxed()
}

/// Strategy producing a row of exactly `width` values.
pub fn row_strategy(width: usize) -> BoxedStrategy<Row> {
    prop::collection::vec(value_strategy(), width).boxed()
}

/// Strategy producing up to `max_rows` rows of a fixed random width.
pub fn rows_strategy(max_rows: usize) -> BoxedStrategy<Vec<Row>> {
    (1usize..6)
        .prop_flat_map(move |width| prop::collection::vec(row_strategy(width), 0..max_rows))
        .boxed()
}
