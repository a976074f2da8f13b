//! Deterministic sample data.

use siphon_codec::{Row, Value};
use siphon_store::{Database, MemoryDatabase, StoreResult};

/// Builds `n` deterministic `users` rows: `(id, name, email, score)`.
pub fn users_rows(n: u64) -> Vec<Row> {
    (0..n as i64)
        .map(|i| {
            vec![
                Value::Integer(i + 1),
                Value::Text(format!("user-{i}")),
                Value::Text(format!("user-{i}@example.com")),
                Value::Real(f64::from((i % 100) as i32) / 10.0),
            ]
        })
        .collect()
}

/// Builds `n` deterministic `orders` rows: `(id, user_id, note, paid)`.
pub fn orders_rows(n: u64) -> Vec<Row> {
    (0..n as i64)
        .map(|i| {
            vec![
                Value::Integer(i + 1),
                Value::Integer(i % 17 + 1),
                if i % 5 == 0 {
                    Value::Null
                } else {
                    Value::Text(format!("order #{i}"))
                },
                Value::Bool(i % 3 == 0),
            ]
        })
        .collect()
}

/// Builds a database with populated `users` and `orders` tables.
pub fn seeded_database(users: u64, orders: u64) -> StoreResult<MemoryDatabase> {
    let db = MemoryDatabase::new();
    db.create_table("users")?;
    db.append_rows("users", &users_rows(users))?;
    db.create_table("orders")?;
    db.append_rows("orders", &orders_rows(orders))?;
    Ok(db)
}
