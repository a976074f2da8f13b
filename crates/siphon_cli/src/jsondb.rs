//! JSON file loading and dumping for the in-memory store.
//!
//! File format: an object mapping table names to arrays of row arrays.
//! Cells are JSON scalars; byte cells are spelled `{"hex": "..."}` since
//! JSON has no byte-string type.

use siphon_codec::{Row, Value};
use siphon_store::{Database, MemoryDatabase};
use std::error::Error;
use std::fs;
use std::path::Path;

/// Loads a database file into an in-memory store.
pub fn load(path: &Path) -> Result<MemoryDatabase, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&text)?;

    let tables = parsed
        .as_object()
        .ok_or("database file must be a JSON object of tables")?;

    let db = MemoryDatabase::new();
    for (name, rows_value) in tables {
        let rows_json = rows_value
            .as_array()
            .ok_or_else(|| format!("table {name} must be an array of rows"))?;

        let mut rows = Vec::with_capacity(rows_json.len());
        for row_json in rows_json {
            let cells = row_json
                .as_array()
                .ok_or_else(|| format!("rows of {name} must be arrays"))?;
            let row: Row = cells
                .iter()
                .map(value_from_json)
                .collect::<Result<_, _>>()?;
            rows.push(row);
        }

        db.create_table(name)?;
        db.append_rows(name, &rows)?;
    }

    Ok(db)
}

/// Writes a store out as a database file.
pub fn dump(db: &MemoryDatabase, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut tables = serde_json::Map::new();
    for (name, _count) in db.inventory()? {
        let rows = db.all_rows(&name)?;
        let rows_json: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| serde_json::Value::Array(row.iter().map(value_to_json).collect()))
            .collect();
        tables.insert(name, serde_json::Value::Array(rows_json));
    }

    let text = serde_json::to_string_pretty(&serde_json::Value::Object(tables))?;
    fs::write(path, text)?;
    Ok(())
}

fn value_from_json(json: &serde_json::Value) -> Result<Value, Box<dyn Error>> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Real(f))
            } else {
                Err(format!("unrepresentable number: {n}").into())
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(hex_str)) = map.get("hex") {
                if map.len() == 1 {
                    let bytes = decode_hex(hex_str)?;
                    return Ok(Value::Bytes(bytes));
                }
            }
            Err("cell objects must be {\"hex\": \"...\"}".into())
        }
        serde_json::Value::Array(_) => Err("nested arrays are not valid cells".into()),
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => {
            let mut map = serde_json::Map::new();
            map.insert(
                "hex".to_string(),
                serde_json::Value::String(encode_hex(b)),
            );
            serde_json::Value::Object(map)
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex(s: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    if s.len() % 2 != 0 {
        return Err("hex string has odd length".into());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string().into()))
        .collect()
}
