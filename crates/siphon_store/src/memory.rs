//! In-memory database for tests and ephemeral transfers.

use crate::error::{StoreError, StoreResult};
use crate::table::Database;
use parking_lot::RwLock;
use siphon_codec::Row;
use std::collections::BTreeMap;

/// An in-memory database.
///
/// Tables are vectors of rows in append order, which doubles as the
/// deterministic transfer order. Suitable for unit tests, integration
/// tests, and the CLI's JSON-backed transfers.
///
/// # Thread Safety
///
/// All state sits behind `parking_lot` locks; the handle can be shared
/// freely. The transfer engine still serializes chunk attempts per table,
/// as its cursor contract requires.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<BTreeMap<String, TableData>>,
    indexes: RwLock<Vec<u8>>,
}

#[derive(Debug, Default)]
struct TableData {
    rows: Vec<Row>,
    /// Next auto-increment value; rewound by `reset_sequences`.
    sequence: u64,
}

impl MemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a database with the given tables pre-created and populated.
    pub fn with_tables(tables: Vec<(String, Vec<Row>)>) -> StoreResult<Self> {
        let db = Self::new();
        for (name, rows) in tables {
            db.create_table(&name)?;
            db.append_rows(&name, &rows)?;
        }
        Ok(db)
    }

    /// Returns a copy of every row of a table, in order.
    pub fn all_rows(&self, table: &str) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read();
        let data = tables
            .get(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        Ok(data.rows.clone())
    }

    /// Returns the current sequence value of a table.
    pub fn sequence(&self, table: &str) -> StoreResult<u64> {
        let tables = self.tables.read();
        let data = tables
            .get(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        Ok(data.sequence)
    }
}

impl Database for MemoryDatabase {
    fn create_table(&self, name: &str) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(StoreError::DuplicateTable(name.to_string()));
        }
        tables.insert(name.to_string(), TableData::default());
        Ok(())
    }

    fn inventory(&self) -> StoreResult<Vec<(String, u64)>> {
        let tables = self.tables.read();
        Ok(tables
            .iter()
            .map(|(name, data)| (name.clone(), data.rows.len() as u64))
            .collect())
    }

    fn row_count(&self, table: &str) -> StoreResult<u64> {
        let tables = self.tables.read();
        let data = tables
            .get(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        Ok(data.rows.len() as u64)
    }

    fn read_rows(&self, table: &str, offset: u64, limit: u64) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read();
        let data = tables
            .get(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;

        let start = (offset as usize).min(data.rows.len());
        let end = start.saturating_add(limit as usize).min(data.rows.len());
        Ok(data.rows[start..end].to_vec())
    }

    fn append_rows(&self, table: &str, rows: &[Row]) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        data.rows.extend_from_slice(rows);
        Ok(())
    }

    fn dump_schema(&self) -> StoreResult<Vec<u8>> {
        let names: Vec<String> = self.tables.read().keys().cloned().collect();
        let mut blob = Vec::new();
        ciborium::ser::into_writer(&names, &mut blob)
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        Ok(blob)
    }

    fn apply_schema(&self, blob: &[u8]) -> StoreResult<()> {
        // An empty blob is an empty schema.
        if blob.is_empty() {
            return Ok(());
        }
        let names: Vec<String> =
            ciborium::de::from_reader(blob).map_err(|e| StoreError::Schema(e.to_string()))?;

        let mut tables = self.tables.write();
        for name in names {
            tables.entry(name).or_default();
        }
        Ok(())
    }

    fn dump_indexes(&self) -> StoreResult<Vec<u8>> {
        Ok(self.indexes.read().clone())
    }

    fn apply_indexes(&self, blob: &[u8]) -> StoreResult<()> {
        *self.indexes.write() = blob.to_vec();
        Ok(())
    }

    fn reset_sequences(&self) -> StoreResult<Vec<(String, u64)>> {
        let mut tables = self.tables.write();
        let mut reset = Vec::with_capacity(tables.len());

        for (name, data) in tables.iter_mut() {
            // Convention: the first column is the auto-increment key when
            // it is an integer.
            let max_id = data
                .rows
                .iter()
                .filter_map(|row| row.first().and_then(|v| v.as_integer()))
                .max()
                .unwrap_or(0);

            data.sequence = (max_id.max(0) as u64) + 1;
            reset.push((name.clone(), data.sequence));
        }

        Ok(reset)
    }
}
