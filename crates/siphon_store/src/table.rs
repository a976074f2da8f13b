//! The database access trait.

use crate::error::StoreResult;
use siphon_codec::Row;

/// Access to a database participating in a transfer.
///
/// Implementations adapt a concrete database to the transfer engine. The
/// contract the engine relies on:
///
/// - `read_rows` returns rows in a **stable, deterministic order** for a
///   quiescent table; the offset is the transfer cursor, so re-reading the
///   same `(offset, limit)` window must return the same rows
/// - `append_rows` preserves batch order and is the only mutation the
///   receive path performs
/// - `dump_schema`/`dump_indexes` produce opaque blobs that only the
///   matching `apply_*` on the other side interprets (the external schema
///   tool boundary)
/// - `reset_sequences` rewinds auto-increment counters to reflect the rows
///   currently present
///
/// Implementations must be `Send + Sync`; the engine serializes all access
/// to a given table cursor but may hold the handle across threads.
pub trait Database: Send + Sync {
    /// Creates an empty table.
    fn create_table(&self, name: &str) -> StoreResult<()>;

    /// Returns every table's name and current row count.
    fn inventory(&self) -> StoreResult<Vec<(String, u64)>>;

    /// Returns the row count of one table.
    fn row_count(&self, table: &str) -> StoreResult<u64>;

    /// Reads up to `limit` rows starting at row offset `offset`, in the
    /// table's stable order. Returns fewer rows (possibly none) at the end
    /// of the table.
    fn read_rows(&self, table: &str, offset: u64, limit: u64) -> StoreResult<Vec<Row>>;

    /// Appends a batch of rows to the end of a table, preserving order.
    fn append_rows(&self, table: &str, rows: &[Row]) -> StoreResult<()>;

    /// Dumps the schema as an opaque blob.
    fn dump_schema(&self) -> StoreResult<Vec<u8>>;

    /// Applies a schema blob produced by a peer's `dump_schema`.
    fn apply_schema(&self, blob: &[u8]) -> StoreResult<()>;

    /// Dumps index definitions as an opaque blob.
    fn dump_indexes(&self) -> StoreResult<Vec<u8>>;

    /// Applies an index blob produced by a peer's `dump_indexes`.
    fn apply_indexes(&self, blob: &[u8]) -> StoreResult<()>;

    /// Resets every table's sequence counter from its current rows.
    ///
    /// Returns the `(table, next value)` pairs that were set.
    fn reset_sequences(&self) -> StoreResult<Vec<(String, u64)>>;
}
