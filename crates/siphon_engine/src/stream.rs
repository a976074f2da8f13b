//! Per-table transfer streams.
//!
//! A table moves through exactly one of two stream variants, chosen at
//! construction: [`SourceTableStream`] produces chunks from a source
//! table, [`DestinationTableStream`] applies received chunks to a
//! destination table. Both own a [`TransferState`] and enforce the cursor
//! discipline: the cursor advances only on confirmed durable application,
//! and while the error flag is set the identical chunk is retried.

use crate::error::{TransferError, TransferResult};
use siphon_codec::{checksum, decode_rows, encode_rows, verify_checksum};
use siphon_protocol::TransferState;
use siphon_store::Database;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One immutable, once-computed unit of transfer.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Compressed row batch.
    pub payload: Vec<u8>,
    /// Rows in the batch.
    pub row_count: u64,
    /// CRC32 digest of `payload`.
    pub checksum: u32,
    /// Time spent producing the batch (row reads + encoding).
    pub elapsed: Duration,
}

/// Produces chunks from a source table.
pub struct SourceTableStream {
    db: Arc<dyn Database>,
    state: TransferState,
    /// Chunk in flight; re-served verbatim while the error flag is set.
    pending: Option<Chunk>,
    complete: bool,
}

impl SourceTableStream {
    /// Creates a stream at cursor 0 with the given starting chunk size.
    pub fn new(db: Arc<dyn Database>, table: &str, chunk_size: u64) -> Self {
        Self {
            db,
            state: TransferState::with_chunk_size(table, chunk_size),
            pending: None,
            complete: false,
        }
    }

    /// Resumes a stream from persisted state.
    ///
    /// The first `produce` after resuming re-reads the window at the
    /// persisted cursor; nothing beyond the state is required.
    pub fn resume(db: Arc<dyn Database>, state: TransferState) -> Self {
        Self {
            db,
            state,
            pending: None,
            complete: false,
        }
    }

    /// The stream's transfer state.
    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// Current chunk size.
    pub fn chunk_size(&self) -> u64 {
        self.state.chunk_size
    }

    /// Replaces the chunk size for the next production.
    ///
    /// Must not be called while a chunk is unresolved; the sizer feedback
    /// loop only runs after an accepted chunk.
    pub fn set_chunk_size(&mut self, size: u64) {
        self.state.set_chunk_size(size);
    }

    /// True once a production cycle has yielded zero rows.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Marks the in-flight chunk as rejected, forcing a verbatim retry.
    pub fn mark_error(&mut self) {
        self.state.mark_error();
    }

    /// Produces the chunk at the current cursor.
    ///
    /// Reads `chunk_size` rows at `cursor` in the table's deterministic
    /// order, encodes and checksums them, and records the elapsed
    /// production time. While the error flag is set, the cached in-flight
    /// chunk is returned unchanged instead (same bytes, same checksum), so
    /// a retry can never silently produce a different window.
    pub fn produce(&mut self) -> TransferResult<Chunk> {
        if self.state.error {
            if let Some(chunk) = &self.pending {
                return Ok(chunk.clone());
            }
        }

        let started = Instant::now();
        let rows = self
            .db
            .read_rows(&self.state.table, self.state.cursor, self.state.chunk_size)?;
        let (payload, row_count) = encode_rows(&rows)?;
        let digest = checksum(&payload);
        let elapsed = started.elapsed();

        if row_count == 0 {
            self.complete = true;
        }

        self.state.checksum = Some(digest);
        let chunk = Chunk {
            payload,
            row_count,
            checksum: digest,
            elapsed,
        };
        self.pending = Some(chunk.clone());
        Ok(chunk)
    }

    /// Advances the cursor after the peer confirmed durable application.
    pub fn advance(&mut self, rows: u64) {
        self.state.advance(rows);
        self.pending = None;
    }
}

/// Applies received chunks to a destination table.
pub struct DestinationTableStream {
    db: Arc<dyn Database>,
    state: TransferState,
    complete: bool,
}

impl DestinationTableStream {
    /// Creates a stream at cursor 0 with the given starting chunk size.
    pub fn new(db: Arc<dyn Database>, table: &str, chunk_size: u64) -> Self {
        Self {
            db,
            state: TransferState::with_chunk_size(table, chunk_size),
            complete: false,
        }
    }

    /// Resumes a stream from persisted state.
    pub fn resume(db: Arc<dyn Database>, state: TransferState) -> Self {
        Self {
            db,
            state,
            complete: false,
        }
    }

    /// The stream's transfer state.
    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// Current chunk size (the size requested from the peer).
    pub fn chunk_size(&self) -> u64 {
        self.state.chunk_size
    }

    /// Replaces the requested chunk size for the next pull.
    pub fn set_chunk_size(&mut self, size: u64) {
        self.state.set_chunk_size(size);
    }

    /// True once an apply cycle has reported zero rows.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Marks the last pull as corrupted, forcing a re-request of the same
    /// state.
    pub fn mark_error(&mut self) {
        self.state.mark_error();
    }

    /// Verifies and applies one received chunk.
    ///
    /// The declared checksum is verified strictly before decompression,
    /// decoding, or any row write; a mismatch raises
    /// [`TransferError::CorruptedChunk`] with the destination untouched.
    /// On success the cursor advances by the decoded row count, which is
    /// returned. A zero-row chunk marks the stream complete.
    pub fn apply(&mut self, payload: &[u8], declared: u32) -> TransferResult<u64> {
        if verify_checksum(payload, declared).is_err() {
            return Err(TransferError::CorruptedChunk {
                table: self.state.table.clone(),
                cursor: self.state.cursor,
            });
        }

        let rows = decode_rows(payload)?;
        if rows.is_empty() {
            self.complete = true;
            self.state.clear_error();
            return Ok(0);
        }

        self.db.append_rows(&self.state.table, &rows)?;
        let count = rows.len() as u64;
        self.state.advance(count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siphon_codec::{Row, Value};
    use siphon_store::MemoryDatabase;

    fn populated_db(table: &str, rows: u64) -> Arc<dyn Database> {
        let db = MemoryDatabase::new();
        db.create_table(table).unwrap();
        let batch: Vec<Row> = (0..rows as i64)
            .map(|i| vec![Value::Integer(i), Value::Text(format!("row-{i}"))])
            .collect();
        db.append_rows(table, &batch).unwrap();
        Arc::new(db)
    }

    fn empty_db(table: &str) -> Arc<dyn Database> {
        let db = MemoryDatabase::new();
        db.create_table(table).unwrap();
        Arc::new(db)
    }

    #[test]
    fn produce_then_apply_moves_all_rows() {
        let source = populated_db("users", 25);
        let dest = empty_db("users");

        let mut producer = SourceTableStream::new(Arc::clone(&source), "users", 10);
        let mut consumer = DestinationTableStream::new(Arc::clone(&dest), "users", 10);

        let mut applied = 0;
        loop {
            let chunk = producer.produce().unwrap();
            if producer.is_complete() {
                break;
            }
            let rows = consumer.apply(&chunk.payload, chunk.checksum).unwrap();
            applied += rows;
            producer.advance(rows);
        }

        assert_eq!(applied, 25);
        assert_eq!(producer.state().cursor, 25);
        assert_eq!(consumer.state().cursor, 25);

        let expected = source.read_rows("users", 0, 25).unwrap();
        let got = dest.read_rows("users", 0, 25).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn empty_table_completes_in_one_cycle() {
        let source = empty_db("empty");
        let mut producer = SourceTableStream::new(source, "empty", 100);

        let chunk = producer.produce().unwrap();
        assert_eq!(chunk.row_count, 0);
        assert!(producer.is_complete());
        assert_eq!(producer.state().cursor, 0);
    }

    #[test]
    fn retry_returns_identical_chunk() {
        let source = populated_db("users", 10);
        let mut producer = SourceTableStream::new(source, "users", 4);

        let first = producer.produce().unwrap();
        producer.mark_error();
        let retried = producer.produce().unwrap();

        assert_eq!(retried.payload, first.payload);
        assert_eq!(retried.checksum, first.checksum);
        assert_eq!(producer.state().cursor, 0);
        assert_eq!(producer.chunk_size(), 4);
    }

    #[test]
    fn advance_clears_the_pending_chunk() {
        let source = populated_db("users", 10);
        let mut producer = SourceTableStream::new(source, "users", 4);

        let first = producer.produce().unwrap();
        producer.advance(first.row_count);
        assert_eq!(producer.state().cursor, 4);

        let second = producer.produce().unwrap();
        assert_ne!(second.payload, first.payload);
    }

    #[test]
    fn corrupted_payload_never_mutates_destination() {
        let source = populated_db("users", 8);
        let dest = empty_db("users");

        let mut producer = SourceTableStream::new(source, "users", 8);
        let mut consumer = DestinationTableStream::new(Arc::clone(&dest), "users", 8);

        let chunk = producer.produce().unwrap();
        let mut corrupted = chunk.payload.clone();
        corrupted[0] ^= 0x40;

        let result = consumer.apply(&corrupted, chunk.checksum);
        assert!(matches!(
            result,
            Err(TransferError::CorruptedChunk { cursor: 0, .. })
        ));
        assert_eq!(dest.row_count("users").unwrap(), 0);
        assert_eq!(consumer.state().cursor, 0);

        // The identical uncorrupted chunk still applies cleanly.
        let rows = consumer.apply(&chunk.payload, chunk.checksum).unwrap();
        assert_eq!(rows, 8);
        assert_eq!(dest.row_count("users").unwrap(), 8);
    }

    #[test]
    fn repeated_apply_of_same_window_is_detectable_by_cursor() {
        // The orchestrator only applies once per confirmed cursor; this
        // checks the state a resumed run would consult.
        let source = populated_db("users", 6);
        let dest = empty_db("users");

        let mut producer = SourceTableStream::new(source, "users", 6);
        let mut consumer = DestinationTableStream::new(dest, "users", 6);

        let chunk = producer.produce().unwrap();
        consumer.apply(&chunk.payload, chunk.checksum).unwrap();
        assert_eq!(consumer.state().cursor, 6);
    }

    #[test]
    fn zero_row_chunk_completes_destination() {
        let dest = empty_db("users");
        let mut consumer = DestinationTableStream::new(dest, "users", 10);

        let (payload, _) = encode_rows(&[]).unwrap();
        let digest = checksum(&payload);
        let rows = consumer.apply(&payload, digest).unwrap();

        assert_eq!(rows, 0);
        assert!(consumer.is_complete());
    }

    proptest::proptest! {
        #[test]
        fn every_chunk_size_moves_every_row(size in 1u64..50, total in 0u64..120) {
            let source = populated_db("users", total);
            let dest = empty_db("users");

            let mut producer = SourceTableStream::new(Arc::clone(&source), "users", size);
            let mut consumer = DestinationTableStream::new(Arc::clone(&dest), "users", size);

            let mut cycles = 0u64;
            loop {
                let chunk = producer.produce().unwrap();
                if producer.is_complete() {
                    break;
                }
                let applied = consumer.apply(&chunk.payload, chunk.checksum).unwrap();
                producer.advance(applied);
                cycles += 1;
                proptest::prop_assert!(cycles <= total + 1);
            }

            proptest::prop_assert_eq!(producer.state().cursor, total);
            proptest::prop_assert_eq!(consumer.state().cursor, total);
            proptest::prop_assert_eq!(
                dest.read_rows("users", 0, total.max(1)).unwrap(),
                source.read_rows("users", 0, total.max(1)).unwrap()
            );
        }
    }

    #[test]
    fn resume_continues_from_persisted_state() {
        let source = populated_db("users", 10);
        let mut state = TransferState::with_chunk_size("users", 3);
        state.advance(6);

        let mut producer = SourceTableStream::resume(source, state);
        let chunk = producer.produce().unwrap();
        assert_eq!(chunk.row_count, 3);

        let decoded = decode_rows(&chunk.payload).unwrap();
        assert_eq!(decoded[0][0], Value::Integer(6));
    }
}
