//! Per-table transfer state.

use serde::{Deserialize, Serialize};

/// The serializable transfer state of one table.
///
/// This is everything a transfer needs to resume: the table name, how many
/// rows have been durably transferred, the current chunk size, the digest
/// of the last produced chunk, and whether the previous attempt for the
/// current chunk failed verification.
///
/// The state travels alongside every chunk so the peer can validate it is
/// applying the chunk it expects. Invariants:
/// - `cursor` only advances after the consuming side confirms durable
///   application of the corresponding chunk
/// - `chunk_size` is always at least 1
/// - while `error` is set, the same chunk (same cursor, same payload, same
///   checksum) is retried rather than a new one produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferState {
    /// Table name, case and quoting preserved exactly.
    pub table: String,
    /// Rows durably transferred so far; also the offset of the next chunk.
    pub cursor: u64,
    /// Rows requested per chunk.
    pub chunk_size: u64,
    /// Digest of the last produced chunk payload, if one is in flight.
    pub checksum: Option<u32>,
    /// True exactly when the previous attempt for the current chunk failed
    /// verification and must be retried unchanged.
    pub error: bool,
}

/// Default chunk size for a fresh stream, before any tuning feedback.
pub(crate) const DEFAULT_CHUNK_SIZE: u64 = 1_000;

impl TransferState {
    /// Creates the initial state for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            cursor: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            checksum: None,
            error: false,
        }
    }

    /// Creates the initial state with an explicit starting chunk size.
    ///
    /// Sizes below 1 are clamped to 1.
    pub fn with_chunk_size(table: impl Into<String>, chunk_size: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            ..Self::new(table)
        }
    }

    /// Advances the cursor after a confirmed durable application.
    ///
    /// Clears the error flag and the in-flight checksum: the next chunk is
    /// a fresh production.
    pub fn advance(&mut self, rows: u64) {
        self.cursor += rows;
        self.checksum = None;
        self.error = false;
    }

    /// Marks the current chunk as failed, forcing a verbatim retry.
    pub fn mark_error(&mut self) {
        self.error = true;
    }

    /// Clears the error flag after a successful attempt.
    pub fn clear_error(&mut self) {
        self.error = false;
    }

    /// Replaces the chunk size with a tuned value, clamped to at least 1.
    pub fn set_chunk_size(&mut self, size: u64) {
        self.chunk_size = size.max(1);
    }
}
