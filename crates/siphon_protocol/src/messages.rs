//! Request and response messages for transfer operations.

use crate::state::TransferState;
use crate::version::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Compatibility check request, sent before anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Protocol version the client speaks.
    pub version: ProtocolVersion,
    /// Optional shared-secret credentials.
    pub credentials: Option<String>,
}

impl VerifyRequest {
    /// Creates a verify request for the given version.
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            credentials: None,
        }
    }

    /// Attaches credentials.
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }
}

/// Compatibility check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Protocol version the server speaks.
    pub server_version: ProtocolVersion,
}

/// Inventory of a peer's tables: name and row count at snapshot time.
///
/// Used for progress totals only; table order carries no correctness
/// meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInventory {
    /// `(table name, row count)` pairs.
    pub tables: Vec<(String, u64)>,
}

impl TableInventory {
    /// Builds an inventory from name/count pairs.
    pub fn from_pairs(tables: Vec<(String, u64)>) -> Self {
        Self { tables }
    }

    /// Total row count across all tables.
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|(_, count)| count).sum()
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when the inventory holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Inventory response from the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryResponse {
    /// The peer's table inventory.
    pub inventory: TableInventory,
}

/// One chunk pushed to the peer.
///
/// Carries the chunk payload, the transfer state it belongs to, and the
/// payload digest the peer must verify on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushChunkRequest {
    /// Transfer state at production time (cursor names the chunk's window).
    pub state: TransferState,
    /// CRC32 digest of `payload` as computed by the producer.
    pub checksum: u32,
    /// Compressed row batch.
    pub payload: Vec<u8>,
}

/// Peer's verdict on a pushed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkAck {
    /// Chunk verified and durably applied; the producer may advance.
    Accepted,
    /// Payload did not match the declared checksum on arrival. Nothing was
    /// applied; the producer must resend the identical chunk.
    ChecksumMismatch,
}

impl ChunkAck {
    /// True if the chunk was applied.
    pub fn is_accepted(&self) -> bool {
        matches!(self, ChunkAck::Accepted)
    }
}

/// Request for the next chunk of a table being pulled.
///
/// The state's cursor is the requester's durable position; the error flag
/// signals that the previous response failed verification and the peer
/// must re-serve identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullChunkRequest {
    /// Requester's transfer state (table, cursor, requested chunk size).
    pub state: TransferState,
}

/// One chunk pulled from the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullChunkResponse {
    /// Compressed row batch; empty when `row_count` is 0.
    pub payload: Vec<u8>,
    /// CRC32 digest of `payload`.
    pub checksum: u32,
    /// Rows in the batch; 0 means the table is complete.
    pub row_count: u64,
}
