//! Transport abstraction for a transfer session.

use crate::error::TransferResult;
use parking_lot::Mutex;
use siphon_protocol::{
    ChunkAck, InventoryResponse, PullChunkRequest, PullChunkResponse, PushChunkRequest,
    TableInventory, VerifyRequest, VerifyResponse, PROTOCOL_VERSION,
};
use std::collections::VecDeque;

/// Request/response operations an orchestrator issues against a
/// session-scoped peer resource.
///
/// All calls are blocking round trips. The session is scoped to one
/// transfer and must not be shared between orchestrators.
pub trait SessionTransport: Send + Sync {
    /// Checks protocol compatibility and credentials with the peer.
    fn verify_compatibility(&self, request: &VerifyRequest) -> TransferResult<VerifyResponse>;

    /// Opens the logical session resource.
    fn open_session(&self) -> TransferResult<()>;

    /// Releases the session resource.
    fn close_session(&self) -> TransferResult<()>;

    /// Pushes the schema blob.
    fn push_schema(&self, blob: &[u8]) -> TransferResult<()>;

    /// Pulls the peer's schema blob.
    fn pull_schema(&self) -> TransferResult<Vec<u8>>;

    /// Pushes the index blob.
    fn push_indexes(&self, blob: &[u8]) -> TransferResult<()>;

    /// Pulls the peer's index blob.
    fn pull_indexes(&self) -> TransferResult<Vec<u8>>;

    /// Pulls the peer's table inventory.
    fn pull_inventory(&self) -> TransferResult<InventoryResponse>;

    /// Pushes one chunk; the peer verifies the declared checksum before
    /// applying anything.
    fn push_chunk(&self, request: &PushChunkRequest) -> TransferResult<ChunkAck>;

    /// Pulls one chunk for the requester's transfer state.
    fn pull_chunk(&self, request: &PullChunkRequest) -> TransferResult<PullChunkResponse>;

    /// Asks the peer to reset its sequence counters from the pushed data.
    fn reset_sequences(&self) -> TransferResult<()>;
}

/// A scriptable transport for orchestrator tests.
///
/// Responses are queued per operation and popped in order; an empty queue
/// falls back to a benign default (verify succeeds with our own version,
/// pushes are accepted, pulls report a complete table). Every call is
/// recorded in a log so tests can assert on sequencing.
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<String>>,
    verify_results: Mutex<VecDeque<TransferResult<VerifyResponse>>>,
    inventory_results: Mutex<VecDeque<TransferResult<InventoryResponse>>>,
    push_acks: Mutex<VecDeque<TransferResult<ChunkAck>>>,
    pull_results: Mutex<VecDeque<TransferResult<PullChunkResponse>>>,
    schema: Mutex<Vec<u8>>,
    indexes: Mutex<Vec<u8>>,
    pushed_chunks: Mutex<Vec<PushChunkRequest>>,
}

impl MockTransport {
    /// Creates a mock with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a verify result.
    pub fn queue_verify(&self, result: TransferResult<VerifyResponse>) {
        self.verify_results.lock().push_back(result);
    }

    /// Queues an inventory result.
    pub fn queue_inventory(&self, result: TransferResult<InventoryResponse>) {
        self.inventory_results.lock().push_back(result);
    }

    /// Queues a push-chunk acknowledgment.
    pub fn queue_push_ack(&self, result: TransferResult<ChunkAck>) {
        self.push_acks.lock().push_back(result);
    }

    /// Queues a pull-chunk result.
    pub fn queue_pull_chunk(&self, result: TransferResult<PullChunkResponse>) {
        self.pull_results.lock().push_back(result);
    }

    /// Sets the schema blob served by `pull_schema`.
    pub fn set_schema(&self, blob: Vec<u8>) {
        *self.schema.lock() = blob;
    }

    /// Sets the index blob served by `pull_indexes`.
    pub fn set_indexes(&self, blob: Vec<u8>) {
        *self.indexes.lock() = blob;
    }

    /// The recorded call log, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Every chunk that was pushed, in order.
    pub fn pushed_chunks(&self) -> Vec<PushChunkRequest> {
        self.pushed_chunks.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

impl SessionTransport for MockTransport {
    fn verify_compatibility(&self, _request: &VerifyRequest) -> TransferResult<VerifyResponse> {
        self.record("verify");
        self.verify_results.lock().pop_front().unwrap_or(Ok(VerifyResponse {
            server_version: PROTOCOL_VERSION,
        }))
    }

    fn open_session(&self) -> TransferResult<()> {
        self.record("open_session");
        Ok(())
    }

    fn close_session(&self) -> TransferResult<()> {
        self.record("close_session");
        Ok(())
    }

    fn push_schema(&self, blob: &[u8]) -> TransferResult<()> {
        self.record("push_schema");
        *self.schema.lock() = blob.to_vec();
        Ok(())
    }

    fn pull_schema(&self) -> TransferResult<Vec<u8>> {
        self.record("pull_schema");
        Ok(self.schema.lock().clone())
    }

    fn push_indexes(&self, blob: &[u8]) -> TransferResult<()> {
        self.record("push_indexes");
        *self.indexes.lock() = blob.to_vec();
        Ok(())
    }

    fn pull_indexes(&self) -> TransferResult<Vec<u8>> {
        self.record("pull_indexes");
        Ok(self.indexes.lock().clone())
    }

    fn pull_inventory(&self) -> TransferResult<InventoryResponse> {
        self.record("pull_inventory");
        self.inventory_results
            .lock()
            .pop_front()
            .unwrap_or(Ok(InventoryResponse {
                inventory: TableInventory::default(),
            }))
    }

    fn push_chunk(&self, request: &PushChunkRequest) -> TransferResult<ChunkAck> {
        self.record(format!(
            "push_chunk:{}@{}",
            request.state.table, request.state.cursor
        ));
        self.pushed_chunks.lock().push(request.clone());
        self.push_acks
            .lock()
            .pop_front()
            .unwrap_or(Ok(ChunkAck::Accepted))
    }

    fn pull_chunk(&self, request: &PullChunkRequest) -> TransferResult<PullChunkResponse> {
        self.record(format!(
            "pull_chunk:{}@{}",
            request.state.table, request.state.cursor
        ));
        self.pull_results.lock().pop_front().unwrap_or_else(|| {
            let (payload, _) = siphon_codec::encode_rows(&[]).expect("empty batch encodes");
            let digest = siphon_codec::checksum(&payload);
            Ok(PullChunkResponse {
                payload,
                checksum: digest,
                row_count: 0,
            })
        })
    }

    fn reset_sequences(&self) -> TransferResult<()> {
        self.record("reset_sequences");
        Ok(())
    }
}
