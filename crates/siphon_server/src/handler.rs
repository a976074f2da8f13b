//! Request handlers for transfer operations.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::session::{ServedChunk, SessionRegistry};
use siphon_codec::{checksum, decode_rows, encode_rows};
use siphon_protocol::{
    ChunkAck, InventoryResponse, PullChunkRequest, PullChunkResponse, PushChunkRequest,
    TableInventory, VerifyRequest, VerifyResponse,
};
use siphon_store::Database;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// The database this peer reads from and writes to.
    pub db: Arc<dyn Database>,
    /// Open sessions.
    pub sessions: SessionRegistry,
}

impl HandlerContext {
    /// Creates a context.
    pub fn new(config: ServerConfig, db: Arc<dyn Database>) -> Self {
        let sessions = SessionRegistry::new(config.session_secret.clone());
        Self {
            config,
            db,
            sessions,
        }
    }
}

/// Handler for transfer requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a handler over the given context.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a compatibility check.
    ///
    /// Credentials are checked before the version so a probe without the
    /// secret learns nothing about what this peer speaks.
    pub fn handle_verify(&self, request: VerifyRequest) -> ServerResult<VerifyResponse> {
        if let Some(expected) = &self.context.config.credentials {
            if request.credentials.as_deref() != Some(expected.as_str()) {
                return Err(ServerError::NotAuthorized("bad credentials".into()));
            }
        }

        let server_version = self.context.config.version;
        if !server_version.compatible_with(&request.version) {
            return Err(ServerError::IncompatibleVersion {
                server: server_version,
                client: request.version.to_string(),
            });
        }

        Ok(VerifyResponse { server_version })
    }

    /// Opens a session, returning its handle.
    pub fn handle_open_session(&self) -> String {
        let handle = self.context.sessions.open();
        debug!(sessions = self.context.sessions.len(), "session opened");
        handle
    }

    /// Closes a session.
    pub fn handle_close_session(&self, handle: &str) -> ServerResult<()> {
        self.context.sessions.close(handle)
    }

    /// Applies a pushed schema blob.
    pub fn handle_push_schema(&self, handle: &str, blob: &[u8]) -> ServerResult<()> {
        self.context.sessions.with_session(handle, |_| Ok(()))?;
        self.context.db.apply_schema(blob)?;
        Ok(())
    }

    /// Dumps the schema blob.
    pub fn handle_pull_schema(&self, handle: &str) -> ServerResult<Vec<u8>> {
        self.context.sessions.with_session(handle, |_| Ok(()))?;
        Ok(self.context.db.dump_schema()?)
    }

    /// Applies a pushed index blob.
    pub fn handle_push_indexes(&self, handle: &str, blob: &[u8]) -> ServerResult<()> {
        self.context.sessions.with_session(handle, |_| Ok(()))?;
        self.context.db.apply_indexes(blob)?;
        Ok(())
    }

    /// Dumps the index blob.
    pub fn handle_pull_indexes(&self, handle: &str) -> ServerResult<Vec<u8>> {
        self.context.sessions.with_session(handle, |_| Ok(()))?;
        Ok(self.context.db.dump_indexes()?)
    }

    /// Reports the table inventory.
    pub fn handle_inventory(&self, handle: &str) -> ServerResult<InventoryResponse> {
        self.context.sessions.with_session(handle, |_| Ok(()))?;
        let inventory = TableInventory::from_pairs(self.context.db.inventory()?);
        Ok(InventoryResponse { inventory })
    }

    /// Verifies and applies one pushed chunk.
    ///
    /// The declared checksum is verified before anything is decoded or
    /// written; a mismatch answers [`ChunkAck::ChecksumMismatch`] with no
    /// state advanced, and the client resends the identical chunk.
    pub fn handle_push_chunk(
        &self,
        handle: &str,
        request: PushChunkRequest,
    ) -> ServerResult<ChunkAck> {
        if request.payload.len() > self.context.config.max_payload_bytes {
            return Err(ServerError::InvalidRequest(format!(
                "chunk payload of {} bytes exceeds the {} byte limit",
                request.payload.len(),
                self.context.config.max_payload_bytes
            )));
        }

        let table = request.state.table.clone();
        let expected = self.context.sessions.with_session(handle, |state| {
            Ok(*state.ingest.entry(table.clone()).or_insert(0))
        })?;

        if request.state.cursor != expected {
            return Err(ServerError::StateMismatch {
                table,
                expected,
                got: request.state.cursor,
            });
        }

        // Verification precedes mutation.
        let computed = checksum(&request.payload);
        if computed != request.checksum {
            warn!(
                table = %table,
                cursor = request.state.cursor,
                declared = request.checksum,
                computed,
                "rejecting corrupted chunk"
            );
            return Ok(ChunkAck::ChecksumMismatch);
        }

        let rows = decode_rows(&request.payload)?;
        self.context.db.append_rows(&table, &rows)?;

        let applied = rows.len() as u64;
        self.context.sessions.with_session(handle, |state| {
            if let Some(cursor) = state.ingest.get_mut(&table) {
                *cursor += applied;
            }
            Ok(())
        })?;

        debug!(table = %table, rows = applied, "chunk applied");
        Ok(ChunkAck::Accepted)
    }

    /// Produces one chunk for a pulling client.
    ///
    /// Production at a given `(cursor, chunk_size)` is a pure function of
    /// the table, and the last served chunk is cached so a re-request for
    /// an unmoved cursor (the client detected corruption) gets identical
    /// bytes back.
    pub fn handle_pull_chunk(
        &self,
        handle: &str,
        request: PullChunkRequest,
    ) -> ServerResult<PullChunkResponse> {
        let table = request.state.table.clone();
        let cursor = request.state.cursor;
        let chunk_size = request.state.chunk_size.max(1);

        let cached = self.context.sessions.with_session(handle, |state| {
            Ok(state.serve.get(&table).and_then(|served| {
                (served.cursor == cursor && served.chunk_size == chunk_size)
                    .then(|| served.response.clone())
            }))
        })?;
        if let Some(response) = cached {
            debug!(table = %table, cursor, "re-serving cached chunk");
            return Ok(response);
        }

        let rows = self.context.db.read_rows(&table, cursor, chunk_size)?;
        let (payload, row_count) = encode_rows(&rows)?;
        let digest = checksum(&payload);
        let response = PullChunkResponse {
            payload,
            checksum: digest,
            row_count,
        };

        self.context.sessions.with_session(handle, |state| {
            state.serve.insert(
                table.clone(),
                ServedChunk {
                    cursor,
                    chunk_size,
                    response: response.clone(),
                },
            );
            Ok(())
        })?;

        Ok(response)
    }

    /// Resets the database's sequence counters from the pushed rows.
    pub fn handle_reset_sequences(&self, handle: &str) -> ServerResult<()> {
        self.context.sessions.with_session(handle, |_| Ok(()))?;
        let reset = self.context.db.reset_sequences()?;
        debug!(tables = reset.len(), "sequences reset");
        Ok(())
    }
}
