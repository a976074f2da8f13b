//! The in-process server facade.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler};
use siphon_protocol::{
    ChunkAck, InventoryResponse, PullChunkRequest, PullChunkResponse, PushChunkRequest,
    VerifyRequest, VerifyResponse,
};
use siphon_store::Database;
use std::sync::Arc;

/// The transfer peer.
///
/// Wraps a [`RequestHandler`] over a database and exposes one method per
/// transfer operation. The HTTP router binds these to endpoints; tests and
/// in-process transports call them directly.
pub struct SiphonServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SiphonServer {
    /// Creates a server over the given configuration and database.
    pub fn new(config: ServerConfig, db: Arc<dyn Database>) -> Self {
        let context = Arc::new(HandlerContext::new(config, db));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// The database this peer serves.
    pub fn database(&self) -> &Arc<dyn Database> {
        &self.context.db
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.context.sessions.len()
    }

    /// Handles a compatibility check.
    pub fn handle_verify(&self, request: VerifyRequest) -> ServerResult<VerifyResponse> {
        self.handler.handle_verify(request)
    }

    /// Opens a session.
    pub fn handle_open_session(&self) -> String {
        self.handler.handle_open_session()
    }

    /// Closes a session.
    pub fn handle_close_session(&self, handle: &str) -> ServerResult<()> {
        self.handler.handle_close_session(handle)
    }

    /// Applies a pushed schema blob.
    pub fn handle_push_schema(&self, handle: &str, blob: &[u8]) -> ServerResult<()> {
        self.handler.handle_push_schema(handle, blob)
    }

    /// Dumps the schema blob.
    pub fn handle_pull_schema(&self, handle: &str) -> ServerResult<Vec<u8>> {
        self.handler.handle_pull_schema(handle)
    }

    /// Applies a pushed index blob.
    pub fn handle_push_indexes(&self, handle: &str, blob: &[u8]) -> ServerResult<()> {
        self.handler.handle_push_indexes(handle, blob)
    }

    /// Dumps the index blob.
    pub fn handle_pull_indexes(&self, handle: &str) -> ServerResult<Vec<u8>> {
        self.handler.handle_pull_indexes(handle)
    }

    /// Reports the table inventory.
    pub fn handle_inventory(&self, handle: &str) -> ServerResult<InventoryResponse> {
        self.handler.handle_inventory(handle)
    }

    /// Verifies and applies one pushed chunk.
    pub fn handle_push_chunk(
        &self,
        handle: &str,
        request: PushChunkRequest,
    ) -> ServerResult<ChunkAck> {
        self.handler.handle_push_chunk(handle, request)
    }

    /// Produces one chunk for a pulling client.
    pub fn handle_pull_chunk(
        &self,
        handle: &str,
        request: PullChunkRequest,
    ) -> ServerResult<PullChunkResponse> {
        self.handler.handle_pull_chunk(handle, request)
    }

    /// Resets sequence counters from the pushed rows.
    pub fn handle_reset_sequences(&self, handle: &str) -> ServerResult<()> {
        self.handler.handle_reset_sequences(handle)
    }
}
