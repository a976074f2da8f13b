//! Session registry and per-session transfer bookkeeping.

use crate::auth::SessionSigner;
use crate::error::{ServerError, ServerResult};
use parking_lot::RwLock;
use siphon_protocol::PullChunkResponse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session transfer bookkeeping.
///
/// `ingest` tracks the confirmed cursor of every table being pushed to us;
/// `serve` caches the last chunk produced for every table being pulled
/// from us, so an unmoved cursor is re-served byte-identically.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Confirmed ingest cursor per table (push direction).
    pub ingest: HashMap<String, u64>,
    /// Last served chunk per table (pull direction).
    pub serve: HashMap<String, ServedChunk>,
}

/// The last chunk served for a table, kept for verbatim re-serves.
#[derive(Debug, Clone)]
pub struct ServedChunk {
    /// Cursor the chunk was produced at.
    pub cursor: u64,
    /// Chunk size it was produced with.
    pub chunk_size: u64,
    /// The response, byte-for-byte.
    pub response: PullChunkResponse,
}

/// Issues, validates, and stores sessions.
///
/// One session corresponds to one logical transfer; the registry never
/// shares state between sessions.
pub struct SessionRegistry {
    signer: SessionSigner,
    sessions: RwLock<HashMap<u64, SessionState>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Creates a registry signing handles with the given secret.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            signer: SessionSigner::new(secret),
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Opens a session and returns its handle.
    pub fn open(&self) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sessions.write().insert(id, SessionState::default());
        self.signer.handle(id)
    }

    /// Closes a session, releasing its bookkeeping.
    pub fn close(&self, handle: &str) -> ServerResult<()> {
        let id = self.signer.validate(handle)?;
        self.sessions
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServerError::UnknownSession(handle.to_string()))
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// True when no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Runs `f` against a session's state, validating the handle first.
    pub fn with_session<R>(
        &self,
        handle: &str,
        f: impl FnOnce(&mut SessionState) -> ServerResult<R>,
    ) -> ServerResult<R> {
        let id = self.signer.validate(handle)?;
        let mut sessions = self.sessions.write();
        let state = sessions
            .get_mut(&id)
            .ok_or_else(|| ServerError::UnknownSession(handle.to_string()))?;
        f(state)
    }
}
