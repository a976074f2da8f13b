//! Error types for the server.

use siphon_codec::CodecError;
use siphon_protocol::{ProtocolError, ProtocolVersion};
use siphon_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling a transfer request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Credentials missing or wrong.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The client speaks an incompatible protocol version.
    #[error("protocol version mismatch: server speaks {server}, client sent {client}")]
    IncompatibleVersion {
        /// Version this server speaks.
        server: ProtocolVersion,
        /// Version the client presented.
        client: String,
    },

    /// The session handle is unknown, forged, or already closed.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// A pushed chunk's cursor diverged from the session's ingest cursor.
    ///
    /// Distinct from a checksum rejection: a verbatim resend cannot fix a
    /// cursor divergence, so this aborts the client's run.
    #[error("cursor mismatch for table {table}: expected {expected}, got {got}")]
    StateMismatch {
        /// Table being pushed.
        table: String,
        /// The session's ingest cursor.
        expected: u64,
        /// The cursor the client sent.
        got: u64,
    },

    /// Store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Chunk payload codec failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Protocol message codec failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ServerError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) | ServerError::Protocol(_) => 400,
            ServerError::NotAuthorized(_) => 401,
            ServerError::UnknownSession(_) => 404,
            ServerError::StateMismatch { .. } => 409,
            ServerError::IncompatibleVersion { .. } => 417,
            ServerError::Store(StoreError::NoSuchTable(_)) => 404,
            ServerError::Store(_) | ServerError::Codec(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siphon_protocol::PROTOCOL_VERSION;

    #[test]
    fn status_mapping() {
        assert_eq!(ServerError::InvalidRequest("x".into()).status(), 400);
        assert_eq!(ServerError::NotAuthorized("x".into()).status(), 401);
        assert_eq!(ServerError::UnknownSession("x".into()).status(), 404);
        assert_eq!(
            ServerError::StateMismatch {
                table: "t".into(),
                expected: 10,
                got: 5
            }
            .status(),
            409
        );
        assert_eq!(
            ServerError::IncompatibleVersion {
                server: PROTOCOL_VERSION,
                client: "9.9".into()
            }
            .status(),
            417
        );
        assert_eq!(
            ServerError::Store(StoreError::NoSuchTable("t".into())).status(),
            404
        );
    }

    #[test]
    fn state_mismatch_display() {
        let err = ServerError::StateMismatch {
            table: "users".into(),
            expected: 10,
            got: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("users"));
        assert!(msg.contains("10"));
        assert!(msg.contains("5"));
    }
}
