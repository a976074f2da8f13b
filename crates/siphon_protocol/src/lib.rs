//! # Siphon Protocol
//!
//! Wire types and CBOR codecs for the siphon transfer protocol.
//!
//! This crate provides:
//! - [`TransferState`], the serializable per-table resume unit
//! - [`ProtocolVersion`] and the compatibility rule
//! - Request/response messages for every transfer operation
//! - [`to_cbor`]/[`from_cbor`] message codecs
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod messages;
mod state;
mod version;

pub use messages::{
    ChunkAck, InventoryResponse, PullChunkRequest, PullChunkResponse, PushChunkRequest,
    TableInventory, VerifyRequest, VerifyResponse,
};
pub use state::TransferState;
pub use version::{ProtocolVersion, PROTOCOL_VERSION};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Result type for protocol message codecs.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors from encoding or decoding protocol messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Message could not be encoded to CBOR.
    #[error("encode error: {0}")]
    Encode(String),

    /// Message could not be decoded from CBOR.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Encodes a protocol message to CBOR bytes.
pub fn to_cbor<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(message, &mut buf)
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decodes a protocol message from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
}
