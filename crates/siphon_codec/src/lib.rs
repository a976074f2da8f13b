//! # Siphon Codec
//!
//! Row batch codec for siphon.
//!
//! This crate provides:
//! - `Value` and `Row`, the relational scalar model shared by every layer
//! - `encode_rows`/`decode_rows`: CBOR serialization + zstd compression
//! - `checksum`/`verify_checksum`: CRC32 payload integrity
//!
//! The checksum catches transport corruption, not adversarial tampering.
//! Verification always happens before any decode work, so a corrupted
//! payload can never produce partially decoded rows.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod chunk;
mod error;
mod value;

pub use chunk::{checksum, decode_rows, encode_rows, verify_checksum, COMPRESSION_LEVEL};
pub use error::{CodecError, CodecResult};
pub use value::{Row, Value};
