//! Error types for the codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding a chunk payload.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Row batch could not be serialized to CBOR.
    #[error("serialize error: {0}")]
    Serialize(String),

    /// Payload could not be deserialized from CBOR.
    #[error("deserialize error: {0}")]
    Deserialize(String),

    /// Compression failed.
    #[error("compression error: {0}")]
    Compress(String),

    /// Decompression failed.
    #[error("decompression error: {0}")]
    Decompress(String),

    /// Payload checksum did not match the declared digest.
    ///
    /// Raised before any decompression or decode work.
    #[error("checksum mismatch: declared {declared:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Digest transmitted alongside the payload.
        declared: u32,
        /// Digest computed over the received payload.
        computed: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_mismatch_display() {
        let err = CodecError::ChecksumMismatch {
            declared: 0xDEAD_BEEF,
            computed: 0x0BAD_F00D,
        };
        let msg = err.to_string();
        assert!(msg.contains("0xdeadbeef"));
        assert!(msg.contains("0x0badf00d"));
    }
}
