//! Chunk payload encoding, compression, and integrity.
//!
//! A chunk payload is a CBOR-encoded row batch compressed with zstd. The
//! CRC32 digest travels next to the payload; [`verify_checksum`] must be
//! called on the declared digest before [`decode_rows`] touches the bytes.

use crate::error::{CodecError, CodecResult};
use crate::value::Row;

/// zstd compression level used for chunk payloads.
///
/// Level 3 favors throughput over ratio; chunk sizing already bounds the
/// uncompressed batch, so a fast level keeps production time dominated by
/// the row reads it is supposed to measure.
pub const COMPRESSION_LEVEL: i32 = 3;

/// Encodes a row batch into a compressed transport payload.
///
/// Returns the payload bytes and the row count. Encoding is deterministic
/// for a given batch, so producing the same `(cursor, chunk_size)` window
/// twice yields byte-identical payloads and checksums.
pub fn encode_rows(rows: &[Row]) -> CodecResult<(Vec<u8>, u64)> {
    let mut raw = Vec::new();
    ciborium::ser::into_writer(rows, &mut raw)
        .map_err(|e| CodecError::Serialize(e.to_string()))?;

    let payload = zstd::encode_all(raw.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| CodecError::Compress(e.to_string()))?;

    Ok((payload, rows.len() as u64))
}

/// Decodes a compressed transport payload back into a row batch.
///
/// Callers are expected to have verified the payload checksum first; this
/// function does no integrity checking of its own.
pub fn decode_rows(payload: &[u8]) -> CodecResult<Vec<Row>> {
    let raw = zstd::decode_all(payload).map_err(|e| CodecError::Decompress(e.to_string()))?;

    ciborium::de::from_reader(raw.as_slice()).map_err(|e| CodecError::Deserialize(e.to_string()))
}

/// Computes the CRC32 (IEEE) digest of a payload.
pub fn checksum(payload: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = !0u32;
    for &byte in payload {
        crc = (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}

/// Verifies a payload against its declared digest.
///
/// Returns [`CodecError::ChecksumMismatch`] if they differ. This is the
/// only gate between a received payload and row decoding.
pub fn verify_checksum(payload: &[u8], declared: u32) -> CodecResult<()> {
    let computed = checksum(payload);
    if computed != declared {
        return Err(CodecError::ChecksumMismatch { declared, computed });
    }
    Ok(())
}
