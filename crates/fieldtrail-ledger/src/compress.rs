//! Snapshot compression.
//!
//! Whole-document snapshots can be large, so entries may carry them
//! compressed. The payload is the canonical JSON text of the snapshot,
//! compressed by a [`Compressor`] and guarded by a CRC32 of the compressed
//! bytes.

use fieldtrail_types::Value;
use tracing::debug;

use crate::entry::CompressedSnapshot;
use crate::error::{LedgerError, LedgerResult};

/// Default zstd compression level.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Byte-level compression collaborator.
pub trait Compressor: Send + Sync {
    /// Codec name recorded next to compressed payloads.
    fn codec(&self) -> &str;

    fn compress(&self, data: &[u8]) -> LedgerResult<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> LedgerResult<Vec<u8>>;
}

/// zstd-backed [`Compressor`].
#[derive(Clone, Copy, Debug)]
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_ZSTD_LEVEL)
    }
}

impl Compressor for ZstdCompressor {
    fn codec(&self) -> &str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> LedgerResult<Vec<u8>> {
        zstd::encode_all(data, self.level)
            .map_err(|e| LedgerError::CompressionFailed(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> LedgerResult<Vec<u8>> {
        zstd::decode_all(data).map_err(|e| LedgerError::DecompressionFailed(e.to_string()))
    }
}

/// Serialize `snapshot` canonically and compress it.
pub fn compress_snapshot(
    snapshot: &Value,
    compressor: &dyn Compressor,
) -> LedgerResult<CompressedSnapshot> {
    let json = snapshot.to_canonical_json()?;
    let data = compressor.compress(json.as_bytes())?;
    let crc32 = crc32fast::hash(&data);
    debug!(
        codec = compressor.codec(),
        raw = json.len(),
        compressed = data.len(),
        "compressed snapshot"
    );
    Ok(CompressedSnapshot {
        codec: compressor.codec().to_string(),
        data,
        crc32,
    })
}

/// Verify, decompress and parse a compressed snapshot.
///
/// Dates come back as their ISO-8601 strings.
pub fn decompress_snapshot(
    snapshot: &CompressedSnapshot,
    compressor: &dyn Compressor,
) -> LedgerResult<Value> {
    if snapshot.codec != compressor.codec() {
        return Err(LedgerError::UnsupportedCodec(snapshot.codec.clone()));
    }
    let computed = crc32fast::hash(&snapshot.data);
    if computed != snapshot.crc32 {
        return Err(LedgerError::ChecksumMismatch {
            expected: snapshot.crc32,
            computed,
        });
    }
    let raw = compressor.decompress(&snapshot.data)?;
    Ok(serde_json::from_slice(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        Value::from(json!({
            "name": "Widget",
            "tags": ["a", "b"],
            "dims": {"w": 10, "h": 2.5}
        }))
    }

    #[test]
    fn zstd_round_trip() {
        let zstd = ZstdCompressor::default();
        let packed = compress_snapshot(&sample(), &zstd).unwrap();
        assert_eq!(packed.codec, "zstd");
        assert_eq!(packed.crc32, crc32fast::hash(&packed.data));
        assert_eq!(decompress_snapshot(&packed, &zstd).unwrap(), sample());
    }

    #[test]
    fn repetitive_payload_shrinks() {
        let big = Value::from(json!({"body": "x".repeat(10_000)}));
        let packed = compress_snapshot(&big, &ZstdCompressor::new(9)).unwrap();
        assert!(packed.data.len() < 1_000);
    }

    #[test]
    fn corrupted_payload_fails_crc() {
        let zstd = ZstdCompressor::default();
        let mut packed = compress_snapshot(&sample(), &zstd).unwrap();
        let last = packed.data.len() - 1;
        packed.data[last] ^= 0xFF;
        let err = decompress_snapshot(&packed, &zstd).unwrap_err();
        assert!(matches!(err, LedgerError::ChecksumMismatch { .. }));
    }

    #[test]
    fn codec_mismatch_is_rejected() {
        let zstd = ZstdCompressor::default();
        let mut packed = compress_snapshot(&sample(), &zstd).unwrap();
        packed.codec = "gzip".into();
        let err = decompress_snapshot(&packed, &zstd).unwrap_err();
        assert!(matches!(err, LedgerError::UnsupportedCodec(c) if c == "gzip"));
    }
}
