use thiserror::Error;

/// Errors raised while assembling or storing audit entries.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Stored CRC32 does not match the compressed payload.
    #[error("CRC32 mismatch: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("unsupported snapshot codec: {0}")]
    UnsupportedCodec(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The persistence sink rejected or failed to store an entry.
    #[error("sink error: {0}")]
    Sink(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
