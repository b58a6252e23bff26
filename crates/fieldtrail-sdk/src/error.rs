use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Config(#[from] fieldtrail_types::ConfigError),

    #[error("ledger error: {0}")]
    Ledger(#[from] fieldtrail_ledger::LedgerError),

    #[error("failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    /// The document has no usable value at the configured id path.
    #[error("document has no subject id at {path}")]
    MissingSubjectId { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
