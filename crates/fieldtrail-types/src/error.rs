use thiserror::Error;

/// Errors raised while loading or validating a tracking configuration.
///
/// `at` fields name the offending node, either by its dotted `path` or, when
/// the path itself is missing, by its position (`fields[2].children[0]`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("field spec list must be an array, found {found}")]
    NotAList { found: String },

    #[error("field spec at {at} must be an object")]
    NotAnObject { at: String },

    #[error("field spec at {at} has a missing or empty path")]
    MissingPath { at: String },

    #[error("unknown array kind {kind:?} for field {at}")]
    UnknownArrayKind { at: String, kind: String },

    #[error("keyed array {at} requires a non-empty string array_key")]
    MissingArrayKey { at: String },

    #[error("array_key is only valid for keyed arrays, field {at} is {kind}")]
    UnexpectedArrayKey { at: String, kind: String },

    #[error("value_field of {at} must be a string")]
    InvalidValueField { at: String },

    #[error("mask of {at} must be a string literal")]
    InvalidMask { at: String },

    #[error("context of {at} must be a list of paths or an object with document/item path lists")]
    InvalidContextRule { at: String },

    #[error("children of {at} must be a list")]
    InvalidChildren { at: String },

    #[error("invalid option {name}: {reason}")]
    InvalidOption { name: String, reason: String },
}

/// Result alias for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;
