//! Error types for the core domain.

use thiserror::Error;

/// Request validation failure. Always a client-input error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("archive is {size} bytes, exceeding the {max} byte limit")]
    ArchiveTooLarge { size: u64, max: u64 },
}

/// Archive extraction failure. Always a client-input error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("archive is {size} bytes, exceeding the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    #[error("unsafe path in archive: {0}")]
    UnsafePath(String),

    #[error("archive exceeds extraction limits: {0}")]
    LimitExceeded(String),

    #[error("archive contains no uploadable files")]
    Empty,
}
