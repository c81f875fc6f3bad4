use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Code is missing or not a number: got {0}")]
    InvalidCodeType(String),

    #[error("Provided code is invalid: {0}")]
    UnknownStatusCode(String),

    #[error("Log directory {path:?} is not usable: {source}")]
    LogDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl EnvelopeError {
    /// True for the two validation kinds raised by `make`/`forward`.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidCodeType(_) | Self::UnknownStatusCode(_))
    }
}
