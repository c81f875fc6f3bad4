use crate::domain::Envelope;
use crate::error::EnvelopeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Sink level; one sink per level is owned by each builder.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SinkLevel {
    Info,
    Error,
    Debug,
}

impl SinkLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for SinkLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured record handed to a sink.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    pub response: &'a Envelope,
    #[serde(skip)]
    pub description: &'a str,
}

/// Leveled logging destination. Writes are fire-and-forget from the builder's
/// point of view: a failed write is reported, never propagated to the caller.
pub trait LogSink: Send + Sync {
    fn write(&self, record: &LogRecord<'_>) -> Result<(), EnvelopeError>;
}

/// Produces the sink for a context tag and level.
pub trait SinkFactory {
    fn sink(&self, context: &str, level: SinkLevel) -> Result<Arc<dyn LogSink>, EnvelopeError>;
}
