//! Shared test support utilities
//!
//! Provides a `RecordingSinkFactory` whose sinks capture every record in memory,
//! for use in unit and integration tests.

use crate::domain::Envelope;
use crate::error::EnvelopeError;
use crate::port::{LogRecord, LogSink, SinkFactory, SinkLevel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// One captured sink write.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkWrite {
    pub level: SinkLevel,
    pub context: String,
    pub description: String,
    pub response: Envelope,
}

#[derive(Default)]
struct Shared {
    writes: Mutex<Vec<SinkWrite>>,
    should_fail: AtomicBool,
}

/// Factory handing out sinks that share one in-memory record list.
#[derive(Clone, Default)]
pub struct RecordingSinkFactory {
    shared: Arc<Shared>,
}

impl RecordingSinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.shared.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<SinkWrite> {
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn records_at(&self, level: SinkLevel) -> Vec<SinkWrite> {
        self.records()
            .into_iter()
            .filter(|w| w.level == level)
            .collect()
    }
}

impl SinkFactory for RecordingSinkFactory {
    fn sink(&self, context: &str, level: SinkLevel) -> Result<Arc<dyn LogSink>, EnvelopeError> {
        Ok(Arc::new(RecordingSink {
            level,
            context: context.to_string(),
            shared: self.shared.clone(),
        }))
    }
}

struct RecordingSink {
    level: SinkLevel,
    context: String,
    shared: Arc<Shared>,
}

impl LogSink for RecordingSink {
    fn write(&self, record: &LogRecord<'_>) -> Result<(), EnvelopeError> {
        if self.shared.should_fail.load(Ordering::SeqCst) {
            return Err(EnvelopeError::Sink("Mock sink failure".to_string()));
        }
        let write = SinkWrite {
            level: self.level,
            context: self.context.clone(),
            description: record.description.to_string(),
            response: record.response.clone(),
        };
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(write);
        Ok(())
    }
}
