#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod app;
pub mod builder;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use builder::ResponseBuilder;
pub use config::BuilderConfig;
pub use domain::{Envelope, HttpSummary, SeverityTier, StatusDescriptor};
pub use error::EnvelopeError;
pub use port::{LogRecord, LogSink, SinkFactory, SinkLevel};
