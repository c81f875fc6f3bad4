pub mod retention;
pub mod sink;

pub use sink::RotatingFileSink;

use crate::error::EnvelopeError;
use crate::port::{LogSink, SinkFactory, SinkLevel};
use chrono::Duration as ChronoDuration;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// When a file sink starts a new file and how many old ones it keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub period: ChronoDuration,
    /// Prior files kept after rotation; `None` keeps all of them.
    pub retain: Option<usize>,
    pub mirror_stdout: bool,
}

impl RotationPolicy {
    /// info: 2 days / 1 kept. error: 1 week / 2 kept, mirrored to stdout. debug: 4 hours / all kept.
    #[must_use]
    pub fn for_level(level: SinkLevel) -> Self {
        match level {
            SinkLevel::Info => Self {
                period: ChronoDuration::days(2),
                retain: Some(1),
                mirror_stdout: false,
            },
            SinkLevel::Error => Self {
                period: ChronoDuration::weeks(1),
                retain: Some(2),
                mirror_stdout: true,
            },
            SinkLevel::Debug => Self {
                period: ChronoDuration::hours(4),
                retain: None,
                mirror_stdout: false,
            },
        }
    }
}

/// Default sink factory: one rotating JSON-lines file set per context and level.
#[derive(Debug, Clone)]
pub struct FileSinkFactory {
    directory: PathBuf,
}

impl FileSinkFactory {
    /// Creates `directory` when it is missing.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, EnvelopeError> {
        let directory = directory.into();
        ensure_log_dir(&directory)?;
        Ok(Self { directory })
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl SinkFactory for FileSinkFactory {
    fn sink(&self, context: &str, level: SinkLevel) -> Result<Arc<dyn LogSink>, EnvelopeError> {
        let sink = RotatingFileSink::open(
            &self.directory,
            context,
            level,
            RotationPolicy::for_level(level),
        )?;
        Ok(Arc::new(sink))
    }
}

/// Makes sure `path` is an existing, writable directory.
pub fn ensure_log_dir(path: &Path) -> Result<(), EnvelopeError> {
    let fail = |source: io::Error| EnvelopeError::LogDirectory {
        path: path.to_path_buf(),
        source,
    };

    if !path.exists() {
        fs::create_dir_all(path).map_err(fail)?;
    }

    let metadata = fs::metadata(path).map_err(fail)?;
    if !metadata.is_dir() {
        return Err(fail(io::Error::new(
            io::ErrorKind::NotADirectory,
            "log path is not a directory",
        )));
    }
    if metadata.permissions().readonly() {
        return Err(fail(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "log directory is read-only",
        )));
    }
    Ok(())
}
