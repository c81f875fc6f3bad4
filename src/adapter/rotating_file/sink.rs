// Append envelope records to JSON-lines files with period based rotation.
// Each write appends one ND-JSON line. When the current file is older than the
// policy period a new file with a timestamp suffix is opened first, and files
// beyond the retention count are pruned oldest first. Opening a sink resumes
// the newest file of the same base while it is still within the period.

use super::RotationPolicy;
use super::retention::{TIMESTAMP_FORMAT, prune_rotated, rotated_files};
use crate::domain::Envelope;
use crate::error::EnvelopeError;
use crate::port::{LogRecord, LogSink, SinkLevel};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

type Mirror = Box<dyn Write + Send>;

struct Inner {
    file: File,
    path: PathBuf,
    created_at: DateTime<Local>,
    mirror: Option<Mirror>,
}

#[derive(Serialize)]
struct LineRecord<'a> {
    time: String,
    level: &'static str,
    context: &'a str,
    msg: &'a str,
    response: &'a Envelope,
}

pub struct RotatingFileSink {
    directory: PathBuf,
    base_name: String,
    context: String,
    level: SinkLevel,
    policy: RotationPolicy,
    inner: Mutex<Option<Inner>>,
}

impl RotatingFileSink {
    /// Open a sink writing `<base>_<timestamp>.json` files under `directory`.
    /// Mirrors to stdout when the policy asks for it.
    pub fn open(
        directory: impl Into<PathBuf>,
        context: &str,
        level: SinkLevel,
        policy: RotationPolicy,
    ) -> Result<Self, EnvelopeError> {
        let mirror: Option<Mirror> = if policy.mirror_stdout {
            Some(Box::new(io::stdout()))
        } else {
            None
        };
        Self::open_with_mirror(directory, context, level, policy, mirror)
    }

    /// Same as [`RotatingFileSink::open`] but mirrors lines into `mirror` instead of stdout.
    pub fn open_with_mirror(
        directory: impl Into<PathBuf>,
        context: &str,
        level: SinkLevel,
        policy: RotationPolicy,
        mirror: Option<Mirror>,
    ) -> Result<Self, EnvelopeError> {
        let directory = directory.into();
        let base_name = base_name(context, level);
        let (file, path, created_at) = resume_or_open(&directory, &base_name, policy.period)?;

        let sink = Self {
            directory,
            base_name,
            context: context.to_string(),
            level,
            policy,
            inner: Mutex::new(Some(Inner {
                file,
                path: path.clone(),
                created_at,
                mirror,
            })),
        };
        sink.prune(&path);
        Ok(sink)
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Path of the file currently being appended to.
    #[must_use]
    pub fn current_path(&self) -> Option<PathBuf> {
        self.inner
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|inner| inner.path.clone()))
    }

    fn rotate_if_needed(&self, inner: &mut Inner) -> Result<(), EnvelopeError> {
        if Local::now() - inner.created_at < self.policy.period {
            return Ok(());
        }

        inner.file.flush()?;
        inner.file.sync_data()?;

        let (file, path) = open_new_log_file(&self.directory, &self.base_name)?;
        inner.file = file;
        inner.path = path;
        inner.created_at = Local::now();

        self.prune(&inner.path);
        Ok(())
    }

    fn prune(&self, current: &Path) {
        if let Some(retain) = self.policy.retain {
            if let Err(e) = prune_rotated(&self.directory, &self.base_name, current, retain) {
                warn!("Failed to prune rotated {} logs: {e}", self.base_name);
            }
        }
    }

    fn write_line(&self, line: &str) -> Result<(), EnvelopeError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| EnvelopeError::Sink("sink lock poisoned".into()))?;
        let inner = guard
            .as_mut()
            .ok_or_else(|| EnvelopeError::Sink("sink closed".into()))?;

        self.rotate_if_needed(inner)?;

        inner.file.write_all(line.as_bytes())?;
        inner.file.write_all(b"\n")?;
        inner.file.flush()?;

        if let Some(mirror) = inner.mirror.as_mut() {
            mirror.write_all(line.as_bytes())?;
            mirror.write_all(b"\n")?;
            mirror.flush()?;
        }
        Ok(())
    }
}

impl LogSink for RotatingFileSink {
    fn write(&self, record: &LogRecord<'_>) -> Result<(), EnvelopeError> {
        let line = serde_json::to_string(&LineRecord {
            time: Utc::now().to_rfc3339(),
            level: self.level.as_str(),
            context: &self.context,
            msg: record.description,
            response: record.response,
        })?;
        self.write_line(&line)
    }
}

/// `<context>-<level>`, with anything outside `[A-Za-z0-9_-]` replaced.
fn base_name(context: &str, level: SinkLevel) -> String {
    let stem: String = if context.is_empty() {
        "response".to_string()
    } else {
        context
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!("{stem}-{level}")
}

/// Appends to the newest `<base>_*.json` while it is younger than `period`,
/// otherwise starts a new file.
fn resume_or_open(
    dir: &Path,
    base_name: &str,
    period: chrono::Duration,
) -> Result<(File, PathBuf, DateTime<Local>), EnvelopeError> {
    let newest = rotated_files(dir, base_name)?.pop();
    if let Some(newest) = newest {
        if let Some(created_at) = newest.created_local() {
            if Local::now() - created_at < period {
                let file = OpenOptions::new().append(true).open(&newest.path)?;
                return Ok((file, newest.path, created_at));
            }
        }
    }

    let (file, path) = open_new_log_file(dir, base_name)?;
    Ok((file, path, Local::now()))
}

fn open_new_log_file(dir: &Path, base_name: &str) -> Result<(File, PathBuf), EnvelopeError> {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT);
    let mut suffix = 0u32;
    loop {
        let filename = if suffix == 0 {
            format!("{base_name}_{timestamp}.json")
        } else {
            format!("{base_name}_{timestamp}_{suffix}.json")
        };
        let full_path = dir.join(filename);

        match OpenOptions::new()
            .write(true)
            .append(true)
            .create_new(true)
            .open(&full_path)
        {
            Ok(file) => return Ok((file, full_path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
