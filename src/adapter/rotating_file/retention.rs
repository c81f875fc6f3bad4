// Retention for rotated log files.
// Rotated files are named `<base>_<YYYYmmdd_HHMMSS>[_<n>].json`; the timestamp
// and the numeric suffix order them. Pruning keeps the `retain` newest
// predecessors of the current file and deletes the rest, oldest first.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A file belonging to one sink, with the creation time and suffix parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedFile {
    pub path: PathBuf,
    pub created_at: NaiveDateTime,
    pub suffix: u32,
}

impl RotatedFile {
    /// Creation time in the local zone, as written into the name.
    #[must_use]
    pub fn created_local(&self) -> Option<DateTime<Local>> {
        Local.from_local_datetime(&self.created_at).earliest()
    }
}

/// Parses `<base>_<timestamp>[_<n>].json`; anything else is not ours.
fn parse_name(base_name: &str, file_name: &str) -> Option<(NaiveDateTime, u32)> {
    let rest = file_name
        .strip_prefix(base_name)?
        .strip_prefix('_')?
        .strip_suffix(".json")?;
    let (stamp, suffix) = match rest.get(15..) {
        Some("") => (rest, 0),
        Some(tail) => (rest.get(..15)?, tail.strip_prefix('_')?.parse().ok()?),
        None => return None,
    };
    let created_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some((created_at, suffix))
}

/// All files of `base_name` in `directory`, oldest first.
pub fn rotated_files(directory: &Path, base_name: &str) -> io::Result<Vec<RotatedFile>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let Some((created_at, suffix)) = entry
            .file_name()
            .to_str()
            .and_then(|name| parse_name(base_name, name))
        else {
            continue;
        };
        if !entry.metadata()?.is_file() {
            continue;
        }
        files.push(RotatedFile {
            path: entry.path(),
            created_at,
            suffix,
        });
    }
    files.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.suffix.cmp(&b.suffix))
    });
    Ok(files)
}

/// Returns the number of files removed.
pub fn prune_rotated(
    directory: &Path,
    base_name: &str,
    current: &Path,
    retain: usize,
) -> io::Result<usize> {
    let priors: Vec<RotatedFile> = rotated_files(directory, base_name)?
        .into_iter()
        .filter(|f| f.path != current)
        .collect();

    if priors.len() <= retain {
        return Ok(0);
    }

    let excess = priors.len() - retain;
    let mut removed = 0;
    for file in priors.iter().take(excess) {
        match fs::remove_file(&file.path) {
            Ok(()) => {
                info!("Removed rotated log {:?}", file.path);
                removed += 1;
            }
            Err(e) => error!("Failed to remove {:?}: {e}", file.path),
        }
    }
    Ok(removed)
}
