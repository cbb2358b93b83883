//! # journal — decision log on disk
//!
//! One JSON object per line (JSONL). Older deployments wrote a single JSON
//! array; [`load`] still reads that layout and [`compact`] rewrites it as JSONL.
//!
//! Records are kept as raw `serde_json::Value`; normalization happens in
//! [`crate::engine::history`].
//!
//! [`load`] never touches the file. Only the process that [`append`]s may
//! [`compact`] it.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ContextError, Result};

/// Records retained from the journal unless configured otherwise.
pub const DEFAULT_MAX_HISTORY: usize = 300;

fn last_n(mut records: Vec<Value>, limit: usize) -> Vec<Value> {
    let start = records.len().saturating_sub(limit);
    records.drain(..start);
    records
}

/// Every readable record. A missing file is an empty journal.
///
/// Blank lines, malformed lines and entries that are not JSON objects are
/// skipped.
fn read_all(path: &Path) -> Result<Vec<Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no journal yet");
            return Ok(Vec::new());
        }
        Err(e) => return Err(ContextError::io(path, e)),
    };

    let records: Vec<Value> = if text.trim_start().starts_with('[') {
        let data: Vec<Value> =
            serde_json::from_str(&text).map_err(|e| ContextError::json(path, e))?;
        data.into_iter().filter(Value::is_object).collect()
    } else {
        let mut skipped = 0usize;
        let records: Vec<Value> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str::<Value>(line) {
                Ok(v) if v.is_object() => Some(v),
                _ => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "malformed journal lines ignored");
        }
        records
    };

    Ok(records)
}

/// Load the last `limit` records.
pub fn load(path: &Path, limit: usize) -> Result<Vec<Value>> {
    Ok(last_n(read_all(path)?, limit))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| ContextError::io(dir, e))
        }
        _ => Ok(()),
    }
}

/// Append one record as a JSON line.
pub fn append(path: &Path, record: &Value) -> Result<()> {
    ensure_parent(path)?;
    let line = serde_json::to_string(record).map_err(|e| ContextError::json(path, e))?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ContextError::io(path, e))?;
    writeln!(file, "{line}").map_err(|e| ContextError::io(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Rewrite the journal with exactly `records`, through `<file>.tmp` and a rename.
pub fn compact(path: &Path, records: &[Value]) -> Result<()> {
    ensure_parent(path)?;
    let mut body = String::new();
    for record in records {
        let line = serde_json::to_string(record).map_err(|e| ContextError::json(path, e))?;
        body.push_str(&line);
        body.push('\n');
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, body).map_err(|e| ContextError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ContextError::io(path, e))?;

    debug!(path = %path.display(), records = records.len(), "journal compacted");
    Ok(())
}
