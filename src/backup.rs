//! JSON backup export of users and time records.

use crate::user::{TimeRecord, User};
use anyhow::{anyhow, Context as _, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct Backup<'a> {
    users: &'a [User],
    records: &'a [TimeRecord],
}

/// Default file name for a backup taken on `date`
pub fn default_filename(date: NaiveDate) -> String {
    format!("staffdesk-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Resolve where a backup goes: an explicit path wins, otherwise the
/// default file name inside `dir` (or the working directory).
pub fn resolve_path(explicit: Option<&Path>, dir: Option<&Path>, date: NaiveDate) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => dir
            .unwrap_or_else(|| Path::new("."))
            .join(default_filename(date)),
    }
}

/// Read time records from a JSON array file. A missing file yields no records.
pub fn load_records(path: &Path) -> Result<Vec<TimeRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse records {}", path.display()))?;
    match value {
        serde_json::Value::Array(records) => Ok(records),
        _ => Err(anyhow!(
            "Records file {} must contain a JSON array",
            path.display()
        )),
    }
}

/// Write `{ users, records }` to `path`, creating parent directories.
/// Returns the number of bytes written.
pub fn write_backup(path: &Path, users: &[User], records: &[TimeRecord]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let content = serde_json::to_string_pretty(&Backup { users, records })?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write backup {}", path.display()))?;
    Ok(content.len())
}
