use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL log of everything a session did against the store
pub struct Transcript {
    pub path: PathBuf,
    session_id: String,
    base_url: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    base_url: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    pub fn new(path: &Path, session_id: &str, base_url: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            base_url: base_url.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            base_url: &self.base_url,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn load_ok(&mut self, loaded: usize, duplicates: &[String]) -> Result<()> {
        self.log(
            "load_ok",
            serde_json::json!({ "loaded": loaded, "duplicates": duplicates }),
        )
    }

    pub fn load_err(&mut self, error: &str) -> Result<()> {
        self.log("load_err", serde_json::json!({ "error": error }))
    }

    /// Log a committed create or update
    pub fn user_saved(&mut self, mode: &str, id: &str, username: &str) -> Result<()> {
        self.log(
            "user_saved",
            serde_json::json!({
                "mode": mode,
                "id": id,
                "username": username,
            }),
        )
    }

    pub fn save_err(&mut self, mode: &str, id: &str, error: &str) -> Result<()> {
        self.log(
            "save_err",
            serde_json::json!({
                "mode": mode,
                "id": id,
                "error": error,
            }),
        )
    }

    pub fn user_deleted(&mut self, id: &str) -> Result<()> {
        self.log("user_deleted", serde_json::json!({ "id": id }))
    }

    pub fn delete_declined(&mut self, id: &str) -> Result<()> {
        self.log("delete_declined", serde_json::json!({ "id": id }))
    }

    pub fn delete_err(&mut self, id: &str, error: &str) -> Result<()> {
        self.log(
            "delete_err",
            serde_json::json!({
                "id": id,
                "error": error,
            }),
        )
    }

    pub fn backup_written(&mut self, path: &Path, users: usize, records: usize) -> Result<()> {
        self.log(
            "backup_written",
            serde_json::json!({
                "path": path,
                "users": users,
                "records": records,
            }),
        )
    }
}
