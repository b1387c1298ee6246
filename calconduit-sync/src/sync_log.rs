//! Append-only sync log: one JSON object per line, one line per attempt.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use calconduit_core::paths;

use crate::error::{io_err, SyncError};
use crate::report::SyncRecord;

/// Receives exactly one record per sync attempt.
pub trait SyncLog {
    fn record(&mut self, record: &SyncRecord) -> Result<(), SyncError>;
}

/// JSON-lines file sink, opened in append mode for every record.
#[derive(Debug, Clone)]
pub struct JsonlSyncLog {
    path: PathBuf,
}

impl JsonlSyncLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<home>/.calconduit/logs/sync.log`
    pub fn at_home(home: &Path) -> Self {
        Self::new(paths::sync_log_path(home))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SyncLog for JsonlSyncLog {
    fn record(&mut self, record: &SyncRecord) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_err(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySyncLog {
    pub records: Vec<SyncRecord>,
}

impl MemorySyncLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncLog for MemorySyncLog {
    fn record(&mut self, record: &SyncRecord) -> Result<(), SyncError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Read every record from a sync log. Missing file → empty; blank lines skipped.
pub fn read_records(path: &Path) -> Result<Vec<SyncRecord>, SyncError> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let file = std::fs::File::open(path).map_err(|e| io_err(path, e))?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| io_err(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::report::Classification;

    fn record(webname: &str) -> SyncRecord {
        SyncRecord {
            timestamp: Utc::now(),
            name: webname.to_uppercase(),
            webname: webname.to_string(),
            url: format!("https://src/{webname}.ics"),
            delta: false,
            classification: Classification::Information,
            bytes: Some(42),
            events: Some(1),
            status: Some(200),
            code: Some("120".into()),
            description: Some("ok".into()),
            level: Some("Information".into()),
            endpoint: None,
            error: None,
        }
    }

    #[test]
    fn jsonl_log_appends_one_line_per_record() {
        let home = TempDir::new().expect("home");
        let mut log = JsonlSyncLog::at_home(home.path());
        log.record(&record("a")).expect("a");
        log.record(&record("b")).expect("b");

        let contents = std::fs::read_to_string(log.path()).expect("read");
        assert_eq!(contents.lines().count(), 2);

        let records = read_records(log.path()).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].webname, "a");
        assert_eq!(records[1].webname, "b");
    }

    #[test]
    fn jsonl_log_never_truncates_existing_content() {
        let home = TempDir::new().expect("home");
        let mut first = JsonlSyncLog::at_home(home.path());
        first.record(&record("a")).expect("a");
        let mut second = JsonlSyncLog::at_home(home.path());
        second.record(&record("b")).expect("b");
        assert_eq!(read_records(second.path()).expect("records").len(), 2);
    }

    #[test]
    fn read_records_of_missing_file_is_empty() {
        let home = TempDir::new().expect("home");
        assert!(read_records(&home.path().join("none.log")).expect("read").is_empty());
    }
}
