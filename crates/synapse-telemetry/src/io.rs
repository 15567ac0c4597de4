//! JSONL event log I/O and atomic config writes

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Append one record as a single line.
///
/// The line is written with one `write_all` so concurrent appenders to the
/// same log do not interleave within a record.
pub fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    ensure_parent(path)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&line)
}

/// Read every record of a JSONL log. A missing file is an empty log; blank
/// and unparsable lines (unknown event kinds included) are skipped.
pub fn read_jsonl<T: for<'de> Deserialize<'de>>(path: &Path) -> std::io::Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(record) = serde_json::from_str(&line) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Sibling scratch file: `config.json` -> `config.json.tmp`
fn scratch_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("synapse"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `data` so readers see either the old or the new
/// contents, never a torn file
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    ensure_parent(path)?;
    let scratch = scratch_path(path);
    {
        let mut file = File::create(&scratch)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    std::fs::rename(&scratch, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SynapseEvent;

    #[test]
    fn test_jsonl_append_and_read_events() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = temp.path().join("nested").join("events.jsonl");

        let events = vec![
            SynapseEvent::PredictionHit {
                category: "A+B".to_string(),
                fragment_count: 2,
            },
            SynapseEvent::PathwayUpdated {
                category: "A+B".to_string(),
                worker: "A".to_string(),
                old_strength: 0.5,
                new_strength: 0.524,
                signal: 0.3,
            },
        ];
        for event in &events {
            append_jsonl(&log, event).unwrap();
        }

        let read_back: Vec<SynapseEvent> = read_jsonl(&log).unwrap();
        assert_eq!(read_back, events);
    }

    #[test]
    fn test_read_jsonl_skips_malformed_lines() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = temp.path().join("events.jsonl");
        std::fs::write(
            &log,
            "not json\n\n{\"kind\":\"prediction_hit\",\"category\":\"X\",\"fragment_count\":1}\n",
        )
        .unwrap();

        let read_back: Vec<SynapseEvent> = read_jsonl(&log).unwrap();
        assert_eq!(read_back.len(), 1);
    }

    #[test]
    fn test_read_jsonl_missing_file_is_empty() {
        let records: Vec<SynapseEvent> =
            read_jsonl(Path::new("/nonexistent/synapse/events.jsonl")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_atomic_write() {
        let temp = tempfile::TempDir::new().unwrap();
        let target = temp.path().join("config.json");

        atomic_write(&target, b"{}").unwrap();
        atomic_write(&target, b"{\"workers\":{}}").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"{\"workers\":{}}");
        assert!(!temp.path().join("config.json.tmp").exists());
    }
}
