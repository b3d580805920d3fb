//! Durable session records: one CSV row per participant.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use diner_common::{RECORD_COLUMNS, Session};
use fs2::FileExt;
use tracing::{debug, info};

use crate::errors::RecordError;

/// Destination for finished sessions.
pub trait RecordSink: Send {
    fn file_exists(&self, path: &Path) -> bool;

    /// Write the column header. A no-op when the file already has content.
    fn write_header(&mut self, path: &Path, columns: &[&str]) -> Result<(), RecordError>;

    fn append_row(&mut self, path: &Path, values: &[String]) -> Result<(), RecordError>;
}

/// Append `session` to `path`, writing the header first for a new file.
pub fn write_session(
    sink: &mut dyn RecordSink,
    path: &Path,
    session: &Session,
) -> Result<(), RecordError> {
    if !sink.file_exists(path) {
        sink.write_header(path, &RECORD_COLUMNS)?;
    }
    sink.append_row(path, &session.record_fields())?;
    info!(path = %path.display(), participant = %session.participant_id, "Session record written");
    Ok(())
}

/// CSV file writer. Appends hold an exclusive file lock.
#[derive(Debug, Default)]
pub struct CsvRecordWriter;

impl CsvRecordWriter {
    pub fn new() -> Self {
        Self
    }

    fn append_line(path: &Path, line: &str) -> Result<(), RecordError> {
        let io_err = |source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        file.lock_exclusive().map_err(io_err)?;
        let written = writeln!(file, "{}", line).and_then(|_| file.flush());
        let unlocked = FileExt::unlock(&file);
        written.map_err(io_err)?;
        unlocked.map_err(io_err)
    }
}

impl RecordSink for CsvRecordWriter {
    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write_header(&mut self, path: &Path, columns: &[&str]) -> Result<(), RecordError> {
        let has_content = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
        if has_content {
            debug!(path = %path.display(), "Record header already present");
            return Ok(());
        }
        let line = columns
            .iter()
            .map(|c| escape_field(c))
            .collect::<Vec<_>>()
            .join(",");
        Self::append_line(path, &line)
    }

    fn append_row(&mut self, path: &Path, values: &[String]) -> Result<(), RecordError> {
        let line = values
            .iter()
            .map(|v| escape_field(v))
            .collect::<Vec<_>>()
            .join(",");
        Self::append_line(path, &line)
    }
}

/// In-memory sink, useful for hosts that persist elsewhere and for tests.
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    pub files: Vec<(PathBuf, Vec<String>)>,
}

impl MemoryRecordSink {
    pub fn lines(&self, path: &Path) -> Vec<String> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, lines)| lines.clone())
            .unwrap_or_default()
    }

    fn push(&mut self, path: &Path, line: String) {
        match self.files.iter_mut().find(|(p, _)| p == path) {
            Some((_, lines)) => lines.push(line),
            None => self.files.push((path.to_path_buf(), vec![line])),
        }
    }
}

impl RecordSink for MemoryRecordSink {
    fn file_exists(&self, path: &Path) -> bool {
        self.files.iter().any(|(p, _)| p == path)
    }

    fn write_header(&mut self, path: &Path, columns: &[&str]) -> Result<(), RecordError> {
        if !self.file_exists(path) {
            self.push(path, columns.join(","));
        }
        Ok(())
    }

    fn append_row(&mut self, path: &Path, values: &[String]) -> Result<(), RecordError> {
        let line = values
            .iter()
            .map(|v| escape_field(v))
            .collect::<Vec<_>>()
            .join(",");
        self.push(path, line);
        Ok(())
    }
}

/// Quote a field containing a comma, quote or line break; double inner quotes.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
