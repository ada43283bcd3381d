use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::RawAlert;
use crate::reader::forward::ForwardReader;
use crate::reader::reverse::ReverseReader;

pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Handle on an append-only NDJSON alert log.
///
/// Each read call reopens the file, so a reader always sees whatever is at
/// the path at call time. The path is validated once at construction.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    chunk_size: usize,
}

/// Bounds applied while streaming: an optional time window over each
/// record's parsed timestamp and an optional maximum record count.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub max: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

impl LogFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("alerts file not found: {}", path.display()),
            ));
        }
        if !path.is_file() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("path is not a regular file: {}", path.display()),
            ));
        }

        Ok(LogFile {
            path,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream records in file order.
    pub fn forward(&self, options: ReadOptions) -> Result<ForwardReader> {
        let file = File::open(&self.path)?;
        Ok(ForwardReader::new(BufReader::new(file), options))
    }

    /// Stream records newest-first via a chunked reverse scan.
    ///
    /// Assumes the file is timestamp-ascending: once a record older than
    /// `options.start` is seen, the stream stops. Out-of-order input can
    /// therefore lose in-window records past the first old one.
    pub fn reverse(&self, options: ReadOptions) -> Result<ReverseReader> {
        let file = File::open(&self.path)?;
        ReverseReader::new(file, self.chunk_size, options)
    }

    /// Count records passing the given bounds. Thin wrapper over forward
    /// streaming.
    pub fn count(&self, options: ReadOptions) -> Result<usize> {
        let mut n = 0;
        for record in self.forward(options)? {
            record?;
            n += 1;
        }
        Ok(n)
    }

    pub fn file_info(&self) -> Result<FileInfo> {
        let meta = std::fs::metadata(&self.path)?;
        let modified = meta.modified()?;
        Ok(FileInfo {
            path: self.path.clone(),
            size_bytes: meta.len(),
            modified: DateTime::<Utc>::from(modified),
        })
    }
}

/// Parse one log line into a raw record. Blank lines and malformed JSON
/// are skipped, never fatal.
pub(crate) fn parse_line(line: &str) -> Option<RawAlert> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            debug!("skipping non-object log line");
            None
        }
        Err(err) => {
            debug!(%err, "skipping malformed log line");
            None
        }
    }
}

/// Pull the record's timestamp, accepting RFC 3339 with a trailing `Z`,
/// converted to UTC. Absent or unparsable timestamps yield `None`.
pub(crate) fn extract_timestamp(raw: &RawAlert) -> Option<DateTime<Utc>> {
    let text = raw.get("timestamp")?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Records without a parseable timestamp pass the window unconditionally.
pub(crate) fn passes_window(raw: &RawAlert, options: &ReadOptions) -> bool {
    if options.start.is_none() && options.end.is_none() {
        return true;
    }
    let Some(ts) = extract_timestamp(raw) else {
        return true;
    };
    if let Some(start) = options.start {
        if ts < start {
            return false;
        }
    }
    if let Some(end) = options.end {
        if ts > end {
            return false;
        }
    }
    true
}
