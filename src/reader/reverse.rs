use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::RawAlert;
use crate::reader::log_file::{extract_timestamp, parse_line, passes_window, ReadOptions};

/// Newest-first stream of raw alerts via a chunked reverse scan.
///
/// Steps backward from end-of-file in fixed-size chunks, carrying the
/// incomplete leading fragment between chunks, and emits complete lines
/// last-to-first. The whole file is never held in memory at once.
///
/// Early termination: once a record's timestamp is strictly earlier than
/// `options.start` the stream stops. This relies on the log being
/// timestamp-ascending; an out-of-order old record causes any in-window
/// records before it in the file to be missed. Accepted trade-off.
pub struct ReverseReader {
    file: File,
    position: u64,
    carry: Vec<u8>,
    // Complete lines of the current chunk in file order; popped from the
    // back to yield reverse order.
    pending: Vec<String>,
    chunk_size: usize,
    options: ReadOptions,
    yielded: usize,
    done: bool,
}

impl ReverseReader {
    pub(crate) fn new(mut file: File, chunk_size: usize, options: ReadOptions) -> Result<Self> {
        let position = file.seek(SeekFrom::End(0))?;
        Ok(ReverseReader {
            file,
            position,
            carry: Vec::new(),
            pending: Vec::new(),
            chunk_size: chunk_size.max(1),
            options,
            yielded: 0,
            done: false,
        })
    }

    /// Read chunks backward until at least one complete line is buffered.
    /// Returns false when the file start is reached and the carry is spent.
    fn refill(&mut self) -> Result<bool> {
        while self.pending.is_empty() {
            if self.position == 0 {
                if self.carry.is_empty() {
                    return Ok(false);
                }
                // The remaining carry is the first line of the file.
                let line = String::from_utf8_lossy(&self.carry).into_owned();
                self.carry.clear();
                self.pending.push(line);
                return Ok(true);
            }

            let step = (self.chunk_size as u64).min(self.position);
            self.position -= step;
            self.file.seek(SeekFrom::Start(self.position)).map_err(read_error)?;

            let mut chunk = vec![0u8; step as usize];
            self.file.read_exact(&mut chunk).map_err(read_error)?;
            chunk.append(&mut self.carry);

            let mut segments = chunk.split(|&b| b == b'\n');
            if let Some(fragment) = segments.next() {
                let rest: Vec<String> = segments
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
                if rest.is_empty() {
                    // No line terminator in this chunk; keep accumulating.
                    self.carry = fragment.to_vec();
                } else {
                    self.carry = fragment.to_vec();
                    self.pending = rest;
                }
            }
        }
        Ok(true)
    }
}

fn read_error(err: std::io::Error) -> Error {
    Error::new(
        ErrorKind::Io,
        format!("alert log became unreadable mid-stream: {err}"),
    )
}

impl Iterator for ReverseReader {
    type Item = Result<RawAlert>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(max) = self.options.max {
            if self.yielded >= max {
                self.done = true;
                return None;
            }
        }

        loop {
            if self.pending.is_empty() {
                match self.refill() {
                    Ok(true) => {}
                    Ok(false) => {
                        self.done = true;
                        return None;
                    }
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                }
            }
            let Some(line) = self.pending.pop() else {
                continue;
            };
            let Some(raw) = parse_line(&line) else {
                continue;
            };

            // Scanning backward through an ascending log: anything older
            // than the window start ends the stream.
            if let Some(start) = self.options.start {
                if let Some(ts) = extract_timestamp(&raw) {
                    if ts < start {
                        self.done = true;
                        return None;
                    }
                }
            }
            if !passes_window(&raw, &self.options) {
                continue;
            }
            self.yielded += 1;
            return Some(Ok(raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::{TimeZone, Utc};
    use tempfile::NamedTempFile;

    use crate::core::types::RawAlert;
    use crate::reader::log_file::{LogFile, ReadOptions};

    fn fixture(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn ascending_fixture(n: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..n {
            writeln!(
                file,
                "{{\"timestamp\":\"2024-01-01T{:02}:00:00Z\",\"seq\":{i}}}",
                i % 24
            )
            .unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn collect(reader: impl Iterator<Item = crate::core::error::Result<RawAlert>>) -> Vec<RawAlert> {
        reader.collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn reverse_is_forward_reversed() {
        let file = ascending_fixture(12);
        let log = LogFile::open(file.path()).unwrap();

        let mut forward = collect(log.forward(ReadOptions::default()).unwrap());
        let reverse = collect(log.reverse(ReadOptions::default()).unwrap());

        forward.reverse();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn tiny_chunk_size_matches_large() {
        let file = ascending_fixture(10);
        let small = LogFile::open(file.path()).unwrap().with_chunk_size(3);
        let large = LogFile::open(file.path()).unwrap().with_chunk_size(1 << 20);

        let a = collect(small.reverse(ReadOptions::default()).unwrap());
        let b = collect(large.reverse(ReadOptions::default()).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn missing_trailing_newline_still_yields_last_line() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{{\"seq\":0}}\n{{\"seq\":1}}\n{{\"seq\":2}}"
        )
        .unwrap();
        file.flush().unwrap();

        let log = LogFile::open(file.path()).unwrap().with_chunk_size(4);
        let records = collect(log.reverse(ReadOptions::default()).unwrap());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["seq"], 2);
        assert_eq!(records[2]["seq"], 0);
    }

    #[test]
    fn stops_at_first_record_older_than_window_start() {
        let file = fixture(&[
            r#"{"timestamp":"2024-01-01T00:00:00Z","seq":0}"#,
            r#"{"timestamp":"2024-01-01T01:00:00Z","seq":1}"#,
            r#"{"timestamp":"2024-01-01T02:00:00Z","seq":2}"#,
        ]);
        let log = LogFile::open(file.path()).unwrap();
        let options = ReadOptions {
            start: Some(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()),
            end: None,
            max: None,
        };
        let records = collect(log.reverse(options).unwrap());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["seq"], 2);
        assert_eq!(records[1]["seq"], 1);
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"seq\":0}\n\xff\xfe garbage \xff\n{\"seq\":1}\n")
            .unwrap();
        file.flush().unwrap();

        let log = LogFile::open(file.path()).unwrap().with_chunk_size(8);
        let records = collect(log.reverse(ReadOptions::default()).unwrap());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["seq"], 1);
        assert_eq!(records[1]["seq"], 0);
    }

    #[test]
    fn malformed_line_between_valid_lines_is_skipped() {
        let file = fixture(&[r#"{"seq":0}"#, "not json", r#"{"seq":1}"#]);
        let log = LogFile::open(file.path()).unwrap();
        let records = collect(log.reverse(ReadOptions::default()).unwrap());
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn max_count_stops_early() {
        let file = ascending_fixture(10);
        let log = LogFile::open(file.path()).unwrap();
        let options = ReadOptions {
            max: Some(3),
            ..Default::default()
        };
        let records = collect(log.reverse(options).unwrap());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["seq"], 9);
    }
}
