use std::fs::File;
use std::io::{BufRead, BufReader, Lines};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::RawAlert;
use crate::reader::log_file::{parse_line, passes_window, ReadOptions};

/// Lazy file-order stream of raw alerts.
///
/// Malformed lines are skipped; an I/O failure mid-stream yields one `Err`
/// and then the iterator fuses.
pub struct ForwardReader {
    lines: Lines<BufReader<File>>,
    options: ReadOptions,
    yielded: usize,
    done: bool,
}

impl ForwardReader {
    pub(crate) fn new(reader: BufReader<File>, options: ReadOptions) -> Self {
        ForwardReader {
            lines: reader.lines(),
            options,
            yielded: 0,
            done: false,
        }
    }
}

impl Iterator for ForwardReader {
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
            match self.lines.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(Error::new(
                        ErrorKind::Io,
                        format!("alert log became unreadable mid-stream: {err}"),
                    )));
                }
                Some(Ok(line)) => {
                    let Some(raw) = parse_line(&line) else {
                        continue;
                    };
                    if !passes_window(&raw, &self.options) {
                        continue;
                    }
                    self.yielded += 1;
                    return Some(Ok(raw));
                }
            }
        }
    }
}
