//! HTTP access log
//!
//! One line per request in combined log format:
//!
//! ```text
//! 127.0.0.1 - - [16/Oct/2026:09:12:44 +0000] "POST /crawler/engine HTTP/1.1" 200 61 "-" "objrpc-client"
//! ```
//!
//! Lines go to the configured file, or to `tracing` at debug level under
//! the `objrpc::access` target when no file is set.

use chrono::Utc;
use objrpc_core::{Error, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;

/// What gets logged about one request
#[derive(Debug, Clone)]
pub struct AccessEntry<'a> {
    pub peer: Option<SocketAddr>,
    pub method: &'a str,
    pub uri: &'a str,
    pub version: &'a str,
    pub status: u16,
    pub length: usize,
    pub referrer: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

impl AccessEntry<'_> {
    /// Render the combined log format line, without a newline
    pub fn format_line(&self) -> String {
        let peer = self
            .peer
            .map(|p| p.ip().to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} - - [{}] \"{} {} {}\" {} {} \"{}\" \"{}\"",
            peer,
            Utc::now().format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.uri,
            self.version,
            self.status,
            self.length,
            self.referrer.unwrap_or("-"),
            self.user_agent.unwrap_or("-"),
        )
    }
}

enum Sink {
    File(Mutex<File>),
    Tracing,
}

/// Destination for access lines
pub struct AccessLog {
    sink: Sink,
}

impl AccessLog {
    /// Append to `path`, creating it if needed; `None` logs through `tracing`
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let sink = match path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        Error::Config(format!("cannot open logfile {}: {}", path.display(), e))
                    })?;
                Sink::File(Mutex::new(file))
            }
            None => Sink::Tracing,
        };
        Ok(Self { sink })
    }

    /// Log through `tracing` only
    pub fn tracing() -> Self {
        Self {
            sink: Sink::Tracing,
        }
    }

    /// Record one request
    pub fn record(&self, entry: &AccessEntry<'_>) {
        let line = entry.format_line();
        match &self.sink {
            Sink::File(file) => {
                let mut file = file.lock();
                if let Err(e) = writeln!(file, "{}", line) {
                    tracing::warn!(error = %e, "failed to write access log");
                }
            }
            Sink::Tracing => tracing::debug!(target: "objrpc::access", "{}", line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AccessEntry<'static> {
        AccessEntry {
            peer: Some("127.0.0.1:50000".parse().unwrap()),
            method: "POST",
            uri: "/crawler/engine",
            version: "HTTP/1.1",
            status: 200,
            length: 61,
            referrer: None,
            user_agent: Some("objrpc-client"),
        }
    }

    #[test]
    fn test_format_line() {
        let line = entry().format_line();

        assert!(line.starts_with("127.0.0.1 - - ["));
        assert!(line.contains("] \"POST /crawler/engine HTTP/1.1\" 200 61 \"-\" \"objrpc-client\""));
        assert!(line.contains("+0000]"));
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");

        let log = AccessLog::open(Some(&path)).unwrap();
        log.record(&entry());
        log.record(&AccessEntry {
            status: 404,
            ..entry()
        });

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\" 404 "));
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = AccessLog::open(Some(&dir.path().join("missing").join("access.log")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_tracing_sink() {
        AccessLog::tracing().record(&entry());
        AccessLog::open(None).unwrap().record(&entry());
    }
}
