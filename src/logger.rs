//! Leveled, timestamped outcome log.
//!
//! Every dispatched command ends in one record here. Records are formatted as
//!
//! ```text
//! [MM-DD-YYYY hh:mm:ss AM/PM] (LOG|ERROR) <message>
//! ```
//!
//! and written to two sinks: an append-only persistent destination (the log
//! file) and a live sink (stdout). The enabled levels form a bitmask filter
//! that can be swapped at runtime.
//!
//! Internal diagnostics go through `tracing`; this sink is the operator-facing
//! record of what the bot did.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Deserialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Timestamp layout of a record prefix.
const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %I:%M:%S %p";

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Info = 0b01,
    Error = 0b10,
}

impl LogLevel {
    /// Bit this level occupies in a [`LogFilter`].
    #[inline]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Name printed inside the parentheses of a record.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "LOG",
            Self::Error => "ERROR",
        }
    }
}

/// Set of enabled levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct LogFilter(u8);

impl LogFilter {
    pub const NONE: Self = Self(0);
    pub const INFO: Self = Self(LogLevel::Info.bit());
    pub const ERROR: Self = Self(LogLevel::Error.bit());
    pub const ALL: Self = Self(LogLevel::Info.bit() | LogLevel::Error.bit());

    /// Whether records at `level` pass this filter.
    #[inline]
    pub const fn contains(self, level: LogLevel) -> bool {
        self.0 & level.bit() == level.bit()
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::ALL
    }
}

/// Error for unrecognized filter names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level {0:?} (expected info, error, all or none)")]
pub struct ParseLogFilterError(String);

impl FromStr for LogFilter {
    type Err = ParseLogFilterError;

    /// Accepts `info`, `error`, `all`/`both`, `none`/`off`, or a comma-separated
    /// combination such as `info,error`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bits = 0u8;
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            bits |= match part.to_ascii_lowercase().as_str() {
                "info" | "log" => Self::INFO.0,
                "error" => Self::ERROR.0,
                "all" | "both" => Self::ALL.0,
                "none" | "off" => 0,
                _ => return Err(ParseLogFilterError(s.to_string())),
            };
        }
        Ok(Self(bits))
    }
}

impl TryFrom<String> for LogFilter {
    type Error = ParseLogFilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for LogFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::ALL => "all",
            Self::INFO => "info",
            Self::ERROR => "error",
            _ => "none",
        };
        f.write_str(name)
    }
}

/// Format one record line (without the newline).
pub fn format_record(at: DateTime<Local>, level: LogLevel, message: &str) -> String {
    format!(
        "[{}] ({}) {}",
        at.format(TIMESTAMP_FORMAT),
        level.label(),
        message
    )
}

type Sink = Box<dyn Write + Send>;

/// The outcome log sink.
pub struct Logger {
    filter: AtomicU8,
    persistent: Mutex<Sink>,
    live: Mutex<Sink>,
}

impl Logger {
    /// Open the log file at `path`, rotating any previous file out of the way,
    /// with stdout as the live sink.
    pub fn open(path: impl AsRef<Path>, filter: LogFilter) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        if let Some(rotated) = rotate(path)? {
            tracing::info!(from = %path.display(), to = %rotated.display(), "Rotated previous log file");
        }

        let file: File = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::with_sinks(
            Box::new(file),
            Box::new(io::stdout()),
            filter,
        ))
    }

    /// Build a logger over arbitrary sinks.
    pub fn with_sinks(persistent: Sink, live: Sink, filter: LogFilter) -> Self {
        Self {
            filter: AtomicU8::new(filter.bits()),
            persistent: Mutex::new(persistent),
            live: Mutex::new(live),
        }
    }

    /// Current filter.
    pub fn filter(&self) -> LogFilter {
        LogFilter::from_bits(self.filter.load(Ordering::Relaxed))
    }

    /// Replace the filter.
    pub fn set_filter(&self, filter: LogFilter) {
        self.filter.store(filter.bits(), Ordering::Relaxed);
    }

    /// Emit `message` at `level` if the level is enabled.
    pub fn log(&self, message: &str, level: LogLevel) {
        if !self.filter().contains(level) {
            return;
        }

        let now = Local::now();
        let line = format_record(now, level, message);

        let persisted = {
            let mut sink = self.persistent.lock();
            writeln!(sink, "{line}").and_then(|()| sink.flush())
        };

        let mut live = self.live.lock();
        if let Err(e) = writeln!(live, "{line}").and_then(|()| live.flush()) {
            tracing::warn!(error = %e, "Failed to write log record to live sink");
        }

        if let Err(e) = persisted {
            tracing::error!(error = %e, "Failed to append log record");
            let notice = format_record(
                now,
                LogLevel::Error,
                &format!("failed to append previous record to log file: {e}"),
            );
            let _ = writeln!(live, "{notice}").and_then(|()| live.flush());
        }
    }

    #[inline]
    pub fn info(&self, message: &str) {
        self.log(message, LogLevel::Info);
    }

    #[inline]
    pub fn error(&self, message: &str) {
        self.log(message, LogLevel::Error);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("filter", &self.filter())
            .finish_non_exhaustive()
    }
}

/// Move an existing log file to `<path>.<YYYYMMDD-HHMMSS>`.
///
/// Returns the new location, or `None` when there was nothing to rotate.
fn rotate(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let mut target = PathBuf::from(format!("{}.{}", path.display(), stamp));
    let mut n = 1;
    while target.exists() {
        target = PathBuf::from(format!("{}.{}.{}", path.display(), stamp, n));
        n += 1;
    }

    std::fs::rename(path, &target)?;
    Ok(Some(target))
}

/// Cloneable in-memory sink. Used as a log destination in tests and tools.
#[derive(Clone, Default)]
pub struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Written lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
