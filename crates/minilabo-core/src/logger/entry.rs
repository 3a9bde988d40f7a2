//! Log entries and the line format

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Single-character tag embedded in every formatted line.
    ///
    /// Display bridges match on `[E]` and `[W]`; these must not change.
    pub fn tag(self) -> char {
        match self {
            LogLevel::Debug => 'D',
            LogLevel::Info => 'I',
            LogLevel::Warn => 'W',
            LogLevel::Error => 'E',
        }
    }
}

/// One immutable log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since boot
    pub timestamp_ms: u64,
    pub level: LogLevel,
    /// Short subsystem tag (`CFG`, `IO`, `DMM`, ...)
    pub category: String,
    /// Operation that emitted the entry
    pub function: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(
        timestamp_ms: u64,
        level: LogLevel,
        category: impl Into<String>,
        function: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_ms,
            level,
            category: category.into(),
            function: function.into(),
            message: message.into(),
        }
    }
}

/// `"<ts right-aligned in 10> [X] category/function: message"`, no newline
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>10} [{}] {}/{}: {}",
            self.timestamp_ms,
            self.level.tag(),
            self.category,
            self.function,
            self.message
        )
    }
}
