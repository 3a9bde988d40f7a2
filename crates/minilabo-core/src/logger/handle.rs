//! Shared logger handle
//!
//! [`Logger`] is a cheap, cloneable handle to one [`RingLogger`]. The store,
//! the runtime and host code all log through clones of the same handle.
//!
//! The sink is called after the ring lock is released, so a sink may log
//! through the handle itself without deadlocking.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::error;

use super::entry::{LogEntry, LogLevel};
use super::file::AppendReport;
use super::ring_logger::RingLogger;
use super::sink::LogSink;
use crate::clock::SharedClock;
use crate::config::Config;

#[derive(Clone)]
pub struct Logger {
    inner: Arc<Mutex<RingLogger>>,
}

impl Logger {
    pub fn new(config: &Config, clock: SharedClock) -> Self {
        Self::from_ring(RingLogger::new(config, clock))
    }

    pub fn from_ring(ring: RingLogger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ring)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RingLogger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn init(&self) {
        self.lock().init();
    }

    pub fn log(&self, level: LogLevel, category: &str, function: &str, message: impl Into<String>) {
        let (line, sink) = {
            let mut ring = self.lock();
            let line = ring.record(level, category, function, message);
            (line, ring.sink())
        };
        if let Some(sink) = sink {
            sink.write_line(&line);
        }
    }

    pub fn debug(&self, category: &str, function: &str, message: impl Into<String>) {
        self.log(LogLevel::Debug, category, function, message)
    }

    pub fn info(&self, category: &str, function: &str, message: impl Into<String>) {
        self.log(LogLevel::Info, category, function, message)
    }

    pub fn warn(&self, category: &str, function: &str, message: impl Into<String>) {
        self.log(LogLevel::Warn, category, function, message)
    }

    pub fn error(&self, category: &str, function: &str, message: impl Into<String>) {
        self.log(LogLevel::Error, category, function, message)
    }

    pub fn set_sink(&self, sink: Arc<dyn LogSink>) {
        self.lock().set_sink(sink);
    }

    pub fn clear_sink(&self) {
        self.lock().clear_sink();
    }

    pub fn tail(&self, n: usize) -> String {
        self.lock().tail(n)
    }

    pub fn tail_entries(&self, n: usize) -> Vec<LogEntry> {
        self.lock().tail_entries(n)
    }

    /// Number of entries currently held in RAM
    pub fn len(&self) -> usize {
        self.lock().ring().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scheduler hook: flush when the interval elapsed
    ///
    /// A failed flush is recorded at ERROR and retried next interval.
    pub fn tick(&self) -> Option<AppendReport> {
        let outcome = self.lock().tick();
        match outcome {
            Ok(report) => report,
            Err(e) => {
                error!("Log flush failed: {}", e);
                self.error("LOG", "flush", format!("Flush failed: {}", e));
                None
            }
        }
    }

    /// Flush now, regardless of the interval
    pub fn flush(&self) -> Option<AppendReport> {
        let outcome = self.lock().flush();
        match outcome {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Log flush failed: {}", e);
                self.error("LOG", "flush", format!("Flush failed: {}", e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::logger::MemorySink;
    use std::fs;
    use tempfile::TempDir;

    fn setup(temp_dir: &TempDir) -> (Logger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let logger = Logger::new(&Config::with_data_dir(temp_dir.path()), clock.clone());
        logger.init();
        (logger, clock)
    }

    #[test]
    fn test_clones_share_one_ring() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, _clock) = setup(&temp_dir);
        let other = logger.clone();

        logger.info("A", "a", "from first");
        other.info("B", "b", "from second");

        assert_eq!(logger.len(), 2);
        assert!(other.tail(1).contains("B/b: from second"));
    }

    #[test]
    fn test_sink_may_log_without_deadlock() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, _clock) = setup(&temp_dir);
        let echo = logger.clone();
        let captured = MemorySink::new();
        let seen = captured.clone();

        logger.set_sink(Arc::new(move |line: &str| {
            seen.write_line(line);
            if !line.contains("WS/echo") {
                echo.debug("WS", "echo", "forwarded");
            }
        }));
        logger.info("IO", "registerIO", "Registered IO_A0");

        assert_eq!(captured.lines().len(), 2);
        assert_eq!(logger.len(), 2);
    }

    #[test]
    fn test_failed_flush_is_logged_as_error() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, clock) = setup(&temp_dir);
        fs::write(temp_dir.path().join("logs"), b"").unwrap();
        logger.info("T", "t", "pending");

        clock.set(5001);
        assert!(logger.tick().is_none());

        let last = logger.tail_entries(1).pop().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert_eq!(last.category, "LOG");
        assert!(logger.tail(1).contains("[E] LOG/flush: Flush failed"));
    }

    #[test]
    fn test_tick_flushes_to_current_file() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, clock) = setup(&temp_dir);
        logger.error("CFG", "saveArea", "rename failed");

        clock.set(5001);
        let report = logger.tick().unwrap();
        assert_eq!(report.lines, 1);

        let content =
            fs::read_to_string(temp_dir.path().join("logs").join("log_current.log")).unwrap();
        assert_eq!(content, "         0 [E] CFG/saveArea: rename failed\n");
    }
}
