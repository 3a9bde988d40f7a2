//! Ring logger engine
//!
//! Owns the ring, the single sink slot and the durable log file. All
//! methods take `&mut self`; share it through [`Logger`](super::Logger).

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::entry::{LogEntry, LogLevel};
use super::file::{AppendReport, LogFile};
use super::ring::LogRing;
use super::sink::LogSink;
use crate::clock::SharedClock;
use crate::config::{Config, FlushMode, LogSettings};
use crate::storage::StorageResult;

/// Target the device log is mirrored to in `tracing`
pub const DEVICE_TARGET: &str = "minilabo_core::device";

/// In-memory ring logger with periodic flush to disk
pub struct RingLogger {
    ring: LogRing,
    sink: Option<Arc<dyn LogSink>>,
    file: LogFile,
    settings: LogSettings,
    clock: SharedClock,
    last_flush: u64,
    /// `ring.total()` at the last successful incremental flush
    flushed_mark: u64,
}

impl RingLogger {
    pub fn new(config: &Config, clock: SharedClock) -> Self {
        let last_flush = clock.millis();
        Self {
            ring: LogRing::new(config.log.ring_capacity),
            sink: None,
            file: LogFile::new(config),
            settings: config.log,
            clock,
            last_flush,
            flushed_mark: 0,
        }
    }

    /// Empty the ring and restart the flush interval from now
    pub fn init(&mut self) {
        self.ring.reset();
        self.flushed_mark = 0;
        self.last_flush = self.clock.millis();
    }

    /// Store an entry and return its formatted line, without calling the sink
    pub fn record(
        &mut self,
        level: LogLevel,
        category: &str,
        function: &str,
        message: impl Into<String>,
    ) -> String {
        let entry = LogEntry::new(self.clock.millis(), level, category, function, message);
        let line = entry.to_string();
        mirror(&entry);
        self.ring.push(entry);
        line
    }

    /// Store an entry and hand its line to the sink
    pub fn log(
        &mut self,
        level: LogLevel,
        category: &str,
        function: &str,
        message: impl Into<String>,
    ) {
        let line = self.record(level, category, function, message);
        if let Some(sink) = &self.sink {
            sink.write_line(&line);
        }
    }

    pub fn debug(&mut self, category: &str, function: &str, message: impl Into<String>) {
        self.log(LogLevel::Debug, category, function, message)
    }

    pub fn info(&mut self, category: &str, function: &str, message: impl Into<String>) {
        self.log(LogLevel::Info, category, function, message)
    }

    pub fn warn(&mut self, category: &str, function: &str, message: impl Into<String>) {
        self.log(LogLevel::Warn, category, function, message)
    }

    pub fn error(&mut self, category: &str, function: &str, message: impl Into<String>) {
        self.log(LogLevel::Error, category, function, message)
    }

    /// Install the real-time sink, replacing any previous one
    pub fn set_sink(&mut self, sink: Arc<dyn LogSink>) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    pub fn sink(&self) -> Option<Arc<dyn LogSink>> {
        self.sink.clone()
    }

    /// Up to `n` most recent lines, oldest first, each ending in `\n`
    pub fn tail(&self, n: usize) -> String {
        self.ring.tail(n).fold(String::new(), |mut out, entry| {
            out.push_str(&entry.to_string());
            out.push('\n');
            out
        })
    }

    /// Up to `n` most recent entries, oldest first
    pub fn tail_entries(&self, n: usize) -> Vec<LogEntry> {
        self.ring.tail(n).cloned().collect()
    }

    pub fn ring(&self) -> &LogRing {
        &self.ring
    }

    pub fn log_file(&self) -> &LogFile {
        &self.file
    }

    /// Flush when more than `flush_interval_ms` passed since the last one
    ///
    /// Returns `Ok(None)` when the interval has not elapsed. The interval
    /// restarts even if the flush fails.
    pub fn tick(&mut self) -> StorageResult<Option<AppendReport>> {
        let now = self.clock.millis();
        if now.saturating_sub(self.last_flush) <= self.settings.flush_interval_ms {
            return Ok(None);
        }
        self.last_flush = now;
        self.flush().map(Some)
    }

    /// Append the ring to the current log file now
    pub fn flush(&mut self) -> StorageResult<AppendReport> {
        let now = self.clock.millis();
        let lines: Vec<String> = match self.settings.flush_mode {
            FlushMode::Full => self.ring.iter().map(ToString::to_string).collect(),
            FlushMode::Incremental => self
                .ring
                .since(self.flushed_mark)
                .map(ToString::to_string)
                .collect(),
        };

        if lines.is_empty() {
            return Ok(AppendReport {
                lines: 0,
                file_size: 0,
                rotated_to: None,
            });
        }

        let mut report = self.file.write_lines(&lines)?;
        // Written lines count as flushed even if the rotation below fails
        self.flushed_mark = self.ring.total();
        report.rotated_to = self.file.rotate_if_oversized(report.file_size, now)?;
        Ok(report)
    }
}

fn mirror(entry: &LogEntry) {
    let LogEntry {
        timestamp_ms,
        category,
        function,
        message,
        ..
    } = entry;
    match entry.level {
        LogLevel::Debug => {
            debug!(target: DEVICE_TARGET, ts = timestamp_ms, %category, %function, "{}", message)
        }
        LogLevel::Info => {
            info!(target: DEVICE_TARGET, ts = timestamp_ms, %category, %function, "{}", message)
        }
        LogLevel::Warn => {
            warn!(target: DEVICE_TARGET, ts = timestamp_ms, %category, %function, "{}", message)
        }
        LogLevel::Error => {
            error!(target: DEVICE_TARGET, ts = timestamp_ms, %category, %function, "{}", message)
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

    fn setup(temp_dir: &TempDir, capacity: usize) -> (RingLogger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let mut config = Config::with_data_dir(temp_dir.path());
        config.log.ring_capacity = capacity;
        let mut logger = RingLogger::new(&config, clock.clone());
        logger.init();
        (logger, clock)
    }

    #[test]
    fn test_log_formats_and_notifies_sink() {
        let temp_dir = TempDir::new().unwrap();
        let (mut logger, clock) = setup(&temp_dir, 10);
        let sink = MemorySink::new();
        logger.set_sink(Arc::new(sink.clone()));

        clock.set(42);
        logger.warn("DMM", "begin", "Unknown IO for channel CH2: IO_X");

        assert_eq!(
            sink.lines(),
            ["        42 [W] DMM/begin: Unknown IO for channel CH2: IO_X"]
        );
    }

    #[test]
    fn test_set_sink_replaces_previous() {
        let temp_dir = TempDir::new().unwrap();
        let (mut logger, _clock) = setup(&temp_dir, 10);
        let first = MemorySink::new();
        let second = MemorySink::new();

        logger.set_sink(Arc::new(first.clone()));
        logger.info("A", "a", "one");
        logger.set_sink(Arc::new(second.clone()));
        logger.info("A", "a", "two");
        logger.clear_sink();
        logger.info("A", "a", "three");

        assert_eq!(first.lines().len(), 1);
        assert_eq!(second.lines().len(), 1);
        assert!(second.lines()[0].ends_with("two"));
    }

    #[test]
    fn test_tail_capped_at_available() {
        let temp_dir = TempDir::new().unwrap();
        let (mut logger, clock) = setup(&temp_dir, 3);

        for (t, m) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            clock.set(t as u64);
            logger.info("T", "t", *m);
        }

        let expected = "         2 [I] T/t: C\n         3 [I] T/t: D\n         4 [I] T/t: E\n";
        assert_eq!(logger.tail(3), expected);
        assert_eq!(logger.tail(5), expected);
        assert_eq!(logger.tail(0), "");
    }

    #[test]
    fn test_tail_entries_before_wrap() {
        let temp_dir = TempDir::new().unwrap();
        let (mut logger, _clock) = setup(&temp_dir, 200);
        logger.debug("T", "t", "first");
        logger.error("T", "t", "second");

        let entries = logger.tail_entries(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].level, LogLevel::Error);
    }

    #[test]
    fn test_tick_waits_for_interval() {
        let temp_dir = TempDir::new().unwrap();
        let (mut logger, clock) = setup(&temp_dir, 10);
        logger.info("T", "t", "hello");

        clock.set(5000);
        assert!(logger.tick().unwrap().is_none());
        assert!(!logger.log_file().current_path().exists());

        clock.set(5001);
        let report = logger.tick().unwrap().unwrap();
        assert_eq!(report.lines, 1);
        assert!(logger.log_file().current_path().exists());

        clock.set(6000);
        assert!(logger.tick().unwrap().is_none());
    }

    #[test]
    fn test_full_flush_repeats_lines() {
        let temp_dir = TempDir::new().unwrap();
        let (mut logger, _clock) = setup(&temp_dir, 10);

        logger.info("T", "t", "a");
        logger.flush().unwrap();
        logger.info("T", "t", "b");
        logger.flush().unwrap();

        let content = fs::read_to_string(logger.log_file().current_path()).unwrap();
        let messages: Vec<&str> = content.lines().map(|l| &l[l.len() - 1..]).collect();
        assert_eq!(messages, ["a", "a", "b"]);
    }

    #[test]
    fn test_incremental_flush_writes_each_line_once() {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let mut config = Config::with_data_dir(temp_dir.path());
        config.log.flush_mode = FlushMode::Incremental;
        let mut logger = RingLogger::new(&config, clock);

        logger.info("T", "t", "a");
        logger.flush().unwrap();
        logger.info("T", "t", "b");
        logger.flush().unwrap();
        let report = logger.flush().unwrap();
        assert_eq!(report.lines, 0);

        let content = fs::read_to_string(logger.log_file().current_path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_flush_rotates_large_file() {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let mut config = Config::with_data_dir(temp_dir.path());
        config.log.file_max_size = 64;
        config.log.flush_mode = FlushMode::Incremental;
        let mut logger = RingLogger::new(&config, clock.clone());

        logger.info("T", "t", "a fairly long line that fills the file quickly");
        logger.info("T", "t", "and another one to go past the limit");
        clock.set(7000);
        let report = logger.flush().unwrap();

        let archive = report.rotated_to.unwrap();
        assert!(archive.ends_with("log_7000.log"));
        assert!(!logger.log_file().current_path().exists());

        logger.info("T", "t", "fresh");
        logger.flush().unwrap();
        let content = fs::read_to_string(logger.log_file().current_path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with("fresh\n"));
    }

    #[test]
    fn test_incremental_flush_after_failed_rotation_writes_once() {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let mut config = Config::with_data_dir(temp_dir.path());
        config.log.file_max_size = 8;
        config.log.flush_mode = FlushMode::Incremental;
        let mut logger = RingLogger::new(&config, clock.clone());
        let logs = temp_dir.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        for name in ["log_100.log".to_string()]
            .into_iter()
            .chain((1..16).map(|n| format!("log_100_{}.log", n)))
        {
            fs::write(logs.join(name), b"taken\n").unwrap();
        }

        logger.info("T", "t", "once");
        clock.set(100);
        assert!(logger.flush().is_err());

        logger.info("T", "t", "next");
        clock.set(200);
        let archive = logger.flush().unwrap().rotated_to.unwrap();

        let content = fs::read_to_string(archive).unwrap();
        let messages: Vec<&str> = content.lines().map(|l| &l[l.len() - 4..]).collect();
        assert_eq!(messages, ["once", "next"]);
    }

    #[test]
    fn test_failed_flush_retries_next_interval() {
        let temp_dir = TempDir::new().unwrap();
        let (mut logger, clock) = setup(&temp_dir, 10);
        fs::write(temp_dir.path().join("logs"), b"").unwrap();
        logger.info("T", "t", "kept in ram");

        clock.set(6000);
        assert!(logger.tick().is_err());
        // Interval restarted even though the flush failed
        assert!(logger.tick().unwrap().is_none());

        fs::remove_file(temp_dir.path().join("logs")).unwrap();
        clock.set(12000);
        assert_eq!(logger.tick().unwrap().unwrap().lines, 1);
    }

    #[test]
    fn test_init_resets_ring() {
        let temp_dir = TempDir::new().unwrap();
        let (mut logger, _clock) = setup(&temp_dir, 2);
        logger.info("T", "t", "a");
        logger.info("T", "t", "b");
        assert!(logger.ring().has_wrapped());

        logger.init();
        assert!(logger.ring().is_empty());
        assert!(!logger.ring().has_wrapped());
        assert_eq!(logger.ring().head(), 0);
    }
}
