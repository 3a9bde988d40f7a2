//! Real-time fan-out of formatted log lines
//!
//! A sink runs on the producer's call stack, so implementations must return
//! quickly (queue the line, push it to a socket buffer, ...).

use std::sync::{Arc, Mutex, PoisonError};

/// Anything that accepts a formatted log line
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write_line(&self, line: &str) {
        self(line)
    }
}

/// Sink that keeps every line in memory
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines received so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take the received lines, leaving the buffer empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_is_a_sink() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let sink: Arc<dyn LogSink> = Arc::new(move |_line: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        sink.write_line("a");
        sink.write_line("b");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let other = sink.clone();
        other.write_line("hello");

        assert_eq!(sink.lines(), ["hello"]);
        assert_eq!(sink.drain(), ["hello"]);
        assert!(other.lines().is_empty());
    }
}
