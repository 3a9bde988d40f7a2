//! Ring logger
//!
//! Lossy, non-blocking device log:
//!
//! ```text
//! log() ──▶ [ring of N entries] ──▶ sink (real-time, producer's stack)
//!                  │
//!                tick() every flush interval
//!                  ▼
//!          logs/log_current.log ──(size limit)──▶ logs/log_<millis>.log
//! ```
//!
//! Every line has the form `"%10lu [X] category/function: message"` with
//! `X` one of `D`, `I`, `W`, `E`.
//!
//! ## Usage
//!
//! ```ignore
//! let logger = Logger::new(&config, clock);
//! logger.init();
//! logger.set_sink(Arc::new(|line: &str| websocket.push(line)));
//! logger.info("WS", "begin", "Web server started on port 80");
//! let recent = logger.tail(50);
//! ```

mod entry;
mod file;
mod handle;
mod ring;
mod ring_logger;
mod sink;

pub use entry::{LogEntry, LogLevel};
pub use file::{AppendReport, LogFile};
pub use handle::Logger;
pub use ring::LogRing;
pub use ring_logger::{RingLogger, DEVICE_TARGET};
pub use sink::{LogSink, MemorySink};
