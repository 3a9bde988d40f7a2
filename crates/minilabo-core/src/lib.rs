//! MiniLabo Core Library
//!
//! This crate provides the firmware core of MiniLabo, a small networked
//! lab instrument: persistent configuration areas and the device log.
//!
//! # Architecture
//!
//! - **Areas**: one JSON document per subsystem, edited in RAM and written
//!   back lazily with crash-safe write-replace
//! - **Ring logger**: fixed-size in-memory log with a real-time sink and
//!   periodic flush to a rotating file
//!
//! Both are driven by a cooperative [`Runtime::tick`]; time comes from a
//! [`Clock`] so tests run on a [`ManualClock`].
//!
//! # Quick Start
//!
//! ```text
//! let mut runtime = Runtime::new(Config::load()?);
//! runtime.init();
//!
//! runtime.store_mut().replace("funcgen", json!({"freq": 1000.0}))?;
//! runtime.logger().info("FG", "apply", "Frequency set");
//!
//! loop {
//!     runtime.tick();
//! }
//! ```
//!
//! # Modules
//!
//! - `store`: Debounced area store (main entry point)
//! - `areas`: Known areas and their factory defaults
//! - `logger`: Ring logger, sinks and the log file
//! - `storage`: Crash-safe JSON persistence
//! - `runtime`: Boot, tick and shutdown wiring
//! - `clock`: Millisecond time sources
//! - `config`: Application configuration

pub mod areas;
pub mod clock;
pub mod config;
pub mod logger;
pub mod runtime;
pub mod storage;
pub mod store;

pub use areas::{AreaDef, AreaRegistry, BUILTIN_AREAS};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{Config, FlushMode, LogSettings, StoreSettings};
pub use logger::{LogEntry, LogLevel, LogSink, Logger, MemorySink, RingLogger};
pub use runtime::{Runtime, TickReport};
pub use storage::{StorageError, StorageResult};
pub use store::{AreaStore, LoadOutcome};
