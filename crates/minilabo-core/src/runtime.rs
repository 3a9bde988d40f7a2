//! Cooperative main loop
//!
//! Wires one [`Logger`] and one [`AreaStore`] to a shared clock. The host
//! calls [`Runtime::tick`] from its scheduler loop; nothing here blocks
//! beyond a single file write.

use std::sync::Arc;

use crate::areas::AreaRegistry;
use crate::clock::{SharedClock, SystemClock};
use crate::config::Config;
use crate::logger::{AppendReport, Logger};
use crate::store::{AreaStore, LoadOutcome};

/// What one tick did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Area written by the store, if any
    pub saved: Option<String>,
    /// Log flush performed, if any
    pub flushed: Option<AppendReport>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.saved.is_none() && self.flushed.is_none()
    }
}

pub struct Runtime {
    config: Config,
    clock: SharedClock,
    logger: Logger,
    store: AreaStore,
}

impl Runtime {
    /// Runtime on the wall clock with the built-in areas
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, AreaRegistry::builtin(), Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: Config, registry: AreaRegistry, clock: SharedClock) -> Self {
        let logger = Logger::new(&config, clock.clone());
        let store = AreaStore::new(&config, registry, clock.clone(), logger.clone());
        Self {
            config,
            clock,
            logger,
            store,
        }
    }

    /// Boot: logger first, then every area
    pub fn init(&mut self) -> Vec<(String, LoadOutcome)> {
        self.logger.init();
        self.logger.info(
            "SYS",
            "init",
            format!("Data directory: {}", self.config.data_dir.display()),
        );
        let outcomes = self.store.init();
        self.logger
            .info("SYS", "init", format!("{} areas ready", outcomes.len()));
        outcomes
    }

    pub fn tick(&mut self) -> TickReport {
        TickReport {
            saved: self.store.tick(),
            flushed: self.logger.tick(),
        }
    }

    /// Persist pending areas and flush the log before power-off
    pub fn shutdown(&mut self) -> usize {
        let written = self.store.flush_all();
        self.logger.info(
            "SYS",
            "shutdown",
            format!("Wrote {} pending areas", written),
        );
        self.logger.flush();
        written
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn store(&self) -> &AreaStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AreaStore {
        &mut self.store
    }
}
