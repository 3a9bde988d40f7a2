//! Configuration area store
//!
//! The `AreaStore` holds the live JSON document of every registered area
//! and persists edits lazily:
//!
//! - `request_save` marks an area dirty and restarts its debounce window
//! - `tick` writes a dirty area once it has been idle for `debounce_ms`
//!   and at least `min_period_ms` passed since the previous write of any
//!   area; at most one area is written per tick
//!
//! A failed write leaves the area dirty and is retried on a later tick.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = AreaStore::new(&config, AreaRegistry::builtin(), clock, logger);
//! store.init();
//!
//! if let Some(doc) = store.document_mut("funcgen") {
//!     doc["freq"] = json!(1000.0);
//! }
//! store.request_save("funcgen");
//!
//! loop {
//!     store.tick();
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::areas::AreaRegistry;
use crate::clock::SharedClock;
use crate::config::{Config, StoreSettings};
use crate::logger::Logger;
use crate::storage::{self, StorageError, StorageResult, TempRecovery};

/// Log category of the store
const CATEGORY: &str = "CFG";

/// In-memory state of one area
#[derive(Debug, Clone)]
pub struct AreaState {
    path: PathBuf,
    document: Value,
    dirty: bool,
    last_change: u64,
}

impl AreaState {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Time of the last `request_save`
    pub fn last_change(&self) -> u64 {
        self.last_change
    }
}

/// How an area got its document at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Parsed from its file
    Loaded,
    /// File missing; defaults written
    Defaulted,
    /// File corrupt; backed up, defaults written
    Reset,
    /// File present but unreadable; defaults kept in memory only
    Unreadable,
}

/// Debounced, crash-safe store of configuration areas
pub struct AreaStore {
    areas: BTreeMap<String, AreaState>,
    registry: AreaRegistry,
    settings: StoreSettings,
    clock: SharedClock,
    logger: Logger,
    /// Time of the last successful physical write, across all areas
    last_save: u64,
}

impl AreaStore {
    /// Create the store with one empty document per registered area
    ///
    /// Nothing touches the filesystem until [`init`](Self::init).
    pub fn new(config: &Config, registry: AreaRegistry, clock: SharedClock, logger: Logger) -> Self {
        let areas = registry
            .iter()
            .map(|def| {
                let state = AreaState {
                    path: config.area_path(&def.name),
                    document: Value::Null,
                    dirty: false,
                    last_change: 0,
                };
                (def.name.clone(), state)
            })
            .collect();

        Self {
            areas,
            registry,
            settings: config.store,
            clock,
            logger,
            last_save: 0,
        }
    }

    /// Load every area from disk, writing defaults where needed
    ///
    /// Must run before any consumer reads a document.
    pub fn init(&mut self) -> Vec<(String, LoadOutcome)> {
        let now = self.clock.millis();
        let mut outcomes = Vec::with_capacity(self.areas.len());

        for (name, state) in self.areas.iter_mut() {
            let outcome = load_area(name, state, &self.registry, &self.logger);
            if matches!(outcome, LoadOutcome::Defaulted | LoadOutcome::Reset)
                && save_area(name, state, &self.logger).is_err()
            {
                // Retried by tick once the debounce window passes
                state.dirty = true;
                state.last_change = now;
            }
            outcomes.push((name.clone(), outcome));
        }

        outcomes
    }

    /// Live document of an area
    pub fn document(&self, name: &str) -> Option<&Value> {
        self.areas.get(name).map(|state| &state.document)
    }

    /// Live document of an area, for in-place edits
    ///
    /// Edits are not detected; call [`request_save`](Self::request_save)
    /// afterwards.
    pub fn document_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.areas.get_mut(name).map(|state| &mut state.document)
    }

    /// Replace an area's whole document and schedule its save
    pub fn replace(&mut self, name: &str, document: Value) -> StorageResult<()> {
        let state = self
            .areas
            .get_mut(name)
            .ok_or_else(|| StorageError::UnknownArea(name.to_string()))?;
        state.document = document;
        self.request_save(name);
        Ok(())
    }

    /// Mark an area dirty and restart its debounce window
    ///
    /// Returns `false` for an unknown area.
    pub fn request_save(&mut self, name: &str) -> bool {
        if self.mark_dirty(name) {
            true
        } else {
            self.logger.warn(
                CATEGORY,
                "request_save",
                format!("Unknown area: {}", name),
            );
            false
        }
    }

    fn mark_dirty(&mut self, name: &str) -> bool {
        let now = self.clock.millis();
        match self.areas.get_mut(name) {
            Some(state) => {
                state.dirty = true;
                state.last_change = now;
                true
            }
            None => false,
        }
    }

    /// Scheduler hook: persist at most one eligible area
    ///
    /// Returns the name of the area written, if any.
    pub fn tick(&mut self) -> Option<String> {
        let now = self.clock.millis();
        if now.saturating_sub(self.last_save) < self.settings.min_period_ms {
            return None;
        }

        let debounce_ms = self.settings.debounce_ms;
        for (name, state) in self.areas.iter_mut() {
            if !state.dirty || now.saturating_sub(state.last_change) < debounce_ms {
                continue;
            }
            if save_area(name, state, &self.logger).is_ok() {
                state.dirty = false;
                self.last_save = now;
                return Some(name.clone());
            }
        }

        None
    }

    /// Persist every dirty area now, ignoring debounce and min period
    ///
    /// Returns how many areas were written.
    pub fn flush_all(&mut self) -> usize {
        let now = self.clock.millis();
        let mut written = 0;

        for (name, state) in self.areas.iter_mut().filter(|(_, state)| state.dirty) {
            if save_area(name, state, &self.logger).is_ok() {
                state.dirty = false;
                written += 1;
            }
        }

        if written > 0 {
            self.last_save = now;
        }
        written
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.areas.contains_key(name)
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.areas.get(name).is_some_and(|state| state.dirty)
    }

    /// Names of dirty areas
    pub fn pending(&self) -> impl Iterator<Item = &str> + '_ {
        self.areas
            .iter()
            .filter(|(_, state)| state.dirty)
            .map(|(name, _)| name.as_str())
    }

    pub fn area_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.areas.keys().map(String::as_str)
    }

    pub fn area(&self, name: &str) -> Option<&AreaState> {
        self.areas.get(name)
    }

    /// Time of the last successful physical write
    pub fn last_save(&self) -> u64 {
        self.last_save
    }
}

/// Fill `state` from its file, recovering from crashes and corruption
///
/// Defaults are put in place but not written; the caller persists them.
fn load_area(
    name: &str,
    state: &mut AreaState,
    registry: &AreaRegistry,
    logger: &Logger,
) -> LoadOutcome {
    let path = state.path.clone();

    match storage::recover_temp(&path) {
        Ok(TempRecovery::Clean) => {}
        Ok(TempRecovery::Promoted) => logger.warn(
            CATEGORY,
            "load_area",
            format!("Recovered interrupted save of {}", path.display()),
        ),
        Ok(TempRecovery::Discarded) => logger.warn(
            CATEGORY,
            "load_area",
            format!("Removed stale temp file for {}", path.display()),
        ),
        Err(e) => logger.error(CATEGORY, "load_area", e.to_string()),
    }

    let outcome = match storage::load_document(&path) {
        Ok(Some(document)) => {
            state.document = document;
            return LoadOutcome::Loaded;
        }
        Ok(None) => {
            logger.warn(
                CATEGORY,
                "load_area",
                format!("File not found, using defaults: {}", path.display()),
            );
            LoadOutcome::Defaulted
        }
        Err(StorageError::InvalidFormat { details, .. }) => {
            logger.error(
                CATEGORY,
                "load_area",
                format!("Failed to parse {}: {}", path.display(), details),
            );
            match storage::backup_corrupt(&path) {
                Ok(backup) => logger.info(
                    CATEGORY,
                    "load_area",
                    format!("Corrupt file kept as {}", backup.display()),
                ),
                Err(e) => logger.error(CATEGORY, "load_area", e.to_string()),
            }
            LoadOutcome::Reset
        }
        Err(e) => {
            logger.error(CATEGORY, "load_area", e.to_string());
            LoadOutcome::Unreadable
        }
    };

    state.document = registry.defaults_for(name);
    outcome
}

fn save_area(name: &str, state: &AreaState, logger: &Logger) -> StorageResult<()> {
    match storage::save_document(&state.path, name, &state.document) {
        Ok(()) => {
            logger.info(
                CATEGORY,
                "save_area",
                format!("Saved {}", state.path.display()),
            );
            Ok(())
        }
        Err(e) => {
            let retry = if e.is_recoverable() { ", will retry" } else { "" };
            logger.error(CATEGORY, "save_area", format!("{}{}", e, retry));
            Err(e)
        }
    }
}
