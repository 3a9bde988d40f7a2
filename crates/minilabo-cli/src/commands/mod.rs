//! Command handlers

pub mod areas;
pub mod config;
pub mod logs;
pub mod run;

use anyhow::{bail, Result};

use minilabo_core::{Config, Runtime};

/// Boot a runtime on `config` for a one-shot command
pub fn boot(config: Config) -> Runtime {
    let mut runtime = Runtime::new(config);
    runtime.init();
    runtime
}

/// Fail with the list of known areas when `area` is not one of them
pub fn ensure_known(runtime: &Runtime, area: &str) -> Result<()> {
    if runtime.store().is_known(area) {
        return Ok(());
    }
    let known: Vec<&str> = runtime.store().area_names().collect();
    bail!("Unknown area '{}'. Known areas: {}", area, known.join(", "))
}
