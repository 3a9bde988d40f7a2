//! Config command handlers
//!
//! Read and replace whole area documents, the way the web layer's
//! `GET`/`PUT /api/config/<area>` routes do.

use anyhow::{Context, Result};
use serde_json::Value;

use minilabo_core::Config;

use super::{boot, ensure_known};
use crate::output::Output;

/// Show an area document
pub fn show(config: Config, area: String, output: &Output) -> Result<()> {
    let mut runtime = boot(config);
    ensure_known(&runtime, &area)?;

    if let Some(document) = runtime.store().document(&area) {
        output.print_document(document);
    }

    runtime.shutdown();
    Ok(())
}

/// Replace an area document and persist it
pub fn set(config: Config, area: String, json: String, output: &Output) -> Result<()> {
    let document: Value = serde_json::from_str(&json)
        .with_context(|| format!("Invalid JSON for area '{}'", area))?;

    let mut runtime = boot(config);
    ensure_known(&runtime, &area)?;

    runtime
        .store_mut()
        .replace(&area, document)
        .with_context(|| format!("Failed to update area '{}'", area))?;
    runtime.shutdown();

    if runtime.store().is_dirty(&area) {
        anyhow::bail!("Area '{}' could not be written; see the device log", area);
    }

    let path = runtime.config().area_path(&area);
    output.success(&format!("Saved {} to {}", area, path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use minilabo_core::storage;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_set_persists_document() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());
        let output = Output::new(OutputFormat::Quiet);

        set(
            config.clone(),
            "funcgen".to_string(),
            r#"{"freq": 1000.0, "wave": "sine"}"#.to_string(),
            &output,
        )
        .unwrap();

        let saved = storage::load_document(&config.area_path("funcgen"))
            .unwrap()
            .unwrap();
        assert_eq!(saved, json!({"freq": 1000.0, "wave": "sine"}));
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());
        let output = Output::new(OutputFormat::Quiet);

        assert!(set(config.clone(), "funcgen".into(), "{not json".into(), &output).is_err());
        assert!(set(config.clone(), "lasers".into(), "{}".into(), &output).is_err());
        assert!(show(config, "lasers".into(), &output).is_err());
    }
}
