//! Areas command handler

use anyhow::Result;

use minilabo_core::{AreaRegistry, Config};

use crate::output::{AreaRow, Output};

/// List the known areas and their files
pub fn list(config: &Config, output: &Output) -> Result<()> {
    output.print_areas(&rows(config, &AreaRegistry::builtin()));
    Ok(())
}

fn rows(config: &Config, registry: &AreaRegistry) -> Vec<AreaRow> {
    let mut rows: Vec<AreaRow> = registry
        .iter()
        .map(|def| {
            let path = config.area_path(&def.name);
            AreaRow {
                name: def.name.clone(),
                exists: path.exists(),
                path,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}
