//! Logs command handler

use std::fs;
use std::io;

use anyhow::{Context, Result};

use minilabo_core::logger::LogFile;
use minilabo_core::Config;

use crate::output::Output;

/// Print the last `n` lines of the current device log file
pub fn show(config: &Config, n: usize, output: &Output) -> Result<()> {
    let path = config.current_log_path();
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            output.message(&format!("No log file yet at {}", path.display()));
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read log file: {:?}", path));
        }
    };

    output.print_log_lines(&last_lines(&content, n));

    let archives = LogFile::new(config).archives()?;
    if !archives.is_empty() {
        output.message(&format!(
            "{} rotated file(s) in {}",
            archives.len(),
            config.logs_dir().display()
        ));
    }
    Ok(())
}

fn last_lines(content: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}
