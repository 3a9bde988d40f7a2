//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::path::PathBuf;

use serde_json::Value;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// One row of `minilabo areas`
#[derive(Debug, Clone)]
pub struct AreaRow {
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print an area document
    pub fn print_document(&self, document: &Value) {
        match self.format {
            OutputFormat::Human | OutputFormat::Json => {
                println!("{}", pretty(document));
            }
            OutputFormat::Quiet => {
                println!("{}", document);
            }
        }
    }

    /// Print the known areas
    pub fn print_areas(&self, areas: &[AreaRow]) {
        match self.format {
            OutputFormat::Human => {
                for area in areas {
                    let state = if area.exists { "" } else { " (not written yet)" };
                    println!("{:<10} {}{}", area.name, area.path.display(), state);
                }
                println!("\n{} area(s)", areas.len());
            }
            OutputFormat::Json => {
                let rows: Vec<_> = areas
                    .iter()
                    .map(|area| {
                        serde_json::json!({
                            "name": area.name,
                            "path": area.path,
                            "exists": area.exists
                        })
                    })
                    .collect();
                println!("{}", pretty(&Value::Array(rows)));
            }
            OutputFormat::Quiet => {
                for area in areas {
                    println!("{}", area.name);
                }
            }
        }
    }

    /// Print device log lines
    pub fn print_log_lines(&self, lines: &[&str]) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => {
                for line in lines {
                    println!("{}", line);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!(lines));
            }
        }
    }

    /// Print one live log line from the runtime sink
    pub fn log_line(&self, line: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", line),
            OutputFormat::Json => println!("{}", serde_json::json!({"line": line})),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn pretty(value: &Value) -> String {
    // Serializing a Value cannot fail; fall back to the compact form anyway
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_quiet_output() {
        assert!(Output::new(OutputFormat::Quiet).is_quiet());
        assert!(!Output::new(OutputFormat::Json).is_quiet());
    }

    #[test]
    fn test_pretty_keeps_structure() {
        let doc = json!({"pin": 1234, "ui": ["dmm"]});
        let text = pretty(&doc);
        assert!(text.contains('\n'));
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), doc);
    }
}
