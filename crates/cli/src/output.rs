//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use lpu237_settings::{ExportFormat, render};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// `--json` wins over `--format`, which wins over the config file.
    pub fn resolve(json: bool, flag: Option<Self>, configured: Self) -> Self {
        if json {
            Self::Json
        } else {
            flag.unwrap_or(configured)
        }
    }

    fn export(self) -> Option<ExportFormat> {
        match self {
            Self::Human => None,
            Self::Json => Some(ExportFormat::Json),
            Self::Yaml => Some(ExportFormat::Yaml),
        }
    }
}

/// Prints `value` as JSON/YAML, or calls `human` for the default format.
pub fn emit<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    human: impl FnOnce(),
) -> anyhow::Result<()> {
    match format.export() {
        Some(export) => {
            let wrapped = json!({ "success": true, "data": value });
            println!("{}", render(&wrapped, export)?.trim_end());
        }
        None => human(),
    }
    Ok(())
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format error as JSON: {}", e),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn heading(text: &str) {
    println!("{}", text.bold());
}

pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<24} {}", label.dimmed(), value);
}

/// One planned or sent wire string.
pub fn wire_line(index: usize, label: &str, wire: &str) {
    println!("  {:>3}  {:<32} {}", index, label, wire.cyan());
}

pub fn warning(text: &str) {
    println!("  {} {}", "!".yellow().bold(), text);
}
