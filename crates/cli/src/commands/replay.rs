//! Drive sequences from a file of recorded responses

use anyhow::{Context, Result};
use lpu237_protocol::transport::mock::ScriptedTransport;
use lpu237_protocol::{DeviceConfig, Lpu237, drive};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::commands::simulate::{SequenceRun, print_runs};
use crate::commands::{SequenceKind, generate, print_config};
use crate::error::CliError;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct Replay<'a> {
    runs: Vec<SequenceRun>,
    sent: &'a [String],
    unused_responses: usize,
    config: &'a DeviceConfig,
}

/// One response per line; blank lines and `#` comments are skipped.
pub fn load_responses(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Execute replay command
pub fn execute(responses: &Path, sequences: &[SequenceKind], format: OutputFormat) -> Result<()> {
    let text = fs::read_to_string(responses)
        .with_context(|| format!("reading responses from {}", responses.display()))?;
    let lines = load_responses(&text);
    if lines.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "{} holds no responses",
            responses.display()
        ))
        .into());
    }
    debug!("loaded {} responses", lines.len());

    let mut transport = ScriptedTransport::new(lines);
    let mut device = Lpu237::new();
    let mut runs = Vec::with_capacity(sequences.len());
    for &kind in sequences {
        let queued = generate(&mut device, kind)?;
        let summary = drive(&mut device, &mut transport).map_err(CliError::from)?;
        runs.push(SequenceRun {
            sequence: kind,
            queued,
            summary,
        });
    }

    let report = Replay {
        runs,
        sent: transport.sent(),
        unused_responses: transport.remaining(),
        config: device.config(),
    };
    output::emit(format, &report, || {
        print_runs(&report.runs);
        output::heading("Sent");
        for (index, wire) in report.sent.iter().enumerate() {
            output::wire_line(index, "", wire);
        }
        if report.unused_responses > 0 {
            output::warning(&format!("{} responses left unused", report.unused_responses));
        }
        print_config(report.config);
    })
}
