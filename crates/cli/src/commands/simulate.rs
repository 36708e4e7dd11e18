//! Run sequences against the in-memory reader

use anyhow::{Context, Result};
use lpu237_protocol::{DeviceConfig, DriveSummary, drive};
use lpu237_settings::{ImportReport, import_file};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::commands::{SequenceKind, connect, generate, print_config};
use crate::config::CliConfig;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
pub(crate) struct SequenceRun {
    pub sequence: SequenceKind,
    pub queued: usize,
    #[serde(flatten)]
    pub summary: DriveSummary,
}

#[derive(Debug, Serialize)]
struct Simulation<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    import: Option<ImportReport>,
    runs: Vec<SequenceRun>,
    applies: usize,
    config: &'a DeviceConfig,
}

/// Execute simulate command
pub fn execute(
    sequences: &[SequenceKind],
    settings: Option<&Path>,
    config: &CliConfig,
    format: OutputFormat,
) -> Result<()> {
    let (mut sim, mut device) = connect(&config.device)?;
    let import = settings
        .map(|path| import_file(device.config_mut(), path))
        .transpose()?;

    let mut runs = Vec::with_capacity(sequences.len());
    for &kind in sequences {
        let queued = generate(&mut device, kind)?;
        let summary = drive(&mut device, &mut sim)
            .with_context(|| format!("{kind} against the simulator"))?;
        info!("{}: {} applied, {} rejected", kind, summary.applied, summary.rejected);
        runs.push(SequenceRun {
            sequence: kind,
            queued,
            summary,
        });
    }

    let report = Simulation {
        import,
        runs,
        applies: sim.apply_count(),
        config: device.config(),
    };
    output::emit(format, &report, || {
        if let Some(import) = &report.import {
            output::heading("Settings");
            output::field("applied", import.applied);
            output::field("changed", import.changed);
            for skipped in &import.skipped {
                output::warning(&format!(
                    "skipped {}.{} ({})",
                    skipped.element, skipped.attribute, skipped.reason
                ));
            }
        }
        print_runs(&report.runs);
        output::field("applies", report.applies);
        print_config(report.config);
    })
}

pub(crate) fn print_runs(runs: &[SequenceRun]) {
    output::heading("Sequences");
    for run in runs {
        output::field(
            &run.sequence.to_string(),
            format!(
                "{} queued, {} sent, {} applied, {} rejected",
                run.queued, run.summary.sent, run.summary.applied, run.summary.rejected
            ),
        );
    }
}
