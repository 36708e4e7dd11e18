//! Print the wire strings a sequence would send

use anyhow::Result;
use lpu237_settings::import_file;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::commands::{SequenceKind, build, connect};
use crate::config::CliConfig;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct PlannedRequest {
    request: String,
    wire: String,
}

#[derive(Debug, Serialize)]
struct Plan {
    sequence: SequenceKind,
    commit: bool,
    requests: Vec<PlannedRequest>,
}

/// Execute plan command
pub fn execute(
    kind: SequenceKind,
    settings: Option<&Path>,
    config: &CliConfig,
    format: OutputFormat,
) -> Result<()> {
    let (_sim, mut device) = connect(&config.device)?;
    if let Some(path) = settings {
        let report = import_file(device.config_mut(), path)?;
        info!("imported {} settings, {} changed", report.applied, report.changed);
    }

    let sequence = build(&device, kind)?;
    let plan = Plan {
        sequence: kind,
        commit: sequence.is_commit(),
        requests: sequence
            .into_entries()
            .into_iter()
            .map(|(request, wire)| PlannedRequest {
                request: request.to_string(),
                wire,
            })
            .collect(),
    };

    output::emit(format, &plan, || {
        output::heading(&format!("{} ({} requests)", plan.sequence, plan.requests.len()));
        for (index, planned) in plan.requests.iter().enumerate() {
            output::wire_line(index, &planned.request, &planned.wire);
        }
        if plan.requests.is_empty() {
            output::warning("nothing to send");
        }
    })
}
