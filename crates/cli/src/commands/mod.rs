//! Command implementations for lpuctl

pub mod decode;
pub mod plan;
pub mod replay;
pub mod simulate;

use crate::config::DeviceProfile;
use crate::output;
use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use lpu237_protocol::sequence::{self, Sequence};
use lpu237_protocol::transport::mock::SimulatedLpu237;
use lpu237_protocol::{DeviceConfig, Lpu237, ProtocolResult, SystemRecord, Track, drive};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Transaction sequences the engine can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequenceKind {
    SystemInfo,
    GetParameters,
    SetParameters,
    GetRecord,
    SetRecord,
    EnableRead,
    DisableRead,
    Bootloader,
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        f.write_str(&name)
    }
}

#[derive(Subcommand)]
pub enum DecodeCommands {
    /// Decode one response frame
    Response {
        /// Response as hex, e.g. 52ff0405140000
        hex: String,
    },

    /// Decode a card-swipe or iButton report
    Frame {
        /// Raw report bytes as hex
        hex: String,
    },
}

/// The image a set-record sequence writes: the last record read, or the
/// factory image, with the model's writable fields laid over it.
pub fn record_for(device: &Lpu237) -> SystemRecord {
    let mut record = device
        .record()
        .cloned()
        .unwrap_or_else(SystemRecord::factory_default);
    record.overlay(device.config());
    record
}

/// Builds `kind` against the current model without queueing it.
pub fn build(device: &Lpu237, kind: SequenceKind) -> ProtocolResult<Sequence> {
    let config = device.config();
    match kind {
        SequenceKind::SystemInfo => sequence::system_information(),
        SequenceKind::GetParameters => sequence::get_parameters(config.features()),
        SequenceKind::SetParameters => sequence::set_parameters(config),
        SequenceKind::GetRecord => sequence::get_record(),
        SequenceKind::SetRecord => sequence::set_record(&record_for(device)),
        SequenceKind::EnableRead => Ok(sequence::enable_read(true)),
        SequenceKind::DisableRead => Ok(sequence::enable_read(false)),
        SequenceKind::Bootloader => Ok(sequence::run_bootloader()),
    }
}

/// Queues `kind` on the engine. Returns the number of queued transactions.
pub fn generate(device: &mut Lpu237, kind: SequenceKind) -> ProtocolResult<usize> {
    match kind {
        SequenceKind::SystemInfo => device.generate_get_system_information(),
        SequenceKind::GetParameters => device.generate_get_parameters(),
        SequenceKind::SetParameters => device.generate_set_parameters(),
        SequenceKind::GetRecord => device.generate_get_record(),
        SequenceKind::SetRecord => {
            let record = record_for(device);
            device.generate_set_record(&record)
        }
        SequenceKind::EnableRead => Ok(device.generate_enable_read(true)),
        SequenceKind::DisableRead => Ok(device.generate_enable_read(false)),
        SequenceKind::Bootloader => Ok(device.generate_run_bootloader()),
    }
}

/// A simulated reader and a session that has read its identity and
/// parameters.
pub fn connect(profile: &DeviceProfile) -> Result<(SimulatedLpu237, Lpu237)> {
    let mut sim = profile.simulator()?;
    let mut device = Lpu237::new();
    for kind in [SequenceKind::SystemInfo, SequenceKind::GetParameters] {
        generate(&mut device, kind)?;
        let summary = drive(&mut device, &mut sim)
            .with_context(|| format!("{kind} against the simulator"))?;
        info!(
            "{}: {} sent, {} rejected",
            kind, summary.sent, summary.rejected
        );
    }
    Ok((sim, device))
}

/// Human rendering of the configuration model.
pub fn print_config(config: &DeviceConfig) {
    output::heading("Device");
    output::field("name", config.name());
    output::field("firmware", config.version());
    output::field("structure", config.structure_version());
    output::field("uid", config.uid());
    output::field("function", format!("{:?}", config.function()));
    output::field("mmd1000", config.supports_mmd1000());
    output::heading("Parameters");
    output::field("interface", format!("{:?}", config.interface()));
    output::field("language", format!("{:?}", config.language()));
    output::field("buzzer", config.buzzer_count());
    output::field("boot run time (ms)", config.boot_run_time());
    output::field("send condition (all)", config.global_send_condition());
    output::field("global prefix", config.global_prefix());
    output::field("global postfix", config.global_postfix());
    for track in Track::ALL {
        output::field(
            &format!("{track:?} enabled"),
            config.track_enabled(track),
        );
    }
    if !config.dirty().is_empty() {
        output::warning(&format!("{} fields not yet written", config.dirty().len()));
    }
}
