//! Multi-command sequences.
//!
//! Builders stage every (request, wire) pair in a [`Sequence`] first. Any
//! encoding failure drops the whole sequence, so the engine only ever
//! enqueues complete ones.

use crate::chunked::{self, chunk_bytes};
use crate::config::DeviceConfig;
use crate::error::ProtocolResult;
use crate::field::{ComboParam, Field};
use crate::record::SystemRecord;
use crate::request::{self, Command, Request};
use crate::types::{Combination, Track};
use crate::version::FeatureSet;
use tracing::debug;

/// An ordered, fully encoded list of transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    entries: Vec<(Request, String)>,
    commit: bool,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(&mut self, command: Command) -> &mut Self {
        self.entries.push((Request::Command(command), command.encode()));
        self
    }

    pub fn get(&mut self, field: Field) -> ProtocolResult<&mut Self> {
        let wire = request::build_field_get(field)?;
        self.entries.push((Request::Get(field), wire));
        Ok(self)
    }

    pub fn set(&mut self, field: Field, data: &[u8]) -> ProtocolResult<&mut Self> {
        let wire = request::build_field_set(field, data)?;
        self.entries.push((Request::Set(field), wire));
        Ok(self)
    }

    pub fn push(&mut self, request: Request, wire: String) -> &mut Self {
        self.entries.push((request, wire));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether completing this sequence commits the change tracker.
    pub fn is_commit(&self) -> bool {
        self.commit
    }

    pub fn requests(&self) -> impl Iterator<Item = Request> + '_ {
        self.entries.iter().map(|(request, _)| *request)
    }

    pub fn wires(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(_, wire)| wire.as_str())
    }

    pub fn into_entries(self) -> Vec<(Request, String)> {
        self.entries
    }
}

/// Enter config, identity reads, leave config.
pub fn system_information() -> ProtocolResult<Sequence> {
    let mut seq = Sequence::new();
    seq.command(Command::EnterConfig);
    seq.get(Field::Version)?;
    seq.get(Field::StructureVersion)?;
    seq.command(Command::GetIsStandard);
    seq.command(Command::GetIsIButtonOnly);
    seq.get(Field::Name)?;
    seq.command(Command::LeaveConfig);
    debug!("system information sequence: {} transactions", seq.len());
    Ok(seq)
}

/// Every parameter transaction a full read performs, in device order.
pub fn parameter_requests(features: &FeatureSet) -> Vec<Request> {
    let mut out = vec![
        Request::Command(Command::GetUid),
        Request::Get(Field::Manufacturer),
        Request::Get(Field::Name),
        Request::Get(Field::GlobalSendCondition),
        Request::Get(Field::TrackOrder),
        Request::Command(Command::GetSupportsMmd1000),
        Request::Get(Field::Interface),
        Request::Get(Field::Language),
        Request::Get(Field::Buzzer),
        Request::Get(Field::BootRunTime),
    ];
    if features.ibutton_uart_tags {
        out.extend(
            [
                Field::IButtonPrefix,
                Field::IButtonPostfix,
                Field::UartPrefix,
                Field::UartPostfix,
            ]
            .map(Request::Get),
        );
    }
    if features.ibutton_remove {
        out.extend(
            [
                Field::IButtonRemove,
                Field::IButtonRemovePrefix,
                Field::IButtonRemovePostfix,
            ]
            .map(Request::Get),
        );
    }
    out.extend(
        [Field::Blank, Field::GlobalPrefix, Field::GlobalPostfix].map(Request::Get),
    );
    out.extend(Track::ALL.map(|track| Request::Get(Field::EnableTrack(track))));

    let combinations = Combination::ALL
        .iter()
        .copied()
        .take(features.combination_count());
    for track in Track::ALL {
        for combination in combinations.clone() {
            out.extend(
                ComboParam::ALL.map(|param| Request::Get(Field::Combo(track, combination, param))),
            );
        }
    }
    out
}

/// Whether the gate admits `field` for this firmware.
pub fn field_available(features: &FeatureSet, field: Field) -> bool {
    if field.needs_tag_set() && !features.ibutton_uart_tags {
        return false;
    }
    if field.needs_ibutton_remove() && !features.ibutton_remove {
        return false;
    }
    match field {
        Field::Combo(_, combination, _) => combination.index() < features.combination_count(),
        _ => true,
    }
}

/// Enter config, the version-gated read set, leave config.
pub fn get_parameters(features: &FeatureSet) -> ProtocolResult<Sequence> {
    let mut seq = Sequence::new();
    seq.command(Command::EnterConfig);
    for request in parameter_requests(features) {
        match request {
            Request::Command(command) => {
                seq.command(command);
            }
            Request::Get(field) => {
                seq.get(field)?;
            }
            other => debug!("skipping {other}: not a read"),
        }
    }
    seq.command(Command::LeaveConfig);
    debug!("get parameters sequence: {} transactions", seq.len());
    Ok(seq)
}

/// Fields a set sequence writes, in read order.
///
/// Only dirty fields the gate admits are written. On multi-combination
/// firmware a dirty cell rewrites its whole track's combination block.
pub fn dirty_fields(config: &DeviceConfig) -> Vec<Field> {
    let features = config.features();
    let dirty = config.dirty();
    let block_dirty = |track: Track| {
        features.multi_combination
            && dirty
                .iter()
                .any(|field| matches!(field, Field::Combo(t, _, _) if t == track))
    };
    parameter_requests(features)
        .into_iter()
        .filter_map(|request| match request {
            Request::Get(field) if field.is_writable() => Some(field),
            _ => None,
        })
        .filter(|field| match field {
            Field::Combo(track, _, _) if block_dirty(*track) => true,
            other => dirty.contains(*other),
        })
        .filter(|field| field_available(features, *field))
        .collect()
}

/// Enter config, one set per dirty field, apply, leave config. Empty when
/// nothing is dirty.
pub fn set_parameters(config: &DeviceConfig) -> ProtocolResult<Sequence> {
    let fields = dirty_fields(config);
    let mut seq = Sequence::new();
    if fields.is_empty() {
        debug!("set parameters: nothing dirty");
        return Ok(seq);
    }
    seq.command(Command::EnterConfig);
    for field in fields {
        let data = config.field_bytes(field)?;
        seq.set(field, &data)?;
    }
    seq.command(Command::Apply);
    seq.command(Command::LeaveConfig);
    seq.commit = true;
    debug!("set parameters sequence: {} transactions", seq.len());
    Ok(seq)
}

/// Enter or leave OPOS (read-enabled) mode.
pub fn enable_read(enable: bool) -> Sequence {
    let mut seq = Sequence::new();
    seq.command(if enable {
        Command::EnterOpos
    } else {
        Command::LeaveOpos
    });
    seq
}

/// Enter config, jump to the bootloader.
pub fn run_bootloader() -> Sequence {
    let mut seq = Sequence::new();
    seq.command(Command::EnterConfig).command(Command::GotoBootloader);
    seq
}

/// Enter config, every read slice of the system record, leave config.
pub fn get_record() -> ProtocolResult<Sequence> {
    let mut seq = Sequence::new();
    seq.command(Command::EnterConfig);
    for chunk in chunked::read_chunks() {
        let wire = request::build_config_get(chunk.offset, u32::from(chunk.size))?;
        seq.push(Request::GetRecordChunk(chunk), wire);
    }
    seq.command(Command::LeaveConfig);
    Ok(seq)
}

/// Enter config, every write slice of `record`, apply, leave config.
pub fn set_record(record: &SystemRecord) -> ProtocolResult<Sequence> {
    let image = record.to_bytes();
    let mut seq = Sequence::new();
    seq.command(Command::EnterConfig);
    for chunk in chunked::write_chunks() {
        let data = chunk_bytes(&image, chunk).unwrap_or(&[]);
        let wire =
            request::build_config_set(chunk.offset, u32::from(chunk.size), &hex::encode(data))?;
        seq.push(Request::SetRecordChunk(chunk), wire);
    }
    seq.command(Command::Apply).command(Command::LeaveConfig);
    Ok(seq)
}
