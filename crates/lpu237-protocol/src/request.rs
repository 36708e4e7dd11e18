//! Request types and the command encodings behind them.
//!
//! A [`Request`] is the symbolic half of a queued transaction. The engine
//! pops one alongside each response and dispatches on it, so the enum is the
//! complete list of things this crate knows how to decode.

use crate::error::{ProtocolError, ProtocolResult};
use crate::field::Field;
use crate::memory::Location;
use crate::wire::{self, HexPayload, MAX_PAYLOAD};
use std::fmt;

/// Parameter access command (`'A'`).
pub const CMD_CONFIG: u8 = 0x41;
pub const SUB_GET: u8 = 0xC9;
pub const SUB_SET: u8 = 0xC8;

const ACCESS_HEADER: usize = 8;

/// Zero-payload single-byte commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    EnterConfig,
    LeaveConfig,
    EnterOpos,
    LeaveOpos,
    Apply,
    GotoBootloader,
    GetUid,
    GetIsStandard,
    GetIsIButtonOnly,
    GetSupportsMmd1000,
}

impl Command {
    pub const ALL: [Command; 10] = [
        Command::EnterConfig,
        Command::LeaveConfig,
        Command::EnterOpos,
        Command::LeaveOpos,
        Command::Apply,
        Command::GotoBootloader,
        Command::GetUid,
        Command::GetIsStandard,
        Command::GetIsIButtonOnly,
        Command::GetSupportsMmd1000,
    ];

    pub fn byte(self) -> u8 {
        match self {
            Self::EnterConfig => b'X',
            Self::LeaveConfig => b'Y',
            Self::EnterOpos => b'I',
            Self::LeaveOpos => b'J',
            Self::Apply => b'B',
            Self::GotoBootloader => b'G',
            Self::GetUid => b'U',
            Self::GetIsStandard => b'D',
            Self::GetIsIButtonOnly => b'W',
            Self::GetSupportsMmd1000 => b'N',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.byte() == byte)
    }

    /// `CMD 00 00`.
    pub fn encode(self) -> String {
        wire::encode_request(self.byte(), 0, &HexPayload::default())
    }
}

/// One queued transaction, as the engine sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    Command(Command),
    Get(Field),
    Set(Field),
    /// One slice of the system record read.
    GetRecordChunk(Location),
    /// One slice of the system record write.
    SetRecordChunk(Location),
}

impl Request {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::Set(_) | Self::SetRecordChunk(_) | Self::Command(Command::Apply)
        )
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(command) => write!(f, "{command:?}"),
            Self::Get(field) => write!(f, "get {field}"),
            Self::Set(field) => write!(f, "set {field}"),
            Self::GetRecordChunk(loc) => write!(f, "get record[{}+{}]", loc.offset, loc.size),
            Self::SetRecordChunk(loc) => write!(f, "set record[{}+{}]", loc.offset, loc.size),
        }
    }
}

/// `41 C9 08 OFFSET(4,LE) SIZE(4,LE)`.
pub fn build_config_get(offset: u32, size: u32) -> ProtocolResult<String> {
    let mut data = Vec::with_capacity(ACCESS_HEADER);
    data.extend_from_slice(&offset.to_le_bytes());
    data.extend_from_slice(&size.to_le_bytes());
    let payload = HexPayload::from_bytes(&data)?;
    Ok(wire::encode_request(CMD_CONFIG, SUB_GET, &payload))
}

/// `41 C8 LEN OFFSET(4,LE) SIZE(4,LE) DATA(SIZE)`. The data must hold exactly
/// `size` bytes.
pub fn build_config_set(offset: u32, size: u32, payload_hex: &str) -> ProtocolResult<String> {
    let data = HexPayload::new(payload_hex)?;
    if usize::try_from(size).ok() != Some(data.byte_len()) {
        return Err(ProtocolError::SizeMismatch {
            declared: size,
            actual: data.byte_len(),
        });
    }
    let total = ACCESS_HEADER.saturating_add(data.byte_len());
    if total > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge {
            len: total,
            max: MAX_PAYLOAD,
        });
    }
    let mut header = Vec::with_capacity(ACCESS_HEADER);
    header.extend_from_slice(&offset.to_le_bytes());
    header.extend_from_slice(&size.to_le_bytes());
    let mut payload = hex::encode(header);
    payload.push_str(data.as_str());
    wire::build_request(CMD_CONFIG, SUB_SET, &payload)
}

/// Reads one field at its mapped location.
pub fn build_field_get(field: Field) -> ProtocolResult<String> {
    let Location { offset, size } = field.location();
    build_config_get(offset, u32::from(size))
}

/// Writes `data` to a field's mapped location.
pub fn build_field_set(field: Field, data: &[u8]) -> ProtocolResult<String> {
    let Location { offset, size } = field.location();
    build_config_set(offset, u32::from(size), &hex::encode(data))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Get,
    Set,
}

/// A decoded parameter-access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAccess {
    pub kind: AccessKind,
    pub offset: u32,
    pub size: u32,
    /// Empty for gets.
    pub data: Vec<u8>,
}

/// Inverse of [`build_config_get`] / [`build_config_set`].
pub fn parse_config_request(wire: &str) -> Option<ConfigAccess> {
    let raw = wire::parse_request(wire)?;
    if raw.command != CMD_CONFIG {
        return None;
    }
    let kind = match raw.sub {
        SUB_GET => AccessKind::Get,
        SUB_SET => AccessKind::Set,
        _ => return None,
    };
    let (header, data) = raw.payload.split_at_checked(ACCESS_HEADER)?;
    let (offset, size) = header.split_at_checked(4)?;
    let offset = u32::from_le_bytes(offset.try_into().ok()?);
    let size = u32::from_le_bytes(size.try_into().ok()?);
    match kind {
        AccessKind::Get if !data.is_empty() => None,
        AccessKind::Set if usize::try_from(size).ok() != Some(data.len()) => None,
        _ => Some(ConfigAccess {
            kind,
            offset,
            size,
            data: data.to_vec(),
        }),
    }
}
