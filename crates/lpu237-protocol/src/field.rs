//! Symbolic identifiers for every configuration field.
//!
//! A [`Field`] names exactly one location in the parameter space. Fields are
//! both the payload of get/set requests and the entries of the change
//! tracker.

use crate::memory::{self, Location};
use crate::types::{Combination, Track};
use serde::Serialize;
use std::fmt;

const ENABLE_TRACK_BASE: u16 = 0x20;
const COMBO_BASE: u16 = 0x40;

/// One per-track, per-combination parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboParam {
    ReadDirection,
    MaxSize,
    BitSize,
    DataMask,
    UseParity,
    ParityType,
    StxPattern,
    EtxPattern,
    UseEcm,
    EcmType,
    AddValue,
    PrivatePrefix,
    PrivatePostfix,
}

impl ComboParam {
    /// Read/write order within a combination block.
    pub const ALL: [ComboParam; 13] = [
        ComboParam::ReadDirection,
        ComboParam::MaxSize,
        ComboParam::BitSize,
        ComboParam::DataMask,
        ComboParam::UseParity,
        ComboParam::ParityType,
        ComboParam::StxPattern,
        ComboParam::EtxPattern,
        ComboParam::UseEcm,
        ComboParam::EcmType,
        ComboParam::AddValue,
        ComboParam::PrivatePrefix,
        ComboParam::PrivatePostfix,
    ];

    fn ordinal(self) -> u16 {
        match self {
            Self::ReadDirection => 0,
            Self::MaxSize => 1,
            Self::BitSize => 2,
            Self::DataMask => 3,
            Self::UseParity => 4,
            Self::ParityType => 5,
            Self::StxPattern => 6,
            Self::EtxPattern => 7,
            Self::UseEcm => 8,
            Self::EcmType => 9,
            Self::AddValue => 10,
            Self::PrivatePrefix => 11,
            Self::PrivatePostfix => 12,
        }
    }

    fn table(self) -> &'static [[u32; 3]; 3] {
        match self {
            Self::ReadDirection => &memory::READ_DIRECTION,
            Self::MaxSize => &memory::MAX_SIZE,
            Self::BitSize => &memory::BIT_SIZE,
            Self::DataMask => &memory::DATA_MASK,
            Self::UseParity => &memory::USE_PARITY,
            Self::ParityType => &memory::PARITY_TYPE,
            Self::StxPattern => &memory::STX_PATTERN,
            Self::EtxPattern => &memory::ETX_PATTERN,
            Self::UseEcm => &memory::USE_ECM,
            Self::EcmType => &memory::ECM_TYPE,
            Self::AddValue => &memory::ADD_VALUE,
            Self::PrivatePrefix => &memory::PRIVATE_PREFIX,
            Self::PrivatePostfix => &memory::PRIVATE_POSTFIX,
        }
    }

    fn size(self) -> u8 {
        match self {
            Self::PrivatePrefix | Self::PrivatePostfix => memory::TAG_SIZE,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadDirection => "read_direction",
            Self::MaxSize => "max_size",
            Self::BitSize => "bit_size",
            Self::DataMask => "data_mask",
            Self::UseParity => "use_parity",
            Self::ParityType => "parity_type",
            Self::StxPattern => "stx_pattern",
            Self::EtxPattern => "etx_pattern",
            Self::UseEcm => "use_ecm",
            Self::EcmType => "ecm_type",
            Self::AddValue => "add_value",
            Self::PrivatePrefix => "private_prefix",
            Self::PrivatePostfix => "private_postfix",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Version,
    StructureVersion,
    Name,
    Manufacturer,
    GlobalSendCondition,
    TrackOrder,
    Interface,
    Language,
    Buzzer,
    BootRunTime,
    IButtonPrefix,
    IButtonPostfix,
    UartPrefix,
    UartPostfix,
    IButtonRemove,
    IButtonRemovePrefix,
    IButtonRemovePostfix,
    Blank,
    GlobalPrefix,
    GlobalPostfix,
    EnableTrack(Track),
    Combo(Track, Combination, ComboParam),
}

impl Field {
    pub fn location(self) -> Location {
        match self {
            Self::Version => memory::VERSION,
            Self::StructureVersion => memory::STRUCTURE_VERSION,
            Self::Name => memory::NAME,
            Self::Manufacturer => memory::MANUFACTURER,
            Self::GlobalSendCondition => memory::GLOBAL_SEND_CONDITION,
            Self::TrackOrder => memory::TRACK_ORDER,
            Self::Interface => memory::INTERFACE,
            Self::Language => memory::LANGUAGE,
            Self::Buzzer => memory::BUZZER,
            Self::BootRunTime => memory::BOOT_RUN_TIME,
            Self::IButtonPrefix => memory::IBUTTON_PREFIX,
            Self::IButtonPostfix => memory::IBUTTON_POSTFIX,
            Self::UartPrefix => memory::UART_PREFIX,
            Self::UartPostfix => memory::UART_POSTFIX,
            Self::IButtonRemove => memory::IBUTTON_REMOVE,
            Self::IButtonRemovePrefix => memory::IBUTTON_REMOVE_PREFIX,
            Self::IButtonRemovePostfix => memory::IBUTTON_REMOVE_POSTFIX,
            Self::Blank => memory::BLANK,
            Self::GlobalPrefix => memory::GLOBAL_PREFIX,
            Self::GlobalPostfix => memory::GLOBAL_POSTFIX,
            Self::EnableTrack(track) => {
                Location::new(memory::per_track(&memory::ENABLE_TRACK, track), 1)
            }
            Self::Combo(track, combination, param) => Location::new(
                memory::per_combination(param.table(), track, combination),
                param.size(),
            ),
        }
    }

    /// Identity fields are read from the device but never written back.
    pub fn is_writable(self) -> bool {
        !matches!(
            self,
            Self::Version | Self::StructureVersion | Self::Name | Self::Manufacturer
        )
    }

    /// Numeric tag: `base + track * 3 + combination` for matrix fields.
    pub fn code(self) -> u16 {
        let cell = |track: Track, combination: u16| {
            u16::try_from(track.index()).unwrap_or(0) * 3 + combination
        };
        match self {
            Self::EnableTrack(track) => ENABLE_TRACK_BASE + cell(track, 0),
            Self::Combo(track, combination, param) => {
                let combination = u16::try_from(combination.index()).unwrap_or(0);
                COMBO_BASE + param.ordinal() * 9 + cell(track, combination)
            }
            scalar => scalar.scalar_ordinal(),
        }
    }

    fn scalar_ordinal(self) -> u16 {
        match self {
            Self::Version => 0,
            Self::StructureVersion => 1,
            Self::Name => 2,
            Self::Manufacturer => 3,
            Self::GlobalSendCondition => 4,
            Self::TrackOrder => 5,
            Self::Interface => 6,
            Self::Language => 7,
            Self::Buzzer => 8,
            Self::BootRunTime => 9,
            Self::IButtonPrefix => 10,
            Self::IButtonPostfix => 11,
            Self::UartPrefix => 12,
            Self::UartPostfix => 13,
            Self::IButtonRemove => 14,
            Self::IButtonRemovePrefix => 15,
            Self::IButtonRemovePostfix => 16,
            Self::Blank => 17,
            Self::GlobalPrefix => 18,
            Self::GlobalPostfix => 19,
            Self::EnableTrack(_) | Self::Combo(..) => u16::MAX,
        }
    }

    /// Fields that need firmware 3.0.0.0 or newer.
    pub(crate) fn needs_tag_set(self) -> bool {
        matches!(
            self,
            Self::IButtonPrefix | Self::IButtonPostfix | Self::UartPrefix | Self::UartPostfix
        )
    }

    /// Fields that need structure version 4.0.0.0 or newer.
    pub(crate) fn needs_ibutton_remove(self) -> bool {
        matches!(
            self,
            Self::IButtonRemove | Self::IButtonRemovePrefix | Self::IButtonRemovePostfix
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnableTrack(track) => write!(f, "iso{}.enable", track.index() + 1),
            Self::Combo(track, combination, param) => write!(
                f,
                "iso{}.combination{}.{}",
                track.index() + 1,
                combination.index(),
                param.name()
            ),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_fields() -> Vec<Field> {
        let mut fields = vec![
            Field::Version,
            Field::StructureVersion,
            Field::Name,
            Field::Manufacturer,
            Field::GlobalSendCondition,
            Field::TrackOrder,
            Field::Interface,
            Field::Language,
            Field::Buzzer,
            Field::BootRunTime,
            Field::IButtonPrefix,
            Field::IButtonPostfix,
            Field::UartPrefix,
            Field::UartPostfix,
            Field::IButtonRemove,
            Field::IButtonRemovePrefix,
            Field::IButtonRemovePostfix,
            Field::Blank,
            Field::GlobalPrefix,
            Field::GlobalPostfix,
        ];
        for track in Track::ALL {
            fields.push(Field::EnableTrack(track));
            for combination in Combination::ALL {
                for param in ComboParam::ALL {
                    fields.push(Field::Combo(track, combination, param));
                }
            }
        }
        fields
    }

    #[test]
    fn test_codes_are_unique() {
        let fields = all_fields();
        let codes: HashSet<u16> = fields.iter().map(|f| f.code()).collect();
        assert_eq!(codes.len(), fields.len());
    }

    #[test]
    fn test_matrix_code_layout() {
        let base = Field::Combo(Track::Iso1, Combination::First, ComboParam::MaxSize).code();
        let cell = Field::Combo(Track::Iso3, Combination::Second, ComboParam::MaxSize).code();
        assert_eq!(cell - base, 2 * 3 + 1);
    }

    #[test]
    fn test_locations_match_memory_map() {
        let loc = Field::Combo(Track::Iso2, Combination::First, ComboParam::MaxSize).location();
        assert_eq!(loc, Location::new(361, 1));
        let loc = Field::Combo(Track::Iso3, Combination::Third, ComboParam::PrivatePostfix)
            .location();
        assert_eq!(loc, Location::new(635, 15));
        assert_eq!(Field::EnableTrack(Track::Iso2).location(), Location::new(337, 1));
    }

    #[test]
    fn test_identity_fields_read_only() {
        assert!(!Field::Version.is_writable());
        assert!(!Field::Name.is_writable());
        assert!(Field::Interface.is_writable());
        assert!(Field::EnableTrack(Track::Iso1).is_writable());
    }

    #[test]
    fn test_display_names() {
        let field = Field::Combo(Track::Iso1, Combination::Third, ComboParam::EcmType);
        assert_eq!(field.to_string(), "iso1.combination2.ecm_type");
        assert_eq!(Field::Blank.to_string(), "Blank");
    }
}
