//! LPU237 domain types: track/combination indices, per-track containers and
//! the enumerated parameter values stored in the device.

use serde::Serialize;

/// One of the three magnetic-stripe channels (ISO1..ISO3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Iso1,
    Iso2,
    Iso3,
}

impl Track {
    pub const ALL: [Track; 3] = [Track::Iso1, Track::Iso2, Track::Iso3];

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Iso1),
            1 => Some(Self::Iso2),
            2 => Some(Self::Iso3),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Iso1 => 0,
            Self::Iso2 => 1,
            Self::Iso3 => 2,
        }
    }

    /// Offset added to each raw frame byte to recover printable ASCII.
    pub fn ascii_offset(self) -> u8 {
        match self {
            Self::Iso1 => 0x20,
            Self::Iso2 | Self::Iso3 => 0x30,
        }
    }
}

/// One of the three alternative decode-parameter profiles of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Combination {
    First,
    Second,
    Third,
}

impl Combination {
    pub const ALL: [Combination; 3] = [Combination::First, Combination::Second, Combination::Third];

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::First),
            1 => Some(Self::Second),
            2 => Some(Self::Third),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
            Self::Third => 2,
        }
    }
}

/// Three values, one per track.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TrackArray<T>([T; 3]);

impl<T> TrackArray<T> {
    pub fn new(values: [T; 3]) -> Self {
        Self(values)
    }

    pub fn get(&self, track: Track) -> &T {
        match track {
            Track::Iso1 => &self.0[0],
            Track::Iso2 => &self.0[1],
            Track::Iso3 => &self.0[2],
        }
    }

    pub fn get_mut(&mut self, track: Track) -> &mut T {
        match track {
            Track::Iso1 => &mut self.0[0],
            Track::Iso2 => &mut self.0[1],
            Track::Iso3 => &mut self.0[2],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Track, &T)> {
        Track::ALL.into_iter().zip(self.0.iter())
    }
}

/// A 3x3 matrix indexed by track then combination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Matrix3x3<T>(TrackArray<[T; 3]>);

impl<T> Matrix3x3<T> {
    pub fn new(rows: [[T; 3]; 3]) -> Self {
        Self(TrackArray::new(rows))
    }

    pub fn get(&self, track: Track, combination: Combination) -> &T {
        let row = self.0.get(track);
        match combination {
            Combination::First => &row[0],
            Combination::Second => &row[1],
            Combination::Third => &row[2],
        }
    }

    pub fn get_mut(&mut self, track: Track, combination: Combination) -> &mut T {
        let row = self.0.get_mut(track);
        match combination {
            Combination::First => &mut row[0],
            Combination::Second => &mut row[1],
            Combination::Third => &mut row[2],
        }
    }
}

impl<T: Copy> Matrix3x3<T> {
    pub fn splat(value: T) -> Self {
        Self(TrackArray([[value; 3]; 3]))
    }
}

/// Host interface the reader emulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interface {
    #[default]
    UsbKeyboard,
    UsbHid,
    Rs232,
    Ps2StandAlone,
    Ps2Bypass,
    ByHwSetting,
}

impl Interface {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::UsbKeyboard),
            1 => Some(Self::UsbHid),
            10 => Some(Self::Rs232),
            20 => Some(Self::Ps2StandAlone),
            21 => Some(Self::Ps2Bypass),
            100 => Some(Self::ByHwSetting),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::UsbKeyboard => 0,
            Self::UsbHid => 1,
            Self::Rs232 => 10,
            Self::Ps2StandAlone => 20,
            Self::Ps2Bypass => 21,
            Self::ByHwSetting => 100,
        }
    }
}

/// Keyboard layout used when the reader emulates a keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    UsaEnglish,
    Spanish,
    Danish,
    French,
    German,
    Italian,
    Norwegian,
    Swedish,
    UkEnglish,
    Israel,
    Turkey,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::UsaEnglish,
        Language::Spanish,
        Language::Danish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Norwegian,
        Language::Swedish,
        Language::UkEnglish,
        Language::Israel,
        Language::Turkey,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::UsaEnglish => 0,
            Self::Spanish => 1,
            Self::Danish => 2,
            Self::French => 3,
            Self::German => 4,
            Self::Italian => 5,
            Self::Norwegian => 6,
            Self::Swedish => 7,
            Self::UkEnglish => 8,
            Self::Israel => 9,
            Self::Turkey => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadDirection {
    #[default]
    Bidirectional,
    Forward,
    Backward,
}

impl ReadDirection {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Bidirectional),
            1 => Some(Self::Forward),
            2 => Some(Self::Backward),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Bidirectional => 0,
            Self::Forward => 1,
            Self::Backward => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParityType {
    #[default]
    Even,
    Odd,
}

impl ParityType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Even),
            1 => Some(Self::Odd),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }
}

/// Error-correction mode applied to track data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EcmType {
    #[default]
    Lrc,
    InvertedLrc,
    Crc,
}

impl EcmType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Lrc),
            1 => Some(Self::InvertedLrc),
            2 => Some(Self::Crc),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Lrc => 0,
            Self::InvertedLrc => 1,
            Self::Crc => 2,
        }
    }
}

/// How the reader formats an iButton key id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IButtonMode {
    #[default]
    Zeros,
    F12,
    Zeros7,
    AddmitCodeStick,
    None,
}

impl IButtonMode {
    pub fn from_nibble(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Zeros),
            1 => Some(Self::F12),
            2 => Some(Self::Zeros7),
            3 => Some(Self::AddmitCodeStick),
            4 => Some(Self::None),
            _ => None,
        }
    }

    pub fn to_nibble(self) -> u8 {
        match self {
            Self::Zeros => 0,
            Self::F12 => 1,
            Self::Zeros7 => 2,
            Self::AddmitCodeStick => 3,
            Self::None => 4,
        }
    }
}

/// Functional classification derived from the probe responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFunction {
    #[default]
    None,
    MsrOnly,
    MsrAndIButton,
    IButtonOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Manufacturer {
    #[default]
    Elpusk,
    Btc,
    Other(u8),
}

impl Manufacturer {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Elpusk,
            1 => Self::Btc,
            other => Self::Other(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Elpusk => 0,
            Self::Btc => 1,
            Self::Other(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_index_roundtrip() {
        for track in Track::ALL {
            assert_eq!(Track::from_index(track.index()), Some(track));
        }
        assert_eq!(Track::from_index(3), None);
        assert_eq!(Combination::from_index(usize::MAX), None);
    }

    #[test]
    fn test_matrix_addresses_cells_independently() {
        let mut m = Matrix3x3::splat(0u8);
        *m.get_mut(Track::Iso2, Combination::Third) = 7;
        assert_eq!(*m.get(Track::Iso2, Combination::Third), 7);
        assert_eq!(*m.get(Track::Iso3, Combination::Second), 0);
    }

    #[test]
    fn test_interface_codes() {
        for raw in [0u8, 1, 10, 20, 21, 100] {
            let iface = Interface::from_u8(raw).expect("known interface code");
            assert_eq!(iface.to_u8(), raw);
        }
        assert_eq!(Interface::from_u8(2), None);
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_u32(8), Some(Language::UkEnglish));
        assert_eq!(Language::from_u32(11), None);
        for lang in Language::ALL {
            assert_eq!(Language::from_u32(lang.to_u32()), Some(lang));
        }
    }

    #[test]
    fn test_manufacturer_keeps_unknown_code() {
        assert_eq!(Manufacturer::from_u8(7), Manufacturer::Other(7));
        assert_eq!(Manufacturer::from_u8(7).to_u8(), 7);
    }

    #[test]
    fn test_ascii_offsets() {
        assert_eq!(Track::Iso1.ascii_offset(), 0x20);
        assert_eq!(Track::Iso3.ascii_offset(), 0x30);
    }
}
