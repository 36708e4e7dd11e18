//! Version vectors and the feature gate derived from them.
//!
//! Firmware and structure versions are four components (major, minor, patch,
//! build) compared most-significant first. Every version-dependent decision
//! in the crate goes through [`FeatureSet`], computed once when the versions
//! are decoded.

use serde::{Serialize, Serializer};
use std::fmt;

const FIRST_BOOTLOADER: Version = Version::new(1, 1, 0, 0);
const FIRST_HID_BOOTLOADER: Version = Version::new(2, 2, 0, 0);
const FIRST_TAG_SET: Version = Version::new(3, 0, 0, 0);
const LAST_KEYMAP_TABLE: Version = Version::new(3, 3, 0, 2);
const MULTI_COMBINATION_V5: Version = Version::new(5, 13, 0, 0);
const MULTI_COMBINATION_V3_FIRST: Version = Version::new(3, 21, 0, 0);
const MULTI_COMBINATION_V3_END: Version = Version::new(4, 0, 0, 0);
const FIRST_IBUTTON_REMOVE_STRUCTURE: Version = Version::new(4, 0, 0, 0);
const MMD1100_FIRST_EXCLUSIVE: Version = Version::new(5, 15, 0, 0);
const MMD1100_END: Version = Version::new(6, 0, 0, 0);

/// Compares two version vectors.
///
/// Inputs shorter than four components are padded with zeros; components past
/// the fourth are ignored. Returns `true` if `first` is greater than `second`,
/// or `or_equal` when all four components match.
pub fn greater(first: &[u8], second: &[u8], or_equal: bool) -> bool {
    for index in 0..4 {
        let a = first.get(index).copied().unwrap_or(0);
        let b = second.get(index).copied().unwrap_or(0);
        if a != b {
            return a > b;
        }
    }
    or_equal
}

/// A four-component version vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Version([u8; 4]);

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8, build: u8) -> Self {
        Self([major, minor, patch, build])
    }

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Builds a version from a slice, zero-padding short input.
    pub fn from_slice(components: &[u8]) -> Self {
        let mut out = [0u8; 4];
        for (slot, value) in out.iter_mut().zip(components) {
            *slot = *value;
        }
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn major(&self) -> u8 {
        self.0[0]
    }

    pub fn minor(&self) -> u8 {
        self.0[1]
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    /// `self > other`, or `self == other` when `or_equal` is set.
    pub fn greater(&self, other: &Version, or_equal: bool) -> bool {
        greater(&self.0, &other.0, or_equal)
    }

    /// Parses `"major.minor.patch.build"`; missing trailing components are zero.
    pub fn parse(text: &str) -> Option<Self> {
        let mut components = Vec::with_capacity(4);
        for part in text.trim().split('.') {
            components.push(part.trim().parse::<u8>().ok()?);
        }
        if components.is_empty() || components.len() > 4 {
            return None;
        }
        Some(Self::from_slice(&components))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch, build] = self.0;
        write!(f, "{major}.{minor}.{patch}.{build}")
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which bootloader the firmware jumps to on `goto-bootloader`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootloaderKind {
    #[default]
    None,
    /// Mass-storage bootloader.
    Msd,
    /// HID bootloader.
    Hid,
}

/// Feature availability derived from the firmware and structure versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FeatureSet {
    pub bootloader: BootloaderKind,
    pub keymap_table_removed: bool,
    pub multi_combination: bool,
    pub ibutton_uart_tags: bool,
    pub ibutton_remove: bool,
    pub mmd1100_reset_interval: bool,
}

impl FeatureSet {
    pub fn from_versions(version: &Version, structure_version: &Version) -> Self {
        let bootloader = if version.greater(&FIRST_HID_BOOTLOADER, false) {
            BootloaderKind::Hid
        } else if version.greater(&FIRST_BOOTLOADER, false) {
            BootloaderKind::Msd
        } else {
            BootloaderKind::None
        };

        let multi_combination = version.greater(&MULTI_COMBINATION_V5, true)
            || (version.greater(&MULTI_COMBINATION_V3_FIRST, true)
                && MULTI_COMBINATION_V3_END.greater(version, false));

        Self {
            bootloader,
            keymap_table_removed: version.greater(&LAST_KEYMAP_TABLE, false),
            multi_combination,
            ibutton_uart_tags: version.greater(&FIRST_TAG_SET, true),
            ibutton_remove: structure_version.greater(&FIRST_IBUTTON_REMOVE_STRUCTURE, true),
            mmd1100_reset_interval: version.greater(&MMD1100_FIRST_EXCLUSIVE, false)
                && MMD1100_END.greater(version, false),
        }
    }

    pub fn hid_bootloader(&self) -> bool {
        self.bootloader == BootloaderKind::Hid
    }

    /// Number of decode-parameter combinations the firmware exposes per track.
    pub fn combination_count(&self) -> usize {
        if self.multi_combination { 3 } else { 1 }
    }
}
