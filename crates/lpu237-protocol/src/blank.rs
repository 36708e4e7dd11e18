//! The four "blank" bytes at the head of the system record.
//!
//! Byte 1 carries independent boolean flags, byte 2 packs the MMD1100 reset
//! interval (upper nibble) and the iButton reading mode (lower nibble). Bytes 0
//! and 3 are not interpreted and are written back exactly as read.

use crate::types::IButtonMode;
use serde::Serialize;

const FLAGS: usize = 1;
const NIBBLES: usize = 2;

const ANY_TRACK_SUCCESS: u8 = 0x01;
const IGNORE_DUPLICATE_ISO1: u8 = 0x02;
const IGNORE_DUPLICATE_ISO3: u8 = 0x04;
const STRIP_LEADING_COLON: u8 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct BlankFlags([u8; 4]);

impl BlankFlags {
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0
    }

    fn byte(&self, index: usize) -> u8 {
        self.0.get(index).copied().unwrap_or(0)
    }

    fn set_byte(&mut self, index: usize, value: u8) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = value;
        }
    }

    fn flag(&self, mask: u8) -> bool {
        self.byte(FLAGS) & mask != 0
    }

    fn with_flag(mut self, mask: u8, on: bool) -> Self {
        let value = if on {
            self.byte(FLAGS) | mask
        } else {
            self.byte(FLAGS) & !mask
        };
        self.set_byte(FLAGS, value);
        self
    }

    pub fn any_track_success_indicates_success(&self) -> bool {
        self.flag(ANY_TRACK_SUCCESS)
    }

    pub fn ignore_duplicate_iso1(&self) -> bool {
        self.flag(IGNORE_DUPLICATE_ISO1)
    }

    pub fn ignore_duplicate_iso3(&self) -> bool {
        self.flag(IGNORE_DUPLICATE_ISO3)
    }

    pub fn strip_leading_colon(&self) -> bool {
        self.flag(STRIP_LEADING_COLON)
    }

    /// Raw upper nibble of byte 2.
    pub fn mmd1100_reset_interval(&self) -> u8 {
        self.byte(NIBBLES) >> 4
    }

    /// `None` when the lower nibble holds a code this crate does not know.
    pub fn ibutton_mode(&self) -> Option<IButtonMode> {
        IButtonMode::from_nibble(self.byte(NIBBLES) & 0x0F)
    }

    pub fn with_any_track_success_indicates_success(self, on: bool) -> Self {
        self.with_flag(ANY_TRACK_SUCCESS, on)
    }

    pub fn with_ignore_duplicate_iso1(self, on: bool) -> Self {
        self.with_flag(IGNORE_DUPLICATE_ISO1, on)
    }

    pub fn with_ignore_duplicate_iso3(self, on: bool) -> Self {
        self.with_flag(IGNORE_DUPLICATE_ISO3, on)
    }

    pub fn with_strip_leading_colon(self, on: bool) -> Self {
        self.with_flag(STRIP_LEADING_COLON, on)
    }

    /// Values above 15 saturate to 15.
    pub fn with_mmd1100_reset_interval(mut self, interval: u8) -> Self {
        let value = (interval.min(0x0F) << 4) | (self.byte(NIBBLES) & 0x0F);
        self.set_byte(NIBBLES, value);
        self
    }

    pub fn with_ibutton_mode(mut self, mode: IButtonMode) -> Self {
        let value = (self.byte(NIBBLES) & 0xF0) | mode.to_nibble();
        self.set_byte(NIBBLES, value);
        self
    }
}
