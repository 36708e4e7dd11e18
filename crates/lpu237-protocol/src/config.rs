//! In-memory mirror of the device's parameter store.
//!
//! Every public setter compares the new value against the current one and,
//! only on a difference, stores it and marks the field in the change
//! tracker. Values decoded from the device are loaded through crate-private
//! paths that never mark anything.

use crate::blank::BlankFlags;
use crate::error::{ProtocolError, ProtocolResult};
use crate::field::{ComboParam, Field};
use crate::tag::{Tag, TagKind};
use crate::tracker::ChangeTracker;
use crate::types::{
    Combination, DeviceFunction, EcmType, IButtonMode, Interface, Language, Manufacturer,
    Matrix3x3, ParityType, ReadDirection, Track, TrackArray,
};
use crate::version::{FeatureSet, Version};
use crate::wire::Response;
use serde::Serialize;
use tracing::warn;

/// Buzzer setting that keeps the buzzer audible.
pub const BUZZER_ON: u32 = 26_000;
/// Buzzer setting that silences the buzzer.
pub const BUZZER_OFF: u32 = 5_000;

fn update<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// One per-combination parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboValue {
    ReadDirection(ReadDirection),
    MaxSize(u8),
    BitSize(u8),
    DataMask(u8),
    UseParity(bool),
    ParityType(ParityType),
    StxPattern(u8),
    EtxPattern(u8),
    UseEcm(bool),
    EcmType(EcmType),
    AddValue(u8),
    PrivatePrefix(Tag),
    PrivatePostfix(Tag),
}

impl ComboValue {
    pub fn param(&self) -> ComboParam {
        match self {
            Self::ReadDirection(_) => ComboParam::ReadDirection,
            Self::MaxSize(_) => ComboParam::MaxSize,
            Self::BitSize(_) => ComboParam::BitSize,
            Self::DataMask(_) => ComboParam::DataMask,
            Self::UseParity(_) => ComboParam::UseParity,
            Self::ParityType(_) => ComboParam::ParityType,
            Self::StxPattern(_) => ComboParam::StxPattern,
            Self::EtxPattern(_) => ComboParam::EtxPattern,
            Self::UseEcm(_) => ComboParam::UseEcm,
            Self::EcmType(_) => ComboParam::EcmType,
            Self::AddValue(_) => ComboParam::AddValue,
            Self::PrivatePrefix(_) => ComboParam::PrivatePrefix,
            Self::PrivatePostfix(_) => ComboParam::PrivatePostfix,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::ReadDirection(v) => vec![v.to_u8()],
            Self::ParityType(v) => vec![v.to_u8()],
            Self::EcmType(v) => vec![v.to_u8()],
            Self::UseParity(v) | Self::UseEcm(v) => vec![u8::from(*v)],
            Self::MaxSize(v)
            | Self::BitSize(v)
            | Self::DataMask(v)
            | Self::StxPattern(v)
            | Self::EtxPattern(v)
            | Self::AddValue(v) => vec![*v],
            Self::PrivatePrefix(tag) | Self::PrivatePostfix(tag) => tag.to_bytes(),
        }
    }

    /// Decodes one parameter from its raw field bytes.
    pub fn from_bytes(param: ComboParam, data: &[u8]) -> Option<Self> {
        let byte = || match data {
            [value] => Some(*value),
            _ => None,
        };
        let value = match param {
            ComboParam::ReadDirection => Self::ReadDirection(ReadDirection::from_u8(byte()?)?),
            ComboParam::MaxSize => Self::MaxSize(byte()?),
            ComboParam::BitSize => Self::BitSize(byte()?),
            ComboParam::DataMask => Self::DataMask(byte()?),
            ComboParam::UseParity => Self::UseParity(byte()? != 0),
            ComboParam::ParityType => Self::ParityType(ParityType::from_u8(byte()?)?),
            ComboParam::StxPattern => Self::StxPattern(byte()?),
            ComboParam::EtxPattern => Self::EtxPattern(byte()?),
            ComboParam::UseEcm => Self::UseEcm(byte()? != 0),
            ComboParam::EcmType => Self::EcmType(EcmType::from_u8(byte()?)?),
            ComboParam::AddValue => Self::AddValue(byte()?),
            ComboParam::PrivatePrefix => {
                Self::PrivatePrefix(Tag::from_bytes(TagKind::Normal, data).ok()?)
            }
            ComboParam::PrivatePostfix => {
                Self::PrivatePostfix(Tag::from_bytes(TagKind::Normal, data).ok()?)
            }
        };
        Some(value)
    }
}

/// Decode parameters of one (track, combination) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComboParams {
    pub read_direction: ReadDirection,
    pub max_size: u8,
    pub bit_size: u8,
    pub data_mask: u8,
    pub use_parity: bool,
    pub parity_type: ParityType,
    pub stx_pattern: u8,
    pub etx_pattern: u8,
    pub use_ecm: bool,
    pub ecm_type: EcmType,
    pub add_value: u8,
    pub private_prefix: Tag,
    pub private_postfix: Tag,
}

impl Default for ComboParams {
    fn default() -> Self {
        Self {
            read_direction: ReadDirection::default(),
            max_size: 0,
            bit_size: 0,
            data_mask: 0,
            use_parity: false,
            parity_type: ParityType::default(),
            stx_pattern: 0,
            etx_pattern: 0,
            use_ecm: false,
            ecm_type: EcmType::default(),
            add_value: 0,
            private_prefix: Tag::empty(TagKind::Normal),
            private_postfix: Tag::empty(TagKind::Normal),
        }
    }
}

impl ComboParams {
    pub fn value(&self, param: ComboParam) -> ComboValue {
        match param {
            ComboParam::ReadDirection => ComboValue::ReadDirection(self.read_direction),
            ComboParam::MaxSize => ComboValue::MaxSize(self.max_size),
            ComboParam::BitSize => ComboValue::BitSize(self.bit_size),
            ComboParam::DataMask => ComboValue::DataMask(self.data_mask),
            ComboParam::UseParity => ComboValue::UseParity(self.use_parity),
            ComboParam::ParityType => ComboValue::ParityType(self.parity_type),
            ComboParam::StxPattern => ComboValue::StxPattern(self.stx_pattern),
            ComboParam::EtxPattern => ComboValue::EtxPattern(self.etx_pattern),
            ComboParam::UseEcm => ComboValue::UseEcm(self.use_ecm),
            ComboParam::EcmType => ComboValue::EcmType(self.ecm_type),
            ComboParam::AddValue => ComboValue::AddValue(self.add_value),
            ComboParam::PrivatePrefix => ComboValue::PrivatePrefix(self.private_prefix.clone()),
            ComboParam::PrivatePostfix => {
                ComboValue::PrivatePostfix(self.private_postfix.clone())
            }
        }
    }

    /// Stores `value`; returns whether anything changed.
    pub(crate) fn store(&mut self, value: ComboValue) -> bool {
        match value {
            ComboValue::ReadDirection(v) => update(&mut self.read_direction, v),
            ComboValue::MaxSize(v) => update(&mut self.max_size, v),
            ComboValue::BitSize(v) => update(&mut self.bit_size, v),
            ComboValue::DataMask(v) => update(&mut self.data_mask, v),
            ComboValue::UseParity(v) => update(&mut self.use_parity, v),
            ComboValue::ParityType(v) => update(&mut self.parity_type, v),
            ComboValue::StxPattern(v) => update(&mut self.stx_pattern, v),
            ComboValue::EtxPattern(v) => update(&mut self.etx_pattern, v),
            ComboValue::UseEcm(v) => update(&mut self.use_ecm, v),
            ComboValue::EcmType(v) => update(&mut self.ecm_type, v),
            ComboValue::AddValue(v) => update(&mut self.add_value, v),
            ComboValue::PrivatePrefix(tag) => {
                tag.kind() == TagKind::Normal && update(&mut self.private_prefix, tag)
            }
            ComboValue::PrivatePostfix(tag) => {
                tag.kind() == TagKind::Normal && update(&mut self.private_postfix, tag)
            }
        }
    }
}

/// Configuration model of one device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceConfig {
    pub(crate) name: String,
    pub(crate) version: Version,
    pub(crate) structure_version: Version,
    pub(crate) uid: String,
    pub(crate) manufacturer: Manufacturer,
    pub(crate) function: DeviceFunction,
    pub(crate) supports_mmd1000: bool,
    pub(crate) features: FeatureSet,
    pub(crate) global_send_condition: bool,
    pub(crate) track_order: [u8; 3],
    pub(crate) interface: Interface,
    pub(crate) language: Language,
    pub(crate) buzzer_count: u32,
    pub(crate) boot_run_time: u32,
    pub(crate) blank: BlankFlags,
    pub(crate) global_prefix: Tag,
    pub(crate) global_postfix: Tag,
    pub(crate) ibutton_prefix: Tag,
    pub(crate) ibutton_postfix: Tag,
    pub(crate) ibutton_remove: Tag,
    pub(crate) ibutton_remove_prefix: Tag,
    pub(crate) ibutton_remove_postfix: Tag,
    pub(crate) uart_prefix: Tag,
    pub(crate) uart_postfix: Tag,
    pub(crate) track_enabled: TrackArray<bool>,
    pub(crate) combos: Matrix3x3<ComboParams>,
    #[serde(skip)]
    pub(crate) dirty: ChangeTracker,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let normal = Tag::empty(TagKind::Normal);
        Self {
            name: String::new(),
            version: Version::default(),
            structure_version: Version::default(),
            uid: String::new(),
            manufacturer: Manufacturer::default(),
            function: DeviceFunction::default(),
            supports_mmd1000: false,
            features: FeatureSet::default(),
            global_send_condition: false,
            track_order: [0, 1, 2],
            interface: Interface::default(),
            language: Language::default(),
            buzzer_count: 0,
            boot_run_time: 0,
            blank: BlankFlags::default(),
            global_prefix: normal.clone(),
            global_postfix: normal.clone(),
            ibutton_prefix: normal.clone(),
            ibutton_postfix: normal.clone(),
            ibutton_remove: Tag::empty(TagKind::IButtonRemove),
            ibutton_remove_prefix: normal.clone(),
            ibutton_remove_postfix: normal.clone(),
            uart_prefix: normal.clone(),
            uart_postfix: normal,
            track_enabled: TrackArray::default(),
            combos: Matrix3x3::default(),
            dirty: ChangeTracker::new(),
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ── identity ─────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn structure_version(&self) -> Version {
        self.structure_version
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn manufacturer(&self) -> Manufacturer {
        self.manufacturer
    }

    pub fn function(&self) -> DeviceFunction {
        self.function
    }

    pub fn supports_mmd1000(&self) -> bool {
        self.supports_mmd1000
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn dirty(&self) -> &ChangeTracker {
        &self.dirty
    }

    // ── global parameters ───────────────────────────────────────────────

    pub fn global_send_condition(&self) -> bool {
        self.global_send_condition
    }

    pub fn track_order(&self) -> [u8; 3] {
        self.track_order
    }

    pub fn interface(&self) -> Interface {
        self.interface
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn buzzer_count(&self) -> u32 {
        self.buzzer_count
    }

    pub fn boot_run_time(&self) -> u32 {
        self.boot_run_time
    }

    pub fn blank(&self) -> BlankFlags {
        self.blank
    }

    pub fn global_prefix(&self) -> &Tag {
        &self.global_prefix
    }

    pub fn global_postfix(&self) -> &Tag {
        &self.global_postfix
    }

    pub fn ibutton_prefix(&self) -> &Tag {
        &self.ibutton_prefix
    }

    pub fn ibutton_postfix(&self) -> &Tag {
        &self.ibutton_postfix
    }

    pub fn ibutton_remove(&self) -> &Tag {
        &self.ibutton_remove
    }

    pub fn ibutton_remove_prefix(&self) -> &Tag {
        &self.ibutton_remove_prefix
    }

    pub fn ibutton_remove_postfix(&self) -> &Tag {
        &self.ibutton_remove_postfix
    }

    pub fn uart_prefix(&self) -> &Tag {
        &self.uart_prefix
    }

    pub fn uart_postfix(&self) -> &Tag {
        &self.uart_postfix
    }

    pub fn track_enabled(&self, track: Track) -> bool {
        *self.track_enabled.get(track)
    }

    pub fn combo(&self, track: Track, combination: Combination) -> &ComboParams {
        self.combos.get(track, combination)
    }

    // ── setters ─────────────────────────────────────────────────────────

    fn note(&mut self, changed: bool, field: Field) -> bool {
        if changed {
            self.dirty.mark(field);
        }
        changed
    }

    pub fn set_global_send_condition(&mut self, all_tracks: bool) -> bool {
        let changed = update(&mut self.global_send_condition, all_tracks);
        self.note(changed, Field::GlobalSendCondition)
    }

    /// Sets the order tracks are emitted in; ignored unless `order` names
    /// each track exactly once.
    pub fn set_track_order(&mut self, order: [Track; 3]) -> bool {
        let [a, b, c] = order;
        if a == b || b == c || a == c {
            warn!("ignoring track order {:?}: not a permutation", order);
            return false;
        }
        let raw = order.map(|track| u8::try_from(track.index()).unwrap_or(0));
        let changed = update(&mut self.track_order, raw);
        self.note(changed, Field::TrackOrder)
    }

    pub fn set_interface(&mut self, interface: Interface) -> bool {
        let changed = update(&mut self.interface, interface);
        self.note(changed, Field::Interface)
    }

    pub fn set_language(&mut self, language: Language) -> bool {
        let changed = update(&mut self.language, language);
        self.note(changed, Field::Language)
    }

    pub fn set_buzzer_count(&mut self, count: u32) -> bool {
        let changed = update(&mut self.buzzer_count, count);
        self.note(changed, Field::Buzzer)
    }

    pub fn set_boot_run_time(&mut self, run_time_ms: u32) -> bool {
        let changed = update(&mut self.boot_run_time, run_time_ms);
        self.note(changed, Field::BootRunTime)
    }

    fn set_blank(&mut self, blank: BlankFlags) -> bool {
        let changed = update(&mut self.blank, blank);
        self.note(changed, Field::Blank)
    }

    pub fn set_any_track_success_indicates_success(&mut self, on: bool) -> bool {
        self.set_blank(self.blank.with_any_track_success_indicates_success(on))
    }

    pub fn set_ignore_duplicate_iso1(&mut self, on: bool) -> bool {
        self.set_blank(self.blank.with_ignore_duplicate_iso1(on))
    }

    pub fn set_ignore_duplicate_iso3(&mut self, on: bool) -> bool {
        self.set_blank(self.blank.with_ignore_duplicate_iso3(on))
    }

    pub fn set_strip_leading_colon(&mut self, on: bool) -> bool {
        self.set_blank(self.blank.with_strip_leading_colon(on))
    }

    pub fn set_mmd1100_reset_interval(&mut self, interval: u8) -> bool {
        self.set_blank(self.blank.with_mmd1100_reset_interval(interval))
    }

    pub fn set_ibutton_mode(&mut self, mode: IButtonMode) -> bool {
        self.set_blank(self.blank.with_ibutton_mode(mode))
    }

    fn tag_slot(&self, field: Field) -> Option<&Tag> {
        match field {
            Field::GlobalPrefix => Some(&self.global_prefix),
            Field::GlobalPostfix => Some(&self.global_postfix),
            Field::IButtonPrefix => Some(&self.ibutton_prefix),
            Field::IButtonPostfix => Some(&self.ibutton_postfix),
            Field::IButtonRemove => Some(&self.ibutton_remove),
            Field::IButtonRemovePrefix => Some(&self.ibutton_remove_prefix),
            Field::IButtonRemovePostfix => Some(&self.ibutton_remove_postfix),
            Field::UartPrefix => Some(&self.uart_prefix),
            Field::UartPostfix => Some(&self.uart_postfix),
            _ => None,
        }
    }

    fn tag_slot_mut(&mut self, field: Field) -> Option<&mut Tag> {
        match field {
            Field::GlobalPrefix => Some(&mut self.global_prefix),
            Field::GlobalPostfix => Some(&mut self.global_postfix),
            Field::IButtonPrefix => Some(&mut self.ibutton_prefix),
            Field::IButtonPostfix => Some(&mut self.ibutton_postfix),
            Field::IButtonRemove => Some(&mut self.ibutton_remove),
            Field::IButtonRemovePrefix => Some(&mut self.ibutton_remove_prefix),
            Field::IButtonRemovePostfix => Some(&mut self.ibutton_remove_postfix),
            Field::UartPrefix => Some(&mut self.uart_prefix),
            Field::UartPostfix => Some(&mut self.uart_postfix),
            _ => None,
        }
    }

    fn set_tag(&mut self, field: Field, tag: Tag) -> bool {
        let Some(slot) = self.tag_slot_mut(field) else {
            return false;
        };
        if slot.kind() != tag.kind() {
            warn!("ignoring {:?} tag for {}", tag.kind(), field);
            return false;
        }
        let changed = update(slot, tag);
        self.note(changed, field)
    }

    pub fn set_global_prefix(&mut self, tag: Tag) -> bool {
        self.set_tag(Field::GlobalPrefix, tag)
    }

    pub fn set_global_postfix(&mut self, tag: Tag) -> bool {
        self.set_tag(Field::GlobalPostfix, tag)
    }

    pub fn set_ibutton_prefix(&mut self, tag: Tag) -> bool {
        self.set_tag(Field::IButtonPrefix, tag)
    }

    pub fn set_ibutton_postfix(&mut self, tag: Tag) -> bool {
        self.set_tag(Field::IButtonPostfix, tag)
    }

    pub fn set_ibutton_remove(&mut self, tag: Tag) -> bool {
        self.set_tag(Field::IButtonRemove, tag)
    }

    pub fn set_ibutton_remove_prefix(&mut self, tag: Tag) -> bool {
        self.set_tag(Field::IButtonRemovePrefix, tag)
    }

    pub fn set_ibutton_remove_postfix(&mut self, tag: Tag) -> bool {
        self.set_tag(Field::IButtonRemovePostfix, tag)
    }

    pub fn set_uart_prefix(&mut self, tag: Tag) -> bool {
        self.set_tag(Field::UartPrefix, tag)
    }

    pub fn set_uart_postfix(&mut self, tag: Tag) -> bool {
        self.set_tag(Field::UartPostfix, tag)
    }

    pub fn set_track_enabled(&mut self, track: Track, enabled: bool) -> bool {
        let changed = update(self.track_enabled.get_mut(track), enabled);
        self.note(changed, Field::EnableTrack(track))
    }

    /// Index-based variant; out-of-range tracks are a no-op.
    pub fn set_track_enabled_at(&mut self, track: usize, enabled: bool) -> bool {
        match Track::from_index(track) {
            Some(track) => self.set_track_enabled(track, enabled),
            None => false,
        }
    }

    pub fn set_combo(&mut self, track: Track, combination: Combination, value: ComboValue) -> bool {
        let field = Field::Combo(track, combination, value.param());
        let changed = self.combos.get_mut(track, combination).store(value);
        self.note(changed, field)
    }

    /// Index-based variant; out-of-range indices are a no-op.
    pub fn set_combo_at(&mut self, track: usize, combination: usize, value: ComboValue) -> bool {
        match (Track::from_index(track), Combination::from_index(combination)) {
            (Some(track), Some(combination)) => self.set_combo(track, combination, value),
            _ => false,
        }
    }

    // ── wire mapping ────────────────────────────────────────────────────

    /// Raw bytes of a writable field, exactly `field.location().size` long.
    pub fn field_bytes(&self, field: Field) -> ProtocolResult<Vec<u8>> {
        if !field.is_writable() {
            return Err(ProtocolError::ReadOnlyField(field.to_string()));
        }
        let bytes = match field {
            Field::GlobalSendCondition => vec![u8::from(self.global_send_condition)],
            Field::TrackOrder => self.track_order.to_vec(),
            Field::Interface => vec![self.interface.to_u8()],
            Field::Language => self.language.to_u32().to_le_bytes().to_vec(),
            Field::Buzzer => self.buzzer_count.to_le_bytes().to_vec(),
            Field::BootRunTime => self.boot_run_time.to_le_bytes().to_vec(),
            Field::Blank => self.blank.to_bytes().to_vec(),
            Field::EnableTrack(track) => vec![u8::from(self.track_enabled(track))],
            Field::Combo(track, combination, param) => {
                self.combo(track, combination).value(param).to_bytes()
            }
            tag_field => self
                .tag_slot(tag_field)
                .map(Tag::to_bytes)
                .ok_or_else(|| ProtocolError::ReadOnlyField(tag_field.to_string()))?,
        };
        let expected = field.location().len();
        if bytes.len() != expected {
            return Err(ProtocolError::InvalidTag(format!(
                "{field} encodes to {} bytes, location holds {expected}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Loads a field from a get-response without marking it dirty.
    /// Returns `false` (leaving the model untouched) on any mismatch.
    pub(crate) fn load_field(&mut self, field: Field, response: &Response) -> bool {
        let size = field.location().len();
        let byte = |r: &Response| r.uint_le(1).and_then(|v| u8::try_from(v).ok());
        match field {
            Field::Version | Field::StructureVersion => {
                let Some(data) = response.bytes(size) else {
                    return false;
                };
                let version = Version::from_slice(data);
                if field == Field::Version {
                    self.version = version;
                } else {
                    self.structure_version = version;
                }
                self.refresh_features();
                true
            }
            Field::Name => response.ascii(size).map(|name| self.name = name).is_some(),
            Field::Manufacturer => byte(response)
                .map(|v| self.manufacturer = Manufacturer::from_u8(v))
                .is_some(),
            Field::GlobalSendCondition => response
                .flag(size)
                .map(|v| self.global_send_condition = v)
                .is_some(),
            Field::TrackOrder => match response.bytes(size) {
                Some([a, b, c]) => {
                    self.track_order = [*a, *b, *c];
                    true
                }
                _ => false,
            },
            Field::Interface => byte(response)
                .and_then(Interface::from_u8)
                .map(|v| self.interface = v)
                .is_some(),
            Field::Language => response
                .uint_le(size)
                .and_then(Language::from_u32)
                .map(|v| self.language = v)
                .is_some(),
            Field::Buzzer => response
                .uint_le(size)
                .map(|v| self.buzzer_count = v)
                .is_some(),
            Field::BootRunTime => response
                .uint_le(size)
                .map(|v| self.boot_run_time = v)
                .is_some(),
            Field::Blank => match response.bytes(size) {
                Some([a, b, c, d]) => {
                    self.blank = BlankFlags::from_bytes([*a, *b, *c, *d]);
                    true
                }
                _ => false,
            },
            Field::EnableTrack(track) => response
                .flag(size)
                .map(|v| *self.track_enabled.get_mut(track) = v)
                .is_some(),
            Field::Combo(track, combination, param) => {
                match response
                    .bytes(size)
                    .and_then(|data| ComboValue::from_bytes(param, data))
                {
                    Some(value) => {
                        self.combos.get_mut(track, combination).store(value);
                        true
                    }
                    None => false,
                }
            }
            tag_field => {
                let Some(data) = response.bytes(size) else {
                    return false;
                };
                let Some(slot) = self.tag_slot_mut(tag_field) else {
                    return false;
                };
                match Tag::from_bytes(slot.kind(), data) {
                    Ok(tag) => {
                        *slot = tag;
                        true
                    }
                    Err(_) => false,
                }
            }
        }
    }

    pub(crate) fn load_tag(&mut self, field: Field, tag: Tag) {
        if let Some(slot) = self.tag_slot_mut(field)
            && slot.kind() == tag.kind()
        {
            *slot = tag;
        }
    }

    pub(crate) fn refresh_features(&mut self) {
        self.features = FeatureSet::from_versions(&self.version, &self.structure_version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(hex: &str) -> Response {
        Response::parse(hex).expect("test response should parse")
    }

    #[test]
    fn test_setter_marks_once() {
        let mut config = DeviceConfig::new();
        assert!(config.set_interface(Interface::UsbHid));
        assert!(!config.set_interface(Interface::UsbHid));
        assert_eq!(config.dirty().len(), 1);
        assert!(config.dirty().contains(Field::Interface));
    }

    #[test]
    fn test_same_value_marks_nothing() {
        let mut config = DeviceConfig::new();
        assert!(!config.set_language(Language::UsaEnglish));
        assert!(config.dirty().is_empty());
    }

    #[test]
    fn test_revert_keeps_mark() {
        let mut config = DeviceConfig::new();
        config.set_buzzer_count(BUZZER_ON);
        config.set_buzzer_count(0);
        assert_eq!(config.buzzer_count(), 0);
        assert!(config.dirty().contains(Field::Buzzer));
        assert_eq!(config.dirty().len(), 1);
    }

    #[test]
    fn test_combo_setter_marks_cell() {
        let mut config = DeviceConfig::new();
        assert!(config.set_combo(Track::Iso2, Combination::Third, ComboValue::MaxSize(40)));
        assert_eq!(config.combo(Track::Iso2, Combination::Third).max_size, 40);
        assert!(config
            .dirty()
            .contains(Field::Combo(Track::Iso2, Combination::Third, ComboParam::MaxSize)));
        assert_eq!(config.combo(Track::Iso2, Combination::First).max_size, 0);
    }

    #[test]
    fn test_out_of_range_indices_are_noop() {
        let mut config = DeviceConfig::new();
        assert!(!config.set_combo_at(3, 0, ComboValue::MaxSize(1)));
        assert!(!config.set_combo_at(0, 3, ComboValue::MaxSize(1)));
        assert!(!config.set_track_enabled_at(7, true));
        assert!(config.dirty().is_empty());
    }

    #[test]
    fn test_tag_kind_mismatch_ignored() {
        let mut config = DeviceConfig::new();
        let remove = Tag::from_ascii(TagKind::IButtonRemove, "x").expect("tag");
        assert!(!config.set_global_prefix(remove.clone()));
        assert!(config.set_ibutton_remove(remove));
        assert_eq!(config.dirty().len(), 1);
    }

    #[test]
    fn test_blank_setters_share_one_field() {
        let mut config = DeviceConfig::new();
        config.set_ignore_duplicate_iso3(true);
        config.set_ibutton_mode(IButtonMode::F12);
        assert_eq!(config.dirty().len(), 1);
        assert_eq!(config.blank().to_bytes(), [0, 0x04, 0x01, 0]);
    }

    #[test]
    fn test_track_order_requires_permutation() {
        let mut config = DeviceConfig::new();
        assert!(!config.set_track_order([Track::Iso1, Track::Iso1, Track::Iso3]));
        assert!(config.set_track_order([Track::Iso3, Track::Iso2, Track::Iso1]));
        assert_eq!(config.track_order(), [2, 1, 0]);
    }

    #[test]
    fn test_field_bytes_sizes() {
        let config = DeviceConfig::new();
        assert_eq!(config.field_bytes(Field::Language).expect("writable").len(), 4);
        assert_eq!(config.field_bytes(Field::IButtonRemove).expect("writable").len(), 41);
        assert!(matches!(
            config.field_bytes(Field::Version),
            Err(ProtocolError::ReadOnlyField(_))
        ));
    }

    #[test]
    fn test_load_does_not_mark() {
        let mut config = DeviceConfig::new();
        assert!(config.load_field(Field::Interface, &response("52ff010a")));
        assert_eq!(config.interface(), Interface::Rs232);
        assert!(config.dirty().is_empty());
    }

    #[test]
    fn test_load_version_refreshes_features() {
        let mut config = DeviceConfig::new();
        assert!(config.load_field(Field::Version, &response("52ff0405140000")));
        assert_eq!(config.version(), Version::new(5, 20, 0, 0));
        assert!(config.features().multi_combination);
        assert!(config.features().hid_bootloader());
    }

    #[test]
    fn test_load_rejects_wrong_size_and_unknown_codes() {
        let mut config = DeviceConfig::new();
        assert!(!config.load_field(Field::Version, &response("52ff03010106")));
        assert!(!config.load_field(Field::Interface, &response("52ff0163")));
        assert!(!config.load_field(
            Field::Combo(Track::Iso1, Combination::First, ComboParam::EcmType),
            &response("52ff0109"),
        ));
        assert_eq!(config, DeviceConfig::new());
    }

    #[test]
    fn test_load_name_trims_padding() {
        let mut config = DeviceConfig::new();
        let payload = format!("{}{}", hex::encode("LPU237"), "00".repeat(10));
        assert!(config.load_field(Field::Name, &response(&format!("52ff10{payload}"))));
        assert_eq!(config.name(), "LPU237");
    }
}
