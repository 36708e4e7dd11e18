//! The 953-byte system record: the device's whole parameter store as one
//! fixed-layout struct.
//!
//! Every byte of the image has a home in [`SystemRecord`], including reserved
//! regions, so `to_bytes(from_bytes(image)) == image` for any valid image.

use crate::blank::BlankFlags;
use crate::bytes::{ByteReader, ByteWriter};
use crate::config::{BUZZER_ON, ComboValue, DeviceConfig};
use crate::error::{ProtocolError, ProtocolResult};
use crate::field::{ComboParam, Field};
use crate::memory::{self, RECORD_SIZE};
use crate::tag::{Tag, TagKind};
use crate::types::{Combination, Interface, Language, Manufacturer, Track, TrackArray};
use crate::version::Version;
use tracing::warn;

const TAG: usize = memory::TAG_SIZE as usize;
const REMOVE_TAG: usize = memory::REMOVE_TAG_SIZE as usize;
const HEADER_RESERVED: usize = 48;
const TRACK_RESERVED: usize = 61;
const TAIL_RESERVED: usize = 111;

type TagBytes = [u8; TAG];

fn cell(row: &[u8; 3], combination: Combination) -> u8 {
    match combination {
        Combination::First => row[0],
        Combination::Second => row[1],
        Combination::Third => row[2],
    }
}

fn cell_mut(row: &mut [u8; 3], combination: Combination) -> &mut u8 {
    match combination {
        Combination::First => &mut row[0],
        Combination::Second => &mut row[1],
        Combination::Third => &mut row[2],
    }
}

fn tag_cell(row: &[TagBytes; 3], combination: Combination) -> &TagBytes {
    match combination {
        Combination::First => &row[0],
        Combination::Second => &row[1],
        Combination::Third => &row[2],
    }
}

fn tag_cell_mut(row: &mut [TagBytes; 3], combination: Combination) -> &mut TagBytes {
    match combination {
        Combination::First => &mut row[0],
        Combination::Second => &mut row[1],
        Combination::Third => &mut row[2],
    }
}

fn copy_into<const N: usize>(slot: &mut [u8; N], data: &[u8]) {
    let mut out = [0u8; N];
    for (target, value) in out.iter_mut().zip(data) {
        *target = *value;
    }
    *slot = out;
}

/// One 187-byte per-track block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub enable: u8,
    pub reserved_head: [u8; 2],
    pub read_direction: [u8; 3],
    pub bit_size: [u8; 3],
    pub data_mask: [u8; 3],
    pub use_parity: [u8; 3],
    pub parity_type: [u8; 3],
    pub stx_pattern: [u8; 3],
    pub etx_pattern: [u8; 3],
    pub max_size: [u8; 3],
    pub use_ecm: [u8; 3],
    pub ecm_type: [u8; 3],
    pub add_value: [u8; 3],
    pub private_prefix: [TagBytes; 3],
    pub private_postfix: [TagBytes; 3],
    pub reserved: Vec<u8>,
}

impl TrackRecord {
    fn zeroed() -> Self {
        Self {
            enable: 0,
            reserved_head: [0; 2],
            read_direction: [0; 3],
            bit_size: [0; 3],
            data_mask: [0; 3],
            use_parity: [0; 3],
            parity_type: [0; 3],
            stx_pattern: [0; 3],
            etx_pattern: [0; 3],
            max_size: [0; 3],
            use_ecm: [0; 3],
            ecm_type: [0; 3],
            add_value: [0; 3],
            private_prefix: [[0; TAG]; 3],
            private_postfix: [[0; TAG]; 3],
            reserved: vec![0; TRACK_RESERVED],
        }
    }

    /// ISO 7811 defaults for the first combination of `track`.
    fn iso_default(track: Track) -> Self {
        let (max_size, bit_size, data_mask, stx, etx) = match track {
            Track::Iso1 => (76, 7, 0x3F, 0x05, 0x1F),
            Track::Iso2 => (37, 5, 0x0F, 0x0B, 0x0F),
            Track::Iso3 => (104, 5, 0x0F, 0x0B, 0x0F),
        };
        let mut record = Self::zeroed();
        record.enable = 1;
        record.max_size = [max_size, 0, 0];
        record.bit_size = [bit_size, 0, 0];
        record.data_mask = [data_mask, 0, 0];
        record.use_parity = [1, 0, 0];
        record.parity_type = [1, 0, 0];
        record.stx_pattern = [stx, 0, 0];
        record.etx_pattern = [etx, 0, 0];
        record.use_ecm = [1, 0, 0];
        record.add_value = [track.ascii_offset(), 0, 0];
        record
    }

    fn read(reader: &mut ByteReader<'_>) -> ProtocolResult<Self> {
        Ok(Self {
            enable: reader.read_u8()?,
            reserved_head: reader.read_array()?,
            read_direction: reader.read_array()?,
            bit_size: reader.read_array()?,
            data_mask: reader.read_array()?,
            use_parity: reader.read_array()?,
            parity_type: reader.read_array()?,
            stx_pattern: reader.read_array()?,
            etx_pattern: reader.read_array()?,
            max_size: reader.read_array()?,
            use_ecm: reader.read_array()?,
            ecm_type: reader.read_array()?,
            add_value: reader.read_array()?,
            private_prefix: [reader.read_array()?, reader.read_array()?, reader.read_array()?],
            private_postfix: [reader.read_array()?, reader.read_array()?, reader.read_array()?],
            reserved: reader.read_bytes(TRACK_RESERVED)?.to_vec(),
        })
    }

    fn write(&self, out: &mut ByteWriter) {
        out.write_u8(self.enable)
            .write_bytes(&self.reserved_head)
            .write_bytes(&self.read_direction)
            .write_bytes(&self.bit_size)
            .write_bytes(&self.data_mask)
            .write_bytes(&self.use_parity)
            .write_bytes(&self.parity_type)
            .write_bytes(&self.stx_pattern)
            .write_bytes(&self.etx_pattern)
            .write_bytes(&self.max_size)
            .write_bytes(&self.use_ecm)
            .write_bytes(&self.ecm_type)
            .write_bytes(&self.add_value);
        for tag in self.private_prefix.iter().chain(&self.private_postfix) {
            out.write_bytes(tag);
        }
        out.write_fixed(&self.reserved, TRACK_RESERVED);
    }

    fn row(&self, param: ComboParam) -> Option<&[u8; 3]> {
        match param {
            ComboParam::ReadDirection => Some(&self.read_direction),
            ComboParam::MaxSize => Some(&self.max_size),
            ComboParam::BitSize => Some(&self.bit_size),
            ComboParam::DataMask => Some(&self.data_mask),
            ComboParam::UseParity => Some(&self.use_parity),
            ComboParam::ParityType => Some(&self.parity_type),
            ComboParam::StxPattern => Some(&self.stx_pattern),
            ComboParam::EtxPattern => Some(&self.etx_pattern),
            ComboParam::UseEcm => Some(&self.use_ecm),
            ComboParam::EcmType => Some(&self.ecm_type),
            ComboParam::AddValue => Some(&self.add_value),
            ComboParam::PrivatePrefix | ComboParam::PrivatePostfix => None,
        }
    }

    fn row_mut(&mut self, param: ComboParam) -> Option<&mut [u8; 3]> {
        match param {
            ComboParam::ReadDirection => Some(&mut self.read_direction),
            ComboParam::MaxSize => Some(&mut self.max_size),
            ComboParam::BitSize => Some(&mut self.bit_size),
            ComboParam::DataMask => Some(&mut self.data_mask),
            ComboParam::UseParity => Some(&mut self.use_parity),
            ComboParam::ParityType => Some(&mut self.parity_type),
            ComboParam::StxPattern => Some(&mut self.stx_pattern),
            ComboParam::EtxPattern => Some(&mut self.etx_pattern),
            ComboParam::UseEcm => Some(&mut self.use_ecm),
            ComboParam::EcmType => Some(&mut self.ecm_type),
            ComboParam::AddValue => Some(&mut self.add_value),
            ComboParam::PrivatePrefix | ComboParam::PrivatePostfix => None,
        }
    }

    /// Raw bytes of one combination parameter.
    pub fn param_bytes(&self, param: ComboParam, combination: Combination) -> Vec<u8> {
        match (param, self.row(param)) {
            (_, Some(row)) => vec![cell(row, combination)],
            (ComboParam::PrivatePrefix, None) => {
                tag_cell(&self.private_prefix, combination).to_vec()
            }
            (_, None) => tag_cell(&self.private_postfix, combination).to_vec(),
        }
    }

    fn set_param_bytes(&mut self, param: ComboParam, combination: Combination, data: &[u8]) {
        match param {
            ComboParam::PrivatePrefix => {
                copy_into(tag_cell_mut(&mut self.private_prefix, combination), data);
            }
            ComboParam::PrivatePostfix => {
                copy_into(tag_cell_mut(&mut self.private_postfix, combination), data);
            }
            scalar => {
                if let (Some(row), Some(value)) = (self.row_mut(scalar), data.first()) {
                    *cell_mut(row, combination) = *value;
                }
            }
        }
    }
}

/// The complete parameter store image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemRecord {
    pub blank: BlankFlags,
    pub structure_version: Version,
    pub name: [u8; 16],
    pub version: Version,
    pub boot_mode: u8,
    pub app_mode: u8,
    pub serial: [u8; 8],
    pub interface: u8,
    pub buzzer_count: u32,
    pub watchdog: u32,
    pub boot_run_time: u32,
    pub uart_port: u32,
    pub uart_baud: u32,
    pub global_send_condition: u8,
    pub track_order: [u8; 3],
    pub language: u32,
    pub global_prefix: TagBytes,
    pub global_postfix: TagBytes,
    pub manufacturer: u8,
    pub header_reserved: Vec<u8>,
    pub tracks: TrackArray<TrackRecord>,
    pub ibutton_prefix: TagBytes,
    pub ibutton_postfix: TagBytes,
    pub uart_prefix: TagBytes,
    pub uart_postfix: TagBytes,
    pub ibutton_remove: [u8; REMOVE_TAG],
    pub ibutton_remove_prefix: TagBytes,
    pub ibutton_remove_postfix: TagBytes,
    pub tail_reserved: Vec<u8>,
}

impl SystemRecord {
    /// Image of a freshly flashed reader.
    pub fn factory_default() -> Self {
        let mut name = [0u8; 16];
        copy_into(&mut name, b"LPU237");
        Self {
            blank: BlankFlags::default(),
            structure_version: Version::new(4, 0, 0, 0),
            name,
            version: Version::new(5, 20, 0, 0),
            boot_mode: 0,
            app_mode: 0,
            serial: [0; 8],
            interface: Interface::UsbKeyboard.to_u8(),
            buzzer_count: BUZZER_ON,
            watchdog: 0,
            boot_run_time: 15_000,
            uart_port: 0,
            uart_baud: 115_200,
            global_send_condition: 0,
            track_order: [0, 1, 2],
            language: Language::UsaEnglish.to_u32(),
            global_prefix: [0; TAG],
            global_postfix: [0; TAG],
            manufacturer: Manufacturer::Elpusk.to_u8(),
            header_reserved: vec![0; HEADER_RESERVED],
            tracks: TrackArray::new(Track::ALL.map(TrackRecord::iso_default)),
            ibutton_prefix: [0; TAG],
            ibutton_postfix: [0; TAG],
            uart_prefix: [0; TAG],
            uart_postfix: [0; TAG],
            ibutton_remove: [0; REMOVE_TAG],
            ibutton_remove_prefix: [0; TAG],
            ibutton_remove_postfix: [0; TAG],
            tail_reserved: vec![0; TAIL_RESERVED],
        }
    }

    /// Deserializes an image of exactly [`RECORD_SIZE`] bytes whose size
    /// field agrees with the layout.
    pub fn from_bytes(data: &[u8]) -> ProtocolResult<Self> {
        if data.len() < RECORD_SIZE {
            return Err(ProtocolError::RecordTooShort {
                expected: RECORD_SIZE,
                actual: data.len(),
            });
        }
        if data.len() > RECORD_SIZE {
            return Err(ProtocolError::RecordTooLong {
                expected: RECORD_SIZE,
                actual: data.len(),
            });
        }

        let mut r = ByteReader::new(data);
        let blank = BlankFlags::from_bytes(r.read_array()?);
        let declared = r.read_u32_le()?;
        if usize::try_from(declared).ok() != Some(RECORD_SIZE) {
            return Err(ProtocolError::RecordSizeMismatch {
                declared,
                expected: RECORD_SIZE,
            });
        }

        let record = Self {
            blank,
            structure_version: Version::from_bytes(r.read_array()?),
            name: r.read_array()?,
            version: Version::from_bytes(r.read_array()?),
            boot_mode: r.read_u8()?,
            app_mode: r.read_u8()?,
            serial: r.read_array()?,
            interface: r.read_u8()?,
            buzzer_count: r.read_u32_le()?,
            watchdog: r.read_u32_le()?,
            boot_run_time: r.read_u32_le()?,
            uart_port: r.read_u32_le()?,
            uart_baud: r.read_u32_le()?,
            global_send_condition: r.read_u8()?,
            track_order: r.read_array()?,
            language: r.read_u32_le()?,
            global_prefix: r.read_array()?,
            global_postfix: r.read_array()?,
            manufacturer: r.read_u8()?,
            header_reserved: r.read_bytes(HEADER_RESERVED)?.to_vec(),
            tracks: TrackArray::new([
                TrackRecord::read(&mut r)?,
                TrackRecord::read(&mut r)?,
                TrackRecord::read(&mut r)?,
            ]),
            ibutton_prefix: r.read_array()?,
            ibutton_postfix: r.read_array()?,
            uart_prefix: r.read_array()?,
            uart_postfix: r.read_array()?,
            ibutton_remove: r.read_array()?,
            ibutton_remove_prefix: r.read_array()?,
            ibutton_remove_postfix: r.read_array()?,
            tail_reserved: r.read_bytes(TAIL_RESERVED)?.to_vec(),
        };
        debug_assert_eq!(r.remaining(), 0);
        Ok(record)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = ByteWriter::with_capacity(RECORD_SIZE);
        let size_field = u32::try_from(RECORD_SIZE).unwrap_or(u32::MAX);
        out.write_bytes(&self.blank.to_bytes())
            .write_u32_le(size_field)
            .write_bytes(self.structure_version.as_bytes())
            .write_bytes(&self.name)
            .write_bytes(self.version.as_bytes())
            .write_u8(self.boot_mode)
            .write_u8(self.app_mode)
            .write_bytes(&self.serial)
            .write_u8(self.interface)
            .write_u32_le(self.buzzer_count)
            .write_u32_le(self.watchdog)
            .write_u32_le(self.boot_run_time)
            .write_u32_le(self.uart_port)
            .write_u32_le(self.uart_baud)
            .write_u8(self.global_send_condition)
            .write_bytes(&self.track_order)
            .write_u32_le(self.language)
            .write_bytes(&self.global_prefix)
            .write_bytes(&self.global_postfix)
            .write_u8(self.manufacturer)
            .write_fixed(&self.header_reserved, HEADER_RESERVED);
        for (_, track) in self.tracks.iter() {
            track.write(&mut out);
        }
        out.write_bytes(&self.ibutton_prefix)
            .write_bytes(&self.ibutton_postfix)
            .write_bytes(&self.uart_prefix)
            .write_bytes(&self.uart_postfix)
            .write_bytes(&self.ibutton_remove)
            .write_bytes(&self.ibutton_remove_prefix)
            .write_bytes(&self.ibutton_remove_postfix)
            .write_fixed(&self.tail_reserved, TAIL_RESERVED);
        out.into_inner()
    }

    /// Name up to the first NUL.
    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|b| *b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(self.name.get(..end).unwrap_or(&[])).into_owned()
    }

    /// Raw bytes the record holds for `field`.
    pub fn field_bytes(&self, field: Field) -> Vec<u8> {
        match field {
            Field::Version => self.version.as_bytes().to_vec(),
            Field::StructureVersion => self.structure_version.as_bytes().to_vec(),
            Field::Name => self.name.to_vec(),
            Field::Manufacturer => vec![self.manufacturer],
            Field::GlobalSendCondition => vec![self.global_send_condition],
            Field::TrackOrder => self.track_order.to_vec(),
            Field::Interface => vec![self.interface],
            Field::Language => self.language.to_le_bytes().to_vec(),
            Field::Buzzer => self.buzzer_count.to_le_bytes().to_vec(),
            Field::BootRunTime => self.boot_run_time.to_le_bytes().to_vec(),
            Field::IButtonPrefix => self.ibutton_prefix.to_vec(),
            Field::IButtonPostfix => self.ibutton_postfix.to_vec(),
            Field::UartPrefix => self.uart_prefix.to_vec(),
            Field::UartPostfix => self.uart_postfix.to_vec(),
            Field::IButtonRemove => self.ibutton_remove.to_vec(),
            Field::IButtonRemovePrefix => self.ibutton_remove_prefix.to_vec(),
            Field::IButtonRemovePostfix => self.ibutton_remove_postfix.to_vec(),
            Field::Blank => self.blank.to_bytes().to_vec(),
            Field::GlobalPrefix => self.global_prefix.to_vec(),
            Field::GlobalPostfix => self.global_postfix.to_vec(),
            Field::EnableTrack(track) => vec![self.tracks.get(track).enable],
            Field::Combo(track, combination, param) => {
                self.tracks.get(track).param_bytes(param, combination)
            }
        }
    }

    /// Copies the writable fields of `config` over this image.
    pub fn overlay(&mut self, config: &DeviceConfig) {
        self.blank = config.blank();
        self.global_send_condition = u8::from(config.global_send_condition());
        self.track_order = config.track_order();
        self.interface = config.interface().to_u8();
        self.language = config.language().to_u32();
        self.buzzer_count = config.buzzer_count();
        self.boot_run_time = config.boot_run_time();
        copy_into(&mut self.global_prefix, &config.global_prefix().to_bytes());
        copy_into(&mut self.global_postfix, &config.global_postfix().to_bytes());
        copy_into(&mut self.ibutton_prefix, &config.ibutton_prefix().to_bytes());
        copy_into(&mut self.ibutton_postfix, &config.ibutton_postfix().to_bytes());
        copy_into(&mut self.uart_prefix, &config.uart_prefix().to_bytes());
        copy_into(&mut self.uart_postfix, &config.uart_postfix().to_bytes());
        copy_into(&mut self.ibutton_remove, &config.ibutton_remove().to_bytes());
        copy_into(&mut self.ibutton_remove_prefix, &config.ibutton_remove_prefix().to_bytes());
        copy_into(&mut self.ibutton_remove_postfix, &config.ibutton_remove_postfix().to_bytes());
        for track in Track::ALL {
            let block = self.tracks.get_mut(track);
            block.enable = u8::from(config.track_enabled(track));
            for combination in Combination::ALL {
                let params = config.combo(track, combination);
                for param in ComboParam::ALL {
                    block.set_param_bytes(param, combination, &params.value(param).to_bytes());
                }
            }
        }
    }

    /// Loads the image into `config` without marking any field dirty.
    /// Values outside their domain are skipped with a warning.
    pub fn apply_to(&self, config: &mut DeviceConfig) {
        config.name = self.name_str();
        config.version = self.version;
        config.structure_version = self.structure_version;
        config.manufacturer = Manufacturer::from_u8(self.manufacturer);
        config.blank = self.blank;
        config.global_send_condition = self.global_send_condition != 0;
        config.track_order = self.track_order;
        match Interface::from_u8(self.interface) {
            Some(interface) => config.interface = interface,
            None => warn!("record holds unknown interface code {}", self.interface),
        }
        match Language::from_u32(self.language) {
            Some(language) => config.language = language,
            None => warn!("record holds unknown language code {}", self.language),
        }
        config.buzzer_count = self.buzzer_count;
        config.boot_run_time = self.boot_run_time;

        let tags: [(Field, &[u8], TagKind); 9] = [
            (Field::GlobalPrefix, &self.global_prefix, TagKind::Normal),
            (Field::GlobalPostfix, &self.global_postfix, TagKind::Normal),
            (Field::IButtonPrefix, &self.ibutton_prefix, TagKind::Normal),
            (Field::IButtonPostfix, &self.ibutton_postfix, TagKind::Normal),
            (Field::UartPrefix, &self.uart_prefix, TagKind::Normal),
            (Field::UartPostfix, &self.uart_postfix, TagKind::Normal),
            (Field::IButtonRemove, &self.ibutton_remove, TagKind::IButtonRemove),
            (Field::IButtonRemovePrefix, &self.ibutton_remove_prefix, TagKind::Normal),
            (Field::IButtonRemovePostfix, &self.ibutton_remove_postfix, TagKind::Normal),
        ];
        for (field, data, kind) in tags {
            match Tag::from_bytes(kind, data) {
                Ok(tag) => config.load_tag(field, tag),
                Err(e) => warn!("record holds malformed {field} tag: {e}"),
            }
        }

        for track in Track::ALL {
            let block = self.tracks.get(track);
            *config.track_enabled.get_mut(track) = block.enable != 0;
            for combination in Combination::ALL {
                for param in ComboParam::ALL {
                    let data = block.param_bytes(param, combination);
                    match ComboValue::from_bytes(param, &data) {
                        Some(value) => {
                            config.combos.get_mut(track, combination).store(value);
                        }
                        None => warn!(
                            "record holds invalid {}",
                            Field::Combo(track, combination, param)
                        ),
                    }
                }
            }
        }
        config.refresh_features();
    }
}
