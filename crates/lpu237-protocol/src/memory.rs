//! Memory map of the device's non-volatile parameter store.
//!
//! Offsets are fixed protocol constants taken from the firmware's system
//! record layout. They are tabulated, never computed, so any drift from the
//! firmware shows up as a table diff.

use crate::types::{Combination, Track};

/// Total size of the system record in bytes.
pub const RECORD_SIZE: usize = 953;

/// Offset of the system record inside the parameter space.
pub const RECORD_BASE: u32 = 0;

/// Size of a normal prefix/postfix tag.
pub const TAG_SIZE: u8 = 15;

/// Size of the iButton remove tag.
pub const REMOVE_TAG_SIZE: u8 = 41;

/// Size of the UID payload returned by the `'U'` command.
pub const UID_SIZE: usize = 16;

/// Location of one field inside the parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub offset: u32,
    pub size: u8,
}

impl Location {
    pub const fn new(offset: u32, size: u8) -> Self {
        Self { offset, size }
    }

    pub fn len(&self) -> usize {
        usize::from(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

pub const BLANK: Location = Location::new(0, 4);
pub const RECORD_SIZE_FIELD: Location = Location::new(4, 4);
pub const STRUCTURE_VERSION: Location = Location::new(8, 4);
pub const NAME: Location = Location::new(12, 16);
pub const VERSION: Location = Location::new(28, 4);
pub const BOOT_MODE: Location = Location::new(32, 1);
pub const APP_MODE: Location = Location::new(33, 1);
pub const SERIAL: Location = Location::new(34, 8);
pub const INTERFACE: Location = Location::new(42, 1);
pub const BUZZER: Location = Location::new(43, 4);
pub const WATCHDOG: Location = Location::new(47, 4);
pub const BOOT_RUN_TIME: Location = Location::new(51, 4);
pub const UART_PORT: Location = Location::new(55, 4);
pub const UART_BAUD: Location = Location::new(59, 4);
pub const GLOBAL_SEND_CONDITION: Location = Location::new(63, 1);
pub const TRACK_ORDER: Location = Location::new(64, 3);
pub const LANGUAGE: Location = Location::new(67, 4);
pub const GLOBAL_PREFIX: Location = Location::new(71, TAG_SIZE);
pub const GLOBAL_POSTFIX: Location = Location::new(86, TAG_SIZE);
pub const MANUFACTURER: Location = Location::new(101, 1);
pub const HEADER_RESERVED: Location = Location::new(102, 48);

pub const IBUTTON_PREFIX: Location = Location::new(711, TAG_SIZE);
pub const IBUTTON_POSTFIX: Location = Location::new(726, TAG_SIZE);
pub const UART_PREFIX: Location = Location::new(741, TAG_SIZE);
pub const UART_POSTFIX: Location = Location::new(756, TAG_SIZE);
pub const IBUTTON_REMOVE: Location = Location::new(771, REMOVE_TAG_SIZE);
pub const IBUTTON_REMOVE_PREFIX: Location = Location::new(812, TAG_SIZE);
pub const IBUTTON_REMOVE_POSTFIX: Location = Location::new(827, TAG_SIZE);
pub const TAIL_RESERVED: Location = Location::new(842, 111);

/// Start of each per-track block.
pub const TRACK_BLOCK: [u32; 3] = [150, 337, 524];
/// Size of one per-track block.
pub const TRACK_BLOCK_SIZE: usize = 187;
/// Unused bytes at the end of each per-track block.
pub const TRACK_RESERVED: [Location; 3] = [
    Location::new(276, 61),
    Location::new(463, 61),
    Location::new(650, 61),
];

pub const ENABLE_TRACK: [u32; 3] = [150, 337, 524];
pub const READ_DIRECTION: [[u32; 3]; 3] = [[153, 154, 155], [340, 341, 342], [527, 528, 529]];
pub const BIT_SIZE: [[u32; 3]; 3] = [[156, 157, 158], [343, 344, 345], [530, 531, 532]];
pub const DATA_MASK: [[u32; 3]; 3] = [[159, 160, 161], [346, 347, 348], [533, 534, 535]];
pub const USE_PARITY: [[u32; 3]; 3] = [[162, 163, 164], [349, 350, 351], [536, 537, 538]];
pub const PARITY_TYPE: [[u32; 3]; 3] = [[165, 166, 167], [352, 353, 354], [539, 540, 541]];
pub const STX_PATTERN: [[u32; 3]; 3] = [[168, 169, 170], [355, 356, 357], [542, 543, 544]];
pub const ETX_PATTERN: [[u32; 3]; 3] = [[171, 172, 173], [358, 359, 360], [545, 546, 547]];
pub const MAX_SIZE: [[u32; 3]; 3] = [[174, 175, 176], [361, 362, 363], [548, 549, 550]];
pub const USE_ECM: [[u32; 3]; 3] = [[177, 178, 179], [364, 365, 366], [551, 552, 553]];
pub const ECM_TYPE: [[u32; 3]; 3] = [[180, 181, 182], [367, 368, 369], [554, 555, 556]];
pub const ADD_VALUE: [[u32; 3]; 3] = [[183, 184, 185], [370, 371, 372], [557, 558, 559]];
pub const PRIVATE_PREFIX: [[u32; 3]; 3] = [[186, 201, 216], [373, 388, 403], [560, 575, 590]];
pub const PRIVATE_POSTFIX: [[u32; 3]; 3] = [[231, 246, 261], [418, 433, 448], [605, 620, 635]];

/// Looks up a per-track table entry.
pub fn per_track(table: &[u32; 3], track: Track) -> u32 {
    match track {
        Track::Iso1 => table[0],
        Track::Iso2 => table[1],
        Track::Iso3 => table[2],
    }
}

/// Looks up a per-track, per-combination table entry.
pub fn per_combination(table: &[[u32; 3]; 3], track: Track, combination: Combination) -> u32 {
    let row = match track {
        Track::Iso1 => &table[0],
        Track::Iso2 => &table[1],
        Track::Iso3 => &table[2],
    };
    match combination {
        Combination::First => row[0],
        Combination::Second => row[1],
        Combination::Third => row[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_BYTE_TABLES: [&[[u32; 3]; 3]; 11] = [
        &READ_DIRECTION,
        &BIT_SIZE,
        &DATA_MASK,
        &USE_PARITY,
        &PARITY_TYPE,
        &STX_PATTERN,
        &ETX_PATTERN,
        &MAX_SIZE,
        &USE_ECM,
        &ECM_TYPE,
        &ADD_VALUE,
    ];

    #[test]
    fn test_max_size_offsets() {
        assert_eq!(
            MAX_SIZE,
            [[174, 175, 176], [361, 362, 363], [548, 549, 550]]
        );
        assert_eq!(
            per_combination(&MAX_SIZE, Track::Iso2, Combination::Third),
            363
        );
    }

    #[test]
    fn test_track_blocks_share_one_layout() {
        for table in ONE_BYTE_TABLES {
            for t in 0..3 {
                for c in 0..3 {
                    let relative = table[t][c] - TRACK_BLOCK[t];
                    assert_eq!(relative, table[0][c] - TRACK_BLOCK[0]);
                    assert!((relative as usize) < TRACK_BLOCK_SIZE);
                }
            }
        }
    }

    #[test]
    fn test_fields_do_not_overlap() {
        let mut used = vec![false; RECORD_SIZE];
        let mut claim = |loc: Location| {
            for i in 0..loc.len() {
                let at = loc.offset as usize + i;
                assert!(!used[at], "byte {at} claimed twice");
                used[at] = true;
            }
        };

        for loc in [
            BLANK,
            RECORD_SIZE_FIELD,
            STRUCTURE_VERSION,
            NAME,
            VERSION,
            BOOT_MODE,
            APP_MODE,
            SERIAL,
            INTERFACE,
            BUZZER,
            WATCHDOG,
            BOOT_RUN_TIME,
            UART_PORT,
            UART_BAUD,
            GLOBAL_SEND_CONDITION,
            TRACK_ORDER,
            LANGUAGE,
            GLOBAL_PREFIX,
            GLOBAL_POSTFIX,
            MANUFACTURER,
            HEADER_RESERVED,
            IBUTTON_PREFIX,
            IBUTTON_POSTFIX,
            UART_PREFIX,
            UART_POSTFIX,
            IBUTTON_REMOVE,
            IBUTTON_REMOVE_PREFIX,
            IBUTTON_REMOVE_POSTFIX,
            TAIL_RESERVED,
        ] {
            claim(loc);
        }

        for t in 0..3 {
            claim(Location::new(ENABLE_TRACK[t], 1));
            claim(Location::new(TRACK_BLOCK[t] + 1, 2));
            claim(TRACK_RESERVED[t]);
            for c in 0..3 {
                for table in ONE_BYTE_TABLES {
                    claim(Location::new(table[t][c], 1));
                }
                claim(Location::new(PRIVATE_PREFIX[t][c], TAG_SIZE));
                claim(Location::new(PRIVATE_POSTFIX[t][c], TAG_SIZE));
            }
        }

        assert!(used.iter().all(|b| *b), "record layout has gaps");
    }
}
