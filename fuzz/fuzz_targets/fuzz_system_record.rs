//! Fuzzes system record parsing and the overlay onto a configuration.
//!
//! Must never panic.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_system_record
#![no_main]
use libfuzzer_sys::fuzz_target;
use lpu237_protocol::{DeviceConfig, SystemRecord};

fuzz_target!(|data: &[u8]| {
    if let Ok(record) = SystemRecord::from_bytes(data) {
        let mut config = DeviceConfig::new();
        record.apply_to(&mut config);
        let mut copy = record.clone();
        copy.overlay(&config);
        let _ = copy.to_bytes();
    }
});
