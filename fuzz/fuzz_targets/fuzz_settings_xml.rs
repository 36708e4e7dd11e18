//! Fuzzes the settings XML importer.
//!
//! Must never panic; malformed documents are errors.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_settings_xml
#![no_main]
use libfuzzer_sys::fuzz_target;
use lpu237_protocol::DeviceConfig;
use lpu237_settings::import_xml;

fuzz_target!(|data: &[u8]| {
    if let Ok(xml) = std::str::from_utf8(data) {
        let mut config = DeviceConfig::new();
        let _ = import_xml(&mut config, xml);
    }
});
