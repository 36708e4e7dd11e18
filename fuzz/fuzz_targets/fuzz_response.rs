//! Fuzzes response parsing and the engine's response handling.
//!
//! Arbitrary text is fed both to the bare parser and as the answer to every
//! request of a full parameter read. Must never panic.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_response
#![no_main]
use libfuzzer_sys::fuzz_target;
use lpu237_protocol::{Lpu237, Response};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Some(response) = Response::parse(&text) {
        let _ = response.uint_le(4);
        let _ = response.ascii(16);
    }

    let mut device = Lpu237::new();
    if device.generate_get_system_information().is_err() {
        return;
    }
    while device.get_tx_transaction().is_some() {
        device.set_rx_transaction(&text);
        let _ = device.set_from_rx();
    }
});
