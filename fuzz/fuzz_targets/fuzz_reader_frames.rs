//! Fuzzes the card-swipe and iButton report decoders.
//!
//! Must never panic.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_reader_frames
#![no_main]
use libfuzzer_sys::fuzz_target;
use lpu237_protocol::{ReadState, decode_ibutton_frame, decode_msr_frame};

fuzz_target!(|data: &[u8]| {
    let _ = decode_msr_frame(data);
    let _ = decode_ibutton_frame(data);
    let mut state = ReadState::new();
    let _ = state.apply(data);
});
