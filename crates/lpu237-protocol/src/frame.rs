//! Decoders for frames the reader streams in OPOS mode.
//!
//! These are unsolicited reports, not responses, so they never pass through
//! the transaction queues.

use crate::types::{Track, TrackArray};
use serde::Serialize;
use tracing::debug;

/// Marker occupying bytes `[11, 31)` of every iButton frame.
pub const IBUTTON_MARKER: &[u8; 20] = b"this_is_ibutton_data";
/// Shortest valid iButton frame.
pub const IBUTTON_FRAME_LEN: usize = 31;

const IBUTTON_ID: std::ops::Range<usize> = 3..11;
const IBUTTON_MARKER_AT: std::ops::Range<usize> = 11..31;

/// Outcome of one track in a card swipe.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TrackRead {
    /// Negative device error code, or 0.
    pub error: i8,
    pub data: String,
}

/// A decoded card-swipe frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MsrFrame {
    pub tracks: TrackArray<TrackRead>,
}

/// Decodes a swipe frame: three signed length/error header bytes, then each
/// track's payload. `None` when the frame is shorter than its header says.
pub fn decode_msr_frame(frame: &[u8]) -> Option<MsrFrame> {
    let (header, mut body) = frame.split_first_chunk::<3>()?;
    let mut out = MsrFrame::default();
    for (track, raw) in Track::ALL.into_iter().zip(header) {
        let signed = i8::from_le_bytes([*raw]);
        let slot = out.tracks.get_mut(track);
        if signed < 0 {
            slot.error = signed;
            continue;
        }
        let len = usize::from(signed.unsigned_abs());
        let (data, rest) = body.split_at_checked(len)?;
        let offset = track.ascii_offset();
        slot.data = data
            .iter()
            .map(|b| char::from(b.wrapping_add(offset)))
            .collect();
        body = rest;
    }
    Some(out)
}

/// A decoded iButton contact frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IButtonFrame {
    pub error: i8,
    /// 8-byte key id as lowercase hex.
    pub id: String,
}

/// `None` unless the frame carries the iButton marker.
pub fn decode_ibutton_frame(frame: &[u8]) -> Option<IButtonFrame> {
    if frame.len() < IBUTTON_FRAME_LEN {
        return None;
    }
    if frame.get(IBUTTON_MARKER_AT)? != IBUTTON_MARKER {
        return None;
    }
    let id = frame.get(IBUTTON_ID)?;
    let error = i8::from_le_bytes([*frame.first()?]);
    Some(IButtonFrame {
        error: error.min(0),
        id: hex::encode(id),
    })
}

/// Latest card and iButton data seen on a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReadState {
    pub tracks: TrackArray<TrackRead>,
    pub ibutton_data: String,
    pub ibutton_error: i8,
}

impl ReadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a swipe frame. Leaves the state unchanged and returns
    /// `false` when the frame does not decode.
    pub fn apply_msr(&mut self, frame: &[u8]) -> bool {
        match decode_msr_frame(frame) {
            Some(decoded) => {
                self.tracks = decoded.tracks;
                true
            }
            None => {
                debug!("short msr frame ({} bytes)", frame.len());
                false
            }
        }
    }

    /// Applies an iButton frame. Leaves the state unchanged and returns
    /// `false` for anything that is not an iButton frame.
    pub fn apply_ibutton(&mut self, frame: &[u8]) -> bool {
        match decode_ibutton_frame(frame) {
            Some(decoded) => {
                self.ibutton_data = decoded.id;
                self.ibutton_error = decoded.error;
                true
            }
            None => false,
        }
    }

    /// Routes a frame to the iButton decoder if it carries the marker,
    /// otherwise to the swipe decoder.
    pub fn apply(&mut self, frame: &[u8]) -> bool {
        self.apply_ibutton(frame) || self.apply_msr(frame)
    }
}
