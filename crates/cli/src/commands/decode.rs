//! Decode responses and unsolicited reader frames

use anyhow::Result;
use lpu237_protocol::{IButtonFrame, MsrFrame, Response, decode_ibutton_frame, decode_msr_frame};
use serde::Serialize;

use crate::commands::DecodeCommands;
use crate::error::CliError;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct DecodedResponse {
    result: u8,
    success: bool,
    strictly_good: bool,
    payload: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DecodedFrame {
    Ibutton(IButtonFrame),
    Msr(MsrFrame),
}

/// Execute decode command
pub fn execute(cmd: &DecodeCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        DecodeCommands::Response { hex } => decode_response(hex, format),
        DecodeCommands::Frame { hex } => decode_frame(hex, format),
    }
}

fn decode_response(hex: &str, format: OutputFormat) -> Result<()> {
    let response = Response::parse(hex)
        .ok_or_else(|| CliError::InvalidInput(format!("not an LPU237 response: {hex}")))?;
    let decoded = DecodedResponse {
        result: response.result(),
        success: response.is_success(),
        strictly_good: response.is_strictly_good(),
        payload: ::hex::encode(response.payload()),
    };
    output::emit(format, &decoded, || {
        output::heading("Response");
        output::field("result", format!("0x{:02x}", decoded.result));
        output::field("success", decoded.success);
        output::field("strictly good", decoded.strictly_good);
        output::field("payload", &decoded.payload);
    })
}

/// iButton frames are recognised by their marker; anything else is treated
/// as a card swipe.
fn classify(bytes: &[u8]) -> Option<DecodedFrame> {
    decode_ibutton_frame(bytes)
        .map(DecodedFrame::Ibutton)
        .or_else(|| decode_msr_frame(bytes).map(DecodedFrame::Msr))
}

fn decode_frame(hex: &str, format: OutputFormat) -> Result<()> {
    let bytes = ::hex::decode(hex.trim())
        .map_err(|e| CliError::InvalidInput(format!("frame is not hex: {e}")))?;
    let frame = classify(&bytes)
        .ok_or_else(|| CliError::InvalidInput("frame is shorter than its header".to_string()))?;
    output::emit(format, &frame, || match &frame {
        DecodedFrame::Ibutton(key) => {
            output::heading("iButton");
            output::field("id", &key.id);
            output::field("error", key.error);
        }
        DecodedFrame::Msr(swipe) => {
            output::heading("Card swipe");
            for (track, read) in swipe.tracks.iter() {
                if read.error < 0 {
                    output::field(&format!("{track:?}"), format!("error {}", read.error));
                } else {
                    output::field(&format!("{track:?}"), &read.data);
                }
            }
        }
    })
}
