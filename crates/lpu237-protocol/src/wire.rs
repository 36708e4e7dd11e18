//! ASCII-hex wire codec.
//!
//! Request:  `CMD(1) SUB(1) LEN(1) DATA(LEN)`
//! Response: `'R'(1) RESULT(1) LEN(1) DATA(LEN)`
//!
//! Every byte travels as two lowercase hex characters. Response extractors
//! never fail loudly: a failed result code or an unexpected payload length
//! yields `None`, which callers must treat as a decode failure.

use crate::error::{ProtocolError, ProtocolResult};

pub const RESPONSE_PREFIX: u8 = 0x52;
pub const RESULT_GOOD: u8 = 0xFF;
pub const RESULT_NEGATIVE_GOOD: u8 = 0x80;
pub const RESULT_ERROR: u8 = 0x00;

/// Largest payload one length byte can describe.
pub const MAX_PAYLOAD: usize = 255;

const HEADER_LEN: usize = 3;

/// Even-length, hex-only payload of at most [`MAX_PAYLOAD`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HexPayload(String);

impl HexPayload {
    pub fn new(text: &str) -> ProtocolResult<Self> {
        if text.len() % 2 != 0 {
            return Err(ProtocolError::InvalidHex(format!(
                "odd number of hex digits ({})",
                text.len()
            )));
        }
        if let Some(bad) = text.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ProtocolError::InvalidHex(format!(
                "unexpected character {bad:?}"
            )));
        }
        let len = text.len() / 2;
        if len > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                len,
                max: MAX_PAYLOAD,
            });
        }
        Ok(Self(text.to_ascii_lowercase()))
    }

    pub fn from_bytes(bytes: &[u8]) -> ProtocolResult<Self> {
        if bytes.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                len: bytes.len(),
                max: MAX_PAYLOAD,
            });
        }
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Payload length in bytes.
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn length_byte(&self) -> u8 {
        // The constructor caps the payload at MAX_PAYLOAD bytes.
        u8::try_from(self.byte_len()).unwrap_or(u8::MAX)
    }
}

/// Frames a validated payload as a request.
pub fn encode_request(command: u8, sub: u8, payload: &HexPayload) -> String {
    let mut out = String::with_capacity(HEADER_LEN * 2 + payload.as_str().len());
    out.push_str(&hex::encode([command, sub, payload.length_byte()]));
    out.push_str(payload.as_str());
    out
}

/// `CMD || SUB || LEN || payload_hex`; fails on odd-length, non-hex or
/// oversized payloads.
pub fn build_request(command: u8, sub: u8, payload_hex: &str) -> ProtocolResult<String> {
    let payload = HexPayload::new(payload_hex)?;
    Ok(encode_request(command, sub, &payload))
}

/// A request decoded back from its wire string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    pub command: u8,
    pub sub: u8,
    pub payload: Vec<u8>,
}

/// Inverse of [`build_request`]. `None` on malformed hex or a length byte
/// that disagrees with the data.
pub fn parse_request(wire: &str) -> Option<RawRequest> {
    let bytes = hex::decode(wire).ok()?;
    let (&command, rest) = bytes.split_first()?;
    let (&sub, rest) = rest.split_first()?;
    let (&len, data) = rest.split_first()?;
    if data.len() != usize::from(len) {
        return None;
    }
    Some(RawRequest {
        command,
        sub,
        payload: data.to_vec(),
    })
}

/// Frames a response the way the device does.
pub fn encode_response(result: u8, payload: &[u8]) -> ProtocolResult<String> {
    let Ok(len) = u8::try_from(payload.len()) else {
        return Err(ProtocolError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD,
        });
    };
    let mut out = hex::encode([RESPONSE_PREFIX, result, len]);
    out.push_str(&hex::encode(payload));
    Ok(out)
}

/// A structurally valid device response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    result: u8,
    payload: Vec<u8>,
}

impl Response {
    /// `None` unless the frame has a full header, the `'R'` prefix, and at
    /// least as many data bytes as its length byte declares. Trailing report
    /// padding is ignored.
    pub fn parse(wire: &str) -> Option<Self> {
        if wire.len() < HEADER_LEN * 2 {
            return None;
        }
        let bytes = hex::decode(wire.trim()).ok()?;
        let (&prefix, rest) = bytes.split_first()?;
        if prefix != RESPONSE_PREFIX {
            return None;
        }
        let (&result, rest) = rest.split_first()?;
        let (&len, data) = rest.split_first()?;
        let payload = data.get(..usize::from(len))?.to_vec();
        Some(Self { result, payload })
    }

    pub fn result(&self) -> u8 {
        self.result
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Good or negative-good.
    pub fn is_success(&self) -> bool {
        matches!(self.result, RESULT_GOOD | RESULT_NEGATIVE_GOOD)
    }

    /// Only an unambiguous "yes".
    pub fn is_strictly_good(&self) -> bool {
        self.result == RESULT_GOOD
    }

    /// The payload, if the response succeeded with exactly `expected` bytes.
    pub fn bytes(&self, expected: usize) -> Option<&[u8]> {
        (self.is_success() && self.payload.len() == expected).then_some(self.payload.as_slice())
    }

    /// Fixed-width ASCII, cut at the first NUL.
    pub fn ascii(&self, expected: usize) -> Option<String> {
        let data = self.bytes(expected)?;
        let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
        let text = data.get(..end)?;
        Some(String::from_utf8_lossy(text).into_owned())
    }

    /// The payload re-encoded as lowercase hex.
    pub fn hex(&self, expected: usize) -> Option<String> {
        self.bytes(expected).map(hex::encode)
    }

    /// `true` if any payload byte is non-zero.
    pub fn flag(&self, expected: usize) -> Option<bool> {
        self.bytes(expected)
            .map(|data| data.iter().any(|b| *b != 0))
    }

    /// Little-endian unsigned integer of 1..=4 bytes.
    pub fn uint_le(&self, expected: usize) -> Option<u32> {
        if !(1..=4).contains(&expected) {
            return None;
        }
        let data = self.bytes(expected)?;
        let mut raw = [0u8; 4];
        for (slot, value) in raw.iter_mut().zip(data) {
            *slot = *value;
        }
        Some(u32::from_le_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_fixed_command() {
        let wire = build_request(b'X', 0, "").expect("empty payload is valid");
        assert_eq!(wire, "580000");
    }

    #[test]
    fn test_build_request_length_byte() {
        let wire = build_request(0x41, 0xC9, "1C00000004000000").expect("valid payload");
        assert_eq!(wire, "41c9081c00000004000000");
    }

    #[test]
    fn test_odd_payload_rejected() {
        let err = build_request(0x41, 0xC8, "abc").expect_err("odd hex must fail");
        assert!(matches!(err, ProtocolError::InvalidHex(_)));
    }

    #[test]
    fn test_non_hex_payload_rejected() {
        assert!(build_request(0x41, 0xC8, "zz").is_err());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload = "00".repeat(256);
        let err = build_request(0x41, 0xC8, &payload).expect_err("256 bytes must fail");
        assert_eq!(
            err,
            ProtocolError::PayloadTooLarge {
                len: 256,
                max: 255
            }
        );
        assert!(build_request(0x41, 0xC8, &"00".repeat(255)).is_ok());
    }

    #[test]
    fn test_parse_request_inverse() {
        let wire = build_request(0x41, 0xC8, "0102").expect("valid");
        let raw = parse_request(&wire).expect("parses back");
        assert_eq!(raw.command, 0x41);
        assert_eq!(raw.sub, 0xC8);
        assert_eq!(raw.payload, vec![1, 2]);
        assert!(parse_request("410003").is_none());
    }

    #[test]
    fn test_response_validity() {
        assert!(Response::parse("52ff").is_none());
        assert!(Response::parse("53ff00").is_none());
        assert!(Response::parse("52ff0401").is_none());
        assert!(Response::parse("52ff00").is_some());
    }

    #[test]
    fn test_response_trailing_padding_ignored() {
        let resp = Response::parse("52ff01aa0000").expect("padded response");
        assert_eq!(resp.payload(), &[0xAA]);
    }

    #[test]
    fn test_success_and_strict_good() {
        let good = Response::parse("52ff00").expect("valid");
        let negative = Response::parse("528000").expect("valid");
        let error = Response::parse("520000").expect("valid");
        assert!(good.is_success() && good.is_strictly_good());
        assert!(negative.is_success() && !negative.is_strictly_good());
        assert!(!error.is_success());
    }

    #[test]
    fn test_version_payload() {
        let resp = Response::parse("52ff0401010600").expect("valid");
        assert_eq!(resp.bytes(4), Some(&[1u8, 1, 6, 0][..]));
        assert_eq!(resp.bytes(3), None);
    }

    #[test]
    fn test_ascii_stops_at_nul() {
        let resp = Response::parse("52ff044c500000").expect("valid");
        assert_eq!(resp.ascii(4).as_deref(), Some("LP"));
    }

    #[test]
    fn test_uint_le() {
        let resp = Response::parse("52ff04906500ff").expect("valid");
        assert_eq!(resp.uint_le(4), Some(0xFF006590));
        assert_eq!(resp.uint_le(5), None);
        let one = Response::parse("52ff010a").expect("valid");
        assert_eq!(one.uint_le(1), Some(10));
    }

    #[test]
    fn test_failed_result_yields_no_value() {
        let resp = Response::parse("520001ff").expect("valid");
        assert_eq!(resp.flag(1), None);
        assert_eq!(resp.hex(1), None);
    }

    #[test]
    fn test_encode_response() {
        assert_eq!(encode_response(RESULT_GOOD, &[1, 2]).expect("fits"), "52ff020102");
        assert!(encode_response(RESULT_GOOD, &[0u8; 256]).is_err());
    }
}
