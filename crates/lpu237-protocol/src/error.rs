//! LPU237 protocol error types.
//!
//! Only encoding failures and malformed structured input surface as errors.
//! A bad device response is never an error: decoders report it as "no value"
//! and the transaction engine reports it as a rejected step.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Invalid hex payload: {0}")]
    InvalidHex(String),

    #[error("Payload too large: {len} bytes exceeds {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Index out of range: track {track}, combination {combination}")]
    IndexOutOfRange { track: usize, combination: usize },

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Field {0} is read-only")]
    ReadOnlyField(String),

    #[error("Record too short: expected {expected} bytes, got {actual}")]
    RecordTooShort { expected: usize, actual: usize },

    #[error("Record too long: expected {expected} bytes, got {actual}")]
    RecordTooLong { expected: usize, actual: usize },

    #[error("Record size mismatch: header declares {declared} bytes, layout is {expected}")]
    RecordSizeMismatch { declared: u32, expected: usize },

    #[error("Set payload holds {actual} bytes but the size field says {declared}")]
    SizeMismatch { declared: u32, actual: usize },

    #[error("Record chunk out of order: expected offset {expected}, got {actual}")]
    ChunkOutOfOrder { expected: u32, actual: u32 },

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl From<hex::FromHexError> for ProtocolError {
    fn from(e: hex::FromHexError) -> Self {
        ProtocolError::InvalidHex(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::RecordTooShort {
            expected: 953,
            actual: 900,
        };
        assert_eq!(
            err.to_string(),
            "Record too short: expected 953 bytes, got 900"
        );
    }

    #[test]
    fn test_error_from_hex() {
        let hex_err = hex::FromHexError::OddLength;
        let err: ProtocolError = hex_err.into();
        assert!(matches!(err, ProtocolError::InvalidHex(_)));
    }
}
