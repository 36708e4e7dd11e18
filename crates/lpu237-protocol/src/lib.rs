//! LPU237 magnetic-stripe/iButton reader protocol.
//!
//! This crate is I/O-free. It encodes requests as ASCII-hex frames, decodes
//! responses, tracks which configuration fields have been edited, and plans
//! the transaction sequences that read and write the device's system record.
//! Hardware access sits behind [`FrameTransport`]; [`transport::mock`]
//! provides an in-memory device for tests and offline tooling.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod blank;
pub mod bytes;
pub mod chunked;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod frame;
pub mod memory;
pub mod record;
pub mod request;
pub mod sequence;
pub mod tag;
pub mod tracker;
pub mod transport;
pub mod types;
pub mod version;
pub mod wire;

// Flat re-exports so callers can use `lpu237_protocol::Foo`.
pub use blank::BlankFlags;
pub use bytes::{ByteReader, ByteWriter};
pub use chunked::{READ_CHUNK, RecordAssembler, WRITE_CHUNK, read_chunks, write_chunks};
pub use config::{BUZZER_OFF, BUZZER_ON, ComboParams, ComboValue, DeviceConfig};
pub use engine::{EngineState, Lpu237, StepOutcome};
pub use error::{ProtocolError, ProtocolResult};
pub use field::{ComboParam, Field};
pub use frame::{
    IButtonFrame, MsrFrame, ReadState, TrackRead, decode_ibutton_frame, decode_msr_frame,
};
pub use memory::{Location, RECORD_SIZE};
pub use record::{SystemRecord, TrackRecord};
pub use request::{
    AccessKind, Command, ConfigAccess, Request, build_config_get, build_config_set,
    build_field_get, build_field_set, parse_config_request,
};
pub use sequence::Sequence;
pub use tag::{KeyPair, Tag, TagKind};
pub use tracker::ChangeTracker;
pub use transport::{DriveSummary, FrameTransport, TransportError, TransportResult, drive};
pub use types::{
    Combination, DeviceFunction, EcmType, IButtonMode, Interface, Language, Manufacturer,
    Matrix3x3, ParityType, ReadDirection, Track, TrackArray,
};
pub use version::{BootloaderKind, FeatureSet, Version, greater};
pub use wire::{HexPayload, Response, build_request, encode_request, encode_response};
