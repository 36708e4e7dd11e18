//! Settings import and export for LPU237 readers.
//!
//! XML settings documents are applied to a
//! [`DeviceConfig`](lpu237_protocol::DeviceConfig) through its change-tracked
//! setters, so an import is followed by an ordinary set sequence. The model
//! can be rendered as JSON or YAML for inspection and archiving.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod export;
pub mod import;
pub mod values;

pub use error::{SettingsError, SettingsResult};
pub use export::{ExportFormat, render, to_json, to_yaml};
pub use import::{ImportReport, SkipReason, SkippedAttribute, import_file, import_xml};
