//! Optional YAML configuration for lpuctl.
//!
//! ```yaml
//! device:
//!   version: 5.20.0.0
//!   structure_version: 4.0.0.0
//!   uid: 0102030405060708090a0b0c0d0e0f10
//!   ibutton_only: false
//! output:
//!   format: json
//! ```

use crate::error::CliError;
use crate::output::OutputFormat;
use lpu237_protocol::memory::UID_SIZE;
use lpu237_protocol::transport::mock::SimulatedLpu237;
use lpu237_protocol::{SystemRecord, Version};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Identity of the simulated reader.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub name: String,
    pub version: String,
    pub structure_version: String,
    /// 16 bytes as hex.
    pub uid: String,
    pub is_standard: bool,
    pub ibutton_only: bool,
    pub mmd1000: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            name: "LPU237".to_string(),
            version: "5.20.0.0".to_string(),
            structure_version: "4.0.0.0".to_string(),
            uid: "0102030405060708090a0b0c0d0e0f10".to_string(),
            is_standard: true,
            ibutton_only: false,
            mmd1000: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub device: DeviceProfile,
    pub output: OutputSection,
}

impl CliConfig {
    /// Defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        debug!("loaded configuration from {:?}", path);
        Ok(config)
    }
}

impl DeviceProfile {
    /// The factory image with this profile's identity.
    pub fn record(&self) -> Result<SystemRecord, CliError> {
        let parse = |text: &str| {
            Version::parse(text)
                .ok_or_else(|| CliError::InvalidConfiguration(format!("bad version {text:?}")))
        };
        let mut record = SystemRecord::factory_default();
        record.version = parse(&self.version)?;
        record.structure_version = parse(&self.structure_version)?;
        if self.name.len() > record.name.len() || !self.name.is_ascii() {
            return Err(CliError::InvalidConfiguration(format!(
                "device name {:?} must be ASCII and at most {} bytes",
                self.name,
                record.name.len()
            )));
        }
        record.name = [0; 16];
        for (slot, byte) in record.name.iter_mut().zip(self.name.bytes()) {
            *slot = byte;
        }
        Ok(record)
    }

    pub fn uid_bytes(&self) -> Result<[u8; UID_SIZE], CliError> {
        let bytes = hex::decode(self.uid.trim())
            .map_err(|e| CliError::InvalidConfiguration(format!("bad uid: {e}")))?;
        <[u8; UID_SIZE]>::try_from(bytes.as_slice()).map_err(|e| {
            CliError::InvalidConfiguration(format!("uid must be {UID_SIZE} bytes: {e}"))
        })
    }

    pub fn simulator(&self) -> Result<SimulatedLpu237, CliError> {
        Ok(SimulatedLpu237::new(&self.record()?)
            .with_uid(self.uid_bytes()?)
            .with_probes(self.is_standard, self.ibutton_only, self.mmd1000))
    }
}
