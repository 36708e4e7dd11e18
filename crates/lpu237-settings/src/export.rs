//! JSON and YAML rendering of the configuration model.

use crate::error::SettingsResult;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Yaml,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// Pretty-printed JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> SettingsResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> SettingsResult<String> {
    Ok(serde_yaml::to_string(value)?)
}

pub fn render<T: Serialize + ?Sized>(value: &T, format: ExportFormat) -> SettingsResult<String> {
    match format {
        ExportFormat::Json => to_json(value),
        ExportFormat::Yaml => to_yaml(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpu237_protocol::{DeviceConfig, Interface};

    #[test]
    fn test_format_parse() {
        assert_eq!("YAML".parse::<ExportFormat>(), Ok(ExportFormat::Yaml));
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("toml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_json_export_uses_snake_case_values() {
        let mut config = DeviceConfig::new();
        config.set_interface(Interface::Rs232);
        let json = to_json(&config).expect("config serializes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["interface"], "rs232");
        assert!(value.get("dirty").is_none());
    }

    #[test]
    fn test_yaml_export() {
        let yaml = to_yaml(&DeviceConfig::new()).expect("config serializes");
        assert!(yaml.contains("interface: usb_keyboard"));
        assert!(yaml.contains("language: usa_english"));
    }
}
