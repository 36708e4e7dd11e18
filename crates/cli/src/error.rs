//! Error types for lpuctl

use lpu237_protocol::{ProtocolError, TransportError};
use lpu237_settings::SettingsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CliError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) | Self::Protocol(_) | Self::Settings(_) => 4,
            Self::Transport(_) => 5,
            Self::InvalidConfiguration(_) | Self::YamlError(_) => 3,
            Self::IoError(_) | Self::JsonError(_) => 1,
        }
    }
}

/// Exit code for any error a command returns. Library errors that were not
/// wrapped in [`CliError`] map the same way as their wrapped forms.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<CliError>() {
        e.exit_code()
    } else if error.downcast_ref::<TransportError>().is_some() {
        5
    } else if error.downcast_ref::<ProtocolError>().is_some()
        || error.downcast_ref::<SettingsError>().is_some()
    {
        4
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::InvalidInput("x".to_string()).exit_code(), 4);
        assert_eq!(
            CliError::Transport(TransportError::NoResponse).exit_code(),
            5
        );
        assert_eq!(
            CliError::InvalidConfiguration("bad".to_string()).exit_code(),
            3
        );
    }

    #[test]
    fn test_exit_code_through_context() {
        use anyhow::Context;
        let result: Result<(), TransportError> = Err(TransportError::Disconnected);
        if let Err(error) = result.context("system-info against the simulator") {
            assert_eq!(exit_code_for(&error), 5);
        }
        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), 1);
    }
}
