use lpu237_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Malformed settings XML: {0}")]
    Xml(String),

    #[error("Invalid value {value:?} for {element}.{attribute}")]
    InvalidValue {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("Invalid tag for {element}.{attribute}: {source}")]
    InvalidTag {
        element: String,
        attribute: String,
        #[source]
        source: ProtocolError,
    },

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML export failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

impl From<quick_xml::Error> for SettingsError {
    fn from(e: quick_xml::Error) -> Self {
        SettingsError::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SettingsError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        SettingsError::Xml(e.to_string())
    }
}
