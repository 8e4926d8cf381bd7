//! Error types for Prez Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrezError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    #[error("Invalid language tag: {0}")]
    InvalidLanguageTag(String),

    #[error("Profile graph error: {0}")]
    ProfileGraph(String),

    #[error("SPARQL query error code {code}: {message}")]
    StoreQuery { code: u16, message: String },

    #[error("Unknown store: {0}")]
    UnknownStore(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrezError {
    /// Store failure carrying the code the store (or transport) reported
    pub fn store(code: u16, message: impl Into<String>) -> Self {
        PrezError::StoreQuery {
            code,
            message: message.into(),
        }
    }
}

impl From<oxigraph::store::StorageError> for PrezError {
    fn from(err: oxigraph::store::StorageError) -> Self {
        PrezError::ProfileGraph(err.to_string())
    }
}

impl From<oxigraph::model::IriParseError> for PrezError {
    fn from(err: oxigraph::model::IriParseError) -> Self {
        PrezError::InvalidIri(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PrezError>;
