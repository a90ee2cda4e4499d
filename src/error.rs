use crate::functions::nodetype::NodeKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypedGpError {
    #[error("No {mode} routine registered for {kind} with signature {sig_hash:#018x}")]
    Lookup {
        mode: &'static str,
        kind: NodeKind,
        sig_hash: u64,
    },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Program is not fitted. Call 'fit' before 'predict'")]
    NotFitted,

    #[error("Size mismatch: expected {expected} weights, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, TypedGpError>;
