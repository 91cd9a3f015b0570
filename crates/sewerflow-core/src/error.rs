// crates/sewerflow-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Normalization failed: {0}")]
    Normalize(#[from] sewerflow_parser::NormalizeError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Configuration file could not be parsed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
