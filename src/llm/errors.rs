//! Error types for the provider gateway

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("invalid provider configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider API error: {0}")]
    Api(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LlmResult<T> = Result<T, LlmError>;
