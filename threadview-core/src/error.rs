use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThreadviewError {
    #[error("invalid thread id: {0}")]
    InvalidThreadId(String),

    #[error(
        "no API key configured (pass --api-key, set THREADVIEWER_API_KEY or OPENAI_API_KEY, or add api_key to the config file)"
    )]
    MissingApiKey,

    #[error("invalid config file {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("cannot decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ThreadviewError>;
