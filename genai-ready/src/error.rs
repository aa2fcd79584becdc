//! Error definitions for the client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP client error: {source}")]
    HttpClient {
        #[from]
        source: reqwest::Error,
    },

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Processing failed: {message}")]
    ProcessingFailed { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Polling cancelled")]
    Cancelled,

    #[error("Status query failed after {attempts} attempt(s): {source}")]
    TransientQuery {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Unknown resource status: {message}")]
    UnknownStatus { message: String },
}

impl Error {
    /// 判断错误是否可重试（网络抖动、限流、服务端 5xx）。
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpClient { source } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            Self::ApiError { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
