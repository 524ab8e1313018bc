//! Error types for storage and remote fetches

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to (de)serialize value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn serialization(key: &str, source: serde_json::Error) -> Self {
        Self::Serialization {
            key: key.to_string(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error {status}: {url}")]
    Status { status: u16, url: String },

    #[error("HTTP request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request timed out after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("Invalid response body from {url}: {message}")]
    InvalidBody { url: String, message: String },

    #[error("Request cancelled: {url}")]
    Cancelled { url: String },

    #[error("HTTP client configuration error: {0}")]
    Configuration(String),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
