//! Error types for autohelp

use std::path::PathBuf;
use thiserror::Error;

/// The analyzer could not open a session
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),
}

/// Sending, editing or reacting to a chat message failed
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to send message to channel {channel_id}: {reason}")]
    SendFailed { channel_id: u64, reason: String },
    #[error("Failed to edit message {message_id}: {reason}")]
    EditFailed { message_id: u64, reason: String },
    #[error("Failed to react to message {message_id}: {reason}")]
    ReactFailed { message_id: u64, reason: String },
}

/// Fetching an attachment failed
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error downloading {name}: {source}")]
    Http {
        name: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Attachment {name} exceeds {limit} bytes")]
    TooLarge { name: String, limit: usize },
}

/// Invalid configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Loading tag definitions failed
#[derive(Debug, Error)]
pub enum TagError {
    #[error("Failed to read tags file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse tags file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
