//! Error handling for the audit engine

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed address specification (fatal, aborts before any network activity)
    #[error("Address format error: {0}")]
    AddressFormat(String),

    /// Device session could not be established
    #[error("Cannot connect to {host}:{port}: {message}")]
    Connect {
        host: String,
        port: u16,
        message: String,
    },

    /// Individual device query failed after connect
    #[error("Device query failed: {0}")]
    Query(String),

    /// Authenticated snapshot download failed
    #[error("Snapshot fetch failed: {0}")]
    Fetch(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),
}
