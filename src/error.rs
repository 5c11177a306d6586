//! Error types for fx-ingest

use thiserror::Error;

/// Main error type for the ingestion pipeline
///
/// None of these are recovered locally: the first error aborts the run and
/// the binary exits non-zero. Blobs already written stay in place.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Zero rate for {currency} against base {base}")]
    ZeroRate { base: String, currency: String },

    #[error("Storage error for {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error("Load error: {0}")]
    Load(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;
