//! Error types for the Percept engine.
//!
//! Errors are organized by subsystem. Transient provider failures carry the
//! HTTP status code when one exists so callers can classify them for retry;
//! data errors name the record that was excluded.

use thiserror::Error;

/// Top-level error type for Percept operations.
#[derive(Error, Debug)]
pub enum PerceptError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Engine errors (tagging, hub detection, scheduling)
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Engine errors, organized by failure class.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Embedding provider call failed (network, HTTP, malformed response).
    /// Transient; callers may retry based on the status code.
    #[error("Embedding provider error: {message}")]
    Provider {
        message: String,
        status_code: Option<u16>,
    },

    /// An embedding call exceeded its deadline
    #[error("Timeout in {stage} after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// A record has no embedding and none could be computed
    #[error("No embedding available for {id}")]
    MissingEmbedding { id: String },

    /// A record's embedding does not match the configured dimension
    #[error("Embedding dimension mismatch for {id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    /// A store operation failed
    #[error("Store error: {message}")]
    Store { message: String },

    /// Catalog data could not be loaded or is unusable
    #[error("Catalog error: {message}")]
    Catalog { message: String },

    /// A scan was cancelled cooperatively before completion
    #[error("Scan cancelled")]
    Cancelled,
}

/// Convenience type alias for Percept results.
pub type Result<T> = std::result::Result<T, PerceptError>;

/// Convenience type alias for engine-internal results.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
