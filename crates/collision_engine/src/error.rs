//! Error types for the collision engine
//!
//! Nothing in the per-tick hot path returns an error: detection anomalies
//! degrade to "no contact reported" so the simulation keeps running. The
//! fallible surface is configuration loading/validation and engine
//! construction.

use thiserror::Error;

/// Unified error type for the collision engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration value is out of valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Convenience alias for `Result<T, EngineError>`.
pub type EngineResult<T> = Result<T, EngineError>;
