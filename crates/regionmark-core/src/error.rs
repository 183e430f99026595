//! Error types for the engine.

use crate::shapes::MarkerId;
use thiserror::Error;

/// Errors reported by marker mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Marker not found: {0}")]
    MarkerNotFound(MarkerId),
}

/// Errors produced while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
