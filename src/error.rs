//! Error types for concept-shift.

use thiserror::Error;

/// Main error type for concept-shift operations.
#[derive(Error, Debug)]
pub enum ShiftError {
    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ShiftError {
    /// Stable, machine-readable error kind used at the HTTP boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            ShiftError::Range(_) => "range_error",
            ShiftError::Config(_) => "config_error",
            ShiftError::EmptyInput(_) => "empty_input_error",
            ShiftError::Model(_) => "model_error",
            ShiftError::Io(_) => "io_error",
            ShiftError::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the error stems from caller input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ShiftError::Range(_) | ShiftError::Config(_) | ShiftError::EmptyInput(_)
        )
    }
}

/// Invalid slice bounds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Unknown time slice: {0}")]
    UnknownKey(String),

    #[error("Start slice {start} is after end slice {end}")]
    Inverted { start: String, end: String },

    #[error("No time slices available")]
    NoSlices,
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown {kind} strategy: {name}")]
    UnknownStrategy { kind: &'static str, name: String },
}

/// Embedding space loading and lookup errors.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("No model files match: {0}")]
    NoModels(String),

    #[error("Invalid model file pattern: {0}")]
    Pattern(String),

    #[error("Malformed model file {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Duplicate time slice: {0}")]
    DuplicateSlice(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for concept-shift operations.
pub type Result<T> = std::result::Result<T, ShiftError>;
