//! Error types for RNN training.

use thiserror::Error;

/// Result type alias for RNN operations.
pub type Result<T> = std::result::Result<T, RnnError>;

/// Errors that can occur while building, training, or persisting an RNN.
#[derive(Debug, Error)]
pub enum RnnError {
    /// Invalid configuration parameter (sizes, learning rate, thresholds).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A token index fell outside the vocabulary.
    #[error("token index {index} out of range for vocabulary of size {size}")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Vocabulary size.
        size: usize,
    },

    /// Inputs and targets of a window have different lengths.
    #[error("window length mismatch: {inputs} inputs but {targets} targets")]
    LengthMismatch {
        /// Number of input tokens.
        inputs: usize,
        /// Number of target tokens.
        targets: usize,
    },

    /// A training window contained no tokens.
    #[error("empty training window")]
    EmptyWindow,

    /// A tensor did not have the shape the model requires.
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Which tensor was checked.
        what: &'static str,
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// NaN or infinity appeared in a gradient accumulator.
    #[error("non-finite value in gradient {param}")]
    NonFiniteGradient {
        /// Name of the parameter whose gradient is corrupt.
        param: &'static str,
    },

    /// A character that is not part of the vocabulary.
    #[error("unknown token {0:?}")]
    UnknownToken(char),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
