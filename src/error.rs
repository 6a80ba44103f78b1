//! Error types for cell configuration, stepping and wiring.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LtcError>;

/// Errors raised while configuring or stepping an LTC cell
#[derive(Error, Debug)]
pub enum LtcError {
    /// Initialization range given for a parameter the cell does not have
    #[error("Unknown parameter '{name}' in initialization ranges (expected one of {expected:?})")]
    UnknownParameter {
        name: String,
        expected: Vec<&'static str>,
    },

    /// Conductance-type parameter with a negative lower bound
    #[error("Initialization range of parameter '{name}' must be non-negative, got min={min}")]
    NegativeLowerBound { name: String, min: f64 },

    /// Range whose lower bound exceeds its upper bound
    #[error("Initialization range of parameter '{name}' is not a valid range: ({min}, {max})")]
    InvalidRange { name: String, min: f64, max: f64 },

    /// Any other invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input, state or time tensor does not match the built dimensions
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Elapsed time that is not positive and finite in every batch row
    #[error("Elapsed time must be positive and finite, got values in [{min}, {max}]")]
    InvalidElapsedTime { min: f64, max: f64 },

    #[error("Wiring error: {0}")]
    Wiring(#[from] WiringError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LtcError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        LtcError::InvalidConfig(msg.into())
    }

    pub fn shape_mismatch(what: &'static str, expected: Vec<usize>, actual: Vec<usize>) -> Self {
        LtcError::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }
}

/// Errors raised by wiring construction and mutation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WiringError {
    #[error("Conflicting input dimensions: expected {expected}, got {got}")]
    ConflictingInputDim { expected: usize, got: usize },

    #[error("Wiring is not built; call build(input_dim) first")]
    NotBuilt,

    #[error("Invalid synapse: src={src}, dest={dest}, units={units}")]
    InvalidSynapse {
        src: usize,
        dest: usize,
        units: usize,
    },

    #[error("Invalid sensory synapse: src={src}, dest={dest}, input_dim={input_dim}, units={units}")]
    InvalidSensorySynapse {
        src: usize,
        dest: usize,
        input_dim: usize,
        units: usize,
    },

    #[error("Polarity must be -1 or 1, got {0}")]
    InvalidPolarity(i32),

    #[error("Sparsity level {level} outside of {allowed}")]
    InvalidSparsity { level: f64, allowed: &'static str },

    #[error("{what} {fanout} exceeds number of {target} neurons {available}")]
    InvalidFanout {
        what: &'static str,
        fanout: usize,
        target: &'static str,
        available: usize,
    },

    #[error("Output size {output} exceeds limit {limit}")]
    InvalidOutputSize { output: usize, limit: usize },

    #[error("Malformed {what} matrix: expected {rows}x{cols}")]
    MalformedMatrix {
        what: &'static str,
        rows: usize,
        cols: usize,
    },
}
