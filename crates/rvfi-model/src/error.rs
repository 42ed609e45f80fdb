//! Error types for interpolation operations.
//!
//! Shape and range problems are caught before the cascade runs; resource
//! and numeric failures surface from the driver. Per-sample errors are the
//! data layer's concern and never appear here.

use thiserror::Error;

/// Main error type for model operations.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Input tensors disagree in shape or violate alignment.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Timestep outside the interpolation range.
    #[error("Invalid timestep: {0}")]
    InvalidTimestep(String),

    /// Malformed scale schedule.
    #[error("Invalid scale schedule: {0}")]
    InvalidSchedule(String),

    /// Non-finite values where finite ones are required.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Checkpoint could not be read, parsed or applied.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// A required file is absent.
    #[error("Missing resource: {0}")]
    MissingResource(String),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

impl ModelError {
    /// Create an invalid timestep error.
    pub fn invalid_timestep(msg: impl Into<String>) -> Self {
        Self::InvalidTimestep(msg.into())
    }

    /// Create an invalid schedule error.
    pub fn invalid_schedule(msg: impl Into<String>) -> Self {
        Self::InvalidSchedule(msg.into())
    }

    /// Create a numerical instability error.
    pub fn numerical_instability(msg: impl Into<String>) -> Self {
        Self::NumericalInstability(msg.into())
    }

    /// Create a checkpoint error.
    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Self::Checkpoint(msg.into())
    }

    /// Create a missing resource error.
    pub fn missing_resource(msg: impl Into<String>) -> Self {
        Self::MissingResource(msg.into())
    }
}
