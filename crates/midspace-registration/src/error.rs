//! Error types for registration operations.
//!
//! Every variant is fatal for a single registration request: the pipeline
//! aborts and reports the reason, nothing is retried.

use midspace_core::SpatialError;
use thiserror::Error;

/// Main error type for registration operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// Volume has the wrong rank or frame count, or a malformed geometry.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Initial transform's declared geometry disagrees with the actual image.
    #[error("Geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// Mid-space symmetrization was requested without an initial transform.
    #[error("Mid-space symmetrization requires an initial transform")]
    MissingInitialization,

    /// A required inverse does not exist.
    #[error("Singular transform: {0}")]
    SingularTransform(String),

    /// Matrix square root of the initial transform is not finite.
    #[error("Initial transform cannot be symmetrized: matrix square root is not finite")]
    NonSymmetrizable,

    /// Model parameters could not be loaded.
    #[error("Weight loading failed: {0}")]
    WeightLoadFailure(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Inference collaborator failed or returned unusable output.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create an invalid geometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create a geometry mismatch error.
    pub fn geometry_mismatch(msg: impl Into<String>) -> Self {
        Self::GeometryMismatch(msg.into())
    }

    /// Create a weight loading error.
    pub fn weight_load(msg: impl Into<String>) -> Self {
        Self::WeightLoadFailure(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an inference error.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }
}

impl From<SpatialError> for RegistrationError {
    fn from(err: SpatialError) -> Self {
        match err {
            SpatialError::InvalidGeometry(msg) => Self::InvalidGeometry(msg),
            SpatialError::InvalidOrientation(msg) => Self::InvalidGeometry(msg),
            SpatialError::SingularTransform(msg) => Self::SingularTransform(msg),
            SpatialError::NonSymmetrizable => Self::NonSymmetrizable,
            SpatialError::ShapeMismatch { expected, actual } => {
                Self::ShapeMismatch { expected, actual }
            }
        }
    }
}
