//! Error types for geometry and transform operations.

use thiserror::Error;

/// Errors raised by the geometry and transform algebra.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialError {
    /// Geometry is malformed (non-positive extent, degenerate axes, wrong rank).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A required inverse does not exist.
    #[error("Singular transform: {0}")]
    SingularTransform(String),

    /// The principal matrix square root contains non-finite values.
    #[error("Transform cannot be symmetrized: matrix square root is not finite")]
    NonSymmetrizable,

    /// Tensor or grid shape disagrees with what the operation expects.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Orientation code could not be parsed.
    #[error("Invalid orientation code: {0}")]
    InvalidOrientation(String),
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, SpatialError>;

impl SpatialError {
    /// Create an invalid geometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create a singular transform error.
    pub fn singular(msg: impl Into<String>) -> Self {
        Self::SingularTransform(msg.into())
    }

    /// Create a shape mismatch error from two shapes.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpatialError::invalid_geometry("shape must be positive");
        assert_eq!(err.to_string(), "Invalid geometry: shape must be positive");
    }

    #[test]
    fn test_shape_mismatch() {
        let err = SpatialError::shape_mismatch(&[4, 4, 4], &[4, 4, 5]);
        let msg = err.to_string();
        assert!(msg.contains("expected [4, 4, 4]"));
        assert!(msg.contains("got [4, 4, 5]"));
    }
}
