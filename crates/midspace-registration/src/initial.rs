//! User-supplied initial alignment.

use midspace_core::transform::{matrix_to_voxel, TransformSpace};
use midspace_core::{AffineTransform, ImageGeometry};

use crate::error::{RegistrationError, Result};

/// Tolerance for matching declared and actual geometries.
pub const GEOMETRY_TOLERANCE: f64 = 1e-3;

/// Moving-to-fixed matrix together with the geometries it was computed for.
#[derive(Debug, Clone)]
pub struct InitialTransform {
    matrix: AffineTransform,
    space: TransformSpace,
    source: ImageGeometry,
    target: ImageGeometry,
}

impl InitialTransform {
    /// Create an initial transform mapping `source` (moving) to `target` (fixed).
    pub fn new(
        matrix: AffineTransform,
        space: TransformSpace,
        source: ImageGeometry,
        target: ImageGeometry,
    ) -> Self {
        Self {
            matrix,
            space,
            source,
            target,
        }
    }

    /// Matrix mapping moving voxel indices to fixed voxel indices.
    pub fn voxel(matrix: AffineTransform, source: ImageGeometry, target: ImageGeometry) -> Self {
        Self::new(matrix, TransformSpace::Voxel, source, target)
    }

    /// Matrix mapping moving world points to fixed world points.
    pub fn world(matrix: AffineTransform, source: ImageGeometry, target: ImageGeometry) -> Self {
        Self::new(matrix, TransformSpace::World, source, target)
    }

    /// The matrix as supplied.
    pub fn matrix(&self) -> &AffineTransform {
        &self.matrix
    }

    /// Space the matrix is expressed in.
    pub fn space(&self) -> TransformSpace {
        self.space
    }

    /// Declared moving geometry.
    pub fn source(&self) -> &ImageGeometry {
        &self.source
    }

    /// Declared fixed geometry.
    pub fn target(&self) -> &ImageGeometry {
        &self.target
    }

    /// Check the declared geometries against the images being registered.
    pub fn validate(&self, moving: &ImageGeometry, fixed: &ImageGeometry) -> Result<()> {
        check_match("moving", &self.source, moving)?;
        check_match("fixed", &self.target, fixed)
    }

    /// The transform as a moving-voxel to fixed-voxel matrix.
    pub fn to_voxel(&self) -> AffineTransform {
        match self.space {
            TransformSpace::Voxel => self.matrix,
            TransformSpace::World => matrix_to_voxel(&self.matrix, &self.source, &self.target),
        }
    }
}

fn check_match(role: &str, declared: &ImageGeometry, actual: &ImageGeometry) -> Result<()> {
    if declared.shape() != actual.shape() {
        return Err(RegistrationError::geometry_mismatch(format!(
            "initial transform expects {role} shape {:?}, image has {:?}",
            declared.shape(),
            actual.shape()
        )));
    }
    let diff = declared.vox2world().max_abs_diff(actual.vox2world());
    if diff > GEOMETRY_TOLERANCE {
        return Err(RegistrationError::geometry_mismatch(format!(
            "initial transform {role} voxel-to-world differs by {diff:.3e}"
        )));
    }
    Ok(())
}
