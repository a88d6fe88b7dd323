//! Voxel-grid geometry and its mapping to world coordinates.

use crate::error::{Result, SpatialError};
use crate::spatial::{Matrix3, Orientation, Point3, Vector3};
use crate::transform::AffineTransform;

/// Immutable description of a 3D voxel grid placed in world space.
///
/// The linear part of `vox2world` is `rotation · shear · diag(voxel_size)`
/// and `center` is the world position of voxel `shape / 2`.
///
/// # Examples
/// ```rust
/// use midspace_core::{ImageGeometry, Orientation, Point3, Vector3};
///
/// let geom = ImageGeometry::with_orientation(
///     [256, 256, 256],
///     Vector3::new(1.0, 1.0, 1.0),
///     Orientation::LIA,
///     Point3::origin(),
/// )
/// .unwrap();
/// assert!(geom.vox2world().compose(geom.world2vox()).is_identity());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry {
    shape: [usize; 3],
    voxel_size: Vector3,
    rotation: Matrix3,
    center: Point3,
    shear: Matrix3,
    vox2world: AffineTransform,
    world2vox: AffineTransform,
}

impl ImageGeometry {
    /// Create a geometry from its parameters.
    ///
    /// # Arguments
    /// * `shape` - Grid extent along each voxel axis, all positive
    /// * `voxel_size` - Physical size of a voxel along each axis, all positive
    /// * `rotation` - Direction matrix, column `i` is the world direction of axis `i`
    /// * `center` - World position of voxel `shape / 2`
    /// * `shear` - Optional upper-triangular shear; `None` means identity
    pub fn new(
        shape: [usize; 3],
        voxel_size: Vector3,
        rotation: Matrix3,
        center: Point3,
        shear: Option<Matrix3>,
    ) -> Result<Self> {
        if shape.iter().any(|&n| n == 0) {
            return Err(SpatialError::invalid_geometry(format!(
                "shape must be positive, got {shape:?}"
            )));
        }
        if voxel_size.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(SpatialError::invalid_geometry(format!(
                "voxel size must be positive, got {:?}",
                voxel_size.as_slice()
            )));
        }
        if rotation.iter().chain(center.iter()).any(|v| !v.is_finite()) {
            return Err(SpatialError::invalid_geometry(
                "rotation and center must be finite",
            ));
        }
        let shear = shear.unwrap_or_else(Matrix3::identity);

        let linear = rotation * shear * Matrix3::from_diagonal(&voxel_size);
        let translation = center.coords - linear * center_voxel(&shape);
        let vox2world = AffineTransform::from_parts(linear, translation);
        let world2vox = vox2world
            .inverse()
            .map_err(|e| SpatialError::invalid_geometry(format!("degenerate axes: {e}")))?;

        Ok(Self {
            shape,
            voxel_size,
            rotation,
            center,
            shear,
            vox2world,
            world2vox,
        })
    }

    /// Create an unsheared geometry from an orientation code.
    pub fn with_orientation(
        shape: [usize; 3],
        voxel_size: Vector3,
        orientation: Orientation,
        center: Point3,
    ) -> Result<Self> {
        Self::new(shape, voxel_size, orientation.rotation(), center, None)
    }

    /// Recover a geometry from a raw voxel-to-world matrix.
    ///
    /// The linear part is split by QR into an orthonormal direction matrix,
    /// positive voxel sizes and a unit-diagonal upper-triangular shear.
    pub fn from_vox2world(shape: [usize; 3], matrix: &AffineTransform) -> Result<Self> {
        if !matrix.is_finite() {
            return Err(SpatialError::invalid_geometry(
                "voxel-to-world matrix is not finite",
            ));
        }
        let qr = matrix.linear().qr();
        let (q, r) = (qr.q(), qr.r());

        let signs = Vector3::from_fn(|i, _| if r[(i, i)] < 0.0 { -1.0 } else { 1.0 });
        let flip = Matrix3::from_diagonal(&signs);
        let rotation = q * flip;
        let upper = flip * r;

        let voxel_size = upper.diagonal();
        if voxel_size.iter().any(|v| *v < 1e-12) {
            return Err(SpatialError::invalid_geometry(
                "voxel-to-world matrix has a degenerate axis",
            ));
        }
        let shear = Matrix3::from_fn(|row, col| upper[(row, col)] / voxel_size[col]);

        let center = matrix.transform_point(&Point3::from(center_voxel(&shape)));
        Self::new(shape, voxel_size, rotation, center, Some(shear))
    }

    /// Grid extent along each voxel axis.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Physical voxel size.
    pub fn voxel_size(&self) -> &Vector3 {
        &self.voxel_size
    }

    /// Direction matrix.
    pub fn rotation(&self) -> &Matrix3 {
        &self.rotation
    }

    /// World position of voxel `shape / 2`.
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Shear matrix (identity when unsheared).
    pub fn shear(&self) -> &Matrix3 {
        &self.shear
    }

    /// True if the shear deviates from identity.
    pub fn has_shear(&self) -> bool {
        (self.shear - Matrix3::identity()).amax() > 1e-9
    }

    /// Closest axis orientation code.
    pub fn orientation(&self) -> Orientation {
        Orientation::from_rotation(&self.rotation)
    }

    /// Voxel-to-world transform.
    pub fn vox2world(&self) -> &AffineTransform {
        &self.vox2world
    }

    /// World-to-voxel transform.
    pub fn world2vox(&self) -> &AffineTransform {
        &self.world2vox
    }

    /// Map a continuous voxel index to a world point.
    pub fn voxel_to_world(&self, index: &Point3) -> Point3 {
        self.vox2world.transform_point(index)
    }

    /// Map a world point to a continuous voxel index.
    pub fn world_to_voxel(&self, point: &Point3) -> Point3 {
        self.world2vox.transform_point(point)
    }

    /// Same grid within `tol`: identical shape and entry-wise close `vox2world`.
    pub fn is_equal(&self, other: &ImageGeometry, tol: f64) -> bool {
        self.shape == other.shape && self.vox2world.approx_eq(&other.vox2world, tol)
    }

    /// Copy of this geometry re-centered on `center`.
    pub fn with_center(&self, center: Point3) -> Result<Self> {
        Self::new(
            self.shape,
            self.voxel_size,
            self.rotation,
            center,
            Some(self.shear),
        )
    }
}

fn center_voxel(shape: &[usize; 3]) -> Vector3 {
    Vector3::new(
        shape[0] as f64 / 2.0,
        shape[1] as f64 / 2.0,
        shape[2] as f64 / 2.0,
    )
}
